// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + periodic validation using Burn's DataLoader and AdamW.
//
//   - Training runs on the autodiff backend B
//   - model.valid() gives the same weights on B::InnerBackend,
//     so validation builds no graph
//   - The validation loader yields one image per batch; metrics
//     are averaged over the number of batches
//   - Burn's cosine annealing scheduler is stepped once per
//     epoch; the value it returns is that epoch's learning rate
//
// A best checkpoint is written only when validation PSNR strictly
// beats the best seen so far. After every epoch the weights,
// optimiser moments and epoch number are saved as "last", so a
// resumed run continues the epoch count and the schedule.

use anyhow::Result;
use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    lr_scheduler::{
        cosine::{CosineAnnealingLrScheduler, CosineAnnealingLrSchedulerConfig},
        LrScheduler,
    },
    module::AutodiffModule,
    optim::{AdamWConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::{
    batcher::EnhanceBatcher,
    dataset::{ensure_full_pass, PairedImageDataset},
};
use crate::infra::{
    checkpoint::{load_model, BestCheckpoint, CheckpointManager, TrainState},
    config::{OptimSection, RunConfig},
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::{
    loss::EnhanceLoss,
    meter::QualityMeter,
    model::{EnhanceNet, EnhanceNetConfig},
};
use crate::quality::lpips::Lpips;

/// What a finished run achieved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainSummary {
    /// Epochs trained by this invocation
    pub epochs_run: usize,
    pub best_epoch: usize,
    /// `-inf` if no validation ever ran
    pub best_psnr:  f64,
}

/// Cosine annealing from LR_INITIAL to LR_MIN over NUM_EPOCHS steps.
/// The first `step()` returns LR_INITIAL.
pub fn cosine_schedule(optim: &OptimSection) -> Result<CosineAnnealingLrScheduler> {
    CosineAnnealingLrSchedulerConfig::new(optim.lr_initial, optim.num_epochs)
        .with_min_lr(optim.lr_min)
        .init()
        .map_err(|e| anyhow::anyhow!("Invalid learning-rate schedule: {e}"))
}

pub fn run_training<B: AutodiffBackend>(
    cfg:           &RunConfig,
    model_cfg:     &EnhanceNetConfig,
    train_dataset: PairedImageDataset,
    val_dataset:   PairedImageDataset,
    ckpt_manager:  &CheckpointManager,
    logger:        &MetricsLogger,
    device:        B::Device,
) -> Result<TrainSummary> {
    let optim_cfg = &cfg.optim;
    B::seed(optim_cfg.seed);

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: EnhanceNet<B> = model_cfg.init(&device);
    if let Some(resume) = &cfg.training.resume {
        model = load_model(model, resume, &device)?;
    }
    tracing::info!(
        "Model ready: base_channels={}, num_blocks={}",
        model_cfg.base_channels,
        model_cfg.num_blocks,
    );

    // ── Loss ──────────────────────────────────────────────────────────────────
    let lpips: Option<Lpips<B>> = match &cfg.loss.lpips_weights {
        Some(path) => Some(Lpips::load(path, &device)?),
        None => {
            tracing::warn!("LOSS.LPIPS_WEIGHTS not set: LPIPS loss and metric disabled");
            None
        }
    };
    let val_lpips = lpips.as_ref().map(|l| l.valid());
    let loss_fn = EnhanceLoss::new(lpips, cfg.loss.smooth_l1, cfg.loss.ssim, cfg.loss.lpips);
    tracing::info!(
        "Loss: {} x SmoothL1 + {} x (1 - SSIM){}",
        cfg.loss.smooth_l1,
        cfg.loss.ssim,
        if loss_fn.has_lpips() { format!(" + {} x LPIPS", cfg.loss.lpips) } else { String::new() },
    );

    // ── AdamW + cosine annealing ──────────────────────────────────────────────
    let mut optim = AdamWConfig::new()
        .with_beta_1(0.9)
        .with_beta_2(0.999)
        .with_epsilon(1e-8)
        .with_weight_decay(optim_cfg.weight_decay)
        .init();
    let mut scheduler = cosine_schedule(optim_cfg)?;

    // ── Resume point ──────────────────────────────────────────────────────────
    let mut start_epoch = 1usize;
    let mut best_psnr   = f64::NEG_INFINITY;
    let mut best_epoch  = 0usize;
    if cfg.training.resume.is_some() {
        if let Some(state) = ckpt_manager.state()? {
            start_epoch = state.epoch + 1;
            if let Some(record) = ckpt_manager.load_optimizer::<B, _>(&device)? {
                optim = optim.load_record(record);
            }
        }
        if let Ok(prev) = ckpt_manager.best() {
            best_psnr  = prev.psnr;
            best_epoch = prev.epoch;
        }
        tracing::info!(
            "Resuming at epoch {} against best PSNR {:.4} (epoch {})",
            start_epoch, best_psnr, best_epoch,
        );
    }
    for _ in 1..start_epoch {
        scheduler.step();
    }

    // ── Data loaders ──────────────────────────────────────────────────────────
    let train_len = train_dataset.len();
    let val_len   = val_dataset.len();
    tracing::info!("Train samples: {}, validation samples: {}", train_len, val_len);

    let train_loader = DataLoaderBuilder::new(EnhanceBatcher::<B>::new(device.clone()))
        .batch_size(optim_cfg.batch_size)
        .shuffle(optim_cfg.seed)
        .num_workers(cfg.training.num_workers)
        .build(train_dataset);

    let val_loader = DataLoaderBuilder::new(EnhanceBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(1)
        .num_workers(cfg.training.num_workers)
        .build(val_dataset);

    // ── Epoch loop ────────────────────────────────────────────────────────────
    let mut epochs_run = 0usize;

    for epoch in start_epoch..=optim_cfg.num_epochs {
        let lr = scheduler.step();

        // ── Training phase ────────────────────────────────────────────────────
        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;
        let mut seen     = 0usize;

        for batch in train_loader.iter() {
            seen += batch.inputs.dims()[0];
            let res = model.forward(batch.inputs);
            let (loss, terms) = loss_fn.forward(res, batch.targets)?;

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            loss_sum += loss_val;
            batches  += 1;
            tracing::trace!(
                epoch,
                batch = batches,
                loss = loss_val,
                smooth_l1 = terms.smooth_l1,
                ssim = terms.ssim,
                lpips = ?terms.lpips,
                "Batch done"
            );

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(lr, model, grads);
        }
        ensure_full_pass("training", seen, train_len)?;
        epochs_run += 1;

        let train_loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
        tracing::debug!(epoch, train_loss, lr, "Epoch trained");

        if epoch % cfg.training.val_after_every == 0 {
            // ── Validation phase ──────────────────────────────────────────────
            let model_valid = model.valid();
            let mut meter = QualityMeter::new(val_lpips.clone());
            for batch in val_loader.iter() {
                let res = model_valid.forward(batch.inputs);
                meter.update(res, batch.targets)?;
            }
            ensure_full_pass("validation", meter.samples(), val_len)?;
            let stats = meter.finish();

            let mut metrics = EpochMetrics {
                epoch,
                stats,
                train_loss,
                best_psnr,
                best_epoch,
                lr,
            };
            if metrics.is_improvement(best_psnr) {
                best_psnr  = stats.psnr;
                best_epoch = epoch;
                metrics.best_psnr  = best_psnr;
                metrics.best_epoch = best_epoch;
                ckpt_manager.save_best(&model_valid, BestCheckpoint { epoch, psnr: best_psnr })?;
            }
            logger.log(&metrics)?;
            tracing::info!(
                epoch,
                psnr = stats.psnr,
                ssim = stats.ssim,
                lpips = ?stats.lpips,
                uciqe = stats.uciqe,
                uiqm = stats.uiqm,
                "Validation done"
            );
            println!("{}", metrics.summary());
        }

        ckpt_manager.save_last(&model, TrainState { epoch })?;
        ckpt_manager.save_optimizer::<B, _>(optim.to_record())?;
    }

    tracing::info!("Training complete. Best PSNR {:.4} at epoch {}", best_psnr, best_epoch);
    Ok(TrainSummary {
        epochs_run,
        best_epoch,
        best_psnr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use std::{fs, path::{Path, PathBuf}};

    use crate::data::loader::{tests::write_pair, PairedImageSource};
    use crate::domain::{
        sample::{PatchSize, SplitMode},
        traits::PairSource,
    };

    type B = Autodiff<NdArray>;

    struct Fixture {
        _tmp:       tempfile::TempDir,
        train_root: PathBuf,
        val_root:   PathBuf,
        cfg:        RunConfig,
    }

    fn fixture(num_epochs: usize) -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let train_root = tmp.path().join("train");
        let val_root   = tmp.path().join("val");
        for (i, shade) in [40u8, 90, 140, 200].iter().enumerate() {
            write_pair(&train_root, &format!("t{i}.png"), 12, 10, *shade);
        }
        write_pair(&val_root, "v0.png", 9, 7, 120);
        write_pair(&val_root, "v1.png", 9, 7, 60);

        let mut cfg = RunConfig::default();
        cfg.optim.batch_size  = 2;
        cfg.optim.num_epochs  = num_epochs;
        cfg.training.ps_w     = 8;
        cfg.training.ps_h     = 8;
        cfg.training.ori      = true;
        cfg.training.num_workers = 1;
        cfg.training.save_dir = tmp.path().join("ckpt");
        cfg.log.log_dir       = tmp.path().join("logs");

        Fixture { _tmp: tmp, train_root, val_root, cfg }
    }

    fn datasets(fx: &Fixture) -> (PairedImageDataset, PairedImageDataset) {
        let patch = PatchSize::new(8, 8);
        let train = PairedImageDataset::new(
            PairedImageSource::new(&fx.train_root, "input", "target").pairs().unwrap(),
            SplitMode::Train, patch, false, 7,
        );
        let val = PairedImageDataset::new(
            PairedImageSource::new(&fx.val_root, "input", "target").pairs().unwrap(),
            SplitMode::Test, patch, true, 7,
        );
        (train, val)
    }

    fn model_cfg() -> EnhanceNetConfig {
        EnhanceNetConfig::new().with_base_channels(2).with_num_blocks(1)
    }

    fn train(fx: &Fixture) -> Result<TrainSummary> {
        let (train, val) = datasets(fx);
        let ckpt   = CheckpointManager::new(fx.cfg.session_dir()).unwrap();
        let logger = MetricsLogger::new(fx.cfg.train_log_path()).unwrap();
        run_training::<B>(&fx.cfg, &model_cfg(), train, val, &ckpt, &logger, Default::default())
    }

    fn file_with_prefix(dir: &Path, prefix: &str) -> Option<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .find(|p| p.file_name().unwrap().to_string_lossy().starts_with(prefix))
    }

    fn log_lines(fx: &Fixture) -> Vec<serde_json::Value> {
        fs::read_to_string(fx.cfg.train_log_path())
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_short_run_saves_best_and_logs() {
        let fx = fixture(2);
        let summary = train(&fx).unwrap();

        assert_eq!(summary.epochs_run, 2);
        assert!(summary.best_epoch >= 1);
        assert!(summary.best_psnr.is_finite());

        let ckpt = CheckpointManager::new(fx.cfg.session_dir()).unwrap();
        assert_eq!(ckpt.best().unwrap().epoch, summary.best_epoch);
        assert_eq!(ckpt.state().unwrap(), Some(TrainState { epoch: 2 }));
        assert!(file_with_prefix(ckpt.dir(), "model_last.").is_some());
        assert!(file_with_prefix(ckpt.dir(), "optim_last.").is_some());

        let lines = log_lines(&fx);
        assert_eq!(lines.len(), 2);
        assert!((lines[0]["lr"].as_f64().unwrap() - fx.cfg.optim.lr_initial).abs() < 1e-12);
    }

    #[test]
    fn test_resume_continues_epochs_and_schedule() {
        let mut fx = fixture(2);
        train(&fx).unwrap();

        let ckpt = CheckpointManager::new(fx.cfg.session_dir()).unwrap();
        fx.cfg.optim.num_epochs = 3;
        fx.cfg.training.resume  = Some(ckpt.last_path());
        let summary = train(&fx).unwrap();

        assert_eq!(summary.epochs_run, 1);
        assert_eq!(ckpt.state().unwrap(), Some(TrainState { epoch: 3 }));

        let lines = log_lines(&fx);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2]["epoch"], 3);
        // Third of three epochs: t = 2 of T = 3, well below LR_INITIAL
        let mut expected = cosine_schedule(&fx.cfg.optim).unwrap();
        let lr3 = (0..3).map(|_| expected.step()).last().unwrap();
        assert!((lines[2]["lr"].as_f64().unwrap() - lr3).abs() < 1e-12);
        assert!(lr3 < fx.cfg.optim.lr_initial);
    }

    #[test]
    fn test_non_improving_validation_keeps_best_checkpoint() {
        let mut fx = fixture(1);
        let ckpt = CheckpointManager::new(fx.cfg.session_dir()).unwrap();
        let seeded = BestCheckpoint { epoch: 99, psnr: 1e9 };
        ckpt.save_best(&model_cfg().init::<B>(&Default::default()), seeded).unwrap();

        let best_weights = file_with_prefix(ckpt.dir(), "model_best.").unwrap();
        let weights_before = fs::read(&best_weights).unwrap();
        let json_before    = fs::read(ckpt.dir().join("best.json")).unwrap();

        fx.cfg.training.resume = Some(ckpt.best_path());
        let summary = train(&fx).unwrap();

        assert_eq!(summary.best_epoch, 99);
        assert_eq!(ckpt.best().unwrap(), seeded);
        assert_eq!(fs::read(&best_weights).unwrap(), weights_before);
        assert_eq!(fs::read(ckpt.dir().join("best.json")).unwrap(), json_before);
        assert!(file_with_prefix(ckpt.dir(), "model_epoch_1.").is_none());

        let lines = log_lines(&fx);
        assert_eq!(lines[0]["best_epoch"], 99);
    }

    #[test]
    fn test_unreadable_validation_image_fails_the_run() {
        let fx = fixture(1);
        let (train_ds, val_ds) = datasets(&fx);
        // Corrupted after the scan, so only the loader can notice
        fs::write(fx.val_root.join("input").join("v0.png"), b"not a png").unwrap();

        let ckpt   = CheckpointManager::new(fx.cfg.session_dir()).unwrap();
        let logger = MetricsLogger::new(fx.cfg.train_log_path()).unwrap();
        let err = run_training::<B>(&fx.cfg, &model_cfg(), train_ds, val_ds, &ckpt, &logger, Default::default())
            .unwrap_err();
        assert!(err.to_string().contains("0 of 2"), "{err}");
    }

    #[test]
    fn test_cosine_schedule_endpoints() {
        let mut optim = RunConfig::default().optim;
        optim.num_epochs = 10;
        let mut sched = cosine_schedule(&optim).unwrap();

        let lrs: Vec<f64> = (0..11).map(|_| sched.step()).collect();
        assert!((lrs[0] - optim.lr_initial).abs() < 1e-12);
        assert!((lrs[5] - (optim.lr_initial + optim.lr_min) / 2.0).abs() < 1e-12);
        assert!((lrs[10] - optim.lr_min).abs() < 1e-12);
        assert!(lrs.windows(2).all(|w| w[1] <= w[0]));
    }
}
