// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a training run in order:
//
//   Step 1: Scan train / val pairs      (Layer 4 - data)
//   Step 2: Build Burn datasets         (Layer 4 - data)
//   Step 3: Save the model config       (Layer 6 - infra)
//   Step 4: Open the metrics log        (Layer 6 - infra)
//   Step 5: Run the training loop       (Layer 5 - ml)

use anyhow::Result;
use burn::backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu};

use crate::application::BackendKind;
use crate::data::{dataset::PairedImageDataset, loader::PairedImageSource};
use crate::domain::{sample::SplitMode, traits::PairSource};
use crate::infra::{checkpoint::CheckpointManager, config::RunConfig, metrics::MetricsLogger};
use crate::ml::{
    model::EnhanceNetConfig,
    trainer::{run_training, TrainSummary},
};

pub struct TrainUseCase {
    config:  RunConfig,
    backend: BackendKind,
}

impl TrainUseCase {
    pub fn new(config: RunConfig, backend: BackendKind) -> Self {
        Self { config, backend }
    }

    pub fn execute(&self) -> Result<TrainSummary> {
        let cfg = &self.config;
        let model = &cfg.model;

        // ── Step 1: Pair input/target files ──────────────────────────────────
        let train_pairs = PairedImageSource::new(&cfg.training.train_dir, &model.input, &model.target).pairs()?;
        let val_pairs   = PairedImageSource::new(&cfg.training.val_dir, &model.input, &model.target).pairs()?;

        // ── Step 2: Datasets ──────────────────────────────────────────────────
        // Validation is deterministic: original size (ORI) or resized to the patch
        let patch = cfg.patch_size();
        let train_dataset = PairedImageDataset::new(train_pairs, SplitMode::Train, patch, false, cfg.optim.seed);
        let val_dataset   = PairedImageDataset::new(val_pairs, SplitMode::Test, patch, cfg.training.ori, cfg.optim.seed);

        // ── Step 3: Architecture next to the weights ──────────────────────────
        let ckpt_manager = CheckpointManager::new(cfg.session_dir())?;
        let model_cfg = EnhanceNetConfig::new()
            .with_base_channels(model.base_channels)
            .with_num_blocks(model.num_blocks);
        ckpt_manager.save_model_config(&model_cfg)?;

        // ── Step 4: JSON-lines log ────────────────────────────────────────────
        let logger = MetricsLogger::new(cfg.train_log_path())?;
        tracing::info!(
            "Session '{}': checkpoints in '{}', metrics in '{}'",
            model.session,
            ckpt_manager.dir().display(),
            logger.path().display(),
        );

        // ── Step 5: Train on the chosen backend ───────────────────────────────
        match self.backend {
            BackendKind::Wgpu => {
                let device = WgpuDevice::default();
                tracing::info!("Using WGPU device: {:?}", device);
                run_training::<Autodiff<Wgpu>>(cfg, &model_cfg, train_dataset, val_dataset, &ckpt_manager, &logger, device)
            }
            BackendKind::NdArray => {
                tracing::info!("Using NdArray CPU backend");
                run_training::<Autodiff<NdArray>>(
                    cfg, &model_cfg, train_dataset, val_dataset, &ckpt_manager, &logger, NdArrayDevice::Cpu,
                )
            }
        }
    }
}
