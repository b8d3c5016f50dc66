// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Restores every image of a test set with a trained checkpoint,
// writes the results to RESULT_DIR/<name>, and averages the
// five quality metrics over the set.

use anyhow::Result;
use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    prelude::*,
};

use crate::data::{
    batcher::EnhanceBatcher,
    dataset::{ensure_full_pass, PairedImageDataset},
};
use crate::infra::{
    checkpoint::{load_model, CheckpointManager},
    config::RunConfig,
    image_io::save_image,
    metrics::{MetricsLogger, TestMetrics},
};
use crate::ml::{
    meter::QualityMeter,
    model::{EnhanceNet, EnhanceNetConfig},
};
use crate::quality::lpips::Lpips;

pub struct Evaluator<B: Backend> {
    model:  EnhanceNet<B>,
    lpips:  Option<Lpips<B>>,
    device: B::Device,
}

impl<B: Backend> Evaluator<B> {
    /// Rebuild the network and load `TESTING.WEIGHT` into it.
    ///
    /// The architecture comes from `model_config.json` next to the
    /// weights when present, otherwise from the MODEL section.
    pub fn from_checkpoint(cfg: &RunConfig, device: B::Device) -> Result<Self> {
        let weight = &cfg.testing.weight;
        let model_cfg = match CheckpointManager::model_config_beside(weight)? {
            Some(saved) => saved,
            None => {
                tracing::warn!(
                    "No model_config.json beside '{}', using the MODEL section",
                    weight.display()
                );
                EnhanceNetConfig::new()
                    .with_base_channels(cfg.model.base_channels)
                    .with_num_blocks(cfg.model.num_blocks)
            }
        };
        let model = load_model(model_cfg.init::<B>(&device), weight, &device)?;

        let lpips = match &cfg.loss.lpips_weights {
            Some(path) => Some(Lpips::load(path, &device)?),
            None => None,
        };

        Ok(Self { model, lpips, device })
    }

    pub fn evaluate(
        &self,
        cfg:     &RunConfig,
        dataset: PairedImageDataset,
        logger:  &MetricsLogger,
    ) -> Result<TestMetrics> {
        let samples = dataset.len();
        let loader = DataLoaderBuilder::new(EnhanceBatcher::<B>::new(self.device.clone()))
            .batch_size(1)
            .num_workers(cfg.training.num_workers)
            .build(dataset);

        let result_dir = &cfg.testing.result_dir;
        let mut meter = QualityMeter::new(self.lpips.clone());

        for batch in loader.iter() {
            let res = self.model.forward(batch.inputs);
            let images = meter.update(res, batch.targets)?;
            for (img, name) in images.iter().zip(&batch.names) {
                save_image(img, &result_dir.join(name))?;
            }
            tracing::debug!("Restored {:?}", batch.names);
        }
        ensure_full_pass("test", meter.samples(), samples)?;

        let metrics = TestMetrics {
            session:  cfg.model.session.clone(),
            weight:   cfg.testing.weight.clone(),
            data_dir: cfg.testing.val_dir.clone(),
            samples,
            stats:    meter.finish(),
        };
        logger.log(&metrics)?;

        tracing::info!(
            samples,
            psnr = metrics.stats.psnr,
            ssim = metrics.stats.ssim,
            "Evaluation done, images written to '{}'",
            result_dir.display()
        );
        println!("{}", metrics.header());
        println!("{}", metrics.summary());
        Ok(metrics)
    }
}
