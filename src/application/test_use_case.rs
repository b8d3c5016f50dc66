// ============================================================
// Layer 2 — TestUseCase
// ============================================================
//   Step 1: Scan test pairs                   (Layer 4 - data)
//   Step 2: Load the checkpoint               (Layer 5 - ml)
//   Step 3: Restore, save, and score images   (Layer 5 - ml)

use anyhow::Result;
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, NdArray, Wgpu},
    prelude::Backend,
};

use crate::application::BackendKind;
use crate::data::{dataset::PairedImageDataset, loader::PairedImageSource};
use crate::domain::{sample::SplitMode, traits::PairSource};
use crate::infra::{config::RunConfig, metrics::{MetricsLogger, TestMetrics}};
use crate::ml::evaluator::Evaluator;

pub struct TestUseCase {
    config:  RunConfig,
    backend: BackendKind,
}

impl TestUseCase {
    pub fn new(config: RunConfig, backend: BackendKind) -> Self {
        Self { config, backend }
    }

    pub fn execute(&self) -> Result<TestMetrics> {
        match self.backend {
            BackendKind::Wgpu => {
                let device = WgpuDevice::default();
                tracing::info!("Using WGPU device: {:?}", device);
                self.evaluate::<Wgpu>(device)
            }
            BackendKind::NdArray => {
                tracing::info!("Using NdArray CPU backend");
                self.evaluate::<NdArray>(NdArrayDevice::Cpu)
            }
        }
    }

    fn evaluate<B: Backend>(&self, device: B::Device) -> Result<TestMetrics> {
        let cfg = &self.config;
        let testing = &cfg.testing;

        let pairs = PairedImageSource::new(&testing.val_dir, &testing.input, &testing.target).pairs()?;
        let dataset = PairedImageDataset::new(
            pairs,
            SplitMode::Test,
            cfg.patch_size(),
            cfg.training.ori,
            cfg.optim.seed,
        );

        let evaluator = Evaluator::<B>::from_checkpoint(cfg, device)?;
        let logger = MetricsLogger::new(cfg.test_log_path())?;
        evaluator.evaluate(cfg, dataset, &logger)
    }
}
