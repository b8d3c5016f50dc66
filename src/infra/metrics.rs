// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one JSON object per line to a log file:
//
//   logs/train.jsonl — one record per validation pass
//   logs/test.jsonl  — one record per evaluation run
//
// Example training line:
//   {"epoch":4,"psnr":22.81,"ssim":0.861,"lpips":null,"uciqe":29.4,
//    "uiqm":2.91,"train_loss":0.21,"best_psnr":22.81,"best_epoch":4,"lr":0.00019}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

/// Averages of the five quality metrics over one pass of a loader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityStats {
    pub psnr:  f64,
    pub ssim:  f64,
    /// None when no LPIPS weights were configured
    pub lpips: Option<f64>,
    pub uciqe: f64,
    pub uiqm:  f64,
}

/// One validation pass during training.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    #[serde(flatten)]
    pub stats: QualityStats,
    pub train_loss: f64,
    pub best_psnr:  f64,
    pub best_epoch: usize,
    pub lr:         f64,
}

impl EpochMetrics {
    /// Strictly higher PSNR than the best so far
    pub fn is_improvement(&self, best_psnr: f64) -> bool {
        self.stats.psnr > best_psnr
    }

    /// The human-readable summary printed after each validation.
    pub fn summary(&self) -> String {
        format!(
            "epoch: {}, PSNR: {:.4}, SSIM: {:.4}, LPIPS: {}, UCIQE: {:.4}, UIQM: {:.4}, best PSNR: {:.4}, best epoch: {}",
            self.epoch,
            self.stats.psnr,
            self.stats.ssim,
            fmt_optional(self.stats.lpips),
            self.stats.uciqe,
            self.stats.uiqm,
            self.best_psnr,
            self.best_epoch,
        )
    }
}

/// One evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestMetrics {
    pub session:  String,
    pub weight:   PathBuf,
    pub data_dir: PathBuf,
    pub samples:  usize,
    #[serde(flatten)]
    pub stats: QualityStats,
}

impl TestMetrics {
    pub fn header(&self) -> String {
        format!(
            "Test result on {}, checkpoint {}, testing data {}",
            self.session,
            self.weight.display(),
            self.data_dir.display(),
        )
    }

    pub fn summary(&self) -> String {
        format!(
            "PSNR: {:.4}, SSIM: {:.4}, LPIPS: {}, UCIQE: {:.4}, UIQM: {:.4}",
            self.stats.psnr,
            self.stats.ssim,
            fmt_optional(self.stats.lpips),
            self.stats.uciqe,
            self.stats.uiqm,
        )
    }
}

fn fmt_optional(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.4}")).unwrap_or_else(|| "n/a".to_string())
}

/// Appends serialisable records to a JSON-lines file.
pub struct MetricsLogger {
    path: PathBuf,
}

impl MetricsLogger {
    /// Create the parent directory if needed. Existing content is kept.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create log dir '{}'", parent.display()))?;
        }
        Ok(Self { path })
    }

    pub fn log<T: Serialize>(&self, record: &T) -> Result<()> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Cannot open log '{}'", self.path.display()))?;

        writeln!(f, "{}", serde_json::to_string(record)?)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
