// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores enhancement-network weights with Burn's
// CompactRecorder (MessagePack, half precision).
//
// Layout of one session directory:
//   checkpoints/<session>/
//     model_config.json       ← EnhanceNet hyper-parameters
//     model_epoch_12.<ext>    ← weights at each new best epoch
//     model_best.<ext>        ← weights of the best epoch so far
//     best.json               ← { "epoch": 12, "psnr": 23.4 }
//     model_last.<ext>        ← weights after the last finished epoch
//     optim_last.<ext>        ← AdamW moments after that epoch
//     state.json              ← { "epoch": 15 }, where a resume picks up
//
// The config is needed to rebuild the exact architecture before
// weights can be loaded into it.

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Record, Recorder},
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::ml::model::{EnhanceNet, EnhanceNetConfig};

const MODEL_CONFIG_FILE: &str = "model_config.json";
const BEST_FILE:         &str = "best.json";
const BEST_WEIGHTS:      &str = "model_best";
const STATE_FILE:        &str = "state.json";
const LAST_WEIGHTS:      &str = "model_last";
const LAST_OPTIM:        &str = "optim_last";

/// Which epoch produced the best validation PSNR.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestCheckpoint {
    pub epoch: usize,
    pub psnr:  f64,
}

/// Last fully trained epoch of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainState {
    pub epoch: usize,
}

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create the manager, creating `dir` (and parents) if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path (without extension) of the weights saved for `epoch`.
    pub fn epoch_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("model_epoch_{epoch}"))
    }

    pub fn best_path(&self) -> PathBuf {
        self.dir.join(BEST_WEIGHTS)
    }

    /// Record weights for a new best epoch and update `best.json`.
    pub fn save_best<B: Backend>(&self, model: &EnhanceNet<B>, best: BestCheckpoint) -> Result<()> {
        let recorder = CompactRecorder::new();
        for path in [self.epoch_path(best.epoch), self.best_path()] {
            recorder
                .record(model.clone().into_record(), path.clone())
                .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;
        }

        let best_path = self.dir.join(BEST_FILE);
        fs::write(&best_path, serde_json::to_string_pretty(&best)?)
            .with_context(|| format!("Failed to write '{}'", best_path.display()))?;

        tracing::debug!("Saved checkpoint: epoch {} (PSNR {:.3})", best.epoch, best.psnr);
        Ok(())
    }

    /// Read `best.json`.
    pub fn best(&self) -> Result<BestCheckpoint> {
        let path = self.dir.join(BEST_FILE);
        let s = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'. Has a validation run improved yet?", path.display()))?;
        Ok(serde_json::from_str(&s)?)
    }

    pub fn last_path(&self) -> PathBuf {
        self.dir.join(LAST_WEIGHTS)
    }

    /// Record the weights after an epoch and mark it as done.
    pub fn save_last<B: Backend>(&self, model: &EnhanceNet<B>, state: TrainState) -> Result<()> {
        let path = self.last_path();
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let state_path = self.dir.join(STATE_FILE);
        fs::write(&state_path, serde_json::to_string_pretty(&state)?)
            .with_context(|| format!("Failed to write '{}'", state_path.display()))?;
        Ok(())
    }

    /// Record optimiser state (e.g. `optim.to_record()`) next to `model_last`.
    pub fn save_optimizer<B: Backend, R: Record<B>>(&self, record: R) -> Result<()> {
        let path = self.dir.join(LAST_OPTIM);
        Recorder::<B>::record(&CompactRecorder::new(), record, path.clone())
            .with_context(|| format!("Failed to save optimiser state to '{}'", path.display()))?;
        Ok(())
    }

    /// Optimiser state saved by `save_optimizer`, if any.
    pub fn load_optimizer<B: Backend, R: Record<B>>(&self, device: &B::Device) -> Result<Option<R>> {
        let path = self.dir.join(LAST_OPTIM);
        let exists = fs::read_dir(&self.dir)?
            .filter_map(|e| e.ok())
            .any(|e| e.file_name().to_string_lossy().starts_with(&format!("{LAST_OPTIM}.")));
        if !exists {
            return Ok(None);
        }
        let record = Recorder::<B>::load(&CompactRecorder::new(), path.clone(), device)
            .with_context(|| format!("Cannot load optimiser state '{}'", path.display()))?;
        Ok(Some(record))
    }

    /// Read `state.json`; `None` for a fresh session.
    pub fn state(&self) -> Result<Option<TrainState>> {
        let path = self.dir.join(STATE_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let s = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        Ok(Some(serde_json::from_str(&s)?))
    }

    /// Persist the architecture so evaluation can rebuild it.
    pub fn save_model_config(&self, cfg: &EnhanceNetConfig) -> Result<()> {
        let path = self.dir.join(MODEL_CONFIG_FILE);
        cfg.save(&path)
            .with_context(|| format!("Cannot write model config to '{}'", path.display()))?;
        tracing::debug!("Saved model config to '{}'", path.display());
        Ok(())
    }

    /// Model config stored next to a weights file, if there is one.
    pub fn model_config_beside(weights: &Path) -> Result<Option<EnhanceNetConfig>> {
        let path = weights
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(MODEL_CONFIG_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let cfg = EnhanceNetConfig::load(&path)
            .map_err(|e| anyhow::anyhow!("Cannot parse '{}': {e}", path.display()))?;
        Ok(Some(cfg))
    }
}

/// Load weights from `path` into `model`.
///
/// The model must have the architecture the weights were saved with.
pub fn load_model<B: Backend>(
    model:  EnhanceNet<B>,
    path:   &Path,
    device: &B::Device,
) -> Result<EnhanceNet<B>> {
    let record = CompactRecorder::new()
        .load(path.to_path_buf(), device)
        .with_context(|| {
            format!("Cannot load checkpoint '{}'. Have you trained the model first?", path.display())
        })?;
    tracing::info!("Loaded weights from '{}'", path.display());
    Ok(model.load_record(record))
}
