// ============================================================
// Layer 6 — Run Configuration
// ============================================================
// Loads the experiment configuration file. The file is split
// into sections that mirror how a run is described:
//
//   MODEL:    session name, data subdirectories, network width
//   OPTIM:    batch size, epochs, learning-rate bounds, seed
//   TRAINING: dataset roots, patch size, validation cadence
//   TESTING:  evaluation data, weights, result directory
//   LOG:      where JSON-lines logs are written
//   LOSS:     weights of the three loss terms
//
// YAML is the primary format; TOML and JSON are accepted too and
// picked by file extension. Every key is optional and falls back
// to the defaults below.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::sample::PatchSize;
use crate::quality::lpips::LPIPS_MIN_SIDE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unsupported config extension for {path}")]
    UnsupportedFormat { path: PathBuf },

    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {format:?} config: {message}")]
    Parse { format: ConfigFormat, message: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "yml" | "yaml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct RunConfig {
    pub model:    ModelSection,
    pub optim:    OptimSection,
    pub training: TrainingSection,
    pub testing:  TestingSection,
    pub log:      LogSection,
    pub loss:     LossSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct ModelSection {
    pub session:       String,
    pub input:         String,
    pub target:        String,
    pub base_channels: usize,
    pub num_blocks:    usize,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            session:       "uw".to_string(),
            input:         "input".to_string(),
            target:        "target".to_string(),
            base_channels: 16,
            num_blocks:    4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct OptimSection {
    pub batch_size:   usize,
    pub num_epochs:   usize,
    pub lr_initial:   f64,
    pub lr_min:       f64,
    pub weight_decay: f32,
    pub seed:         u64,
}

impl Default for OptimSection {
    fn default() -> Self {
        Self {
            batch_size:   4,
            num_epochs:   100,
            lr_initial:   2e-4,
            lr_min:       1e-6,
            weight_decay: 1e-2,
            seed:         3407,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct TrainingSection {
    pub val_after_every: usize,
    pub train_dir:       PathBuf,
    pub val_dir:         PathBuf,
    pub save_dir:        PathBuf,
    pub ps_w:            u32,
    pub ps_h:            u32,
    pub ori:             bool,
    pub log_file:        String,
    pub num_workers:     usize,
    pub resume:          Option<PathBuf>,
}

impl Default for TrainingSection {
    fn default() -> Self {
        Self {
            val_after_every: 1,
            train_dir:       PathBuf::from("data/train"),
            val_dir:         PathBuf::from("data/val"),
            save_dir:        PathBuf::from("checkpoints"),
            ps_w:            256,
            ps_h:            256,
            ori:             false,
            log_file:        "train.jsonl".to_string(),
            num_workers:     4,
            resume:          None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct TestingSection {
    pub input:      String,
    pub target:     String,
    pub val_dir:    PathBuf,
    pub weight:     PathBuf,
    pub result_dir: PathBuf,
    pub log_file:   String,
}

impl Default for TestingSection {
    fn default() -> Self {
        Self {
            input:      "input".to_string(),
            target:     "target".to_string(),
            val_dir:    PathBuf::from("data/test"),
            weight:     PathBuf::from("checkpoints/uw/model_best"),
            result_dir: PathBuf::from("result"),
            log_file:   "test.jsonl".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct LogSection {
    pub log_dir: PathBuf,
}

impl Default for LogSection {
    fn default() -> Self {
        Self { log_dir: PathBuf::from("logs") }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct LossSection {
    pub smooth_l1:     f64,
    pub ssim:          f64,
    pub lpips:         f64,
    pub lpips_weights: Option<PathBuf>,
}

impl Default for LossSection {
    fn default() -> Self {
        Self {
            smooth_l1:     1.0,
            ssim:          0.3,
            lpips:         0.7,
            lpips_weights: None,
        }
    }
}

impl RunConfig {
    /// Load a configuration file, picking the parser from its extension.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let format = ConfigFormat::from_extension(path).ok_or_else(|| {
            ConfigError::UnsupportedFormat { path: path.to_path_buf() }
        })?;

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let cfg = Self::from_str(&content, format)?;
        tracing::debug!("Loaded {:?} config from '{}'", format, path.display());
        Ok(cfg)
    }

    /// Parse configuration text in the given format.
    pub fn from_str(content: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        let parse_err = |message: String| ConfigError::Parse { format, message };
        // An empty YAML document parses as unit, not as a mapping.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        match format {
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| parse_err(e.to_string())),
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| parse_err(e.to_string())),
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| parse_err(e.to_string())),
        }
    }

    /// Reject settings that would make a run meaningless or panic later.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.optim.batch_size == 0 {
            return invalid("OPTIM.BATCH_SIZE must be at least 1");
        }
        if self.optim.num_epochs == 0 {
            return invalid("OPTIM.NUM_EPOCHS must be at least 1");
        }
        if !(self.optim.lr_initial > 0.0 && self.optim.lr_initial <= 1.0) {
            return invalid("OPTIM.LR_INITIAL must be in (0, 1]");
        }
        if self.optim.lr_min < 0.0 || self.optim.lr_min > self.optim.lr_initial {
            return invalid("OPTIM.LR_MIN must be in [0, OPTIM.LR_INITIAL]");
        }
        if self.training.val_after_every == 0 {
            return invalid("TRAINING.VAL_AFTER_EVERY must be at least 1");
        }
        if self.patch_size().is_empty() {
            return invalid("TRAINING.PS_W and TRAINING.PS_H must be non-zero");
        }
        // Training crops and non-ORI validation feed LPIPS at the patch size
        let patch = self.patch_size();
        let min_side = LPIPS_MIN_SIDE as u32;
        if self.loss.lpips_weights.is_some() && (patch.width < min_side || patch.height < min_side) {
            return Err(ConfigError::Invalid(format!(
                "TRAINING.PS_W and TRAINING.PS_H must be at least {min_side} when LOSS.LPIPS_WEIGHTS is set"
            )));
        }
        if self.model.base_channels == 0 {
            return invalid("MODEL.BASE_CHANNELS must be at least 1");
        }
        if self.loss.smooth_l1 < 0.0 || self.loss.ssim < 0.0 || self.loss.lpips < 0.0 {
            return invalid("LOSS weights must be non-negative");
        }
        Ok(())
    }

    pub fn patch_size(&self) -> PatchSize {
        PatchSize::new(self.training.ps_w, self.training.ps_h)
    }

    /// Directory holding this session's checkpoints.
    pub fn session_dir(&self) -> PathBuf {
        self.training.save_dir.join(&self.model.session)
    }

    pub fn train_log_path(&self) -> PathBuf {
        self.log.log_dir.join(&self.training.log_file)
    }

    pub fn test_log_path(&self) -> PathBuf {
        self.log.log_dir.join(&self.testing.log_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_YAML: &str = r#"
MODEL:
  SESSION: 'lsui'
  INPUT: 'raw'
  TARGET: 'gt'
OPTIM:
  BATCH_SIZE: 2
  NUM_EPOCHS: 5
  LR_INITIAL: 0.0002
  LR_MIN: 0.000001
  SEED: 7
TRAINING:
  VAL_AFTER_EVERY: 1
  TRAIN_DIR: '../dataset/LSUI/train'
  VAL_DIR: '../dataset/LSUI/test'
  SAVE_DIR: './checkpoints'
  PS_W: 64
  PS_H: 48
  ORI: true
  LOG_FILE: 'log.txt'
TESTING:
  WEIGHT: './checkpoints/best.pth'
  RESULT_DIR: './result'
LOG:
  LOG_DIR: './log'
"#;

    #[test]
    fn test_yaml_sections_and_defaults() {
        let cfg = RunConfig::from_str(SAMPLE_YAML, ConfigFormat::Yaml).unwrap();
        assert_eq!(cfg.model.session, "lsui");
        assert_eq!(cfg.model.input, "raw");
        assert_eq!(cfg.optim.batch_size, 2);
        assert_eq!(cfg.optim.seed, 7);
        assert_eq!(cfg.patch_size(), PatchSize::new(64, 48));
        assert!(cfg.training.ori);
        assert_eq!(cfg.training.log_file, "log.txt");
        assert_eq!(cfg.log.log_dir, PathBuf::from("./log"));

        // Missing keys fall back to defaults
        assert_eq!(cfg.model.base_channels, 16);
        assert_eq!(cfg.testing.input, "input");
        assert_eq!(cfg.loss.ssim, 0.3);
        assert!(cfg.loss.lpips_weights.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_toml_and_json_are_accepted() {
        let toml_cfg = RunConfig::from_str("[OPTIM]\nBATCH_SIZE = 8\n", ConfigFormat::Toml).unwrap();
        assert_eq!(toml_cfg.optim.batch_size, 8);

        let json_cfg = RunConfig::from_str(r#"{"MODEL": {"SESSION": "x"}}"#, ConfigFormat::Json).unwrap();
        assert_eq!(json_cfg.model.session, "x");
    }

    #[test]
    fn test_empty_file_is_all_defaults() {
        let cfg = RunConfig::from_str("  \n", ConfigFormat::Yaml).unwrap();
        assert_eq!(cfg.optim.num_epochs, 100);
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(ConfigFormat::from_extension(Path::new("config.yml")), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_extension(Path::new("a.toml")), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension(Path::new("a.ini")), None);
        assert!(matches!(
            RunConfig::load(Path::new("settings.ini")),
            Err(ConfigError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut cfg = RunConfig::default();
        cfg.optim.batch_size = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = RunConfig::default();
        cfg.optim.lr_min = 1.0;
        assert!(cfg.validate().is_err());

        let mut cfg = RunConfig::default();
        cfg.training.ps_h = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = RunConfig::default();
        cfg.optim.lr_initial = 2.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_small_patch_rejected_only_with_lpips() {
        let mut cfg = RunConfig::default();
        cfg.training.ps_w = 24;
        cfg.training.ps_h = 24;
        assert!(cfg.validate().is_ok());

        cfg.loss.lpips_weights = Some(PathBuf::from("weights/lpips_alex"));
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));

        cfg.training.ps_w = LPIPS_MIN_SIDE as u32;
        cfg.training.ps_h = LPIPS_MIN_SIDE as u32;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_session_paths() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.session_dir(), PathBuf::from("checkpoints/uw"));
        assert_eq!(cfg.train_log_path(), PathBuf::from("logs/train.jsonl"));
    }
}
