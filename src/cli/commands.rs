// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Two subcommands, `train` and `test`. Both read the run
// configuration file; the flags here only override a few keys
// that are handy to change per invocation.

use anyhow::{Context, Result};
use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::application::BackendKind;
use crate::infra::config::RunConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the enhancement network
    Train(TrainArgs),

    /// Evaluate a checkpoint on the test set and save restored images
    Test(TestArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendArg {
    Wgpu,
    Ndarray,
}

impl From<BackendArg> for BackendKind {
    fn from(b: BackendArg) -> Self {
        match b {
            BackendArg::Wgpu    => BackendKind::Wgpu,
            BackendArg::Ndarray => BackendKind::NdArray,
        }
    }
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Run configuration (.yml, .yaml, .toml or .json)
    #[arg(long, default_value = "config.yml")]
    pub config: PathBuf,

    #[arg(long, value_enum, default_value_t = BackendArg::Wgpu)]
    pub backend: BackendArg,

    /// Override OPTIM.NUM_EPOCHS
    #[arg(long)]
    pub epochs: Option<usize>,

    /// Override TRAINING.RESUME. Training continues after the last
    /// epoch recorded in the session's state.json, if any
    #[arg(long)]
    pub resume: Option<PathBuf>,
}

impl TrainArgs {
    /// Load the config file, apply overrides, and validate.
    pub fn load_config(&self) -> Result<RunConfig> {
        let mut cfg = read_config(&self.config)?;
        if let Some(epochs) = self.epochs {
            cfg.optim.num_epochs = epochs;
        }
        if let Some(resume) = &self.resume {
            cfg.training.resume = Some(resume.clone());
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

#[derive(Args, Debug)]
pub struct TestArgs {
    /// Run configuration (.yml, .yaml, .toml or .json)
    #[arg(long, default_value = "config.yml")]
    pub config: PathBuf,

    #[arg(long, value_enum, default_value_t = BackendArg::Wgpu)]
    pub backend: BackendArg,

    /// Override TESTING.WEIGHT
    #[arg(long)]
    pub weight: Option<PathBuf>,

    /// Override TESTING.RESULT_DIR
    #[arg(long)]
    pub result_dir: Option<PathBuf>,
}

impl TestArgs {
    pub fn load_config(&self) -> Result<RunConfig> {
        let mut cfg = read_config(&self.config)?;
        if let Some(weight) = &self.weight {
            cfg.testing.weight = weight.clone();
        }
        if let Some(dir) = &self.result_dir {
            cfg.testing.result_dir = dir.clone();
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn read_config(path: &PathBuf) -> Result<RunConfig> {
    RunConfig::load(path).with_context(|| format!("Invalid config '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(subcommand)]
        command: Commands,
    }

    fn write_config(dir: &std::path::Path) -> PathBuf {
        let path = dir.join("config.yml");
        std::fs::write(&path, "OPTIM:\n  NUM_EPOCHS: 50\nTESTING:\n  RESULT_DIR: out\n").unwrap();
        path
    }

    #[test]
    fn test_train_overrides_epochs() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(tmp.path());
        let cli = TestCli::parse_from([
            "uw-enhance", "train", "--config", path.to_str().unwrap(), "--backend", "ndarray", "--epochs", "3",
        ]);
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        assert_eq!(args.backend, BackendArg::Ndarray);
        assert_eq!(args.load_config().unwrap().optim.num_epochs, 3);
    }

    #[test]
    fn test_test_keeps_file_values_without_flags() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(tmp.path());
        let cli = TestCli::parse_from(["uw-enhance", "test", "--config", path.to_str().unwrap()]);
        let Commands::Test(args) = cli.command else { panic!("expected test") };
        assert_eq!(args.backend, BackendArg::Wgpu);
        let cfg = args.load_config().unwrap();
        assert_eq!(cfg.testing.result_dir, PathBuf::from("out"));
        assert_eq!(cfg.optim.num_epochs, 50);
    }

    #[test]
    fn test_zero_epochs_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(tmp.path());
        let args = TrainArgs { config: path, backend: BackendArg::Wgpu, epochs: Some(0), resume: None };
        assert!(args.load_config().is_err());
    }
}
