// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and hands a validated RunConfig
// to the matching use case:
//
//   1. `train` — train EnhanceNet, keep the best checkpoint
//   2. `test`  — restore a test set and report its metrics

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, TestArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "uw-enhance",
    version,
    about = "Train and evaluate an underwater image enhancement network."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
            Commands::Test(args)  => run_test(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let cfg = args.load_config()?;
    tracing::info!("Training session '{}' from '{}'", cfg.model.session, args.config.display());

    let summary = TrainUseCase::new(cfg, args.backend.into()).execute()?;
    println!(
        "Training complete. Best PSNR {:.4} at epoch {}.",
        summary.best_psnr, summary.best_epoch
    );
    Ok(())
}

fn run_test(args: TestArgs) -> Result<()> {
    use crate::application::test_use_case::TestUseCase;

    let cfg = args.load_config()?;
    tracing::info!("Evaluating '{}' on '{}'", cfg.testing.weight.display(), cfg.testing.val_dir.display());

    TestUseCase::new(cfg, args.backend.into()).execute()?;
    Ok(())
}
