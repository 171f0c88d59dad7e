// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with clap.
// All work is delegated to Layer 2 (application).
//
//   1. `train`   — trains the autoencoder on a DICOM directory
//   2. `inspect` — preprocesses a directory and prints statistics

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, InspectArgs, TrainArgs};

use crate::application::train_use_case::TrainConfig;
use crate::domain::image::ImageSize;
use crate::infra::run_store::RunStore;

#[derive(Parser, Debug)]
#[command(
    name = "dicom-autoencoder",
    version,
    about = "Train a convolutional autoencoder on DICOM scans for unsupervised anomaly detection."
)]
pub struct Cli {
    /// The subcommand to run (train or inspect)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Inspect(args) => run_inspect(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let config: TrainConfig = match args.config.clone() {
        Some(path) => {
            tracing::info!("Reading configuration from '{}'", path.display());
            RunStore::load_config(path)?
        }
        None => args.into(),
    };
    tracing::info!("Starting training on scans in: {}", config.data_dir);

    let outcome = TrainUseCase::new(config).execute()?;

    println!("{:>5}  {:>12}  {:>12}", "epoch", "train_loss", "val_loss");
    for e in outcome.history.epochs() {
        let marker = if Some(e.epoch) == outcome.best_epoch { "  *" } else { "" };
        println!("{:>5}  {:>12.6}  {:>12.6}{}", e.epoch, e.train_loss, e.val_loss, marker);
    }
    println!("Training complete. Weights restored from epoch marked *.");
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    use crate::application::inspect_use_case::InspectUseCase;

    let use_case = InspectUseCase::new(
        &args.data_dir,
        ImageSize::square(args.image_size),
        args.on_degenerate.into(),
    );
    let summaries = use_case.execute()?;

    for s in &summaries {
        println!(
            "{}  {}  min={:.4} max={:.4} mean={:.4}",
            s.source.display(), s.size, s.min, s.max, s.mean
        );
    }
    println!("{} image(s) ready for training.", summaries.len());
    Ok(())
}
