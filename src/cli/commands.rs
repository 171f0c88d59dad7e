// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `inspect`, and all
// their configurable flags.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::application::train_use_case::TrainConfig;
use crate::data::preprocessor::DegeneratePolicy;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the autoencoder on a directory of .dcm files
    Train(TrainArgs),

    /// Load and preprocess a directory, print per-image statistics
    Inspect(InspectArgs),
}

/// Handling of constant-intensity images
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DegenerateArg {
    /// Drop the image with a warning
    Skip,
    /// Replace it with an all-zero image
    Zero,
    /// Abort the run
    Fail,
}

impl From<DegenerateArg> for DegeneratePolicy {
    fn from(a: DegenerateArg) -> Self {
        match a {
            DegenerateArg::Skip => DegeneratePolicy::Skip,
            DegenerateArg::Zero => DegeneratePolicy::Zero,
            DegenerateArg::Fail => DegeneratePolicy::Fail,
        }
    }
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory containing .dcm files (not searched recursively)
    #[arg(long, default_value = "data/dicom")]
    pub data_dir: String,

    /// Directory for metrics.csv, anomaly_scores.csv and train_config.json
    #[arg(long, default_value = "runs")]
    pub output_dir: String,

    /// Side length images are resized to; must be a multiple of 4
    #[arg(long, default_value_t = 224)]
    pub image_size: usize,

    /// Number of images per batch
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Maximum number of epochs
    #[arg(long, default_value_t = 50)]
    pub epochs: usize,

    /// Epochs without validation improvement before stopping
    #[arg(long, default_value_t = 5)]
    pub patience: usize,

    /// Minimum validation loss decrease that counts as an improvement
    #[arg(long, default_value_t = 0.0)]
    pub min_delta: f64,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Fraction of images held out for validation
    #[arg(long, default_value_t = 0.2)]
    pub val_fraction: f64,

    /// Seed for the train/validation split and weight initialisation
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// What to do with constant-intensity images
    #[arg(long, value_enum, default_value_t = DegenerateArg::Skip)]
    pub on_degenerate: DegenerateArg,

    /// Read every setting from this JSON file instead of the flags above
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_dir:      a.data_dir,
            output_dir:    a.output_dir,
            image_size:    a.image_size,
            batch_size:    a.batch_size,
            epochs:        a.epochs,
            patience:      a.patience,
            min_delta:     a.min_delta,
            lr:            a.lr,
            val_fraction:  a.val_fraction,
            seed:          a.seed,
            on_degenerate: a.on_degenerate.into(),
        }
    }
}

/// All arguments for the `inspect` command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Directory containing .dcm files
    #[arg(long, default_value = "data/dicom")]
    pub data_dir: String,

    /// Side length images are resized to
    #[arg(long, default_value_t = 224)]
    pub image_size: usize,

    /// What to do with constant-intensity images
    #[arg(long, value_enum, default_value_t = DegenerateArg::Skip)]
    pub on_degenerate: DegenerateArg,
}
