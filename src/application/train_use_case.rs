// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline as a linear state
// machine:
//
//   Idle → Loaded → Split → Built → Training → Done
//
//   Loaded:   load + preprocess every .dcm file     (Layer 4 - data)
//   Split:    seeded train/validation partition     (Layer 4 - data)
//   Built:    construct the autoencoder             (Layer 5 - ml)
//   Training: fit with early stopping               (Layer 5 - ml)
//   Done:     write metrics and anomaly scores      (Layer 6 - infra)
//
// Any failure aborts the run; nothing is retried and no partial
// dataset is used.

use std::cell::Cell;
use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    batcher::BatchSequence,
    dataset::ImageDataset,
    loader::DicomDirectoryLoader,
    preprocessor::{DegeneratePolicy, Preprocessor},
    splitter::{split_train_val, DEFAULT_SPLIT_SEED},
};
use crate::domain::error::ScanError;
use crate::domain::history::LossHistory;
use crate::domain::image::ImageSize;
use crate::domain::traits::ImageSource;
use crate::infra::{metrics::MetricsLogger, run_store::RunStore};
use crate::ml::early_stopping::EarlyStoppingConfig;
use crate::ml::model::{Autoencoder, AutoencoderConfig};
use crate::ml::trainer::{
    anomaly_scores, build_model, default_device, fit, FitConfig, InferenceBackend, TrainBackend,
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All parameters of a training run. Serialisable so a run can be
// described in a JSON file and the resolved values saved next to
// the metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub data_dir:      String,
    pub output_dir:    String,
    pub image_size:    usize,
    pub batch_size:    usize,
    pub epochs:        usize,
    pub patience:      usize,
    pub min_delta:     f64,
    pub lr:            f64,
    pub val_fraction:  f64,
    pub seed:          u64,
    pub on_degenerate: DegeneratePolicy,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:      "data/dicom".to_string(),
            output_dir:    "runs".to_string(),
            image_size:    224,
            batch_size:    32,
            epochs:        50,
            patience:      5,
            min_delta:     0.0,
            lr:            1e-3,
            val_fraction:  0.2,
            seed:          DEFAULT_SPLIT_SEED,
            on_degenerate: DegeneratePolicy::Skip,
        }
    }
}

impl TrainConfig {
    pub fn image_size(&self) -> ImageSize {
        ImageSize::square(self.image_size)
    }

    pub fn model_config(&self) -> AutoencoderConfig {
        AutoencoderConfig::for_image_size(self.image_size())
    }

    pub fn fit_config(&self) -> FitConfig {
        FitConfig {
            max_epochs:     self.epochs,
            learning_rate:  self.lr,
            early_stopping: EarlyStoppingConfig {
                patience:  self.patience,
                min_delta: self.min_delta,
            },
        }
    }

    pub fn validate(&self) -> Result<(), ScanError> {
        let invalid = |msg: String| Err(ScanError::InvalidConfig(msg));

        if self.batch_size == 0 {
            return invalid("batch_size must be positive".into());
        }
        if self.epochs == 0 {
            return invalid("epochs must be positive".into());
        }
        if !(self.val_fraction > 0.0 && self.val_fraction < 1.0) {
            return invalid(format!("val_fraction {} must be in (0, 1)", self.val_fraction));
        }
        if !(self.lr.is_finite() && self.lr >= 0.0) {
            return invalid(format!("lr {} must be a non-negative number", self.lr));
        }
        if !(self.min_delta.is_finite() && self.min_delta >= 0.0) {
            return invalid(format!("min_delta {} must be a non-negative number", self.min_delta));
        }
        self.model_config().validate().map_err(ScanError::InvalidConfig)
    }
}

// ─── Pipeline stages ──────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingStage {
    Idle,
    Loaded,
    Split,
    Built,
    Training,
    Done,
}

impl fmt::Display for TrainingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What a successful run hands back.
pub struct TrainOutcome {
    pub model:      Autoencoder<InferenceBackend>,
    pub history:    LossHistory,
    pub best_epoch: Option<usize>,
    /// (source file, reconstruction error) for the validation images
    pub val_scores: Vec<(PathBuf, f64)>,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
    stage:  Cell<TrainingStage>,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config, stage: Cell::new(TrainingStage::Idle) }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// The last stage the pipeline reached.
    pub fn stage(&self) -> TrainingStage {
        self.stage.get()
    }

    fn enter(&self, stage: TrainingStage) {
        tracing::info!("Stage: {} → {}", self.stage.get(), stage);
        self.stage.set(stage);
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainOutcome> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Loaded: read every .dcm file ──────────────────────────────────────
        let preprocessor = Preprocessor::new(cfg.image_size(), cfg.on_degenerate);
        let loader       = DicomDirectoryLoader::new(&cfg.data_dir, preprocessor);
        let images       = loader
            .load_all()
            .with_context(|| format!("Cannot load DICOM images from '{}'", cfg.data_dir))?;
        if images.is_empty() {
            return Err(ScanError::EmptyDataset { dir: PathBuf::from(&cfg.data_dir) }.into());
        }
        let total = images.len();
        self.enter(TrainingStage::Loaded);

        // ── Split: seeded train / validation partition ────────────────────────
        let (train_images, val_images) = split_train_val(images, cfg.val_fraction, cfg.seed);
        if train_images.is_empty() {
            return Err(ScanError::EmptyPartition { partition: "training", total }.into());
        }
        if val_images.is_empty() {
            return Err(ScanError::EmptyPartition { partition: "validation", total }.into());
        }
        tracing::info!(
            "Split: {} train, {} validation",
            train_images.len(),
            val_images.len()
        );
        self.enter(TrainingStage::Split);

        // ── Built: model + output directory ───────────────────────────────────
        let device = default_device();
        tracing::info!("Using device: {:?}", device);
        let model = build_model::<TrainBackend>(&cfg.model_config(), &device, cfg.seed);

        let store = RunStore::new(&cfg.output_dir)?;
        store.save_config(cfg)?;
        let metrics = MetricsLogger::new(&cfg.output_dir)?;
        self.enter(TrainingStage::Built);

        // ── Training: fit with early stopping ─────────────────────────────────
        self.enter(TrainingStage::Training);
        let train_seq = BatchSequence::<TrainBackend>::new(
            ImageDataset::new(train_images), cfg.batch_size, device.clone(),
        );
        let val_seq = BatchSequence::<InferenceBackend>::new(
            ImageDataset::new(val_images), cfg.batch_size, device,
        );
        let outcome = fit(model, &train_seq, &val_seq, &cfg.fit_config(), &metrics)?;

        // ── Done: anomaly scores for the validation images ────────────────────
        let scores = anomaly_scores(&outcome.model, &val_seq)?;
        let val_scores: Vec<(PathBuf, f64)> = val_seq
            .dataset()
            .images()
            .iter()
            .map(|img| img.source.clone())
            .zip(scores)
            .collect();
        metrics.write_anomaly_scores(&val_scores)?;
        self.enter(TrainingStage::Done);

        tracing::info!(
            "Training finished after {} epoch(s){}; metrics in '{}'",
            outcome.history.len(),
            if outcome.history.stopped_early() { " (early stop)" } else { "" },
            metrics.csv_path().display(),
        );

        Ok(TrainOutcome {
            model:      outcome.model,
            history:    outcome.history,
            best_epoch: outcome.best_epoch,
            val_scores,
        })
    }
}
