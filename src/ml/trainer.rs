// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Epoch loop over two BatchSequences with Adam and early stopping.
//
// Key Burn insight:
//   - Training uses TrainBackend (Autodiff<..>) for gradients
//   - model.valid() returns the model on the inner backend
//   - The validation sequence must also use the inner backend
//
// Per epoch:
//   1. forward + BCE loss + backward + Adam step for every batch
//   2. validation loss with the non-autodiff model
//   3. record (epoch, train_loss, val_loss), notify the observer
//   4. early stopping: snapshot on improvement, stop on patience
//
// Losses are sample-weighted means, so a short final batch counts
// for exactly as many images as it holds. When training ends the
// weights of the best validation epoch are restored.
//
// Reference: Kingma & Ba (2015) Adam

use anyhow::{ensure, Result};
use burn::{
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::data::batcher::BatchSequence;
use crate::domain::history::{EpochLoss, LossHistory};
use crate::domain::traits::EpochObserver;
use crate::ml::early_stopping::{EarlyStopping, EarlyStoppingConfig, StoppingDecision};
use crate::ml::model::{Autoencoder, AutoencoderConfig};

#[cfg(not(feature = "wgpu"))]
pub type InferenceBackend = burn::backend::NdArray<f32>;
#[cfg(feature = "wgpu")]
pub type InferenceBackend = burn::backend::Wgpu;

pub type TrainBackend = burn::backend::Autodiff<InferenceBackend>;

/// Adam epsilon, matching the usual Keras default.
const ADAM_EPSILON: f32 = 1e-7;

pub fn default_device() -> <InferenceBackend as Backend>::Device {
    Default::default()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitConfig {
    pub max_epochs:     usize,
    pub learning_rate:  f64,
    pub early_stopping: EarlyStoppingConfig,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_epochs:     50,
            learning_rate:  1e-3,
            early_stopping: EarlyStoppingConfig::default(),
        }
    }
}

/// A trained model (best validation epoch) and its loss history.
pub struct FitOutcome<B: AutodiffBackend> {
    pub model:      Autoencoder<B::InnerBackend>,
    pub history:    LossHistory,
    pub best_epoch: Option<usize>,
}

/// Seed the backend RNG and initialise the model.
pub fn build_model<B: Backend>(cfg: &AutoencoderConfig, device: &B::Device, seed: u64) -> Autoencoder<B> {
    B::seed(seed);
    let model: Autoencoder<B> = cfg.init(device);
    tracing::info!(
        "Model ready: {} parameters, input {}x{}x{}",
        model.parameter_count(),
        cfg.input_height,
        cfg.input_width,
        cfg.channels,
    );
    model
}

pub fn fit<B: AutodiffBackend>(
    mut model: Autoencoder<B>,
    train:     &BatchSequence<B>,
    val:       &BatchSequence<B::InnerBackend>,
    cfg:       &FitConfig,
    observer:  &dyn EpochObserver,
) -> Result<FitOutcome<B>> {
    ensure!(!train.is_empty(), "training sequence has no batches");
    ensure!(!val.is_empty(), "validation sequence has no batches");
    ensure!(cfg.max_epochs > 0, "max_epochs must be positive");

    let mut optim = AdamConfig::new().with_epsilon(ADAM_EPSILON).init();

    let mut stopper    = EarlyStopping::new(cfg.early_stopping);
    let mut history    = LossHistory::new();
    let mut best_model = None;

    tracing::info!(
        "Training for up to {} epochs: {} train batches, {} validation batches",
        cfg.max_epochs,
        train.len(),
        val.len(),
    );

    for epoch in 1..=cfg.max_epochs {
        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_samples  = 0usize;

        for batch in train.iter() {
            let n = batch.len();
            let loss = model.forward_loss(batch);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            train_loss_sum += loss_val * n as f64;
            train_samples  += n;

            // Backward pass + Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.learning_rate, model, grads);
        }
        let train_loss = train_loss_sum / train_samples as f64;

        // ── Validation phase ──────────────────────────────────────────────────
        let val_loss = evaluate(&model.valid(), val);

        let record = EpochLoss::new(epoch, train_loss, val_loss);
        tracing::info!(
            "Epoch {:>3}/{} | train_loss={:.6} | val_loss={:.6}",
            epoch, cfg.max_epochs, train_loss, val_loss,
        );
        history.push(record);
        observer.on_epoch_end(&record)?;

        match stopper.observe(epoch, val_loss) {
            StoppingDecision::Improved => best_model = Some(model.clone()),
            StoppingDecision::Wait => {}
            StoppingDecision::Stop => {
                tracing::info!(
                    "Early stopping at epoch {}: no improvement for {} epochs",
                    epoch,
                    stopper.epochs_without_improvement(),
                );
                history.mark_stopped_early();
                break;
            }
        }
    }

    let best_epoch = stopper.best_epoch();
    let model = match best_model {
        Some(best) => {
            tracing::info!(
                "Restoring weights from epoch {} (val_loss={:.6})",
                best_epoch.unwrap_or_default(),
                stopper.best_loss(),
            );
            best
        }
        None => {
            tracing::warn!("Validation loss never improved; keeping final weights");
            model
        }
    };

    Ok(FitOutcome { model: model.valid(), history, best_epoch })
}

/// Sample-weighted mean reconstruction loss over one epoch of `sequence`.
/// NaN for an empty sequence.
pub fn evaluate<B: Backend>(model: &Autoencoder<B>, sequence: &BatchSequence<B>) -> f64 {
    let mut loss_sum = 0.0f64;
    let mut samples  = 0usize;

    for batch in sequence.iter() {
        let n = batch.len();
        let loss = model.forward_loss(batch);
        loss_sum += loss.into_scalar().elem::<f64>() * n as f64;
        samples  += n;
    }

    if samples > 0 { loss_sum / samples as f64 } else { f64::NAN }
}

/// Per-image reconstruction error, in dataset order.
pub fn anomaly_scores<B: Backend>(model: &Autoencoder<B>, sequence: &BatchSequence<B>) -> Result<Vec<f64>> {
    let mut scores = Vec::with_capacity(sequence.dataset().image_count());
    for batch in sequence.iter() {
        let errors = model
            .reconstruction_errors(batch.inputs)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("cannot read reconstruction errors: {e:?}"))?;
        scores.extend(errors.into_iter().map(f64::from));
    }
    Ok(scores)
}
