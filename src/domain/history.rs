// ============================================================
// Layer 3 — LossHistory Domain Type
// ============================================================
// The record of a training run: one entry per completed epoch.
//
// Entries are appended by the trainer and never modified. The
// history may be shorter than the epoch cap when early stopping
// halts training.
//
// Example:
//   epoch  train_loss  val_loss
//   1      0.6931      0.6802
//   2      0.6410      0.6377   ← best
//   3      0.6201      0.6399
//   ...

use serde::{Deserialize, Serialize};

/// Losses observed at the end of one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochLoss {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Sample-weighted mean reconstruction loss over the training set
    pub train_loss: f64,

    /// Sample-weighted mean reconstruction loss over the validation set
    pub val_loss: f64,
}

impl EpochLoss {
    pub fn new(epoch: usize, train_loss: f64, val_loss: f64) -> Self {
        Self { epoch, train_loss, val_loss }
    }
}

/// Append-only sequence of per-epoch losses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LossHistory {
    epochs:        Vec<EpochLoss>,
    stopped_early: bool,
}

impl LossHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: EpochLoss) {
        debug_assert_eq!(record.epoch, self.epochs.len() + 1);
        self.epochs.push(record);
    }

    pub fn mark_stopped_early(&mut self) {
        self.stopped_early = true;
    }

    /// True when training halted before reaching the epoch cap.
    pub fn stopped_early(&self) -> bool {
        self.stopped_early
    }

    pub fn epochs(&self) -> &[EpochLoss] {
        &self.epochs
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    /// The epoch with the lowest validation loss.
    /// The earliest epoch wins ties; NaN losses never win.
    pub fn best(&self) -> Option<&EpochLoss> {
        self.epochs
            .iter()
            .filter(|e| !e.val_loss.is_nan())
            .fold(None, |best: Option<&EpochLoss>, e| match best {
                Some(b) if b.val_loss <= e.val_loss => Some(b),
                _ => Some(e),
            })
    }
}
