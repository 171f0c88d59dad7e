// ============================================================
// Layer 5 — Early Stopping
// ============================================================
// Watches the validation loss after every epoch.
//
//   improvement  : val_loss < best - min_delta   → reset the counter
//   otherwise    : counter += 1
//   counter == patience                          → stop
//
// The trainer snapshots the model whenever an epoch improves and
// restores that snapshot when training ends. NaN losses never
// count as an improvement.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EarlyStoppingConfig {
    /// Epochs without improvement before stopping
    pub patience: usize,

    /// Minimum decrease that counts as an improvement
    pub min_delta: f64,
}

impl Default for EarlyStoppingConfig {
    fn default() -> Self {
        Self { patience: 5, min_delta: 0.0 }
    }
}

/// Outcome of observing one epoch's validation loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoppingDecision {
    /// New best loss; snapshot the weights
    Improved,
    /// No improvement yet, keep training
    Wait,
    /// Patience exhausted
    Stop,
}

#[derive(Debug, Clone)]
pub struct EarlyStopping {
    config:     EarlyStoppingConfig,
    best_loss:  f64,
    best_epoch: Option<usize>,
    wait:       usize,
}

impl EarlyStopping {
    pub fn new(config: EarlyStoppingConfig) -> Self {
        Self { config, best_loss: f64::INFINITY, best_epoch: None, wait: 0 }
    }

    pub fn observe(&mut self, epoch: usize, val_loss: f64) -> StoppingDecision {
        if val_loss < self.best_loss - self.config.min_delta {
            self.best_loss  = val_loss;
            self.best_epoch = Some(epoch);
            self.wait       = 0;
            return StoppingDecision::Improved;
        }

        self.wait += 1;
        if self.wait >= self.config.patience {
            StoppingDecision::Stop
        } else {
            StoppingDecision::Wait
        }
    }

    pub fn best_epoch(&self) -> Option<usize> {
        self.best_epoch
    }

    pub fn best_loss(&self) -> f64 {
        self.best_loss
    }

    /// Consecutive epochs since the last improvement.
    pub fn epochs_without_improvement(&self) -> usize {
        self.wait
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stopper(patience: usize) -> EarlyStopping {
        EarlyStopping::new(EarlyStoppingConfig { patience, min_delta: 0.0 })
    }

    #[test]
    fn test_first_epoch_always_improves() {
        let mut es = stopper(5);
        assert_eq!(es.observe(1, 10.0), StoppingDecision::Improved);
        assert_eq!(es.best_epoch(), Some(1));
    }

    #[test]
    fn test_stops_after_patience_epochs() {
        let mut es = stopper(3);
        es.observe(1, 1.0);
        assert_eq!(es.observe(2, 1.0), StoppingDecision::Wait);
        assert_eq!(es.observe(3, 1.5), StoppingDecision::Wait);
        assert_eq!(es.observe(4, 1.2), StoppingDecision::Stop);
        assert_eq!(es.best_epoch(), Some(1));
    }

    #[test]
    fn test_improvement_resets_counter() {
        let mut es = stopper(2);
        es.observe(1, 1.0);
        assert_eq!(es.observe(2, 1.1), StoppingDecision::Wait);
        assert_eq!(es.observe(3, 0.9), StoppingDecision::Improved);
        assert_eq!(es.epochs_without_improvement(), 0);
        assert_eq!(es.observe(4, 0.95), StoppingDecision::Wait);
        assert_eq!(es.observe(5, 0.95), StoppingDecision::Stop);
        assert_eq!(es.best_epoch(), Some(3));
    }

    #[test]
    fn test_min_delta_requires_real_improvement() {
        let mut es = EarlyStopping::new(EarlyStoppingConfig { patience: 5, min_delta: 0.1 });
        es.observe(1, 1.0);
        assert_eq!(es.observe(2, 0.95), StoppingDecision::Wait);
        assert_eq!(es.observe(3, 0.85), StoppingDecision::Improved);
    }

    #[test]
    fn test_nan_never_improves() {
        let mut es = stopper(2);
        assert_eq!(es.observe(1, f64::NAN), StoppingDecision::Wait);
        assert_eq!(es.best_epoch(), None);
        assert_eq!(es.observe(2, f64::NAN), StoppingDecision::Stop);
    }
}
