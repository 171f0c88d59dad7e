// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
// This file is the loss-curve artifact of a run: open it in a
// spreadsheet or any plotting tool.
//
// Metrics recorded per epoch:
//   - epoch:      the epoch number (1, 2, 3, ...)
//   - train_loss: mean binary cross-entropy on the training set
//   - val_loss:   mean binary cross-entropy on the validation set
//
// Output file: <output_dir>/metrics.csv
//
// Example CSV output:
//   epoch,train_loss,val_loss
//   1,0.693147,0.690021
//   2,0.652310,0.648877
//   ...
//
// After training, the per-image reconstruction errors of the
// validation set go to <output_dir>/anomaly_scores.csv.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

use crate::domain::history::EpochLoss;
use crate::domain::traits::EpochObserver;

pub const METRICS_FILE: &str = "metrics.csv";
pub const SCORES_FILE:  &str = "anomaly_scores.csv";

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    dir:      PathBuf,
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a new MetricsLogger.
    /// Starts a fresh CSV with only the header row.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join(METRICS_FILE);
        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(f, "epoch,train_loss,val_loss")?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());

        Ok(Self { dir, csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochLoss) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        writeln!(f, "{},{:.6},{:.6}", m.epoch, m.train_loss, m.val_loss)?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );
        Ok(())
    }

    /// Write `source,score` rows, highest score first.
    pub fn write_anomaly_scores(&self, scores: &[(PathBuf, f64)]) -> Result<PathBuf> {
        let path = self.dir.join(SCORES_FILE);
        let mut f = fs::File::create(&path)
            .with_context(|| format!("Cannot create '{}'", path.display()))?;

        let mut ranked: Vec<&(PathBuf, f64)> = scores.iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        writeln!(f, "source,score")?;
        for (source, score) in ranked {
            writeln!(f, "{},{:.8}", source.display(), score)?;
        }
        tracing::debug!("Wrote {} anomaly scores to '{}'", scores.len(), path.display());
        Ok(path)
    }

    /// Return the path to the metrics CSV file
    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}

impl EpochObserver for MetricsLogger {
    fn on_epoch_end(&self, record: &EpochLoss) -> Result<()> {
        self.log(record)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_follow_header() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.on_epoch_end(&EpochLoss::new(1, 0.5, 0.25)).unwrap();
        logger.on_epoch_end(&EpochLoss::new(2, 0.4, 0.2)).unwrap();

        let csv = fs::read_to_string(logger.csv_path()).unwrap();
        assert_eq!(
            csv,
            "epoch,train_loss,val_loss\n1,0.500000,0.250000\n2,0.400000,0.200000\n"
        );
    }

    #[test]
    fn test_new_run_truncates_old_metrics() {
        let dir = tempfile::tempdir().unwrap();
        MetricsLogger::new(dir.path()).unwrap().log(&EpochLoss::new(1, 1.0, 1.0)).unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        assert_eq!(fs::read_to_string(logger.csv_path()).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_scores_sorted_descending() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        let path   = logger
            .write_anomaly_scores(&[("a.dcm".into(), 0.1), ("b.dcm".into(), 0.3)])
            .unwrap();

        let lines: Vec<String> = fs::read_to_string(path).unwrap().lines().map(String::from).collect();
        assert_eq!(lines[0], "source,score");
        assert!(lines[1].starts_with("b.dcm,"));
        assert!(lines[2].starts_with("a.dcm,"));
    }
}
