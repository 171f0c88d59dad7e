// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer programs against these traits rather
// than the concrete loader or logger:
//   - DicomDirectoryLoader implements ImageSource
//   - MetricsLogger implements EpochObserver

use crate::domain::error::ScanResult;
use crate::domain::history::EpochLoss;
use crate::domain::image::NormalizedImage;

// ─── ImageSource ──────────────────────────────────────────────────────────────
/// Any component that can produce the full set of preprocessed images.
pub trait ImageSource {
    /// Load and preprocess every available image, in a stable order.
    fn load_all(&self) -> ScanResult<Vec<NormalizedImage>>;
}

// ─── EpochObserver ────────────────────────────────────────────────────────────
/// Notified by the trainer after every completed epoch.
pub trait EpochObserver {
    fn on_epoch_end(&self, record: &EpochLoss) -> anyhow::Result<()>;
}

/// Observer that ignores every epoch.
pub struct NoopObserver;

impl EpochObserver for NoopObserver {
    fn on_epoch_end(&self, _record: &EpochLoss) -> anyhow::Result<()> {
        Ok(())
    }
}
