// ============================================================
// Layer 3 — Pipeline Errors
// ============================================================
// Typed failures raised by the loading, splitting and training
// code. The application layer wraps these in anyhow errors with
// extra context; callers that need to react to a specific case
// can still downcast back to ScanError.
//
// None of these are retried anywhere in the pipeline.

use std::path::PathBuf;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum ScanError {
    /// File or directory missing, unreadable, or not a valid DICOM
    /// container with decodable pixel data.
    #[error("cannot read '{}'", path.display())]
    Read {
        path:   PathBuf,
        #[source]
        source: BoxError,
    },

    /// Constant-valued image: min-max normalisation is undefined.
    #[error("'{}' has constant intensity {value}; cannot normalise", path.display())]
    DegenerateImage { path: PathBuf, value: f32 },

    /// No `.dcm` files (or none left after skipping degenerate ones).
    #[error("no usable DICOM images found in '{}'", dir.display())]
    EmptyDataset { dir: PathBuf },

    /// A train/validation partition ended up with no samples.
    #[error("{partition} partition is empty after splitting {total} image(s); need at least 2")]
    EmptyPartition { partition: &'static str, total: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ScanError {
    pub fn read(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        Self::Read { path: path.into(), source: source.into() }
    }
}

pub type ScanResult<T> = Result<T, ScanError>;
