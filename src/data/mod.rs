// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from .dcm files on disk to tensor batches.
//
//   .dcm files
//       │
//       ▼
//   DicomDirectoryLoader → lists and decodes files, reads VOI LUT
//       │
//       ▼
//   Preprocessor         → VOI LUT, min-max, resize, 3 channels
//       │
//       ▼
//   split_train_val      → seeded 80/20 partition
//       │
//       ▼
//   ImageDataset         → implements Burn's Dataset trait
//       │
//       ▼
//   BatchSequence        → (inputs, targets) batches per epoch
//
// Each module is responsible for exactly one step.

/// Lists and reads .dcm files using dicom-rs
pub mod loader;

/// Per-image numeric preprocessing
pub mod preprocessor;

/// Implements Burn's Dataset trait for normalized images
pub mod dataset;

/// Burn Batcher plus the sized batch sequence
pub mod batcher;

/// Seeded train/validation split
pub mod splitter;
