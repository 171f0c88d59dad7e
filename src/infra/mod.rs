// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting file output that does not belong to any one
// business layer:
//
//   metrics.rs   — Training metrics logging
//                  Writes per-epoch losses to a CSV file (the
//                  data behind the loss curve) and the anomaly
//                  scores of the validation images.
//
//   run_store.rs — Run configuration persistence
//                  Saves the resolved TrainConfig as JSON and
//                  loads configuration files given on the CLI.
//
// Model weights are deliberately not written anywhere.

/// Training metrics CSV logger
pub mod metrics;

/// TrainConfig JSON persistence
pub mod run_store;
