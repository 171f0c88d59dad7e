// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits that describe the core
// concepts of the system: a preprocessed scan, the loss
// history of a training run, and the errors the pipeline can
// raise.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// The data layer (Layer 4) produces these types and the ML
// layer (Layer 5) consumes them.

// A preprocessed, model-ready scan
pub mod image;

// Per-epoch training and validation losses
pub mod history;

// Typed failures of the loading and training pipeline
pub mod error;

// Core abstractions (traits) that other layers implement
pub mod traits;
