// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn model and optimisation code lives here. The data layer
// only touches Burn for its Dataset and Batcher traits.
//
//   model.rs          — the convolutional autoencoder
//                       conv/pool encoder, conv/upsample decoder,
//                       sigmoid output, binary cross-entropy loss
//
//   early_stopping.rs — patience counter on the validation loss
//
//   trainer.rs        — the training loop
//                       forward pass, loss, backward pass, Adam
//                       step, validation, best-weight restore

/// Convolutional autoencoder architecture
pub mod model;

/// Validation-loss patience tracking
pub mod early_stopping;

/// Training loop with validation and early stopping
pub mod trainer;
