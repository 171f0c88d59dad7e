// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No argument parsing (that's Layer 1)
//   - Only workflow coordination

// The training workflow
pub mod train_use_case;

// Load and summarise a directory without training
pub mod inspect_use_case;
