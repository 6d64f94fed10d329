// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Each use case orchestrates the other layers for one goal.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - Only workflow coordination

// Raw records → tagged train/val/test files
pub mod prepare_use_case;

// The training workflow
pub mod train_use_case;

// Loss, accuracy and sample generations for a checkpoint
pub mod evaluate_use_case;

// Passage + style → question
pub mod generate_use_case;
