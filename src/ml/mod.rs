// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn model code lives here:
//
//   model.rs      — style-conditioned encoder-decoder
//                   • shared token embedding + learned positions
//                   • encoder / decoder transformer blocks
//                   • style embedding fused before the LM head
//
//   loss.rs       — masked cross-entropy and token accuracy
//
//   generator.rs  — greedy decoding loop (cached or full recompute)
//
//   schedule.rs   — reduce-on-plateau learning rate
//
//   trainer.rs    — AdamW training loop with validation,
//                   metrics and checkpointing per epoch
//
//   inferencer.rs — loads a checkpoint and turns passages
//                   into question text
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Raffel et al. (2020) T5

/// Style-conditioned encoder-decoder
pub mod model;

/// Padding-aware loss and accuracy
pub mod loss;

/// Greedy decoding
pub mod generator;

/// Learning rate schedule
pub mod schedule;

/// Training loop with validation and checkpointing
pub mod trainer;

/// Inference engine — loads checkpoint and generates questions
pub mod inferencer;
