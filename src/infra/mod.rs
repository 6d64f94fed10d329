// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by several other layers:
//
//   checkpoint.rs      — model weights via Burn's CompactRecorder,
//                        plus the model and run configs as JSON
//                        so inference can rebuild the model.
//
//   tokenizer_store.rs — builds / saves / loads the word-level
//                        base vocabulary as tokenizer.json.
//
//   style_tokenizer.rs — wraps the tokenizer with the [SAQ] and
//                        [JSQ] control tokens, encodes prompts
//                        and decodes generated ids.
//
//   metrics.rs         — per-epoch metrics CSV.

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Tokenizer building, saving, and loading
pub mod tokenizer_store;

/// Style-token aware encode / decode
pub mod style_tokenizer;

/// Training metrics CSV logger
pub mod metrics;
