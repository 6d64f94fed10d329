// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits describing question generation:
// no Burn types, no file I/O, no tokenizer.
//
//   style.rs      — the closed SAQ / JSQ enumeration
//   qg_example.rs — one (tagged passage, question, style) triple
//   traits.rs     — ExampleSource and QuestionGenerator seams

/// SAQ / JSQ question styles
pub mod style;

/// Supervised question-generation triple
pub mod qg_example;

/// Core abstractions (traits) that other layers implement
pub mod traits;
