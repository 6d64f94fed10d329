// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams between layers. The application layer talks to
// these traits; the data and ml layers provide implementations.

use anyhow::Result;

use crate::domain::{qg_example::QgExample, style::QuestionStyle};

// ─── ExampleSource ────────────────────────────────────────────────────────────
/// Any component that can load formatted question-generation examples.
///
/// Implementations:
///   - JsonExampleLoader → a `[{input, output, style_id}]` JSON file
pub trait ExampleSource {
    fn load_all(&self) -> Result<Vec<QgExample>>;
}

// ─── QuestionGenerator ────────────────────────────────────────────────────────
/// Anything that turns a passage into a question of the requested style.
///
/// This is the contract a request handler consumes: it supplies the
/// passage text and a parsed style and gets back the question string.
pub trait QuestionGenerator {
    fn generate_question(&self, passage: &str, style: QuestionStyle) -> Result<String>;
}
