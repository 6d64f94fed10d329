// ============================================================
// Shared error type
// ============================================================
// Typed failures for the domain and for construction-time
// validation. Everything above the domain layer works with
// anyhow::Result; these variants convert into it through `?`.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QgError {
    // --- Boundary ---
    #[error("Invalid question type '{0}'. Choose 'SAQ' or 'JSQ'.")]
    InvalidStyle(String),

    #[error("Unknown style id {0} (expected 0 = SAQ or 1 = JSQ)")]
    UnknownStyleId(i64),

    #[error("Passage is empty")]
    EmptyPassage,

    // --- Construction ---
    #[error("Invalid model config: {0}")]
    Config(String),

    #[error("Vocabulary of {tokenizer} tokens does not fit the model's vocab_size {model}")]
    VocabMismatch { tokenizer: usize, model: usize },

    #[error("Style token {token} resolved to id {id}, which belongs to the base vocabulary")]
    StyleTokenCollision { token: String, id: u32 },

    #[error("Tokenizer has no '{0}' token")]
    MissingSpecialToken(String),
}
