// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Builds, saves and loads the base word-level vocabulary.
//
// The vocabulary is written directly as a HuggingFace
// tokenizer.json (WordLevel model + Whitespace pre-tokenizer)
// and loaded back through Tokenizer::from_file, so the same
// file works for training and inference.
//
// Reserved ids follow the T5 convention the generator relies on:
//   <pad> = 0   (also the decoder start token)
//   </s>  = 1   (end of sequence)
//   <unk> = 2
// The [SAQ] / [JSQ] control tokens are NOT part of this file's
// base vocabulary; StyleTokenizer adds them on top.

use anyhow::{Context, Result};
use std::{collections::HashMap, path::PathBuf, str::FromStr};
use tokenizers::Tokenizer;

pub const PAD_TOKEN: &str = "<pad>";
pub const EOS_TOKEN: &str = "</s>";
pub const UNK_TOKEN: &str = "<unk>";

const RESERVED: [&str; 3] = [PAD_TOKEN, EOS_TOKEN, UNK_TOKEN];

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join("tokenizer.json")
    }

    /// Load existing tokenizer or build a new one from texts
    pub fn load_or_build(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        if self.path().exists() {
            tracing::info!("Loading existing tokenizer from disk");
            self.load()
        } else {
            tracing::info!("Building new tokenizer (vocab_size={})", vocab_size);
            self.build_and_save(texts, vocab_size)
        }
    }

    /// Load a previously saved tokenizer from JSON file
    pub fn load(&self) -> Result<Tokenizer> {
        let path = self.path();
        Tokenizer::from_file(&path)
            .map_err(|e| anyhow::anyhow!(
                "Cannot load tokenizer from '{}': {}", path.display(), e
            ))
    }

    /// Persist a tokenizer (including any added style tokens).
    pub fn save(&self, tokenizer: &Tokenizer) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;
        let path = self.path();
        tokenizer
            .save(&path, true)
            .map_err(|e| anyhow::anyhow!("Cannot save tokenizer to '{}': {e}", path.display()))
    }

    fn build_and_save(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        let tokenizer = build_in_memory(texts, vocab_size)?;
        self.save(&tokenizer)?;
        tracing::info!("Tokenizer saved to '{}'", self.path().display());
        Ok(tokenizer)
    }
}

/// Build a word-level tokenizer entirely in memory.
pub fn build_in_memory(texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
    let json = word_level_json(texts, vocab_size).to_string();
    Tokenizer::from_str(&json).map_err(|e| anyhow::anyhow!("Cannot build tokenizer: {e}"))
}

/// Split text the way the Whitespace pre-tokenizer does (`\w+|[^\w\s]+`),
/// lowercased to match the BertNormalizer settings below.
fn pre_tokenize(text: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_is_word = false;

    for c in text.to_lowercase().chars() {
        if c.is_whitespace() {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
            }
            continue;
        }
        let is_word = c.is_alphanumeric() || c == '_';
        if !current.is_empty() && is_word != current_is_word {
            pieces.push(std::mem::take(&mut current));
        }
        current_is_word = is_word;
        current.push(c);
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Frequency-ordered vocabulary in HuggingFace tokenizer.json form.
/// Ties are broken alphabetically so the same corpus always yields
/// the same ids.
pub fn word_level_json(texts: &[String], vocab_size: usize) -> serde_json::Value {
    let mut freq: HashMap<String, usize> = HashMap::new();
    for text in texts {
        for piece in pre_tokenize(text) {
            *freq.entry(piece).or_insert(0) += 1;
        }
    }

    let mut words: Vec<(String, usize)> = freq
        .into_iter()
        .filter(|(w, _)| !RESERVED.contains(&w.as_str()))
        .collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    words.truncate(vocab_size.saturating_sub(RESERVED.len()));

    let mut vocab = serde_json::Map::new();
    for (id, token) in RESERVED.iter().enumerate() {
        vocab.insert(token.to_string(), serde_json::json!(id));
    }
    for (offset, (word, _)) in words.iter().enumerate() {
        vocab.insert(word.clone(), serde_json::json!(RESERVED.len() + offset));
    }

    let added_tokens: Vec<serde_json::Value> = RESERVED
        .iter()
        .enumerate()
        .map(|(id, token)| serde_json::json!({
            "id": id, "content": token, "single_word": false, "lstrip": false,
            "rstrip": false, "normalized": false, "special": true
        }))
        .collect();

    serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": added_tokens,
        "normalizer": {
            "type": "BertNormalizer",
            "clean_text": true,
            "handle_chinese_chars": true,
            "strip_accents": null,
            "lowercase": true
        },
        "pre_tokenizer": {
            "type": "Whitespace"
        },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": vocab,
            "unk_token": UNK_TOKEN
        }
    })
}
