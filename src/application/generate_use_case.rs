// ============================================================
// Layer 2 — GenerateUseCase
// ============================================================
// Loads the tokenizer and model once, then answers any number of
// generate_question calls through a shared reference. Callers
// (the CLI, a request handler) get one long-lived instance instead
// of a process-wide global.
//
// Empty passages are rejected here, before tokenisation.

use anyhow::Result;
use burn::prelude::Backend;
use std::path::Path;

use crate::domain::{style::QuestionStyle, traits::QuestionGenerator};
use crate::error::QgError;
use crate::infra::{
    checkpoint::CheckpointManager,
    style_tokenizer::StyleTokenizer,
    tokenizer_store::TokenizerStore,
};
use crate::ml::inferencer::{GeneratedQuestion, InferBackend, Inferencer};

pub const DEFAULT_MAX_LENGTH: usize = 20;

pub struct GenerateUseCase<B: Backend = InferBackend> {
    tokenizer:  StyleTokenizer,
    inferencer: Inferencer<B>,
    max_length: usize,
}

impl GenerateUseCase<InferBackend> {
    pub fn new(checkpoint_dir: impl AsRef<Path>, max_length: usize) -> Result<Self> {
        let dir        = checkpoint_dir.as_ref();
        let tokenizer  = StyleTokenizer::new(TokenizerStore::new(dir).load()?)?;
        let ckpt       = CheckpointManager::new(dir);
        let inferencer = Inferencer::from_checkpoint(&ckpt, &tokenizer, Default::default())?;
        Ok(Self::from_parts(tokenizer, inferencer, max_length))
    }
}

impl<B: Backend> GenerateUseCase<B> {
    pub fn from_parts(tokenizer: StyleTokenizer, inferencer: Inferencer<B>, max_length: usize) -> Self {
        Self { tokenizer, inferencer, max_length }
    }

    /// Full result: text, ids and why decoding stopped.
    pub fn generate(&self, passage: &str, style: QuestionStyle) -> Result<GeneratedQuestion> {
        let passage = passage.trim();
        if passage.is_empty() {
            return Err(QgError::EmptyPassage.into());
        }
        let question = self.inferencer.generate(&self.tokenizer, passage, style, self.max_length)?;
        tracing::info!(
            "Generated {} question ({} tokens, {:?})",
            style.code(),
            question.token_ids.len(),
            question.finish
        );
        Ok(question)
    }
}

impl<B: Backend> QuestionGenerator for GenerateUseCase<B> {
    fn generate_question(&self, passage: &str, style: QuestionStyle) -> Result<String> {
        Ok(self.generate(passage, style)?.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::style_tokenizer::tests::test_tokenizer;
    use crate::ml::model::tests::{tiny_config, TestBackend};

    fn use_case() -> GenerateUseCase<TestBackend> {
        let tok = test_tokenizer();
        let cfg = tiny_config(tok.vocab_size());
        let device = Default::default();
        let inferencer = Inferencer::new(cfg.init(&device), cfg, device);
        GenerateUseCase::from_parts(tok, inferencer, DEFAULT_MAX_LENGTH)
    }

    #[test]
    fn test_empty_passage_is_rejected() {
        let uc = use_case();
        let err = uc.generate_question("   ", QuestionStyle::ShortAnswer).unwrap_err();
        assert_eq!(err.downcast_ref::<QgError>(), Some(&QgError::EmptyPassage));
    }

    #[test]
    fn test_serves_repeated_requests() {
        let uc = use_case();
        let generator: &dyn QuestionGenerator = &uc;
        let first = generator.generate_question("We watch movies together.", QuestionStyle::JumbledSentence).unwrap();
        let second = generator.generate_question("We watch movies together.", QuestionStyle::JumbledSentence).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_checkpoint_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(GenerateUseCase::new(dir.path(), DEFAULT_MAX_LENGTH).is_err());

        // a mistyped dir must not be created as a side effect
        let typo = dir.path().join("typo-dir");
        assert!(GenerateUseCase::new(&typo, DEFAULT_MAX_LENGTH).is_err());
        assert!(!typo.exists());
    }
}
