// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Rebuilds the model from model_config.json, loads the best (or
// latest) weights, and turns (passage, style) requests into
// question text:
//
//   "[SAQ] passage" → token ids → greedy decode → ids → text
//
// Requests in one batch are padded to the longest prompt; the
// attention mask keeps the padding out of the encoder.

use anyhow::Result;
use burn::prelude::*;

use crate::domain::style::QuestionStyle;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::style_tokenizer::StyleTokenizer;
use crate::ml::generator::{FinishReason, GenerationConfig, GreedyDecoder};
use crate::ml::model::{StyleQgConfig, StyleQgModel};

pub type InferBackend = burn::backend::Wgpu;

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedQuestion {
    pub text:      String,
    /// Generated ids, cut after the first end-of-sequence id.
    pub token_ids: Vec<u32>,
    pub finish:    FinishReason,
}

pub struct Inferencer<B: Backend = InferBackend> {
    model:        StyleQgModel<B>,
    model_config: StyleQgConfig,
    device:       B::Device,
}

impl<B: Backend> Inferencer<B> {
    pub fn new(model: StyleQgModel<B>, model_config: StyleQgConfig, device: B::Device) -> Self {
        Self { model, model_config, device }
    }

    pub fn from_checkpoint(
        ckpt_manager: &CheckpointManager,
        tokenizer:    &StyleTokenizer,
        device:       B::Device,
    ) -> Result<Self> {
        let model_config = ckpt_manager.load_model_config()?.with_dropout(0.0);
        model_config.validate()?;
        model_config.check_vocab(tokenizer.vocab_size())?;

        let model: StyleQgModel<B> = model_config.init(&device);
        let model = ckpt_manager.load_for_inference(model, &device)?;
        tracing::info!("Model loaded from checkpoint");
        Ok(Self::new(model, model_config, device))
    }

    pub fn model(&self) -> &StyleQgModel<B> {
        &self.model
    }

    pub fn model_config(&self) -> &StyleQgConfig {
        &self.model_config
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    pub fn generation_config(&self, tokenizer: &StyleTokenizer, max_length: usize) -> GenerationConfig {
        GenerationConfig::new(tokenizer.decoder_start_id(), tokenizer.eos_id(), tokenizer.pad_id())
            .with_max_length(max_length)
    }

    pub fn generate(
        &self,
        tokenizer:  &StyleTokenizer,
        passage:    &str,
        style:      QuestionStyle,
        max_length: usize,
    ) -> Result<GeneratedQuestion> {
        let mut out = self.generate_batch(tokenizer, &[(passage, style)], max_length)?;
        out.pop().ok_or_else(|| anyhow::anyhow!("Decoder returned no sequence"))
    }

    pub fn generate_batch(
        &self,
        tokenizer:  &StyleTokenizer,
        requests:   &[(&str, QuestionStyle)],
        max_length: usize,
    ) -> Result<Vec<GeneratedQuestion>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let prompts = requests
            .iter()
            .map(|(passage, style)| tokenizer.encode_prompt(passage, *style, self.model_config.max_source_len))
            .collect::<Result<Vec<_>>>()?;
        let width = prompts.iter().map(|p| p.ids.len()).max().unwrap_or(1);

        let mut ids  = Vec::with_capacity(requests.len() * width);
        let mut mask = Vec::with_capacity(requests.len() * width);
        for prompt in &prompts {
            ids.extend(prompt.ids.iter().map(|&x| x as i32));
            ids.extend(std::iter::repeat(tokenizer.pad_id() as i32).take(width - prompt.ids.len()));
            mask.extend(prompt.attention_mask.iter().map(|&x| x as i32));
            mask.extend(std::iter::repeat(0).take(width - prompt.ids.len()));
        }
        let styles: Vec<i32> = requests.iter().map(|(_, s)| s.id() as i32).collect();

        let batch = requests.len();
        let input_ids = Tensor::<B, 1, Int>::from_ints(ids.as_slice(), &self.device).reshape([batch, width]);
        let attention_mask = Tensor::<B, 1, Int>::from_ints(mask.as_slice(), &self.device).reshape([batch, width]);
        let style_ids = Tensor::<B, 1, Int>::from_ints(styles.as_slice(), &self.device);

        let decoder = GreedyDecoder::new(&self.model, self.generation_config(tokenizer, max_length))?;
        let output = decoder.generate(input_ids, attention_mask, style_ids);
        tracing::debug!("Decoded {} sequences in {} steps", batch, output.steps);

        output
            .sequences
            .iter()
            .map(|seq| {
                let token_ids = seq.tokens().to_vec();
                let text = tokenizer.decode(&token_ids)?.trim().to_string();
                Ok(GeneratedQuestion { text, token_ids, finish: seq.finish_reason() })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::style_tokenizer::tests::test_tokenizer;
    use crate::ml::model::tests::{tiny_config, TestBackend};

    fn inferencer(tok: &StyleTokenizer) -> Inferencer<TestBackend> {
        let device = Default::default();
        let cfg = tiny_config(tok.vocab_size());
        let model = cfg.init(&device);
        Inferencer::new(model, cfg, device)
    }

    #[test]
    fn test_end_to_end_generation() {
        let tok = test_tokenizer();
        let inf = inferencer(&tok);

        let q = inf
            .generate(&tok, "We watch movies together.", QuestionStyle::ShortAnswer, 20)
            .unwrap();

        assert!(!q.token_ids.is_empty());
        assert!(q.token_ids.len() <= 20);
        assert_ne!(q.token_ids[0], tok.pad_id());
        if q.token_ids[0] == tok.eos_id() {
            assert!(q.text.is_empty());
        }
        match q.finish {
            FinishReason::EndOfSequence => assert_eq!(q.token_ids.last(), Some(&tok.eos_id())),
            FinishReason::LengthCap     => assert_eq!(q.token_ids.len(), 20),
        }
    }

    #[test]
    fn test_batch_matches_single_requests() {
        let tok = test_tokenizer();
        let inf = inferencer(&tok);
        let requests = [
            ("We watch movies together.", QuestionStyle::ShortAnswer),
            ("Tom has a red ball.", QuestionStyle::JumbledSentence),
        ];

        let batch = inf.generate_batch(&tok, &requests, 8).unwrap();
        assert_eq!(batch.len(), 2);
        for ((passage, style), batched) in requests.iter().zip(&batch) {
            let single = inf.generate(&tok, passage, *style, 8).unwrap();
            assert_eq!(&single, batched);
        }
    }

    #[test]
    fn test_max_length_beyond_model_is_rejected() {
        let tok = test_tokenizer();
        let inf = inferencer(&tok);
        assert!(inf.generate(&tok, "We watch movies.", QuestionStyle::ShortAnswer, 500).is_err());
    }
}
