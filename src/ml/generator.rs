// ============================================================
// Layer 5 — Greedy decoding loop
// ============================================================
// Each batch element is GENERATING until the token it appends is
// the end-of-sequence id, then FINISHED. Every step:
//
//   1. run the decoder for the newest token (the encoder ran once)
//   2. keep the logits of the last position only
//   3. pick the arg-max id (pad is never eligible: it is the start
//      symbol, not an output)
//   4. append it to EVERY running sequence, finished or not
//   5. mark elements whose new token is end-of-sequence as finished
//
// Decoding stops when all elements are finished or `max_length`
// tokens have been generated. The running sequences keep the tokens
// appended after an element finished; `GeneratedSequence::tokens()`
// gives the view cut at the first end-of-sequence token.

use burn::prelude::*;

use crate::error::QgError;
use crate::ml::model::{EncoderOutput, StyleQgModel};

#[derive(Config, Debug)]
pub struct GenerationConfig {
    pub decoder_start_token_id: u32,
    pub eos_token_id: u32,
    pub pad_token_id: u32,
    /// Generated tokens per sequence, start token not counted.
    #[config(default = "20")]
    pub max_length: usize,
    #[config(default = "true")]
    pub suppress_pad: bool,
    /// Reuse per-layer decoder state between steps instead of
    /// re-running the decoder over the whole prefix.
    #[config(default = "true")]
    pub use_cache: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    EndOfSequence,
    LengthCap,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSequence {
    /// Start token followed by every appended token.
    pub running:  Vec<u32>,
    eos_token_id: u32,
}

impl GeneratedSequence {
    /// Everything appended after the start token.
    pub fn generated(&self) -> &[u32] {
        &self.running[1..]
    }

    /// Generated tokens up to and including the first end-of-sequence.
    pub fn tokens(&self) -> &[u32] {
        let generated = self.generated();
        match generated.iter().position(|&id| id == self.eos_token_id) {
            Some(end) => &generated[..=end],
            None      => generated,
        }
    }

    pub fn finish_reason(&self) -> FinishReason {
        if self.generated().contains(&self.eos_token_id) {
            FinishReason::EndOfSequence
        } else {
            FinishReason::LengthCap
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecodeOutput {
    pub sequences: Vec<GeneratedSequence>,
    pub steps:     usize,
}

pub struct GreedyDecoder<'a, B: Backend> {
    model:  &'a StyleQgModel<B>,
    config: GenerationConfig,
}

impl<'a, B: Backend> GreedyDecoder<'a, B> {
    pub fn new(model: &'a StyleQgModel<B>, config: GenerationConfig) -> Result<Self, QgError> {
        if config.max_length > model.max_target_len {
            return Err(QgError::Config(format!(
                "max_length {} exceeds the model's max_target_len {}",
                config.max_length, model.max_target_len
            )));
        }
        Ok(Self { model, config })
    }

    /// input_ids, attention_mask: [batch, src_len]; style_ids: [batch]
    pub fn generate(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
        style_ids:      Tensor<B, 1, Int>,
    ) -> DecodeOutput {
        let [batch, _] = input_ids.dims();
        let device = input_ids.device();
        let start = self.config.decoder_start_token_id;
        let eos = self.config.eos_token_id;

        let encoder = self.model.encode(input_ids, attention_mask);
        let mut cache = self.model.new_cache();
        let blocked = self.pad_block_mask(batch, &device);

        let mut running: Vec<Vec<u32>> = vec![vec![start]; batch];
        let mut finished = vec![false; batch];
        let mut next_input = Tensor::<B, 2, Int>::full([batch, 1], start as i64, &device);
        let mut steps = 0;

        while steps < self.config.max_length && !finished.iter().all(|&f| f) {
            let logits = if self.config.use_cache {
                self.model.decode_step(&encoder, next_input, style_ids.clone(), &mut cache)
            } else {
                self.last_position_logits(&encoder, &running, style_ids.clone(), &device)
            };
            let logits = match &blocked {
                Some(mask) => logits.mask_fill(mask.clone(), f32::NEG_INFINITY),
                None       => logits,
            };

            let next = logits.argmax(1); // [batch, 1]
            let ids: Vec<u32> = next
                .clone()
                .into_data()
                .iter::<i64>()
                .map(|id| id as u32)
                .collect();

            for (i, &id) in ids.iter().enumerate() {
                running[i].push(id);
                if id == eos {
                    finished[i] = true;
                }
            }
            tracing::debug!("step {} → {:?}", steps, ids);

            next_input = next;
            steps += 1;
        }

        let sequences = running
            .into_iter()
            .map(|running| GeneratedSequence { running, eos_token_id: eos })
            .collect();
        DecodeOutput { sequences, steps }
    }

    /// Recompute the decoder over the whole running prefix.
    fn last_position_logits(
        &self,
        encoder:   &EncoderOutput<B>,
        running:   &[Vec<u32>],
        style_ids: Tensor<B, 1, Int>,
        device:    &B::Device,
    ) -> Tensor<B, 2> {
        let batch = running.len();
        let len = running[0].len();
        let flat: Vec<i32> = running.iter().flatten().map(|&id| id as i32).collect();
        let ids = Tensor::<B, 1, Int>::from_ints(flat.as_slice(), device).reshape([batch, len]);

        let logits = self.model.decode(encoder, ids, style_ids);
        let [_, _, vocab] = logits.dims();
        logits.slice([0..batch, len - 1..len, 0..vocab]).reshape([batch, vocab])
    }

    fn pad_block_mask(&self, batch: usize, device: &B::Device) -> Option<Tensor<B, 2, Bool>> {
        if !self.config.suppress_pad {
            return None;
        }
        let vocab = self.model.lm_head.weight.val().dims()[1];
        let pad = self.config.pad_token_id as usize;
        let values: Vec<bool> = (0..batch * vocab).map(|i| i % vocab == pad).collect();
        Some(Tensor::from_data(TensorData::new(values, [batch, vocab]), device))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::tests::{tiny_config, TestBackend};

    const EOS: u32 = 1;

    fn inputs(device: &<TestBackend as Backend>::Device) -> (Tensor<TestBackend, 2, Int>, Tensor<TestBackend, 2, Int>, Tensor<TestBackend, 1, Int>) {
        let ids = Tensor::<TestBackend, 1, Int>::from_ints([5, 6, 7, 1, 8, 9, 1, 0].as_slice(), device).reshape([2, 4]);
        let mask = Tensor::<TestBackend, 1, Int>::from_ints([1, 1, 1, 1, 1, 1, 1, 0].as_slice(), device).reshape([2, 4]);
        let styles = Tensor::<TestBackend, 1, Int>::from_ints([0, 1], device);
        (ids, mask, styles)
    }

    fn config(max_length: usize) -> GenerationConfig {
        GenerationConfig::new(0, EOS, 0).with_max_length(max_length)
    }

    #[test]
    fn test_generation_is_deterministic_and_bounded() {
        let device = Default::default();
        let model: StyleQgModel<TestBackend> = tiny_config(30).init(&device);
        let decoder = GreedyDecoder::new(&model, config(12)).unwrap();

        let (ids, mask, styles) = inputs(&device);
        let first = decoder.generate(ids.clone(), mask.clone(), styles.clone());
        let second = decoder.generate(ids, mask, styles);

        assert_eq!(first.sequences, second.sequences);
        assert!(first.steps <= 12);
        for seq in &first.sequences {
            assert_eq!(seq.running[0], 0);
            assert!(seq.generated().len() <= 12);
            assert!(!seq.tokens().is_empty());
            assert!(!seq.generated().contains(&0), "pad must never be generated");
        }
    }

    #[test]
    fn test_cached_and_full_recompute_agree() {
        let device = Default::default();
        let model: StyleQgModel<TestBackend> = tiny_config(30).init(&device);
        let (ids, mask, styles) = inputs(&device);

        let cached = GreedyDecoder::new(&model, config(10)).unwrap()
            .generate(ids.clone(), mask.clone(), styles.clone());
        let full = GreedyDecoder::new(&model, config(10).with_use_cache(false)).unwrap()
            .generate(ids, mask, styles);

        assert_eq!(cached.sequences, full.sequences);
        assert_eq!(cached.steps, full.steps);
    }

    #[test]
    fn test_max_length_beyond_positions_is_rejected() {
        let device = Default::default();
        let model: StyleQgModel<TestBackend> = tiny_config(30).init(&device);
        assert!(matches!(
            GreedyDecoder::new(&model, config(25)),
            Err(QgError::Config(_))
        ));
    }

    #[test]
    fn test_tokens_cut_at_first_eos() {
        let seq = GeneratedSequence { running: vec![0, 7, 8, EOS, 9, EOS], eos_token_id: EOS };
        assert_eq!(seq.generated(), &[7, 8, EOS, 9, EOS]);
        assert_eq!(seq.tokens(), &[7, 8, EOS]);
        assert_eq!(seq.finish_reason(), FinishReason::EndOfSequence);

        let capped = GeneratedSequence { running: vec![0, 7, 8], eos_token_id: EOS };
        assert_eq!(capped.tokens(), &[7, 8]);
        assert_eq!(capped.finish_reason(), FinishReason::LengthCap);
    }

    #[test]
    fn test_all_finished_stops_early() {
        // Random weights: either every element finishes before the cap,
        // in which case the loop stops right there, or the cap is hit.
        let device = Default::default();
        let model: StyleQgModel<TestBackend> = tiny_config(30).init(&device);
        let (ids, mask, styles) = inputs(&device);
        let out = GreedyDecoder::new(&model, config(10)).unwrap().generate(ids, mask, styles);

        let all_done = out.sequences.iter().all(|s| s.finish_reason() == FinishReason::EndOfSequence);
        if all_done {
            // the loop stops on the step where the last element finished
            let last_eos = out
                .sequences
                .iter()
                .map(|s| s.tokens().len())
                .max()
                .unwrap();
            assert_eq!(out.steps, last_eos);
        } else {
            assert_eq!(out.steps, 10);
        }
    }
}
