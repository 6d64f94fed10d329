use anyhow::Result;
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::domain::qg_example::QgExample;
use crate::infra::style_tokenizer::StyleTokenizer;

/// One tokenised and padded training sample.
/// Input: [SAQ] passage </s> <pad>...   Labels: question </s> <pad>...
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QgSample {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub labels:         Vec<u32>,
    pub style_id:       usize,
}

impl QgSample {
    pub fn from_example(
        example:        &QgExample,
        tokenizer:      &StyleTokenizer,
        max_source_len: usize,
        max_target_len: usize,
    ) -> Result<Self> {
        let source = tokenizer.encode(&example.input, max_source_len, true)?;
        let target = tokenizer.encode(&example.output, max_target_len, true)?;
        Ok(Self {
            input_ids:      source.ids,
            attention_mask: source.attention_mask,
            labels:         target.ids,
            style_id:       example.style.id(),
        })
    }
}

pub struct QgDataset {
    samples: Vec<QgSample>,
}

impl QgDataset {
    pub fn new(samples: Vec<QgSample>) -> Self { Self { samples } }

    pub fn from_examples(
        examples:       &[QgExample],
        tokenizer:      &StyleTokenizer,
        max_source_len: usize,
        max_target_len: usize,
    ) -> Result<Self> {
        let samples = examples
            .iter()
            .map(|ex| QgSample::from_example(ex, tokenizer, max_source_len, max_target_len))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(samples))
    }

    pub fn sample_count(&self) -> usize { self.samples.len() }
}

impl Dataset<QgSample> for QgDataset {
    fn get(&self, index: usize) -> Option<QgSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
