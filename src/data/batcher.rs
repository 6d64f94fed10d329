// ============================================================
// Layer 4 — QG Batcher
// ============================================================
// Implements Burn's Batcher trait: stacks a Vec<QgSample> into
// [batch, len] tensors. Samples are already padded to fixed
// lengths, so stacking is a flatten + reshape.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::QgSample;

#[derive(Debug, Clone)]
pub struct QgBatch<B: Backend> {
    /// [batch_size, max_source_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// [batch_size, max_source_len], 1 = real token, 0 = padding
    pub attention_mask: Tensor<B, 2, Int>,

    /// [batch_size, max_target_len], padded with the pad id
    pub labels: Tensor<B, 2, Int>,

    /// [batch_size], 0 = SAQ, 1 = JSQ
    pub style_ids: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct QgBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> QgBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    fn stack(&self, rows: Vec<&[u32]>) -> Tensor<B, 2, Int> {
        let batch_size = rows.len();
        let len = rows.first().map_or(0, |r| r.len());
        let flat: Vec<i32> = rows
            .iter()
            .flat_map(|r| r.iter().map(|&x| x as i32))
            .collect();
        Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device)
            .reshape([batch_size, len])
    }
}

impl<B: Backend> Batcher<QgSample, QgBatch<B>> for QgBatcher<B> {
    fn batch(&self, items: Vec<QgSample>) -> QgBatch<B> {
        let input_ids      = self.stack(items.iter().map(|s| s.input_ids.as_slice()).collect());
        let attention_mask = self.stack(items.iter().map(|s| s.attention_mask.as_slice()).collect());
        let labels         = self.stack(items.iter().map(|s| s.labels.as_slice()).collect());

        let styles: Vec<i32> = items.iter().map(|s| s.style_id as i32).collect();
        let style_ids = Tensor::<B, 1, Int>::from_ints(styles.as_slice(), &self.device);

        QgBatch { input_ids, attention_mask, labels, style_ids }
    }
}
