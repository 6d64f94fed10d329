// ============================================================
// Layer 5 — Token-level loss and accuracy
// ============================================================
// Cross-entropy over decoder positions where padding never counts:
//
//   1. pad targets are replaced with IGNORE_INDEX (in a new tensor —
//      the caller's labels are left as they were)
//   2. log-softmax over the vocabulary, gather the target log-prob
//   3. average the negative log-probs over non-ignored positions only
//
// Logits at ignored positions are multiplied by a zero weight, so
// changing them cannot change the loss.

use burn::{prelude::*, tensor::activation};

use crate::ml::model::IGNORE_INDEX;

/// Copy of `labels` with every pad position set to IGNORE_INDEX.
pub fn ignore_padding<B: Backend>(labels: Tensor<B, 2, Int>, pad_token_id: u32) -> Tensor<B, 2, Int> {
    let pad = labels.clone().equal_elem(pad_token_id as i64);
    labels.mask_fill(pad, IGNORE_INDEX)
}

/// logits: [batch, len, vocab], labels: [batch, len] → scalar loss [1]
pub fn masked_cross_entropy<B: Backend>(
    logits:       Tensor<B, 3>,
    labels:       Tensor<B, 2, Int>,
    pad_token_id: u32,
) -> Tensor<B, 1> {
    let targets = ignore_padding(labels, pad_token_id);
    let ignored = targets.clone().equal_elem(IGNORE_INDEX);
    // gather needs a valid index everywhere; ignored rows are weighted out below
    let safe_targets = targets.mask_fill(ignored.clone(), 0);

    let log_probs = activation::log_softmax(logits, 2);
    let picked = log_probs
        .gather(2, safe_targets.unsqueeze_dim::<3>(2))
        .squeeze::<2>(2);

    let weights = ignored.bool_not().float();
    let count = weights.clone().sum().clamp_min(1.0);
    (picked * weights).sum().neg() / count
}

/// (correct, total) over non-ignored positions, using arg-max predictions.
pub fn token_accuracy<B: Backend>(
    logits:       Tensor<B, 3>,
    labels:       Tensor<B, 2, Int>,
    pad_token_id: u32,
) -> (usize, usize) {
    let targets = ignore_padding(labels, pad_token_id);
    let valid = targets.clone().equal_elem(IGNORE_INDEX).bool_not().int();
    let predictions = logits.argmax(2).squeeze::<2>(2);

    let correct: i64 = predictions
        .equal(targets)
        .int()
        .mul(valid.clone())
        .sum()
        .into_scalar()
        .elem::<i64>();
    let total: i64 = valid.sum().into_scalar().elem::<i64>();
    (correct as usize, total as usize)
}
