// ============================================================
// Layer 5 — Style-conditioned encoder-decoder
// ============================================================
//
//   input ids ──► shared embedding + positions ──► encoder blocks ──► encoder states
//                                                                          │
//   decoder ids ─► shared embedding + positions ─► decoder blocks ◄────────┘
//                                                   (causal self-attn, cross-attn)
//                                                        │
//   style id ──► style embedding ──► concat ─────────────┘
//                                      │
//                         Linear → ReLU → Linear → ReLU   (style adapter)
//                                      │
//                              Linear (no bias) ──► vocabulary logits
//
// The decoder can run two ways:
//   decode()      — the whole decoder sequence at once (training, scoring)
//   decode_step() — one new token per call, reusing a DecoderCache that
//                   holds every layer's input for earlier positions
// Both produce the same logits for the same positions.
//
// Reference: Raffel et al. (2020) T5, Vaswani et al. (2017)

use burn::{
    nn::{
        attention::{generate_autoregressive_mask, MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation,
};

use crate::domain::style::QuestionStyle;
use crate::error::QgError;
use crate::ml::loss::masked_cross_entropy;

/// Marks target positions that must not contribute to the loss.
pub const IGNORE_INDEX: i64 = -100;

/// SAQ and JSQ.
pub const NUM_STYLES: usize = 2;

#[derive(Config, Debug)]
pub struct StyleQgConfig {
    pub vocab_size: usize,
    #[config(default = "256")]
    pub d_model: usize,
    #[config(default = "8")]
    pub num_heads: usize,
    #[config(default = "4")]
    pub num_encoder_layers: usize,
    #[config(default = "4")]
    pub num_decoder_layers: usize,
    #[config(default = "1024")]
    pub d_ff: usize,
    #[config(default = "128")]
    pub max_source_len: usize,
    #[config(default = "64")]
    pub max_target_len: usize,
    #[config(default = "32")]
    pub style_emb_size: usize,
    #[config(default = "0.1")]
    pub dropout: f64,
    #[config(default = "0")]
    pub pad_token_id: u32,
    #[config(default = "0")]
    pub decoder_start_token_id: u32,
}

impl StyleQgConfig {
    /// Reject shapes that cannot be built. Called before `init`.
    pub fn validate(&self) -> Result<(), QgError> {
        if self.num_heads == 0 || self.d_model % self.num_heads != 0 {
            return Err(QgError::Config(format!(
                "d_model ({}) must be divisible by num_heads ({})",
                self.d_model, self.num_heads
            )));
        }
        if self.style_emb_size == 0 {
            return Err(QgError::Config("style_emb_size must be positive".to_string()));
        }
        if self.max_source_len == 0 || self.max_target_len == 0 {
            return Err(QgError::Config("max_source_len and max_target_len must be positive".to_string()));
        }
        for (name, id) in [("pad_token_id", self.pad_token_id), ("decoder_start_token_id", self.decoder_start_token_id)] {
            if id as usize >= self.vocab_size {
                return Err(QgError::Config(format!(
                    "{name} {id} is outside vocab_size {}", self.vocab_size
                )));
            }
        }
        Ok(())
    }

    /// The tokenizer (style tokens included) must fit the embedding table.
    pub fn check_vocab(&self, tokenizer_vocab: usize) -> Result<(), QgError> {
        if tokenizer_vocab > self.vocab_size {
            return Err(QgError::VocabMismatch { tokenizer: tokenizer_vocab, model: self.vocab_size });
        }
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> StyleQgModel<B> {
        let shared_embedding  = EmbeddingConfig::new(self.vocab_size, self.d_model).init(device);
        let encoder_positions = EmbeddingConfig::new(self.max_source_len, self.d_model).init(device);
        let decoder_positions = EmbeddingConfig::new(self.max_target_len, self.d_model).init(device);
        let encoder_layers = (0..self.num_encoder_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        let decoder_layers = (0..self.num_decoder_layers)
            .map(|_| self.build_decoder_block(device))
            .collect();
        let style = StyleAdapter {
            style_embedding: EmbeddingConfig::new(NUM_STYLES, self.style_emb_size).init(device),
            fuse_in:         LinearConfig::new(self.d_model + self.style_emb_size, self.d_model).init(device),
            fuse_out:        LinearConfig::new(self.d_model, self.d_model).init(device),
        };
        StyleQgModel {
            shared_embedding,
            encoder_positions,
            decoder_positions,
            encoder_layers,
            decoder_layers,
            encoder_norm: LayerNormConfig::new(self.d_model).init(device),
            decoder_norm: LayerNormConfig::new(self.d_model).init(device),
            style,
            lm_head: LinearConfig::new(self.d_model, self.vocab_size).with_bias(false).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            pad_token_id:           self.pad_token_id as usize,
            decoder_start_token_id: self.decoder_start_token_id as usize,
            max_target_len:         self.max_target_len,
        }
    }

    fn attention<B: Backend>(&self, device: &B::Device) -> MultiHeadAttention<B> {
        MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(device)
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        EncoderBlock {
            self_attn:   self.attention(device),
            ffn_linear1: LinearConfig::new(self.d_model, self.d_ff).init(device),
            ffn_linear2: LinearConfig::new(self.d_ff, self.d_model).init(device),
            norm1:       LayerNormConfig::new(self.d_model).init(device),
            norm2:       LayerNormConfig::new(self.d_model).init(device),
            dropout:     DropoutConfig::new(self.dropout).init(),
        }
    }

    fn build_decoder_block<B: Backend>(&self, device: &B::Device) -> DecoderBlock<B> {
        DecoderBlock {
            self_attn:   self.attention(device),
            cross_attn:  self.attention(device),
            ffn_linear1: LinearConfig::new(self.d_model, self.d_ff).init(device),
            ffn_linear2: LinearConfig::new(self.d_ff, self.d_model).init(device),
            norm1:       LayerNormConfig::new(self.d_model).init(device),
            norm2:       LayerNormConfig::new(self.d_model).init(device),
            norm3:       LayerNormConfig::new(self.d_model).init(device),
            dropout:     DropoutConfig::new(self.dropout).init(),
        }
    }
}

// ─── Encoder ──────────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// `pad_mask`: [batch, src_len], true on padding.
    pub fn forward(&self, x: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn_output = self
            .self_attn
            .forward(MhaInput::self_attn(x.clone()).mask_pad(pad_mask))
            .context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(
            activation::gelu(self.ffn_linear1.forward(x.clone()))
        );
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

// ─── Decoder ──────────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct DecoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub cross_attn:  MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub norm3:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> DecoderBlock<B> {
    /// Full-sequence pass with a causal mask.
    pub fn forward(
        &self,
        x:           Tensor<B, 3>,
        memory:      Tensor<B, 3>,
        memory_pad:  Tensor<B, 2, Bool>,
        causal_mask: Tensor<B, 3, Bool>,
    ) -> Tensor<B, 3> {
        let attn_output = self
            .self_attn
            .forward(MhaInput::self_attn(x.clone()).mask_attn(causal_mask))
            .context;
        self.cross_and_ffn(x, attn_output, memory, memory_pad)
    }

    /// One new position. `history` holds this layer's inputs for all
    /// earlier positions and is extended with `x`.
    pub fn forward_step(
        &self,
        x:          Tensor<B, 3>,
        history:    &mut Option<Tensor<B, 3>>,
        memory:     Tensor<B, 3>,
        memory_pad: Tensor<B, 2, Bool>,
    ) -> Tensor<B, 3> {
        let context = match history.take() {
            Some(past) => Tensor::cat(vec![past, x.clone()], 1),
            None       => x.clone(),
        };
        *history = Some(context.clone());

        // The newest position may attend to everything before it,
        // so no causal mask is needed here.
        let attn_output = self
            .self_attn
            .forward(MhaInput::new(x.clone(), context.clone(), context))
            .context;
        self.cross_and_ffn(x, attn_output, memory, memory_pad)
    }

    fn cross_and_ffn(
        &self,
        x:           Tensor<B, 3>,
        attn_output: Tensor<B, 3>,
        memory:      Tensor<B, 3>,
        memory_pad:  Tensor<B, 2, Bool>,
    ) -> Tensor<B, 3> {
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let cross = self
            .cross_attn
            .forward(MhaInput::new(x.clone(), memory.clone(), memory).mask_pad(memory_pad))
            .context;
        let x = self.norm2.forward(x + self.dropout.forward(cross));
        let ffn_out = self.ffn_linear2.forward(
            activation::gelu(self.ffn_linear1.forward(x.clone()))
        );
        self.norm3.forward(x + self.dropout.forward(ffn_out))
    }
}

// ─── Style adapter ────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct StyleAdapter<B: Backend> {
    pub style_embedding: Embedding<B>,
    pub fuse_in:         Linear<B>,
    pub fuse_out:        Linear<B>,
}

impl<B: Backend> StyleAdapter<B> {
    /// hidden: [batch, len, d_model], style_ids: [batch] → [batch, len, d_model]
    pub fn forward(&self, hidden: Tensor<B, 3>, style_ids: Tensor<B, 1, Int>) -> Tensor<B, 3> {
        let [batch, len, _] = hidden.dims();
        let style = self.style_embedding.forward(style_ids.unsqueeze_dim::<2>(1)); // [batch, 1, style]
        let [_, _, style_dim] = style.dims();
        let style = style.expand([batch, len, style_dim]);

        let fused = Tensor::cat(vec![hidden, style], 2);
        let fused = activation::relu(self.fuse_in.forward(fused));
        activation::relu(self.fuse_out.forward(fused))
    }
}

// ─── Full model ───────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct StyleQgModel<B: Backend> {
    pub shared_embedding:       Embedding<B>,
    pub encoder_positions:      Embedding<B>,
    pub decoder_positions:      Embedding<B>,
    pub encoder_layers:         Vec<EncoderBlock<B>>,
    pub decoder_layers:         Vec<DecoderBlock<B>>,
    pub encoder_norm:           LayerNorm<B>,
    pub decoder_norm:           LayerNorm<B>,
    pub style:                  StyleAdapter<B>,
    pub lm_head:                Linear<B>,
    pub dropout:                Dropout,
    pub pad_token_id:           usize,
    pub decoder_start_token_id: usize,
    pub max_target_len:         usize,
}

/// Encoder states for one batch of passages. Built once, then only read.
#[derive(Debug, Clone)]
pub struct EncoderOutput<B: Backend> {
    /// [batch, src_len, d_model]
    pub hidden:   Tensor<B, 3>,
    /// [batch, src_len], true on padding
    pub pad_mask: Tensor<B, 2, Bool>,
}

/// Per-layer decoder inputs for the positions generated so far.
#[derive(Debug, Clone)]
pub struct DecoderCache<B: Backend> {
    layers: Vec<Option<Tensor<B, 3>>>,
}

impl<B: Backend> DecoderCache<B> {
    pub fn new(num_layers: usize) -> Self {
        Self { layers: (0..num_layers).map(|_| None).collect() }
    }

    /// Number of positions already cached; also the position of the
    /// next decoded token.
    pub fn cached_positions(&self) -> usize {
        self.layers
            .first()
            .and_then(|layer| layer.as_ref())
            .map_or(0, |t| t.dims()[1])
    }
}

fn positions<B: Backend>(batch: usize, len: usize, offset: usize, device: &B::Device) -> Tensor<B, 2, Int> {
    Tensor::<B, 1, Int>::arange(offset as i64..(offset + len) as i64, device)
        .unsqueeze::<2>()
        .expand([batch, len])
}

impl<B: Backend> StyleQgModel<B> {
    /// input_ids, attention_mask: [batch, src_len] (mask 1 = token, 0 = pad)
    pub fn encode(&self, input_ids: Tensor<B, 2, Int>, attention_mask: Tensor<B, 2, Int>) -> EncoderOutput<B> {
        let [batch, src_len] = input_ids.dims();
        let device = input_ids.device();
        let pad_mask = attention_mask.equal_elem(0);

        let tok_emb = self.shared_embedding.forward(input_ids);
        let pos_emb = self.encoder_positions.forward(positions::<B>(batch, src_len, 0, &device));

        let mut x = self.dropout.forward(tok_emb + pos_emb);
        for layer in &self.encoder_layers {
            x = layer.forward(x, pad_mask.clone());
        }
        EncoderOutput { hidden: self.encoder_norm.forward(x), pad_mask }
    }

    /// Full decoder pass: [batch, tgt_len] ids → [batch, tgt_len, vocab] logits.
    pub fn decode(
        &self,
        encoder:           &EncoderOutput<B>,
        decoder_input_ids: Tensor<B, 2, Int>,
        style_ids:         Tensor<B, 1, Int>,
    ) -> Tensor<B, 3> {
        let [batch, tgt_len] = decoder_input_ids.dims();
        let device = decoder_input_ids.device();
        let causal_mask = generate_autoregressive_mask::<B>(batch, tgt_len, &device);

        let tok_emb = self.shared_embedding.forward(decoder_input_ids);
        let pos_emb = self.decoder_positions.forward(positions::<B>(batch, tgt_len, 0, &device));

        let mut x = self.dropout.forward(tok_emb + pos_emb);
        for layer in &self.decoder_layers {
            x = layer.forward(x, encoder.hidden.clone(), encoder.pad_mask.clone(), causal_mask.clone());
        }
        self.project(self.decoder_norm.forward(x), style_ids)
    }

    /// Decode one token per batch element ([batch, 1] ids) at the
    /// position after everything in `cache`, and return next-token
    /// logits [batch, vocab].
    pub fn decode_step(
        &self,
        encoder:   &EncoderOutput<B>,
        tokens:    Tensor<B, 2, Int>,
        style_ids: Tensor<B, 1, Int>,
        cache:     &mut DecoderCache<B>,
    ) -> Tensor<B, 2> {
        let [batch, _] = tokens.dims();
        let device = tokens.device();
        let position = cache.cached_positions();

        let tok_emb = self.shared_embedding.forward(tokens);
        let pos_emb = self.decoder_positions.forward(positions::<B>(batch, 1, position, &device));

        let mut x = self.dropout.forward(tok_emb + pos_emb);
        for (layer, history) in self.decoder_layers.iter().zip(cache.layers.iter_mut()) {
            x = layer.forward_step(x, history, encoder.hidden.clone(), encoder.pad_mask.clone());
        }
        let logits = self.project(self.decoder_norm.forward(x), style_ids);
        let [_, _, vocab] = logits.dims();
        logits.reshape([batch, vocab])
    }

    pub fn new_cache(&self) -> DecoderCache<B> {
        DecoderCache::new(self.decoder_layers.len())
    }

    fn project(&self, hidden: Tensor<B, 3>, style_ids: Tensor<B, 1, Int>) -> Tensor<B, 3> {
        self.lm_head.forward(self.style.forward(hidden, style_ids))
    }

    /// Encode + full decode.
    pub fn forward(
        &self,
        input_ids:         Tensor<B, 2, Int>,
        attention_mask:    Tensor<B, 2, Int>,
        decoder_input_ids: Tensor<B, 2, Int>,
        style_ids:         Tensor<B, 1, Int>,
    ) -> Tensor<B, 3> {
        let encoder = self.encode(input_ids, attention_mask);
        self.decode(&encoder, decoder_input_ids, style_ids)
    }

    /// Pass with the reference question as decoder input; returns (loss, logits).
    ///
    /// Without explicit `decoder_input_ids` the decoder input is `labels`
    /// shifted right behind the start token. `labels` is not modified.
    pub fn forward_loss(
        &self,
        input_ids:         Tensor<B, 2, Int>,
        attention_mask:    Tensor<B, 2, Int>,
        style_ids:         Tensor<B, 1, Int>,
        labels:            Tensor<B, 2, Int>,
        decoder_input_ids: Option<Tensor<B, 2, Int>>,
    ) -> (Tensor<B, 1>, Tensor<B, 3>) {
        let decoder_input_ids = decoder_input_ids.unwrap_or_else(|| {
            shift_right(
                labels.clone(),
                self.pad_token_id as u32,
                self.decoder_start_token_id as u32,
            )
        });
        let logits = self.forward(input_ids, attention_mask, decoder_input_ids, style_ids);
        let loss = masked_cross_entropy(logits.clone(), labels, self.pad_token_id as u32);
        (loss, logits)
    }

    /// The conditioning vector for `style`: [style_emb_size].
    pub fn style_vector(&self, style: QuestionStyle) -> Tensor<B, 1> {
        let weight = self.style.style_embedding.weight.val();
        let [_, dim] = weight.dims();
        let row = style.id();
        weight.slice([row..row + 1, 0..dim]).reshape([dim])
    }

    /// Stop gradients through the first `n` encoder blocks.
    pub fn freeze_encoder_layers(mut self, n: usize) -> Self {
        self.encoder_layers = self
            .encoder_layers
            .into_iter()
            .enumerate()
            .map(|(i, layer)| if i < n { layer.no_grad() } else { layer })
            .collect();
        self
    }
}

/// `[t1, t2, t3]` → `[start, t1, t2]`; ignore markers become `pad_token_id`.
pub fn shift_right<B: Backend>(
    labels:                 Tensor<B, 2, Int>,
    pad_token_id:           u32,
    decoder_start_token_id: u32,
) -> Tensor<B, 2, Int> {
    let [batch, len] = labels.dims();
    let device = labels.device();
    let start = Tensor::<B, 2, Int>::full([batch, 1], decoder_start_token_id as i64, &device);

    let shifted = if len > 1 {
        Tensor::cat(vec![start, labels.slice([0..batch, 0..len - 1])], 1)
    } else {
        start
    };
    let ignored = shifted.clone().equal_elem(IGNORE_INDEX);
    shifted.mask_fill(ignored, pad_token_id as i64)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use burn::backend::NdArray;

    use crate::infra::style_tokenizer::tests::test_tokenizer;

    pub(crate) type TestBackend = NdArray;

    pub(crate) fn tiny_config(vocab_size: usize) -> StyleQgConfig {
        StyleQgConfig::new(vocab_size)
            .with_d_model(32)
            .with_num_heads(4)
            .with_num_encoder_layers(2)
            .with_num_decoder_layers(2)
            .with_d_ff(64)
            .with_max_source_len(32)
            .with_max_target_len(24)
            .with_style_emb_size(8)
            .with_dropout(0.0)
    }

    fn ints(values: &[i32], shape: [usize; 2]) -> Tensor<TestBackend, 2, Int> {
        Tensor::<TestBackend, 1, Int>::from_ints(values, &Default::default()).reshape(shape)
    }

    fn floats(t: Tensor<TestBackend, 3>) -> Vec<f32> {
        t.into_data().iter::<f32>().collect()
    }

    fn int_values(t: Tensor<TestBackend, 2, Int>) -> Vec<i64> {
        t.into_data().iter::<i64>().collect()
    }

    #[test]
    fn test_forward_logits_shape() {
        let device = Default::default();
        let model: StyleQgModel<TestBackend> = tiny_config(40).init(&device);

        let input_ids = ints(&[5, 6, 7, 1, 0, 8, 9, 1, 0, 0], [2, 5]);
        let mask      = ints(&[1, 1, 1, 1, 0, 1, 1, 1, 0, 0], [2, 5]);
        let dec       = ints(&[0, 3, 4, 0, 5, 6], [2, 3]);
        let styles    = Tensor::<TestBackend, 1, Int>::from_ints([0, 1], &device);

        let logits = model.forward(input_ids, mask, dec, styles);
        assert_eq!(logits.dims(), [2, 3, 40]);
    }

    #[test]
    fn test_shift_right_prepends_start() {
        let shifted = shift_right(ints(&[11, 12, 13], [1, 3]), 0, 7);
        assert_eq!(int_values(shifted), vec![7, 11, 12]);
    }

    #[test]
    fn test_shift_right_replaces_ignore_marker_with_pad() {
        let labels = ints(&[11, -100, 13, -100], [1, 4]);
        let shifted = shift_right(labels, 0, 0);
        assert_eq!(int_values(shifted), vec![0, 11, 0, 13]);
    }

    #[test]
    fn test_forward_loss_leaves_labels_untouched() {
        let device = Default::default();
        let model: StyleQgModel<TestBackend> = tiny_config(40).init(&device);
        let labels = ints(&[5, 6, 1, 0], [1, 4]);

        let (loss, logits) = model.forward_loss(
            ints(&[5, 6, 7, 1], [1, 4]),
            ints(&[1, 1, 1, 1], [1, 4]),
            Tensor::<TestBackend, 1, Int>::from_ints([0], &device),
            labels.clone(),
            None,
        );
        assert_eq!(logits.dims(), [1, 4, 40]);
        assert!(loss.into_scalar().is_finite());
        assert_eq!(int_values(labels), vec![5, 6, 1, 0]);
    }

    #[test]
    fn test_style_vectors_differ() {
        // vocabulary with the style tokens appended
        let tok = test_tokenizer();
        let cfg = tiny_config(tok.vocab_size());
        assert!(cfg.check_vocab(tok.vocab_size()).is_ok());
        assert!(tok.style_token_id(QuestionStyle::JumbledSentence) < cfg.vocab_size as u32);

        let device = Default::default();
        let model: StyleQgModel<TestBackend> = cfg.init(&device);

        let saq: Vec<f32> = model.style_vector(QuestionStyle::ShortAnswer).into_data().iter::<f32>().collect();
        let jsq: Vec<f32> = model.style_vector(QuestionStyle::JumbledSentence).into_data().iter::<f32>().collect();
        assert_eq!(saq.len(), 8);
        assert_ne!(saq, jsq);
    }

    #[test]
    fn test_style_changes_logits() {
        let device = Default::default();
        let model: StyleQgModel<TestBackend> = tiny_config(40).init(&device);
        let encoder = model.encode(ints(&[5, 6, 7, 1], [1, 4]), ints(&[1, 1, 1, 1], [1, 4]));
        let dec = ints(&[0, 9], [1, 2]);

        let saq = model.decode(&encoder, dec.clone(), Tensor::from_ints([0], &device));
        let jsq = model.decode(&encoder, dec, Tensor::from_ints([1], &device));
        assert_ne!(floats(saq), floats(jsq));
    }

    #[test]
    fn test_decode_step_matches_full_decode() {
        let device = Default::default();
        let model: StyleQgModel<TestBackend> = tiny_config(40).init(&device);
        let encoder = model.encode(
            ints(&[5, 6, 7, 1, 8, 9, 1, 0], [2, 4]),
            ints(&[1, 1, 1, 1, 1, 1, 1, 0], [2, 4]),
        );
        let styles = Tensor::<TestBackend, 1, Int>::from_ints([0, 1], &device);
        let tokens = [[0, 12, 13, 14], [0, 20, 21, 22]];

        let full = model.decode(&encoder, ints(&[0, 12, 13, 14, 0, 20, 21, 22], [2, 4]), styles.clone());

        let mut cache = model.new_cache();
        for pos in 0..4 {
            let step_ids = ints(&[tokens[0][pos], tokens[1][pos]], [2, 1]);
            assert_eq!(cache.cached_positions(), pos);
            let step = model.decode_step(&encoder, step_ids, styles.clone(), &mut cache);
            let expected = full.clone().slice([0..2, pos..pos + 1, 0..40]).reshape([2, 40]);

            let got: Vec<f32> = step.into_data().iter::<f32>().collect();
            let want: Vec<f32> = expected.into_data().iter::<f32>().collect();
            for (g, w) in got.iter().zip(want.iter()) {
                assert!((g - w).abs() < 1e-4, "position {pos}: {g} vs {w}");
            }
        }
        assert_eq!(cache.cached_positions(), 4);
    }

    #[test]
    fn test_config_validation() {
        assert!(tiny_config(40).validate().is_ok());
        assert!(matches!(
            tiny_config(40).with_d_model(30).validate(),
            Err(QgError::Config(_))
        ));
        assert!(matches!(
            tiny_config(40).with_style_emb_size(0).validate(),
            Err(QgError::Config(_))
        ));
        assert_eq!(
            tiny_config(40).check_vocab(41),
            Err(QgError::VocabMismatch { tokenizer: 41, model: 40 })
        );
    }
}
