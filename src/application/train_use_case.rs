// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load train / val splits     (Layer 4 - data)
//   Step 2: Build / load tokenizer      (Layer 6 - infra)
//   Step 3: Add style tokens and save   (Layer 6 - infra)
//   Step 4: Derive the model config     (Layer 5 - ml)
//   Step 5: Tokenise into datasets      (Layer 4 - data)
//   Step 6: Check resume, save configs  (Layer 6 - infra)
//   Step 7: Run training loop           (Layer 5 - ml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::data::{dataset::QgDataset, loader::JsonExampleLoader};
use crate::domain::{qg_example::QgExample, style::QuestionStyle, traits::ExampleSource};
use crate::infra::{
    checkpoint::CheckpointManager,
    style_tokenizer::StyleTokenizer,
    tokenizer_store::TokenizerStore,
};
use crate::ml::model::StyleQgConfig;
use crate::ml::trainer::{run_training, TrainSummary};

// ─── Training Configuration ──────────────────────────────────────────────────
// Every setting of a run. Saved as train_config.json next to the
// checkpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_dir:              String,
    pub checkpoint_dir:        String,
    pub max_source_len:        usize,
    pub max_target_len:        usize,
    pub batch_size:            usize,
    pub epochs:                usize,
    pub lr:                    f64,
    pub weight_decay:          f64,
    pub grad_clip:             f64,
    pub lr_factor:             f64,
    pub lr_patience:           usize,
    pub min_lr:                f64,
    pub d_model:               usize,
    pub num_heads:             usize,
    pub num_encoder_layers:    usize,
    pub num_decoder_layers:    usize,
    pub d_ff:                  usize,
    pub style_emb_size:        usize,
    pub dropout:               f64,
    /// Cap on the base word vocabulary (style tokens come on top).
    pub vocab_size:            usize,
    pub freeze_encoder_layers: usize,
    pub save_every:            usize,
    pub resume:                bool,
    pub seed:                  u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:              "data".to_string(),
            checkpoint_dir:        "checkpoints".to_string(),
            max_source_len:        128,
            max_target_len:        64,
            batch_size:            16,
            epochs:                10,
            lr:                    3e-4,
            weight_decay:          1e-3,
            grad_clip:             1.0,
            lr_factor:             0.5,
            lr_patience:           1,
            min_lr:                1e-6,
            d_model:               256,
            num_heads:             8,
            num_encoder_layers:    4,
            num_decoder_layers:    4,
            d_ff:                  1024,
            style_emb_size:        32,
            dropout:               0.1,
            vocab_size:            16000,
            freeze_encoder_layers: 0,
            save_every:            1,
            resume:                false,
            seed:                  42,
        }
    }
}

impl TrainConfig {
    /// Architecture for a tokenizer whose ids (style tokens included)
    /// span `vocab_size` rows.
    pub fn model_config(&self, tokenizer: &StyleTokenizer) -> StyleQgConfig {
        StyleQgConfig::new(tokenizer.vocab_size())
            .with_d_model(self.d_model)
            .with_num_heads(self.num_heads)
            .with_num_encoder_layers(self.num_encoder_layers)
            .with_num_decoder_layers(self.num_decoder_layers)
            .with_d_ff(self.d_ff)
            .with_max_source_len(self.max_source_len)
            .with_max_target_len(self.max_target_len)
            .with_style_emb_size(self.style_emb_size)
            .with_dropout(self.dropout)
            .with_pad_token_id(tokenizer.pad_id())
            .with_decoder_start_token_id(tokenizer.decoder_start_id())
    }

    /// Settings that change tensor shapes and differ from `saved`.
    /// Weights from a run with any of these cannot be resumed.
    pub fn architecture_changes(&self, saved: &TrainConfig) -> Vec<&'static str> {
        let fields = [
            ("max_source_len",     self.max_source_len     != saved.max_source_len),
            ("max_target_len",     self.max_target_len     != saved.max_target_len),
            ("d_model",            self.d_model            != saved.d_model),
            ("num_heads",          self.num_heads          != saved.num_heads),
            ("num_encoder_layers", self.num_encoder_layers != saved.num_encoder_layers),
            ("num_decoder_layers", self.num_decoder_layers != saved.num_decoder_layers),
            ("d_ff",               self.d_ff               != saved.d_ff),
            ("style_emb_size",     self.style_emb_size     != saved.style_emb_size),
        ];
        fields.into_iter().filter(|(_, changed)| *changed).map(|(name, _)| name).collect()
    }
}

pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<TrainSummary> {
        let cfg = &self.config;
        let data_dir = Path::new(&cfg.data_dir);

        // ── Step 1: Load formatted splits ─────────────────────────────────────
        tracing::info!("Loading datasets from '{}'", cfg.data_dir);
        let train_examples = JsonExampleLoader::new(data_dir.join("train_dataset.json")).load_all()?;
        let val_examples   = JsonExampleLoader::new(data_dir.join("val_dataset.json")).load_all()?;
        anyhow::ensure!(!train_examples.is_empty(), "Training set is empty");

        // ── Step 2 + 3: Tokenizer with style tokens ───────────────────────────
        let tok_store = TokenizerStore::new(&cfg.checkpoint_dir);
        let corpus    = tokenizer_corpus(&train_examples);
        let tokenizer = StyleTokenizer::new(tok_store.load_or_build(&corpus, cfg.vocab_size)?)?;
        tok_store.save(tokenizer.inner())?;
        tracing::info!(
            "Tokenizer ready: {} base tokens, {} total (style ids SAQ={}, JSQ={})",
            tokenizer.base_vocab_size(),
            tokenizer.vocab_size(),
            tokenizer.style_token_id(QuestionStyle::ShortAnswer),
            tokenizer.style_token_id(QuestionStyle::JumbledSentence),
        );

        // ── Step 4: Model config ──────────────────────────────────────────────
        let model_cfg = cfg.model_config(&tokenizer);
        model_cfg.validate()?;

        // ── Step 5: Datasets ──────────────────────────────────────────────────
        let train_dataset = QgDataset::from_examples(&train_examples, &tokenizer, cfg.max_source_len, cfg.max_target_len)?;
        let val_dataset   = QgDataset::from_examples(&val_examples, &tokenizer, cfg.max_source_len, cfg.max_target_len)?;
        tracing::info!(
            "Split: {} train, {} validation",
            train_dataset.sample_count(),
            val_dataset.sample_count()
        );

        // ── Step 6: Save configs for inference ────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir);
        if cfg.resume && ckpt_manager.has_checkpoint() {
            let saved = ckpt_manager.load_config()?;
            let changed = cfg.architecture_changes(&saved);
            anyhow::ensure!(
                changed.is_empty(),
                "Cannot resume from '{}': {} differ from the saved train_config.json",
                cfg.checkpoint_dir,
                changed.join(", "),
            );
        }
        ckpt_manager.save_config(cfg)?;
        ckpt_manager.save_model_config(&model_cfg)?;

        // ── Step 7: Train ─────────────────────────────────────────────────────
        run_training(cfg, &model_cfg, train_dataset, val_dataset, &ckpt_manager)
    }
}

/// Passages (tags stripped) and questions: the text the base
/// vocabulary is built from.
fn tokenizer_corpus(examples: &[QgExample]) -> Vec<String> {
    examples
        .iter()
        .flat_map(|ex| [ex.passage().to_string(), ex.output.clone()])
        .collect()
}
