// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// The four subcommands: `prepare`, `train`, `evaluate`, `generate`.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::{
    evaluate_use_case::EvaluateConfig,
    generate_use_case::DEFAULT_MAX_LENGTH,
    prepare_use_case::PrepareConfig,
    train_use_case::TrainConfig,
};
use crate::data::splitter::SplitRatios;
use crate::domain::style::QuestionStyle;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert raw SAQ/JSQ records into tagged train/val/test files
    Prepare(PrepareArgs),

    /// Train the question generator on prepared data
    Train(TrainArgs),

    /// Score a checkpoint on a prepared split
    Evaluate(EvaluateArgs),

    /// Generate one question from a passage
    Generate(GenerateArgs),
}

#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// JSON array of {task, input, output} records
    #[arg(long)]
    pub raw: PathBuf,

    #[arg(long, default_value = "data")]
    pub out_dir: PathBuf,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, default_value_t = 0.7)]
    pub train_ratio: f64,

    #[arg(long, default_value_t = 0.2)]
    pub val_ratio: f64,

    #[arg(long, default_value_t = 0.1)]
    pub test_ratio: f64,
}

impl From<PrepareArgs> for PrepareConfig {
    fn from(a: PrepareArgs) -> Self {
        PrepareConfig {
            raw_path: a.raw,
            out_dir:  a.out_dir,
            ratios:   SplitRatios { train: a.train_ratio, val: a.val_ratio, test: a.test_ratio },
            seed:     a.seed,
        }
    }
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory holding train_dataset.json and val_dataset.json
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    /// Directory to save checkpoints, configs and the tokenizer
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Tokens per tagged passage, end token included
    #[arg(long, default_value_t = 128)]
    pub max_source_len: usize,

    /// Tokens per question, end token included
    #[arg(long, default_value_t = 64)]
    pub max_target_len: usize,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// Initial learning rate
    #[arg(long, default_value_t = 3e-4)]
    pub lr: f64,

    #[arg(long, default_value_t = 1e-3)]
    pub weight_decay: f64,

    /// Global gradient-norm cap; 0 disables clipping
    #[arg(long, default_value_t = 1.0)]
    pub grad_clip: f64,

    /// Multiplier applied to the lr when validation loss plateaus
    #[arg(long, default_value_t = 0.5)]
    pub lr_factor: f64,

    /// Epochs without improvement before the lr is reduced
    #[arg(long, default_value_t = 1)]
    pub lr_patience: usize,

    #[arg(long, default_value_t = 1e-6)]
    pub min_lr: f64,

    /// Hidden dimension; must be divisible by num_heads
    #[arg(long, default_value_t = 256)]
    pub d_model: usize,

    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 4)]
    pub num_encoder_layers: usize,

    #[arg(long, default_value_t = 4)]
    pub num_decoder_layers: usize,

    #[arg(long, default_value_t = 1024)]
    pub d_ff: usize,

    /// Width of the style embedding fused before the output head
    #[arg(long, default_value_t = 32)]
    pub style_emb_size: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Maximum base vocabulary (style tokens are added on top)
    #[arg(long, default_value_t = 16000)]
    pub vocab_size: usize,

    /// Keep the first N encoder blocks fixed
    #[arg(long, default_value_t = 0)]
    pub freeze_encoder_layers: usize,

    /// Save a checkpoint every N epochs (the last epoch is always saved)
    #[arg(long, default_value_t = 1)]
    pub save_every: usize,

    /// Continue from the latest checkpoint in checkpoint_dir
    #[arg(long)]
    pub resume: bool,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_dir:              a.data_dir,
            checkpoint_dir:        a.checkpoint_dir,
            max_source_len:        a.max_source_len,
            max_target_len:        a.max_target_len,
            batch_size:            a.batch_size,
            epochs:                a.epochs,
            lr:                    a.lr,
            weight_decay:          a.weight_decay,
            grad_clip:             a.grad_clip,
            lr_factor:             a.lr_factor,
            lr_patience:           a.lr_patience,
            min_lr:                a.min_lr,
            d_model:               a.d_model,
            num_heads:             a.num_heads,
            num_encoder_layers:    a.num_encoder_layers,
            num_decoder_layers:    a.num_decoder_layers,
            d_ff:                  a.d_ff,
            style_emb_size:        a.style_emb_size,
            dropout:               a.dropout,
            vocab_size:            a.vocab_size,
            freeze_encoder_layers: a.freeze_encoder_layers,
            save_every:            a.save_every,
            resume:                a.resume,
            seed:                  a.seed,
        }
    }
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// A formatted split, e.g. data/test_dataset.json
    #[arg(long)]
    pub data: PathBuf,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    /// Number of examples to decode and log
    #[arg(long, default_value_t = 5)]
    pub samples: usize,

    #[arg(long, default_value_t = DEFAULT_MAX_LENGTH)]
    pub max_length: usize,
}

impl From<EvaluateArgs> for EvaluateConfig {
    fn from(a: EvaluateArgs) -> Self {
        EvaluateConfig {
            data_path:      a.data,
            checkpoint_dir: a.checkpoint_dir,
            batch_size:     a.batch_size,
            samples:        a.samples,
            max_length:     a.max_length,
        }
    }
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// The passage to ask about
    #[arg(long)]
    pub passage: String,

    /// Question style: saq or jsq
    #[arg(long)]
    pub style: QuestionStyle,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Maximum number of generated tokens
    #[arg(long, default_value_t = DEFAULT_MAX_LENGTH)]
    pub max_length: usize,
}
