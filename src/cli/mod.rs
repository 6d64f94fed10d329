// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and hands off to Layer 2.
//
//   prepare  — raw records → train/val/test JSON
//   train    — trains the model and writes checkpoints
//   evaluate — loss / accuracy / sample generations
//   generate — one passage + style → one question

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, GenerateArgs, PrepareArgs, TrainArgs};

use crate::domain::traits::QuestionGenerator;

#[derive(Parser, Debug)]
#[command(
    name = "style-qg",
    version = "0.1.0",
    about = "Train a style-conditioned question generator (SAQ / JSQ) and generate questions."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// The CLI layer only routes, never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Prepare(args)  => run_prepare(args),
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
            Commands::Generate(args) => run_generate(args),
        }
    }
}

fn run_prepare(args: PrepareArgs) -> Result<()> {
    use crate::application::prepare_use_case::PrepareUseCase;

    let summary = PrepareUseCase::new(args.into()).execute()?;
    println!(
        "Prepared {} train / {} val / {} test examples.",
        summary.train, summary.val, summary.test
    );
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on data in: {}", args.data_dir);
    let summary = TrainUseCase::new(args.into()).execute()?;

    if summary.epochs_run == 0 {
        println!("Nothing to train: the checkpoint is already at the requested epoch count.");
    }
    if let Some(last) = &summary.last {
        println!(
            "Ran {} epoch(s). Last: epoch {} val_loss {:.4} val_acc {:.1}%",
            summary.epochs_run, last.epoch, last.val_loss, last.val_acc * 100.0
        );
    }
    match summary.best_epoch {
        Some(epoch) => println!(
            "Training complete. Best val_loss {:.4} at epoch {}.",
            summary.best_val_loss, epoch
        ),
        None => println!("Training complete. Checkpoint saved."),
    }
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let report = EvaluateUseCase::new(args.into()).execute()?;
    println!(
        "{} examples | loss={:.4} | token_acc={:.1}% | style_distance={:.4}",
        report.examples, report.loss, report.accuracy * 100.0, report.style_distance
    );
    for s in &report.samples {
        println!("\n{}\n  generated: {}\n  reference: {}", s.input, s.generated, s.reference);
    }
    Ok(())
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    use crate::application::generate_use_case::GenerateUseCase;

    let use_case = GenerateUseCase::new(&args.checkpoint_dir, args.max_length)?;
    let question = use_case.generate_question(&args.passage, args.style)?;
    println!("\nQuestion: {}", question);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::style::QuestionStyle;

    #[test]
    fn test_generate_args_parse_style() {
        let cli = Cli::try_parse_from([
            "style-qg", "generate", "--passage", "We watch movies together.", "--style", "JSQ",
        ])
        .unwrap();
        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.style, QuestionStyle::JumbledSentence);
                assert_eq!(args.max_length, 20);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_invalid_style_is_rejected() {
        let parsed = Cli::try_parse_from([
            "style-qg", "generate", "--passage", "x", "--style", "mcq",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_train_args_map_to_config() {
        let cli = Cli::try_parse_from(["style-qg", "train", "--epochs", "3", "--resume"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: crate::application::train_use_case::TrainConfig = args.into();
        assert_eq!(cfg.epochs, 3);
        assert!(cfg.resume);
        assert_eq!(cfg.weight_decay, 1e-3);
    }
}
