// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Scores a trained checkpoint on a formatted split:
//   - mean masked cross-entropy and token accuracy over the file
//   - the first `samples` examples decoded greedily and logged next
//     to their reference question
//   - the L2 distance between the two learned style vectors; near
//     zero means the style conditioning has collapsed

use anyhow::Result;
use burn::{data::dataloader::DataLoaderBuilder, prelude::*};
use std::path::PathBuf;

use crate::data::{batcher::QgBatcher, dataset::QgDataset, loader::JsonExampleLoader};
use crate::domain::{style::QuestionStyle, traits::ExampleSource};
use crate::infra::{
    checkpoint::CheckpointManager,
    style_tokenizer::StyleTokenizer,
    tokenizer_store::TokenizerStore,
};
use crate::ml::inferencer::{InferBackend, Inferencer};
use crate::ml::trainer::evaluate_loader;

#[derive(Debug, Clone)]
pub struct EvaluateConfig {
    pub data_path:      PathBuf,
    pub checkpoint_dir: PathBuf,
    pub batch_size:     usize,
    pub samples:        usize,
    pub max_length:     usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleGeneration {
    pub input:     String,
    pub reference: String,
    pub generated: String,
}

#[derive(Debug, Clone)]
pub struct EvalReport {
    pub examples: usize,
    pub loss:     f64,
    pub accuracy: f64,
    pub style_distance: f64,
    pub samples:  Vec<SampleGeneration>,
}

pub struct EvaluateUseCase {
    config: EvaluateConfig,
}

impl EvaluateUseCase {
    pub fn new(config: EvaluateConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<EvalReport> {
        let cfg = &self.config;
        let tokenizer  = StyleTokenizer::new(TokenizerStore::new(&cfg.checkpoint_dir).load()?)?;
        let ckpt       = CheckpointManager::new(&cfg.checkpoint_dir);
        let inferencer = Inferencer::<InferBackend>::from_checkpoint(&ckpt, &tokenizer, Default::default())?;
        evaluate_with(&inferencer, &tokenizer, cfg)
    }
}

pub fn evaluate_with<B: Backend>(
    inferencer: &Inferencer<B>,
    tokenizer:  &StyleTokenizer,
    cfg:        &EvaluateConfig,
) -> Result<EvalReport> {
    anyhow::ensure!(cfg.batch_size > 0, "batch_size must be at least 1");
    let examples = JsonExampleLoader::new(&cfg.data_path).load_all()?;
    let model_cfg = inferencer.model_config();

    let dataset = QgDataset::from_examples(&examples, tokenizer, model_cfg.max_source_len, model_cfg.max_target_len)?;
    let loader = DataLoaderBuilder::new(QgBatcher::<B>::new(inferencer.device().clone()))
        .batch_size(cfg.batch_size)
        .build(dataset);
    let stats = evaluate_loader(inferencer.model(), loader.as_ref(), tokenizer.pad_id());
    tracing::info!(
        "Evaluated {} examples in {} batches: loss={:.4} token_acc={:.1}%",
        examples.len(),
        stats.batches,
        stats.loss,
        stats.accuracy * 100.0
    );

    let saq = inferencer.model().style_vector(QuestionStyle::ShortAnswer);
    let jsq = inferencer.model().style_vector(QuestionStyle::JumbledSentence);
    let style_distance = (saq - jsq).powf_scalar(2.0).sum().sqrt().into_scalar().elem::<f64>();
    tracing::info!("Style vector distance (SAQ vs JSQ): {:.4}", style_distance);

    let mut samples = Vec::new();
    for ex in examples.iter().take(cfg.samples) {
        let generated = inferencer.generate(tokenizer, ex.passage(), ex.style, cfg.max_length)?;
        tracing::info!("[{}] {} → {} (ref: {})", ex.style.code(), ex.passage(), generated.text, ex.output);
        samples.push(SampleGeneration {
            input:     ex.input.clone(),
            reference: ex.output.clone(),
            generated: generated.text,
        });
    }

    Ok(EvalReport {
        examples: examples.len(),
        loss:     stats.loss,
        accuracy: stats.accuracy,
        style_distance,
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::{write_json, FormattedRecord};
    use crate::infra::style_tokenizer::tests::test_tokenizer;
    use crate::ml::model::tests::{tiny_config, TestBackend};

    #[test]
    fn test_report_covers_file_and_samples() {
        let dir = tempfile::tempdir().unwrap();
        let data_path = dir.path().join("test_dataset.json");
        let records = vec![
            FormattedRecord { input: "[SAQ] We watch movies together.".into(), output: "What do we watch?".into(), style_id: 0 },
            FormattedRecord { input: "[JSQ] Tom has a red ball.".into(), output: "ball / red / Tom".into(), style_id: 1 },
            FormattedRecord { input: "[SAQ] Tom has a red ball.".into(), output: "What does Tom have?".into(), style_id: 0 },
        ];
        write_json(&data_path, &records).unwrap();

        let tok = test_tokenizer();
        let model_cfg = tiny_config(tok.vocab_size());
        let device = Default::default();
        let inferencer = Inferencer::<TestBackend>::new(model_cfg.init(&device), model_cfg, device);

        let cfg = EvaluateConfig {
            data_path,
            checkpoint_dir: dir.path().to_path_buf(),
            batch_size: 2,
            samples: 2,
            max_length: 10,
        };
        let report = evaluate_with(&inferencer, &tok, &cfg).unwrap();

        assert_eq!(report.examples, 3);
        assert!(report.loss.is_finite());
        assert!(report.style_distance > 0.0);
        assert_eq!(report.samples.len(), 2);
        assert_eq!(report.samples[1].reference, "ball / red / Tom");
    }
}
