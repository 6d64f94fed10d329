// ============================================================
// Layer 2 — PrepareUseCase
// ============================================================
//   Step 1: Read raw task records        (Layer 4 - data)
//   Step 2: Tag passages by style        (Layer 4 - data)
//   Step 3: Seeded train/val/test split  (Layer 4 - data)
//   Step 4: Write the three JSON files

use anyhow::Result;
use std::path::PathBuf;

use crate::data::{
    loader::{convert_raw, read_json, write_json, FormattedRecord, RawRecord},
    preprocessor::Preprocessor,
    splitter::{split_dataset, SplitRatios},
};
use crate::domain::qg_example::QgExample;

#[derive(Debug, Clone)]
pub struct PrepareConfig {
    pub raw_path: PathBuf,
    pub out_dir:  PathBuf,
    pub ratios:   SplitRatios,
    pub seed:     u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrepareSummary {
    pub train: usize,
    pub val:   usize,
    pub test:  usize,
}

pub struct PrepareUseCase {
    config: PrepareConfig,
}

impl PrepareUseCase {
    pub fn new(config: PrepareConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<PrepareSummary> {
        let cfg = &self.config;
        cfg.ratios.validate()?;

        let raw: Vec<RawRecord> = read_json(&cfg.raw_path)?;
        tracing::info!("Read {} raw records from '{}'", raw.len(), cfg.raw_path.display());

        let examples = convert_raw(raw, &Preprocessor::new());
        let split = split_dataset(examples, cfg.ratios, cfg.seed)?;

        for (name, part) in [("train", &split.train), ("val", &split.val), ("test", &split.test)] {
            let path = cfg.out_dir.join(format!("{name}_dataset.json"));
            write_json(&path, &to_records(part))?;
            tracing::info!("Wrote {} examples to '{}'", part.len(), path.display());
        }

        Ok(PrepareSummary {
            train: split.train.len(),
            val:   split.val.len(),
            test:  split.test.len(),
        })
    }
}

fn to_records(examples: &[QgExample]) -> Vec<FormattedRecord> {
    examples.iter().map(FormattedRecord::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::JsonExampleLoader;
    use crate::domain::traits::ExampleSource;

    #[test]
    fn test_prepare_writes_three_splits() {
        let dir = tempfile::tempdir().unwrap();
        let raw_path = dir.path().join("raw.json");
        let raw: Vec<RawRecord> = (0..10)
            .map(|i| RawRecord {
                task:   if i % 2 == 0 { "SAQ".into() } else { "JSQ".into() },
                input:  format!("Generate a {}: Sentence number {i}.", if i % 2 == 0 { "SAQ" } else { "JSQ" }),
                output: format!("Question {i}?"),
            })
            .chain(std::iter::once(RawRecord {
                task: "TF".into(), input: "x".into(), output: "y".into(),
            }))
            .collect();
        write_json(&raw_path, &raw).unwrap();

        let out_dir = dir.path().join("out");
        let summary = PrepareUseCase::new(PrepareConfig {
            raw_path,
            out_dir: out_dir.clone(),
            ratios:  SplitRatios::default(),
            seed:    42,
        })
        .execute()
        .unwrap();

        // the TF record is skipped: 10 usable examples
        assert_eq!(summary, PrepareSummary { train: 7, val: 2, test: 1 });

        let train = JsonExampleLoader::new(out_dir.join("train_dataset.json")).load_all().unwrap();
        assert_eq!(train.len(), 7);
        assert!(train.iter().all(|ex| ex.input.starts_with(ex.style.tag())));
        assert!(out_dir.join("test_dataset.json").exists());
    }

    #[test]
    fn test_bad_ratios_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = PrepareUseCase::new(PrepareConfig {
            raw_path: dir.path().join("raw.json"),
            out_dir:  dir.path().to_path_buf(),
            ratios:   SplitRatios { train: 0.5, val: 0.2, test: 0.1 },
            seed:     42,
        })
        .execute();
        assert!(result.is_err());
    }
}
