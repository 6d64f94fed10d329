// ============================================================
// Layer 4 — Example Loader
// ============================================================
// Two JSON shapes are understood:
//
//   raw:        [{ "task": "SAQ", "input": "Generate a SAQ: ...", "output": "..." }]
//   formatted:  [{ "input": "[SAQ] ...", "output": "...", "style_id": 0 }]
//
// `convert_raw` turns the first into the second: the leading
// instruction is replaced by the style tag and the style id is
// recorded. Records with an unknown task are skipped with a
// warning; a formatted record with an out-of-range style id is
// an error naming the offending record.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};

use crate::data::preprocessor::Preprocessor;
use crate::domain::qg_example::QgExample;
use crate::domain::style::QuestionStyle;
use crate::domain::traits::ExampleSource;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub task:   String,
    pub input:  String,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedRecord {
    pub input:    String,
    pub output:   String,
    pub style_id: i64,
}

impl From<&QgExample> for FormattedRecord {
    fn from(ex: &QgExample) -> Self {
        Self {
            input:    ex.input.clone(),
            output:   ex.output.clone(),
            style_id: ex.style.id() as i64,
        }
    }
}

/// Reads a formatted dataset file (JSON array of `FormattedRecord`).
pub struct JsonExampleLoader {
    path: PathBuf,
}

impl JsonExampleLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ExampleSource for JsonExampleLoader {
    fn load_all(&self) -> Result<Vec<QgExample>> {
        let records: Vec<FormattedRecord> = read_json(&self.path)?;

        let examples = records
            .into_iter()
            .enumerate()
            .map(|(i, rec)| {
                let style = QuestionStyle::from_id(rec.style_id)
                    .with_context(|| format!("Record {} in '{}'", i, self.path.display()))?;
                Ok(QgExample::new(rec.input, rec.output, style))
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::info!("Loaded {} examples from '{}'", examples.len(), self.path.display());
        Ok(examples)
    }
}

/// Convert raw task records into tagged examples.
pub fn convert_raw(records: Vec<RawRecord>, preprocessor: &Preprocessor) -> Vec<QgExample> {
    let mut examples = Vec::with_capacity(records.len());
    let mut skipped = 0usize;

    for rec in records {
        let style = match rec.task.parse::<QuestionStyle>() {
            Ok(style) => style,
            Err(_) => {
                tracing::warn!("Skipping record with unknown task '{}'", rec.task);
                skipped += 1;
                continue;
            }
        };
        let passage = preprocessor.clean(strip_instruction(&rec.input, style));
        let question = preprocessor.clean(&rec.output);
        examples.push(QgExample::new(style.tagged(&passage), question, style));
    }

    tracing::info!("Converted {} records ({} skipped)", examples.len(), skipped);
    examples
}

/// Drop a leading "Generate a SAQ:" style instruction, if present.
fn strip_instruction(input: &str, style: QuestionStyle) -> &str {
    let prefix = format!("Generate a {}:", style.code());
    let trimmed = input.trim_start();
    match trimmed.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(&prefix) => trimmed[prefix.len()..].trim_start(),
        _ => trimmed,
    }
}

pub fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Invalid JSON in '{}'", path.display()))
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create '{}'", parent.display()))?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?)
        .with_context(|| format!("Cannot write '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(task: &str, input: &str, output: &str) -> RawRecord {
        RawRecord { task: task.into(), input: input.into(), output: output.into() }
    }

    #[test]
    fn test_convert_replaces_instruction_with_tag() {
        let examples = convert_raw(
            vec![
                raw("SAQ", "Generate a SAQ: We watch movies together.", "What do we watch?"),
                raw("JSQ", "generate a jsq:  Tom has a red ball.", "ball / red / Tom / a / has"),
            ],
            &Preprocessor::new(),
        );
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0].input, "[SAQ] We watch movies together.");
        assert_eq!(examples[0].style, QuestionStyle::ShortAnswer);
        assert_eq!(examples[1].input, "[JSQ] Tom has a red ball.");
        assert_eq!(examples[1].style.id(), 1);
    }

    #[test]
    fn test_unknown_task_is_skipped() {
        let examples = convert_raw(
            vec![
                raw("MCQ", "Generate a MCQ: x", "y"),
                raw("SAQ", "No instruction here.", "Why?"),
            ],
            &Preprocessor::new(),
        );
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].input, "[SAQ] No instruction here.");
    }

    #[test]
    fn test_loader_reads_formatted_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train_dataset.json");
        let records = vec![FormattedRecord {
            input:    "[JSQ] We watch movies.".into(),
            output:   "movies / We / watch".into(),
            style_id: 1,
        }];
        write_json(&path, &records).unwrap();

        let examples = JsonExampleLoader::new(&path).load_all().unwrap();
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].style, QuestionStyle::JumbledSentence);
        assert_eq!(FormattedRecord::from(&examples[0]), records[0]);
    }

    #[test]
    fn test_loader_rejects_bad_style_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"[{"input":"[SAQ] a","output":"b","style_id":7}]"#).unwrap();

        let err = JsonExampleLoader::new(&path).load_all().unwrap_err();
        assert!(format!("{err:#}").contains("Record 0"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(JsonExampleLoader::new("/nonexistent/data.json").load_all().is_err());
    }
}
