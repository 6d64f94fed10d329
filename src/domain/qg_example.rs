// ============================================================
// Layer 3 — QgExample Domain Type
// ============================================================
// One supervised triple for question generation:
//   input  — tagged passage, e.g. "[JSQ] We watch movies together."
//   output — the human-authored question
//   style  — which question style the output is
//
// The style is fixed when the example is built and never changes.

use serde::{Deserialize, Serialize};

use crate::domain::style::QuestionStyle;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QgExample {
    pub input:  String,
    pub output: String,
    pub style:  QuestionStyle,
}

impl QgExample {
    pub fn new(input: impl Into<String>, output: impl Into<String>, style: QuestionStyle) -> Self {
        Self {
            input:  input.into(),
            output: output.into(),
            style,
        }
    }

    /// The passage without its leading style tag.
    pub fn passage(&self) -> &str {
        self.input
            .strip_prefix(self.style.tag())
            .unwrap_or(&self.input)
            .trim_start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passage_strips_tag() {
        let ex = QgExample::new("[SAQ] Tom has a red ball.", "What does Tom have?", QuestionStyle::ShortAnswer);
        assert_eq!(ex.passage(), "Tom has a red ball.");
    }

    #[test]
    fn test_passage_without_tag_is_unchanged() {
        let ex = QgExample::new("Tom has a red ball.", "ball / red / a", QuestionStyle::JumbledSentence);
        assert_eq!(ex.passage(), "Tom has a red ball.");
    }
}
