// ============================================================
// Layer 3 — QuestionStyle Domain Type
// ============================================================
// The two question styles the generator can produce:
//
//   SAQ — short-answer question  ("What do we watch together?")
//   JSQ — jumbled-sentence question ("together / movies / We / watch")
//
// Each style has a fixed integer id (used to index the style
// embedding table) and a control tag that is prepended to the
// passage before tokenisation.
//
// Parsing is strict: anything other than SAQ / JSQ (or 0 / 1)
// is rejected at the boundary instead of falling back to a default.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::QgError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionStyle {
    /// `[SAQ]`, style id 0
    ShortAnswer,
    /// `[JSQ]`, style id 1
    JumbledSentence,
}

impl QuestionStyle {
    pub const ALL: [QuestionStyle; 2] = [QuestionStyle::ShortAnswer, QuestionStyle::JumbledSentence];

    /// Row of the style embedding table.
    pub fn id(self) -> usize {
        match self {
            QuestionStyle::ShortAnswer     => 0,
            QuestionStyle::JumbledSentence => 1,
        }
    }

    pub fn from_id(id: i64) -> Result<Self, QgError> {
        match id {
            0 => Ok(QuestionStyle::ShortAnswer),
            1 => Ok(QuestionStyle::JumbledSentence),
            other => Err(QgError::UnknownStyleId(other)),
        }
    }

    /// Short task name used in datasets and on the command line.
    pub fn code(self) -> &'static str {
        match self {
            QuestionStyle::ShortAnswer     => "SAQ",
            QuestionStyle::JumbledSentence => "JSQ",
        }
    }

    /// Control token prepended to the encoder input.
    pub fn tag(self) -> &'static str {
        match self {
            QuestionStyle::ShortAnswer     => "[SAQ]",
            QuestionStyle::JumbledSentence => "[JSQ]",
        }
    }

    /// Build the tagged encoder input: "[SAQ] We watch movies together."
    pub fn tagged(self, passage: &str) -> String {
        format!("{} {}", self.tag(), passage)
    }
}

impl fmt::Display for QuestionStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for QuestionStyle {
    type Err = QgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SAQ" | "0" => Ok(QuestionStyle::ShortAnswer),
            "JSQ" | "1" => Ok(QuestionStyle::JumbledSentence),
            _ => Err(QgError::InvalidStyle(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_codes_case_insensitive() {
        assert_eq!("saq".parse::<QuestionStyle>(), Ok(QuestionStyle::ShortAnswer));
        assert_eq!(" JSQ ".parse::<QuestionStyle>(), Ok(QuestionStyle::JumbledSentence));
        assert_eq!("1".parse::<QuestionStyle>(), Ok(QuestionStyle::JumbledSentence));
    }

    #[test]
    fn test_rejects_unknown_style() {
        assert_eq!(
            "MCQ".parse::<QuestionStyle>(),
            Err(QgError::InvalidStyle("MCQ".to_string()))
        );
        assert_eq!(QuestionStyle::from_id(2), Err(QgError::UnknownStyleId(2)));
    }

    #[test]
    fn test_ids_and_tags() {
        assert_eq!(QuestionStyle::ShortAnswer.id(), 0);
        assert_eq!(QuestionStyle::JumbledSentence.id(), 1);
        assert_eq!(
            QuestionStyle::ShortAnswer.tagged("We watch movies together."),
            "[SAQ] We watch movies together."
        );
    }
}
