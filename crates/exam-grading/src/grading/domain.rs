use super::classification::Shortfall;
use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier ordered by its natural type: integers numerically, anything else
/// lexicographically, with every integer sorting before any text.
///
/// Whole numbers written in float form (`101.0`) count as integers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NaturalKey {
    Numeric(i64),
    Text(String),
}

impl NaturalKey {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(value) = trimmed.parse::<i64>() {
            return Self::Numeric(value);
        }
        match trimmed.parse::<f64>() {
            Ok(value) if value.fract() == 0.0 && value.abs() < 1e15 => Self::Numeric(value as i64),
            _ => Self::Text(trimmed.to_string()),
        }
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NaturalKey::Numeric(value) => write!(f, "{value}"),
            NaturalKey::Text(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub NaturalKey);

impl QuestionId {
    pub fn parse(raw: &str) -> Self {
        Self(NaturalKey::parse(raw))
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub NaturalKey);

impl ParticipantId {
    pub fn parse(raw: &str) -> Self {
        Self(NaturalKey::parse(raw))
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Answer cells and key letters compare case-insensitively.
pub fn normalize_answer(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// One participant's answer to one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseRow {
    pub participant_id: ParticipantId,
    pub question_id: QuestionId,
    pub selected_answer: String,
    pub key_answer: String,
    /// Pass-through descriptive cells, aligned with the sheet's detail columns.
    pub details: Vec<String>,
}

/// Declared correct answer per question position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerKey {
    answers: Vec<String>,
}

impl AnswerKey {
    /// Parses a key typed as one letter per question, e.g. `ABDCB`.
    pub fn parse(raw: &str, question_count: usize) -> Result<Self, ConfigError> {
        let answers: Vec<String> = raw
            .trim()
            .chars()
            .map(|letter| normalize_answer(&letter.to_string()))
            .collect();

        if answers.len() != question_count {
            return Err(ConfigError::AnswerKeyLength {
                expected: question_count,
                found: answers.len(),
            });
        }

        if let Some(position) = answers.iter().position(String::is_empty) {
            return Err(ConfigError::BlankAnswer {
                position: position + 1,
            });
        }

        Ok(Self { answers })
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// Zero-based lookup.
    pub fn answer_at(&self, position: usize) -> Option<&str> {
        self.answers.get(position).map(String::as_str)
    }

    pub fn answers(&self) -> &[String] {
        &self.answers
    }
}

/// Per-participant tally across all cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantAggregate {
    pub participant_id: ParticipantId,
    /// Descriptive cells from the participant's first row in sheet order.
    pub details: Vec<String>,
    pub total_correct: usize,
    pub cycle_correct: Vec<usize>,
    pub qualified: bool,
    pub shortfalls: Vec<Shortfall>,
}

impl ParticipantAggregate {
    pub fn new(participant_id: ParticipantId, details: Vec<String>, cycle_count: usize) -> Self {
        Self {
            participant_id,
            details,
            total_correct: 0,
            cycle_correct: vec![0; cycle_count],
            qualified: false,
            shortfalls: Vec::new(),
        }
    }

    /// Minimal export value: 1 when qualified, otherwise 0.
    pub fn grade(&self) -> u8 {
        u8::from(self.qualified)
    }
}

/// Structural problems in the response data that stop the run.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GradingError {
    #[error("Q{position} (id {question_id}) has no responses in the sheet")]
    QuestionWithoutResponses {
        position: usize,
        question_id: QuestionId,
    },
    #[error("sheet contains {found} distinct questions but {expected} are configured")]
    QuestionCountMismatch { expected: usize, found: usize },
    #[error("response for question {question_id} does not belong to any cycle")]
    UnknownQuestion { question_id: QuestionId },
}
