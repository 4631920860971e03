use crate::grading::{AnswerKey, Thresholds};
use std::env;
use std::fmt;

const DEFAULT_CYCLE_SIZES: [usize; 3] = [9, 6, 3];
const DEFAULT_JUNIOR_LABEL: &str = "Mirim";

/// Spreadsheet column names the dataset reader looks up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub participant: String,
    pub question: String,
    pub selected_answer: String,
    pub key_answer: String,
    pub category: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            participant: "ID_Participante".to_string(),
            question: "ID_Questão".to_string(),
            selected_answer: "Alternativa".to_string(),
            key_answer: "Resposta".to_string(),
            category: "Categoria".to_string(),
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Rewrites every participant's category once the table is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryOverride {
    pub column: String,
    pub label: String,
}

/// Raw, unvalidated settings as read from the environment and command line.
#[derive(Debug, Clone)]
pub struct GradingSettings {
    pub log_level: String,
    pub cycle_sizes: Vec<usize>,
    pub answer_key: Option<String>,
    pub total_minimum: usize,
    pub cycle_minimums: Option<Vec<usize>>,
    pub junior_category: bool,
    pub junior_label: String,
    pub columns: ColumnMapping,
}

impl Default for GradingSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            cycle_sizes: DEFAULT_CYCLE_SIZES.to_vec(),
            answer_key: None,
            total_minimum: 0,
            cycle_minimums: None,
            junior_category: false,
            junior_label: DEFAULT_JUNIOR_LABEL.to_string(),
            columns: ColumnMapping::default(),
        }
    }
}

impl GradingSettings {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let log_level = env::var("GRADER_LOG_LEVEL").unwrap_or(defaults.log_level);

        let cycle_sizes = match env::var("GRADER_CYCLE_SIZES") {
            Ok(raw) => parse_list("GRADER_CYCLE_SIZES", &raw)?,
            Err(_) => defaults.cycle_sizes,
        };

        let answer_key = env::var("GRADER_ANSWER_KEY")
            .ok()
            .filter(|value| !value.trim().is_empty());

        let total_minimum = match env::var("GRADER_TOTAL_MINIMUM") {
            Ok(raw) => parse_count("GRADER_TOTAL_MINIMUM", &raw)?,
            Err(_) => defaults.total_minimum,
        };

        let cycle_minimums = env::var("GRADER_CYCLE_MINIMUMS")
            .ok()
            .map(|raw| parse_list("GRADER_CYCLE_MINIMUMS", &raw))
            .transpose()?;

        let junior_category = match env::var("GRADER_JUNIOR_CATEGORY") {
            Ok(raw) => parse_flag("GRADER_JUNIOR_CATEGORY", &raw)?,
            Err(_) => defaults.junior_category,
        };

        let junior_label = env::var("GRADER_JUNIOR_LABEL").unwrap_or(defaults.junior_label);

        let mut columns = defaults.columns;
        if let Ok(value) = env::var("GRADER_COLUMN_PARTICIPANT") {
            columns.participant = value;
        }
        if let Ok(value) = env::var("GRADER_COLUMN_QUESTION") {
            columns.question = value;
        }
        if let Ok(value) = env::var("GRADER_COLUMN_SELECTED") {
            columns.selected_answer = value;
        }
        if let Ok(value) = env::var("GRADER_COLUMN_KEY") {
            columns.key_answer = value;
        }
        if let Ok(value) = env::var("GRADER_COLUMN_CATEGORY") {
            columns.category = value;
        }

        Ok(Self {
            log_level,
            cycle_sizes,
            answer_key,
            total_minimum,
            cycle_minimums,
            junior_category,
            junior_label,
            columns,
        })
    }
}

/// Validated, immutable configuration handed to every grading stage.
#[derive(Debug, Clone)]
pub struct GradingConfig {
    pub telemetry: TelemetryConfig,
    pub answer_key: AnswerKey,
    pub cycle_sizes: Vec<usize>,
    pub thresholds: Thresholds,
    pub category: Option<CategoryOverride>,
    pub columns: ColumnMapping,
}

impl GradingConfig {
    pub fn new(settings: GradingSettings) -> Result<Self, ConfigError> {
        let GradingSettings {
            log_level,
            cycle_sizes,
            answer_key,
            total_minimum,
            cycle_minimums,
            junior_category,
            junior_label,
            columns,
        } = settings;

        if cycle_sizes.is_empty() {
            return Err(ConfigError::NoCycles);
        }
        if let Some(position) = cycle_sizes.iter().position(|size| *size == 0) {
            return Err(ConfigError::EmptyCycle {
                cycle: position + 1,
            });
        }

        let question_count: usize = cycle_sizes.iter().sum();
        let raw_key = answer_key.ok_or(ConfigError::MissingAnswerKey)?;
        let answer_key = AnswerKey::parse(&raw_key, question_count)?;

        let thresholds = Thresholds {
            total_minimum,
            cycle_minimums: cycle_minimums.unwrap_or_else(|| vec![0; cycle_sizes.len()]),
        };
        thresholds.validate(&cycle_sizes)?;

        let category = junior_category.then(|| CategoryOverride {
            column: columns.category.clone(),
            label: junior_label,
        });

        Ok(Self {
            telemetry: TelemetryConfig { log_level },
            answer_key,
            cycle_sizes,
            thresholds,
            category,
            columns,
        })
    }

    /// Total number of questions, N.
    pub fn question_count(&self) -> usize {
        self.cycle_sizes.iter().sum()
    }
}

/// Parses a comma separated list of counts such as `9,6,3`.
pub fn parse_list(variable: &'static str, raw: &str) -> Result<Vec<usize>, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    trimmed
        .split(',')
        .map(|item| {
            item.trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidList {
                    variable,
                    value: raw.to_string(),
                })
        })
        .collect()
}

fn parse_count(variable: &'static str, raw: &str) -> Result<usize, ConfigError> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| ConfigError::InvalidNumber {
            variable,
            value: raw.to_string(),
        })
}

/// Accepts the yes/no spellings operators actually type, Portuguese included.
pub fn parse_flag(variable: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "s" | "sim" => Ok(true),
        "" | "0" | "false" | "no" | "n" | "nao" | "não" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            variable,
            value: raw.to_string(),
        }),
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    InvalidNumber {
        variable: &'static str,
        value: String,
    },
    InvalidList {
        variable: &'static str,
        value: String,
    },
    InvalidFlag {
        variable: &'static str,
        value: String,
    },
    NoCycles,
    EmptyCycle {
        cycle: usize,
    },
    MissingAnswerKey,
    AnswerKeyLength {
        expected: usize,
        found: usize,
    },
    BlankAnswer {
        position: usize,
    },
    TotalMinimumTooHigh {
        minimum: usize,
        question_count: usize,
    },
    CycleMinimumCount {
        expected: usize,
        found: usize,
    },
    CycleMinimumTooHigh {
        cycle: usize,
        minimum: usize,
        size: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidNumber { variable, value } => {
                write!(f, "{variable} must be a non-negative integer (got '{value}')")
            }
            ConfigError::InvalidList { variable, value } => write!(
                f,
                "{variable} must be a comma separated list of non-negative integers (got '{value}')"
            ),
            ConfigError::InvalidFlag { variable, value } => {
                write!(f, "{variable} must be a yes/no flag (got '{value}')")
            }
            ConfigError::NoCycles => write!(f, "at least one question cycle is required"),
            ConfigError::EmptyCycle { cycle } => {
                write!(f, "cycle {cycle} must contain at least one question")
            }
            ConfigError::MissingAnswerKey => write!(f, "an answer key is required"),
            ConfigError::AnswerKeyLength { expected, found } => write!(
                f,
                "answer key must have {expected} answers, one per question (got {found})"
            ),
            ConfigError::BlankAnswer { position } => {
                write!(f, "answer key entry for Q{position} is blank")
            }
            ConfigError::TotalMinimumTooHigh {
                minimum,
                question_count,
            } => write!(
                f,
                "total minimum {minimum} cannot exceed the question count {question_count}"
            ),
            ConfigError::CycleMinimumCount { expected, found } => write!(
                f,
                "expected {expected} cycle minimums, one per cycle (got {found})"
            ),
            ConfigError::CycleMinimumTooHigh {
                cycle,
                minimum,
                size,
            } => write!(
                f,
                "minimum {minimum} for cycle {cycle} cannot exceed its {size} questions"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
