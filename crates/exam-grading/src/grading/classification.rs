use super::domain::ParticipantAggregate;
use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Minimum correct answers overall and per cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub total_minimum: usize,
    pub cycle_minimums: Vec<usize>,
}

impl Thresholds {
    /// Checks the minimums are reachable for the configured cycles.
    pub fn validate(&self, cycle_sizes: &[usize]) -> Result<(), ConfigError> {
        let question_count: usize = cycle_sizes.iter().sum();
        if self.total_minimum > question_count {
            return Err(ConfigError::TotalMinimumTooHigh {
                minimum: self.total_minimum,
                question_count,
            });
        }

        if self.cycle_minimums.len() != cycle_sizes.len() {
            return Err(ConfigError::CycleMinimumCount {
                expected: cycle_sizes.len(),
                found: self.cycle_minimums.len(),
            });
        }

        for (index, (minimum, size)) in self.cycle_minimums.iter().zip(cycle_sizes).enumerate() {
            if minimum > size {
                return Err(ConfigError::CycleMinimumTooHigh {
                    cycle: index + 1,
                    minimum: *minimum,
                    size: *size,
                });
            }
        }

        Ok(())
    }
}

/// Unmet minimum recorded against a disqualified participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shortfall {
    TotalBelowMinimum {
        required: usize,
        actual: usize,
    },
    CycleBelowMinimum {
        cycle: usize,
        required: usize,
        actual: usize,
    },
}

impl Shortfall {
    pub fn summary(&self) -> String {
        match self {
            Shortfall::TotalBelowMinimum { required, actual } => {
                format!("total {actual} below minimum {required}")
            }
            Shortfall::CycleBelowMinimum {
                cycle,
                required,
                actual,
            } => format!("cycle {cycle}: {actual} below minimum {required}"),
        }
    }
}

/// Qualifies a participant only when the total and every cycle minimum are met.
pub struct Classifier {
    thresholds: Thresholds,
}

impl Classifier {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn shortfalls(&self, participant: &ParticipantAggregate) -> Vec<Shortfall> {
        let mut shortfalls = Vec::new();

        if participant.total_correct < self.thresholds.total_minimum {
            shortfalls.push(Shortfall::TotalBelowMinimum {
                required: self.thresholds.total_minimum,
                actual: participant.total_correct,
            });
        }

        for (index, required) in self.thresholds.cycle_minimums.iter().enumerate() {
            let actual = participant.cycle_correct.get(index).copied().unwrap_or(0);
            if actual < *required {
                shortfalls.push(Shortfall::CycleBelowMinimum {
                    cycle: index + 1,
                    required: *required,
                    actual,
                });
            }
        }

        shortfalls
    }

    /// Fills `qualified` and `shortfalls` for every participant; returns the qualified count.
    pub fn classify(&self, participants: &mut [ParticipantAggregate]) -> usize {
        let mut qualified = 0;
        for participant in participants.iter_mut() {
            participant.shortfalls = self.shortfalls(participant);
            participant.qualified = participant.shortfalls.is_empty();
            if participant.qualified {
                qualified += 1;
            }
        }

        info!(
            participants = participants.len(),
            qualified,
            total_minimum = self.thresholds.total_minimum,
            "participants classified"
        );
        qualified
    }
}
