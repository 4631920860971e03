use super::classification::Thresholds;
use super::domain::{ParticipantAggregate, QuestionId};
use super::reconcile::Discrepancy;
use crate::config::CategoryOverride;
use serde::Serialize;
use tracing::info;

/// Classified participant table ready for export.
#[derive(Debug, Clone, Serialize)]
pub struct GradingReport {
    pub participant_column: String,
    pub detail_columns: Vec<String>,
    pub cycle_sizes: Vec<usize>,
    pub thresholds: Thresholds,
    /// Sorted by total correct, best first.
    pub participants: Vec<ParticipantAggregate>,
    pub patched_questions: Vec<QuestionId>,
    /// Discrepancies overridden with the declared key, in question order.
    pub patches: Vec<Discrepancy>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub number: usize,
    pub size: usize,
    pub minimum: usize,
    pub met_minimum: usize,
    pub best: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradingSummary {
    pub participants: usize,
    pub qualified: usize,
    pub total_minimum: usize,
    pub top_score: Option<usize>,
    pub cycles: Vec<CycleSummary>,
    pub patched_questions: usize,
}

impl GradingReport {
    pub fn qualified(&self) -> impl Iterator<Item = &ParticipantAggregate> {
        self.participants
            .iter()
            .filter(|participant| participant.qualified)
    }

    pub fn summary(&self) -> GradingSummary {
        let cycles = self
            .cycle_sizes
            .iter()
            .enumerate()
            .map(|(index, size)| {
                let minimum = self
                    .thresholds
                    .cycle_minimums
                    .get(index)
                    .copied()
                    .unwrap_or(0);
                let counts = self.participants.iter().map(|participant| {
                    participant.cycle_correct.get(index).copied().unwrap_or(0)
                });
                CycleSummary {
                    number: index + 1,
                    size: *size,
                    minimum,
                    met_minimum: counts.clone().filter(|count| *count >= minimum).count(),
                    best: counts.max().unwrap_or(0),
                }
            })
            .collect();

        GradingSummary {
            participants: self.participants.len(),
            qualified: self.qualified().count(),
            total_minimum: self.thresholds.total_minimum,
            top_score: self
                .participants
                .iter()
                .map(|participant| participant.total_correct)
                .max(),
            cycles,
            patched_questions: self.patched_questions.len(),
        }
    }
}

/// Overwrites the category cell of every participant with a fixed label,
/// adding the column when the sheet did not carry one.
pub fn apply_category_override(report: &mut GradingReport, category: &CategoryOverride) {
    let column = match report
        .detail_columns
        .iter()
        .position(|name| name == &category.column)
    {
        Some(column) => column,
        None => {
            report.detail_columns.push(category.column.clone());
            report.detail_columns.len() - 1
        }
    };

    for participant in &mut report.participants {
        if participant.details.len() <= column {
            participant.details.resize(column + 1, String::new());
        }
        participant.details[column] = category.label.clone();
    }

    info!(
        column = %category.column,
        label = %category.label,
        participants = report.participants.len(),
        "category override applied"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::domain::ParticipantId;

    fn participant(
        id: &str,
        details: &[&str],
        cycles: &[usize],
        qualified: bool,
    ) -> ParticipantAggregate {
        let mut aggregate = ParticipantAggregate::new(
            ParticipantId::parse(id),
            details.iter().map(|value| value.to_string()).collect(),
            cycles.len(),
        );
        aggregate.cycle_correct = cycles.to_vec();
        aggregate.total_correct = cycles.iter().sum();
        aggregate.qualified = qualified;
        aggregate
    }

    fn report() -> GradingReport {
        GradingReport {
            participant_column: "ID_Participante".to_string(),
            detail_columns: vec!["Nome".to_string(), "Categoria".to_string()],
            cycle_sizes: vec![2, 1],
            thresholds: Thresholds {
                total_minimum: 2,
                cycle_minimums: vec![1, 1],
            },
            participants: vec![
                participant("1", &["Ana", "Regular"], &[2, 1], true),
                participant("2", &["Bruno", "Aberta"], &[1, 0], false),
            ],
            patched_questions: vec![QuestionId::parse("3")],
            patches: Vec::new(),
        }
    }

    #[test]
    fn summary_counts_qualified_and_cycle_passes() {
        let summary = report().summary();

        assert_eq!(summary.participants, 2);
        assert_eq!(summary.qualified, 1);
        assert_eq!(summary.top_score, Some(3));
        assert_eq!(summary.patched_questions, 1);
        assert_eq!(
            summary.cycles,
            vec![
                CycleSummary {
                    number: 1,
                    size: 2,
                    minimum: 1,
                    met_minimum: 2,
                    best: 2,
                },
                CycleSummary {
                    number: 2,
                    size: 1,
                    minimum: 1,
                    met_minimum: 1,
                    best: 1,
                },
            ]
        );
    }

    #[test]
    fn category_override_rewrites_existing_column() {
        let mut report = report();
        let category = CategoryOverride {
            column: "Categoria".to_string(),
            label: "Mirim".to_string(),
        };

        apply_category_override(&mut report, &category);

        assert_eq!(report.detail_columns.len(), 2);
        assert!(report
            .participants
            .iter()
            .all(|participant| participant.details[1] == "Mirim"));
        assert_eq!(report.participants[0].details[0], "Ana");
    }

    #[test]
    fn category_override_adds_missing_column() {
        let mut report = report();
        let category = CategoryOverride {
            column: "Nivel".to_string(),
            label: "Mirim".to_string(),
        };

        apply_category_override(&mut report, &category);

        assert_eq!(report.detail_columns, ["Nome", "Categoria", "Nivel"]);
        assert!(report
            .participants
            .iter()
            .all(|participant| {
                participant.details.len() == 3 && participant.details[2] == "Mirim"
            }));
    }
}
