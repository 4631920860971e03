use super::domain::{GradingError, ParticipantAggregate, ParticipantId, QuestionId};
use super::scoring::ScoredResponse;
use serde::Serialize;
use std::collections::HashMap;

/// Contiguous block of questions scored against its own minimum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cycle {
    /// One-based.
    pub number: usize,
    pub questions: Vec<QuestionId>,
}

impl Cycle {
    pub fn size(&self) -> usize {
        self.questions.len()
    }
}

/// Partition of the sorted question list into consecutive cycles.
#[derive(Debug, Clone)]
pub struct CyclePlan {
    cycles: Vec<Cycle>,
    index: HashMap<QuestionId, usize>,
}

impl CyclePlan {
    pub fn partition(order: &[QuestionId], sizes: &[usize]) -> Result<Self, GradingError> {
        let expected: usize = sizes.iter().sum();
        if expected != order.len() {
            return Err(GradingError::QuestionCountMismatch {
                expected,
                found: order.len(),
            });
        }

        let mut cycles = Vec::with_capacity(sizes.len());
        let mut index = HashMap::with_capacity(order.len());
        let mut remaining = order;
        for (cycle_index, size) in sizes.iter().enumerate() {
            let (questions, rest) = remaining.split_at(*size);
            for question in questions {
                index.insert(question.clone(), cycle_index);
            }
            cycles.push(Cycle {
                number: cycle_index + 1,
                questions: questions.to_vec(),
            });
            remaining = rest;
        }

        Ok(Self { cycles, index })
    }

    /// Zero-based cycle index of `question`.
    pub fn cycle_of(&self, question: &QuestionId) -> Option<usize> {
        self.index.get(question).copied()
    }

    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.cycles.iter().map(Cycle::size).collect()
    }

    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }
}

/// Tallies correct responses per participant, overall and per cycle.
///
/// Descriptive fields come from each participant's first row in `scored`.
/// Output is sorted by total correct descending, ties by participant id.
pub fn aggregate(
    scored: &[ScoredResponse<'_>],
    plan: &CyclePlan,
) -> Result<Vec<ParticipantAggregate>, GradingError> {
    let mut participants: Vec<ParticipantAggregate> = Vec::new();
    let mut slots: HashMap<&ParticipantId, usize> = HashMap::new();

    for response in scored {
        let row = response.row;
        let cycle = plan
            .cycle_of(&row.question_id)
            .ok_or_else(|| GradingError::UnknownQuestion {
                question_id: row.question_id.clone(),
            })?;

        let slot = *slots.entry(&row.participant_id).or_insert_with(|| {
            participants.push(ParticipantAggregate::new(
                row.participant_id.clone(),
                row.details.clone(),
                plan.len(),
            ));
            participants.len() - 1
        });

        if response.is_correct {
            let participant = &mut participants[slot];
            participant.total_correct += 1;
            participant.cycle_correct[cycle] += 1;
        }
    }

    participants.sort_by(|a, b| {
        b.total_correct
            .cmp(&a.total_correct)
            .then_with(|| a.participant_id.cmp(&b.participant_id))
    });

    Ok(participants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::domain::ResponseRow;
    use crate::grading::scoring::score_responses;

    fn questions(count: i64) -> Vec<QuestionId> {
        (1..=count).map(|id| QuestionId::parse(&id.to_string())).collect()
    }

    fn row(participant: &str, question: i64, selected: &str, key: &str, name: &str) -> ResponseRow {
        ResponseRow {
            participant_id: ParticipantId::parse(participant),
            question_id: QuestionId::parse(&question.to_string()),
            selected_answer: selected.to_string(),
            key_answer: key.to_string(),
            details: vec![name.to_string()],
        }
    }

    #[test]
    fn partition_covers_every_question_exactly_once() {
        let order = questions(18);
        let plan = CyclePlan::partition(&order, &[9, 6, 3]).expect("partition");

        assert_eq!(plan.sizes(), vec![9, 6, 3]);
        let flattened: Vec<QuestionId> = plan
            .cycles()
            .iter()
            .flat_map(|cycle| cycle.questions.iter().cloned())
            .collect();
        assert_eq!(flattened, order);
        assert_eq!(plan.cycle_of(&QuestionId::parse("9")), Some(0));
        assert_eq!(plan.cycle_of(&QuestionId::parse("10")), Some(1));
        assert_eq!(plan.cycle_of(&QuestionId::parse("18")), Some(2));
        assert_eq!(plan.cycle_of(&QuestionId::parse("19")), None);
    }

    #[test]
    fn partition_rejects_size_mismatch() {
        let error = CyclePlan::partition(&questions(4), &[2, 1]).expect_err("mismatch");
        assert_eq!(
            error,
            GradingError::QuestionCountMismatch {
                expected: 3,
                found: 4
            }
        );
    }

    #[test]
    fn aggregates_totals_and_cycles_for_single_participant() {
        let rows = vec![
            row("P1", 1, "a", "a", "Ana"),
            row("P1", 2, "c", "b", "Ana"),
            row("P1", 3, "c", "c", "Ana"),
        ];
        let plan = CyclePlan::partition(&questions(3), &[2, 1]).expect("partition");

        let aggregates = aggregate(&score_responses(&rows), &plan).expect("aggregate");

        assert_eq!(aggregates.len(), 1);
        assert_eq!(aggregates[0].total_correct, 2);
        assert_eq!(aggregates[0].cycle_correct, vec![1, 1]);
    }

    #[test]
    fn totals_equal_sum_of_cycles_and_sort_descending() {
        let rows = vec![
            row("2", 1, "a", "a", "Bia"),
            row("2", 2, "b", "b", "Bia"),
            row("2", 3, "x", "c", "Bia"),
            row("1", 1, "x", "a", "Caio"),
            row("1", 2, "b", "b", "Caio"),
            row("1", 3, "x", "c", "Caio"),
            row("3", 1, "a", "a", "Duda"),
            row("3", 2, "b", "b", "Duda"),
            row("3", 3, "c", "c", "Duda"),
            row("4", 1, "x", "a", "Eva"),
            row("4", 2, "x", "b", "Eva"),
            row("4", 3, "c", "c", "Eva"),
        ];
        let plan = CyclePlan::partition(&questions(3), &[2, 1]).expect("partition");

        let aggregates = aggregate(&score_responses(&rows), &plan).expect("aggregate");

        let order: Vec<String> = aggregates
            .iter()
            .map(|participant| participant.participant_id.to_string())
            .collect();
        assert_eq!(order, vec!["3", "2", "1", "4"]);
        for participant in &aggregates {
            assert_eq!(
                participant.total_correct,
                participant.cycle_correct.iter().sum::<usize>()
            );
        }
    }

    #[test]
    fn descriptive_fields_come_from_first_row() {
        let rows = vec![
            row("1", 1, "a", "a", "Ana Souza"),
            row("1", 2, "a", "b", "Ana S."),
        ];
        let plan = CyclePlan::partition(&questions(2), &[2]).expect("partition");

        let aggregates = aggregate(&score_responses(&rows), &plan).expect("aggregate");

        assert_eq!(aggregates[0].details, vec!["Ana Souza".to_string()]);
    }

    #[test]
    fn rows_outside_the_plan_are_rejected() {
        let rows = vec![row("1", 5, "a", "a", "Ana")];
        let plan = CyclePlan::partition(&questions(1), &[1]).expect("partition");

        let error = aggregate(&score_responses(&rows), &plan).expect_err("unknown question");
        assert_eq!(
            error,
            GradingError::UnknownQuestion {
                question_id: QuestionId::parse("5")
            }
        );
    }
}
