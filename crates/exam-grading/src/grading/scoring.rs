use super::domain::ResponseRow;

/// A response paired with its correctness against the reconciled key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredResponse<'a> {
    pub row: &'a ResponseRow,
    pub is_correct: bool,
}

pub fn is_correct(row: &ResponseRow) -> bool {
    row.selected_answer == row.key_answer
}

pub fn score_responses(rows: &[ResponseRow]) -> Vec<ScoredResponse<'_>> {
    rows.iter()
        .map(|row| ScoredResponse {
            row,
            is_correct: is_correct(row),
        })
        .collect()
}
