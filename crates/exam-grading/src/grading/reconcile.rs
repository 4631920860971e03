use super::domain::{AnswerKey, GradingError, QuestionId, ResponseRow};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::{info, warn};

/// A question whose recorded key disagrees with the declared key, with itself, or both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discrepancy {
    /// One-based question position in sorted order.
    pub position: usize,
    pub question_id: QuestionId,
    /// Key recorded on the first row for the question.
    pub recorded: String,
    pub declared: String,
    /// Distinct recorded keys in first-seen order.
    pub recorded_values: Vec<String>,
    pub mismatched: bool,
    pub inconsistent: bool,
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut problems = Vec::new();
        if self.mismatched {
            problems.push(format!(
                "sheet records '{}' but the declared key is '{}'",
                self.recorded, self.declared
            ));
        }
        if self.inconsistent {
            problems.push(format!(
                "sheet records inconsistent keys [{}]",
                self.recorded_values.join(", ")
            ));
        }
        write!(
            f,
            "Q{} (id {}): {}",
            self.position,
            self.question_id,
            problems.join("; ")
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Overwrite the recorded key with the declared answer for every row of the question.
    Patch,
    /// Stop the whole run without producing output.
    Abort,
}

/// Decides how each discrepancy is handled.
pub trait DiscrepancyResolver {
    fn resolve(&mut self, discrepancy: &Discrepancy) -> Resolution;
}

impl<F> DiscrepancyResolver for F
where
    F: FnMut(&Discrepancy) -> Resolution,
{
    fn resolve(&mut self, discrepancy: &Discrepancy) -> Resolution {
        self(discrepancy)
    }
}

/// Trusts the declared key everywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct PatchAll;

impl DiscrepancyResolver for PatchAll {
    fn resolve(&mut self, _discrepancy: &Discrepancy) -> Resolution {
        Resolution::Patch
    }
}

/// Refuses to grade a sheet that disagrees with the declared key.
#[derive(Debug, Default, Clone, Copy)]
pub struct AbortOnDiscrepancy;

impl DiscrepancyResolver for AbortOnDiscrepancy {
    fn resolve(&mut self, _discrepancy: &Discrepancy) -> Resolution {
        Resolution::Abort
    }
}

/// Owned copy of the response rows with every accepted patch applied.
#[derive(Debug, Clone, Default)]
pub struct ReconciledResponses {
    rows: Vec<ResponseRow>,
    patched: Vec<QuestionId>,
    discrepancies: Vec<Discrepancy>,
}

impl ReconciledResponses {
    pub fn new(rows: Vec<ResponseRow>) -> Self {
        Self {
            rows,
            patched: Vec::new(),
            discrepancies: Vec::new(),
        }
    }

    /// Sets the recorded key of every row of `question` to `answer`.
    ///
    /// Returns the number of rows touched. Patching the same question twice
    /// leaves the same state as patching it once.
    pub fn patch(&mut self, question: &QuestionId, answer: &str) -> usize {
        let mut touched = 0;
        for row in self
            .rows
            .iter_mut()
            .filter(|row| &row.question_id == question)
        {
            row.key_answer = answer.to_string();
            touched += 1;
        }

        if touched > 0 && !self.patched.contains(question) {
            self.patched.push(question.clone());
        }
        touched
    }

    pub fn rows(&self) -> &[ResponseRow] {
        &self.rows
    }

    pub fn patched_questions(&self) -> &[QuestionId] {
        &self.patched
    }

    pub fn discrepancies(&self) -> &[Discrepancy] {
        &self.discrepancies
    }
}

#[derive(Debug, Clone)]
pub enum Reconciliation {
    Reconciled(ReconciledResponses),
    Aborted(Discrepancy),
}

/// Cross-checks the declared answer key against the keys recorded in the sheet.
pub struct AnswerKeyReconciler<'a> {
    key: &'a AnswerKey,
}

impl<'a> AnswerKeyReconciler<'a> {
    pub fn new(key: &'a AnswerKey) -> Self {
        Self { key }
    }

    /// Walks the questions in `order`, reporting each discrepancy to `resolver`.
    ///
    /// `rows` is never modified; patches land on the returned copy.
    pub fn reconcile(
        &self,
        order: &[QuestionId],
        rows: &[ResponseRow],
        resolver: &mut dyn DiscrepancyResolver,
    ) -> Result<Reconciliation, GradingError> {
        if order.len() != self.key.len() {
            return Err(GradingError::QuestionCountMismatch {
                expected: self.key.len(),
                found: order.len(),
            });
        }

        let mut recorded_by_question: HashMap<&QuestionId, Vec<&str>> = HashMap::new();
        for row in rows {
            recorded_by_question
                .entry(&row.question_id)
                .or_default()
                .push(&row.key_answer);
        }

        let mut reconciled = ReconciledResponses::new(rows.to_vec());

        for (index, (question_id, declared)) in
            order.iter().zip(self.key.answers().iter()).enumerate()
        {
            let position = index + 1;
            let recorded = recorded_by_question
                .get(question_id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let Some(discrepancy) = check_question(position, question_id, declared, recorded)?
            else {
                continue;
            };

            warn!(
                position,
                question = %question_id,
                recorded = %discrepancy.recorded,
                declared = %discrepancy.declared,
                mismatched = discrepancy.mismatched,
                inconsistent = discrepancy.inconsistent,
                "answer key discrepancy"
            );

            match resolver.resolve(&discrepancy) {
                Resolution::Patch => {
                    let touched = reconciled.patch(question_id, declared);
                    info!(position, question = %question_id, rows = touched, "answer key patched");
                    reconciled.discrepancies.push(discrepancy);
                }
                Resolution::Abort => {
                    warn!(position, question = %question_id, "grading aborted on discrepancy");
                    return Ok(Reconciliation::Aborted(discrepancy));
                }
            }
        }

        Ok(Reconciliation::Reconciled(reconciled))
    }
}

fn check_question(
    position: usize,
    question_id: &QuestionId,
    declared: &str,
    recorded: &[&str],
) -> Result<Option<Discrepancy>, GradingError> {
    let Some(first) = recorded.first().copied() else {
        return Err(GradingError::QuestionWithoutResponses {
            position,
            question_id: question_id.clone(),
        });
    };

    let inconsistent = recorded.iter().any(|value| *value != first);
    let mismatched = first != declared;
    if !inconsistent && !mismatched {
        return Ok(None);
    }

    let mut recorded_values: Vec<String> = Vec::new();
    for value in recorded {
        if !recorded_values.iter().any(|seen| seen == value) {
            recorded_values.push(value.to_string());
        }
    }

    Ok(Some(Discrepancy {
        position,
        question_id: question_id.clone(),
        recorded: first.to_string(),
        declared: declared.to_string(),
        recorded_values,
        mismatched,
        inconsistent,
    }))
}
