use super::classification::Classifier;
use super::cycles::{aggregate, CyclePlan};
use super::domain::GradingError;
use super::reconcile::{AnswerKeyReconciler, Discrepancy, DiscrepancyResolver, Reconciliation};
use super::report::{apply_category_override, GradingReport};
use super::scoring::score_responses;
use super::sheet::ResponseSheet;
use crate::config::GradingConfig;
use tracing::info;

#[derive(Debug, Clone)]
pub enum GradingOutcome {
    Graded(GradingReport),
    /// The resolver chose to stop; nothing was aggregated.
    Aborted(Discrepancy),
}

/// Runs reconciliation, scoring, aggregation and classification in order.
pub struct GradingPipeline<'a> {
    config: &'a GradingConfig,
}

impl<'a> GradingPipeline<'a> {
    pub fn new(config: &'a GradingConfig) -> Self {
        Self { config }
    }

    pub fn run(
        &self,
        sheet: &ResponseSheet,
        resolver: &mut dyn DiscrepancyResolver,
    ) -> Result<GradingOutcome, GradingError> {
        let order = sheet.question_order();
        info!(
            rows = sheet.rows().len(),
            questions = order.len(),
            participants = sheet.participant_count(),
            "grading response sheet"
        );

        let plan = CyclePlan::partition(&order, &self.config.cycle_sizes)?;

        let reconciled = match AnswerKeyReconciler::new(&self.config.answer_key).reconcile(
            &order,
            sheet.rows(),
            resolver,
        )? {
            Reconciliation::Reconciled(reconciled) => reconciled,
            Reconciliation::Aborted(discrepancy) => return Ok(GradingOutcome::Aborted(discrepancy)),
        };

        let scored = score_responses(reconciled.rows());
        let mut participants = aggregate(&scored, &plan)?;
        Classifier::new(self.config.thresholds.clone()).classify(&mut participants);

        let mut report = GradingReport {
            participant_column: self.config.columns.participant.clone(),
            detail_columns: sheet.detail_columns().to_vec(),
            cycle_sizes: plan.sizes(),
            thresholds: self.config.thresholds.clone(),
            participants,
            patched_questions: reconciled.patched_questions().to_vec(),
            patches: reconciled.discrepancies().to_vec(),
        };

        if let Some(category) = &self.config.category {
            apply_category_override(&mut report, category);
        }

        Ok(GradingOutcome::Graded(report))
    }
}
