//! Exam grading pipeline: reconcile the answer key, score each response, tally
//! correct answers per question cycle and classify every participant.
//!
//! Stages run strictly in that order and each one consumes the full output of
//! the previous stage. [`GradingPipeline`] chains them for callers that do not
//! need to inspect the intermediate values.

mod classification;
mod cycles;
mod domain;
pub mod export;
mod pipeline;
mod reconcile;
mod report;
mod scoring;
pub mod sheet;

pub use classification::{Classifier, Shortfall, Thresholds};
pub use cycles::{aggregate, Cycle, CyclePlan};
pub use domain::{
    normalize_answer, AnswerKey, GradingError, NaturalKey, ParticipantAggregate, ParticipantId,
    QuestionId, ResponseRow,
};
pub use pipeline::{GradingOutcome, GradingPipeline};
pub use reconcile::{
    AbortOnDiscrepancy, AnswerKeyReconciler, Discrepancy, DiscrepancyResolver, PatchAll,
    Reconciliation, ReconciledResponses, Resolution,
};
pub use report::{apply_category_override, CycleSummary, GradingReport, GradingSummary};
pub use scoring::{is_correct, score_responses, ScoredResponse};
pub use sheet::{DatasetError, ResponseSheet};
