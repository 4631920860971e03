//! Scoring, answer-key reconciliation and qualification for multiple-choice exam sheets.
//!
//! The [`grading`] module holds the pipeline itself; [`config`], [`telemetry`] and
//! [`error`] carry the ambient pieces shared with the command-line front end.

pub mod config;
pub mod error;
pub mod grading;
pub mod telemetry;
