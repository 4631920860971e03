use crate::commands::{run_check, run_grade};
use clap::{Args, Parser, Subcommand, ValueEnum};
use exam_grading::config::{parse_list, GradingSettings};
use exam_grading::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "exam-grader",
    about = "Grade multiple-choice exam sheets and list the qualified participants",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile the answer key, grade every participant and write the result tables
    Grade(GradeArgs),
    /// Compare the declared answer key with the sheet without grading or writing files
    Check(CheckArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct KeyArgs {
    /// Declared answer key, one letter per question (e.g. ABDCB...)
    #[arg(long)]
    pub(crate) answer_key: Option<String>,
    /// Questions per cycle, comma separated (default 9,6,3)
    #[arg(long)]
    pub(crate) cycle_sizes: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct GradeArgs {
    /// CSV export of the exam responses
    pub(crate) file: PathBuf,
    #[command(flatten)]
    pub(crate) key: KeyArgs,
    /// Minimum correct answers overall to qualify
    #[arg(long)]
    pub(crate) total_minimum: Option<usize>,
    /// Minimum correct answers per cycle, comma separated
    #[arg(long)]
    pub(crate) cycle_minimums: Option<String>,
    /// Treat the sheet as the junior category and relabel every participant
    #[arg(long)]
    pub(crate) junior: bool,
    /// How to handle answer key discrepancies
    #[arg(long, value_enum, default_value_t = DiscrepancyPolicy::Prompt)]
    pub(crate) on_discrepancy: DiscrepancyPolicy,
    /// Classified table destination (defaults to <file>_classificados.csv)
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Grade table destination (defaults to <file>_notas.csv)
    #[arg(long)]
    pub(crate) grades: Option<PathBuf>,
    /// Also write the full report as JSON
    #[arg(long)]
    pub(crate) json: Option<PathBuf>,
    /// Print one line per participant
    #[arg(long)]
    pub(crate) list: bool,
}

#[derive(Args, Debug)]
pub(crate) struct CheckArgs {
    /// CSV export of the exam responses
    pub(crate) file: PathBuf,
    #[command(flatten)]
    pub(crate) key: KeyArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum DiscrepancyPolicy {
    /// Ask on the terminal for every discrepancy
    Prompt,
    /// Overwrite the recorded key with the declared one
    Patch,
    /// Stop at the first discrepancy
    Abort,
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Grade(args) => {
            let settings = grade_settings(GradingSettings::load()?, &args)?;
            run_grade(args, settings)
        }
        Command::Check(args) => {
            let settings = key_settings(GradingSettings::load()?, &args.key)?;
            run_check(args, settings)
        }
    }
}

fn key_settings(
    mut settings: GradingSettings,
    args: &KeyArgs,
) -> Result<GradingSettings, AppError> {
    if let Some(key) = &args.answer_key {
        settings.answer_key = Some(key.clone());
    }
    if let Some(raw) = &args.cycle_sizes {
        settings.cycle_sizes = parse_list("--cycle-sizes", raw)?;
    }
    Ok(settings)
}

fn grade_settings(
    settings: GradingSettings,
    args: &GradeArgs,
) -> Result<GradingSettings, AppError> {
    let mut settings = key_settings(settings, &args.key)?;
    if let Some(minimum) = args.total_minimum {
        settings.total_minimum = minimum;
    }
    if let Some(raw) = &args.cycle_minimums {
        settings.cycle_minimums = Some(parse_list("--cycle-minimums", raw)?);
    }
    if args.junior {
        settings.junior_category = true;
    }
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn grade_flags_override_environment_settings() {
        let cli = Cli::try_parse_from([
            "exam-grader",
            "grade",
            "results.csv",
            "--answer-key",
            "abc",
            "--cycle-sizes",
            "2,1",
            "--total-minimum",
            "2",
            "--cycle-minimums",
            "1,1",
            "--junior",
            "--on-discrepancy",
            "abort",
        ])
        .expect("arguments parse");

        let Command::Grade(args) = cli.command else {
            panic!("expected grade command");
        };
        assert_eq!(args.on_discrepancy, DiscrepancyPolicy::Abort);

        let settings = grade_settings(GradingSettings::default(), &args).expect("settings merge");
        assert_eq!(settings.answer_key.as_deref(), Some("abc"));
        assert_eq!(settings.cycle_sizes, vec![2, 1]);
        assert_eq!(settings.total_minimum, 2);
        assert_eq!(settings.cycle_minimums, Some(vec![1, 1]));
        assert!(settings.junior_category);
    }

    #[test]
    fn malformed_lists_are_configuration_errors() {
        let args = KeyArgs {
            answer_key: None,
            cycle_sizes: Some("9,six".to_string()),
        };
        let error = key_settings(GradingSettings::default(), &args).expect_err("bad list");
        assert!(matches!(error, AppError::Config(_)));
    }
}
