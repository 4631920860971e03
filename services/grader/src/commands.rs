use crate::cli::{CheckArgs, DiscrepancyPolicy, GradeArgs};
use crate::prompt::TerminalPrompt;
use crate::render::{render_configuration, render_discrepancies, render_report};
use chrono::{DateTime, Utc};
use exam_grading::config::{GradingConfig, GradingSettings, TelemetryConfig};
use exam_grading::error::AppError;
use exam_grading::grading::export::{write_grades_csv, write_report_json, write_results_csv};
use exam_grading::grading::{
    AbortOnDiscrepancy, AnswerKeyReconciler, CyclePlan, Discrepancy, DiscrepancyResolver,
    GradingOutcome, GradingPipeline, GradingReport, PatchAll, Resolution, ResponseSheet,
};
use exam_grading::telemetry;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

fn init(settings: GradingSettings) -> Result<GradingConfig, AppError> {
    telemetry::init(&TelemetryConfig {
        log_level: settings.log_level.clone(),
    })?;
    Ok(GradingConfig::new(settings)?)
}

pub(crate) fn run_grade(args: GradeArgs, settings: GradingSettings) -> Result<(), AppError> {
    let config = init(settings)?;
    render_configuration(&config);

    let sheet = ResponseSheet::from_path(&args.file, &config.columns)?;

    let mut resolver: Box<dyn DiscrepancyResolver> = match args.on_discrepancy {
        DiscrepancyPolicy::Prompt => Box::new(TerminalPrompt::stdio()),
        DiscrepancyPolicy::Patch => Box::new(PatchAll),
        DiscrepancyPolicy::Abort => Box::new(AbortOnDiscrepancy),
    };

    let report = match GradingPipeline::new(&config).run(&sheet, resolver.as_mut())? {
        GradingOutcome::Graded(report) => report,
        GradingOutcome::Aborted(discrepancy) => {
            println!("\nGrading stopped at {discrepancy}");
            println!("No files were written.");
            return Ok(());
        }
    };
    drop(sheet);

    let targets = ExportTargets {
        results: args
            .output
            .unwrap_or_else(|| sibling_path(&args.file, "classificados")),
        grades: args
            .grades
            .unwrap_or_else(|| sibling_path(&args.file, "notas")),
        json: args.json,
    };
    write_exports(&report, &targets, Utc::now())?;
    info!(
        results = %targets.results.display(),
        grades = %targets.grades.display(),
        "result tables written"
    );

    render_report(&report, args.list);
    println!("\nClassified table: {}", targets.results.display());
    println!("Grades: {}", targets.grades.display());
    if let Some(json) = &targets.json {
        println!("JSON report: {}", json.display());
    }

    Ok(())
}

pub(crate) fn run_check(args: CheckArgs, settings: GradingSettings) -> Result<(), AppError> {
    let config = init(settings)?;
    let sheet = ResponseSheet::from_path(&args.file, &config.columns)?;
    let order = sheet.question_order();
    CyclePlan::partition(&order, &config.cycle_sizes)?;

    let mut found: Vec<Discrepancy> = Vec::new();
    let mut collect = |discrepancy: &Discrepancy| {
        found.push(discrepancy.clone());
        Resolution::Patch
    };
    AnswerKeyReconciler::new(&config.answer_key).reconcile(&order, sheet.rows(), &mut collect)?;

    render_discrepancies(&order, &found);
    Ok(())
}

struct ExportTargets {
    results: PathBuf,
    grades: PathBuf,
    json: Option<PathBuf>,
}

/// Writes every export next to its target first and renames them only once
/// all of them succeeded, so a failed run leaves no partial export behind.
fn write_exports(
    report: &GradingReport,
    targets: &ExportTargets,
    generated_at: DateTime<Utc>,
) -> Result<(), AppError> {
    let mut staged = Vec::new();
    if let Err(err) = stage_exports(report, targets, generated_at, &mut staged) {
        for (partial, _) in &staged {
            if let Err(cleanup) = fs::remove_file(partial) {
                warn!(path = %partial.display(), error = %cleanup, "could not remove partial export");
            }
        }
        return Err(err);
    }

    for (partial, target) in &staged {
        fs::rename(partial, target)?;
    }
    Ok(())
}

fn stage_exports(
    report: &GradingReport,
    targets: &ExportTargets,
    generated_at: DateTime<Utc>,
    staged: &mut Vec<(PathBuf, PathBuf)>,
) -> Result<(), AppError> {
    let results = stage(&targets.results, staged)?;
    write_results_csv(BufWriter::new(results), report)?;

    let grades = stage(&targets.grades, staged)?;
    write_grades_csv(BufWriter::new(grades), report)?;

    if let Some(json) = &targets.json {
        let mut writer = BufWriter::new(stage(json, staged)?);
        write_report_json(&mut writer, report, generated_at)?;
        writer.flush()?;
    }
    Ok(())
}

fn stage(target: &Path, staged: &mut Vec<(PathBuf, PathBuf)>) -> Result<File, AppError> {
    let mut partial = target.as_os_str().to_owned();
    partial.push(".partial");
    let partial = PathBuf::from(partial);

    let file = File::create(&partial)?;
    staged.push((partial, target.to_path_buf()));
    Ok(file)
}

/// `results.csv` becomes `results_<suffix>.csv` in the same directory.
fn sibling_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "resultado".to_string());
    input.with_file_name(format!("{stem}_{suffix}.csv"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_grading::grading::{ParticipantAggregate, ParticipantId, Thresholds};

    fn report() -> GradingReport {
        let mut participant =
            ParticipantAggregate::new(ParticipantId::parse("1"), vec!["Ana".to_string()], 1);
        participant.total_correct = 1;
        participant.cycle_correct = vec![1];
        participant.qualified = true;

        GradingReport {
            participant_column: "ID_Participante".to_string(),
            detail_columns: vec!["Nome".to_string()],
            cycle_sizes: vec![1],
            thresholds: Thresholds {
                total_minimum: 1,
                cycle_minimums: vec![1],
            },
            participants: vec![participant],
            patched_questions: Vec::new(),
            patches: Vec::new(),
        }
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("exam-grader-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("scratch dir");
        dir
    }

    #[test]
    fn exports_land_together() {
        let dir = scratch_dir("exports-ok");
        let targets = ExportTargets {
            results: dir.join("prova_classificados.csv"),
            grades: dir.join("prova_notas.csv"),
            json: Some(dir.join("prova.json")),
        };

        write_exports(&report(), &targets, Utc::now()).expect("exports written");

        let grades = fs::read_to_string(&targets.grades).expect("grades file");
        assert_eq!(grades, "ID_Participante,Nota\n1,1\n");
        assert!(targets.results.exists());
        assert!(dir.join("prova.json").exists());
        let leftovers = fs::read_dir(&dir)
            .expect("list dir")
            .filter_map(Result::ok)
            .filter(|entry| entry.path().to_string_lossy().ends_with(".partial"))
            .count();
        assert_eq!(leftovers, 0);
        fs::remove_dir_all(&dir).expect("cleanup");
    }

    #[test]
    fn failed_export_leaves_no_files() {
        let dir = scratch_dir("exports-fail");
        let targets = ExportTargets {
            results: dir.join("prova_classificados.csv"),
            grades: dir.join("missing").join("prova_notas.csv"),
            json: None,
        };

        let error = write_exports(&report(), &targets, Utc::now()).expect_err("grades dir missing");
        assert!(matches!(error, AppError::Io(_)));

        let remaining = fs::read_dir(&dir).expect("list dir").count();
        assert_eq!(remaining, 0, "no results table or partial file is left");
        fs::remove_dir_all(&dir).expect("cleanup");
    }

    #[test]
    fn sibling_path_keeps_directory() {
        assert_eq!(
            sibling_path(Path::new("data/prova.csv"), "notas"),
            PathBuf::from("data/prova_notas.csv")
        );
        assert_eq!(
            sibling_path(Path::new("prova"), "classificados"),
            PathBuf::from("prova_classificados.csv")
        );
    }
}
