use exam_grading::config::GradingConfig;
use exam_grading::grading::{Discrepancy, GradingReport, QuestionId};

pub(crate) fn render_configuration(config: &GradingConfig) {
    println!("Exam grading");
    println!(
        "Questions: {} in cycles of {}",
        config.question_count(),
        join(&config.cycle_sizes)
    );
    println!(
        "Answer key: {}",
        config.answer_key.answers().concat().to_uppercase()
    );
    println!(
        "Minimums: {} overall, per cycle {}",
        config.thresholds.total_minimum,
        join(&config.thresholds.cycle_minimums)
    );
    match &config.category {
        Some(category) => println!("Category: {} (all participants)", category.label),
        None => println!("Category: as recorded in the sheet"),
    }
}

pub(crate) fn render_report(report: &GradingReport, list: bool) {
    let summary = report.summary();

    println!("\nSummary");
    println!(
        "- {} of {} participants qualified",
        summary.qualified, summary.participants
    );
    if let Some(top) = summary.top_score {
        println!("- top score: {top}");
    }
    for cycle in &summary.cycles {
        println!(
            "- cycle {}: {} reached {} of {} (best {})",
            cycle.number, cycle.met_minimum, cycle.minimum, cycle.size, cycle.best
        );
    }
    if summary.patched_questions > 0 {
        println!(
            "- answer key patched for {} question(s)",
            summary.patched_questions
        );
        for patch in &report.patches {
            println!("  - {patch}");
        }
    }

    if list {
        println!("\nParticipants by score");
        for participant in &report.participants {
            let status = if participant.qualified {
                "qualified".to_string()
            } else {
                participant
                    .shortfalls
                    .iter()
                    .map(|shortfall| shortfall.summary())
                    .collect::<Vec<_>>()
                    .join("; ")
            };
            println!(
                "- {} | {} | total {} | cycles {} | {}",
                participant.participant_id,
                participant.details.join(" / "),
                participant.total_correct,
                join(&participant.cycle_correct),
                status
            );
        }
    }
}

pub(crate) fn render_discrepancies(order: &[QuestionId], found: &[Discrepancy]) {
    println!("Checked {} questions against the declared key", order.len());
    if found.is_empty() {
        println!("Discrepancies: none");
        return;
    }

    println!("Discrepancies");
    for discrepancy in found {
        println!("- {discrepancy}");
    }
}

fn join(values: &[usize]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
