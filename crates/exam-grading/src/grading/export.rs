//! Result tables for downstream systems.

use super::report::{GradingReport, GradingSummary};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

const TOTAL_HEADER: &str = "Acertos";
const QUALIFIED_HEADER: &str = "Classificado";
const GRADE_HEADER: &str = "Nota";

/// Full participant table: descriptive columns, id, totals, cycles, qualification.
pub fn write_results_csv<W: Write>(writer: W, report: &GradingReport) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header: Vec<String> = report.detail_columns.clone();
    header.push(report.participant_column.clone());
    header.push(TOTAL_HEADER.to_string());
    header.extend((1..=report.cycle_sizes.len()).map(|number| format!("Ciclo {number}")));
    header.push(QUALIFIED_HEADER.to_string());
    csv_writer.write_record(&header)?;

    for participant in &report.participants {
        let mut record = participant.details.clone();
        record.resize(report.detail_columns.len(), String::new());
        record.push(participant.participant_id.to_string());
        record.push(participant.total_correct.to_string());
        record.extend(participant.cycle_correct.iter().map(ToString::to_string));
        record.push(if participant.qualified { "Sim" } else { "Não" }.to_string());
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Minimal export: participant id and a 1/0 grade.
pub fn write_grades_csv<W: Write>(writer: W, report: &GradingReport) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([report.participant_column.as_str(), GRADE_HEADER])?;

    for participant in &report.participants {
        csv_writer.write_record([
            participant.participant_id.to_string(),
            participant.grade().to_string(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct ReportDocument<'a> {
    generated_at: DateTime<Utc>,
    summary: GradingSummary,
    report: &'a GradingReport,
}

pub fn write_report_json<W: Write>(
    writer: W,
    report: &GradingReport,
    generated_at: DateTime<Utc>,
) -> Result<(), serde_json::Error> {
    let document = ReportDocument {
        generated_at,
        summary: report.summary(),
        report,
    };
    serde_json::to_writer_pretty(writer, &document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::{Discrepancy, ParticipantAggregate, ParticipantId, QuestionId, Thresholds};
    use chrono::TimeZone;

    fn report() -> GradingReport {
        let mut first = ParticipantAggregate::new(
            ParticipantId::parse("12"),
            vec!["Ana".to_string()],
            2,
        );
        first.total_correct = 3;
        first.cycle_correct = vec![2, 1];
        first.qualified = true;

        let mut second =
            ParticipantAggregate::new(ParticipantId::parse("7"), vec!["Bruno".to_string()], 2);
        second.total_correct = 1;
        second.cycle_correct = vec![1, 0];

        GradingReport {
            participant_column: "ID_Participante".to_string(),
            detail_columns: vec!["Nome".to_string()],
            cycle_sizes: vec![2, 1],
            thresholds: Thresholds {
                total_minimum: 2,
                cycle_minimums: vec![1, 1],
            },
            participants: vec![first, second],
            patched_questions: vec![QuestionId::parse("5")],
            patches: vec![Discrepancy {
                position: 2,
                question_id: QuestionId::parse("5"),
                recorded: "b".to_string(),
                declared: "c".to_string(),
                recorded_values: vec!["b".to_string()],
                mismatched: true,
                inconsistent: false,
            }],
        }
    }

    #[test]
    fn results_table_lists_cycles_and_qualification() {
        let mut buffer = Vec::new();
        write_results_csv(&mut buffer, &report()).expect("csv written");
        let text = String::from_utf8(buffer).expect("utf8");

        assert_eq!(
            text,
            "Nome,ID_Participante,Acertos,Ciclo 1,Ciclo 2,Classificado\n\
Ana,12,3,2,1,Sim\n\
Bruno,7,1,1,0,Não\n"
        );
    }

    #[test]
    fn grades_table_is_binary() {
        let mut buffer = Vec::new();
        write_grades_csv(&mut buffer, &report()).expect("csv written");
        let text = String::from_utf8(buffer).expect("utf8");

        assert_eq!(text, "ID_Participante,Nota\n12,1\n7,0\n");
    }

    #[test]
    fn json_document_carries_summary_and_timestamp() {
        let generated_at = Utc
            .with_ymd_and_hms(2025, 10, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp");
        let mut buffer = Vec::new();
        write_report_json(&mut buffer, &report(), generated_at).expect("json written");

        let value: serde_json::Value = serde_json::from_slice(&buffer).expect("valid json");
        assert_eq!(value["generated_at"], "2025-10-01T12:00:00Z");
        assert_eq!(value["summary"]["qualified"], 1);
        assert_eq!(value["report"]["participants"][0]["participant_id"], 12);
        assert_eq!(value["report"]["participants"][1]["qualified"], false);
        assert_eq!(value["summary"]["patched_questions"], 1);
        let patch = &value["report"]["patches"][0];
        assert_eq!(patch["question_id"], 5);
        assert_eq!(patch["recorded"], "b");
        assert_eq!(patch["declared"], "c");
    }
}
