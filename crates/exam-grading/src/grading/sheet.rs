//! Tabular response sheet: one row per participant per question.

use super::domain::{normalize_answer, ParticipantId, QuestionId, ResponseRow};
use crate::config::ColumnMapping;
use calamine::{open_workbook_auto, Data, Reader};
use csv::StringRecord;
use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read response sheet: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),
    #[error("spreadsheet has no worksheet")]
    NoWorksheet,
    #[error("required column '{column}' is missing from the sheet header")]
    MissingColumn { column: String },
    #[error("line {line}: column '{column}' is empty")]
    EmptyCell { line: u64, column: String },
}

struct ColumnIndexes {
    participant: usize,
    question: usize,
    selected_answer: usize,
    key_answer: usize,
    details: Vec<usize>,
}

impl ColumnIndexes {
    fn resolve(headers: &StringRecord, columns: &ColumnMapping) -> Result<Self, DatasetError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|header| header == name)
                .ok_or_else(|| DatasetError::MissingColumn {
                    column: name.to_string(),
                })
        };

        let participant = find(&columns.participant)?;
        let question = find(&columns.question)?;
        let selected_answer = find(&columns.selected_answer)?;
        let key_answer = find(&columns.key_answer)?;

        let required = [participant, question, selected_answer, key_answer];
        let details = (0..headers.len())
            .filter(|index| !required.contains(index))
            .collect();

        Ok(Self {
            participant,
            question,
            selected_answer,
            key_answer,
            details,
        })
    }
}

/// Immutable response data loaded from a results export.
#[derive(Debug, Clone, Default)]
pub struct ResponseSheet {
    detail_columns: Vec<String>,
    rows: Vec<ResponseRow>,
}

impl ResponseSheet {
    /// Reads spreadsheet workbooks by extension and anything else as CSV.
    pub fn from_path<P: AsRef<Path>>(path: P, columns: &ColumnMapping) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let is_spreadsheet = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| SPREADSHEET_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);

        info!(path = %path.display(), is_spreadsheet, "loading response sheet");
        if is_spreadsheet {
            return Self::from_workbook(path, columns);
        }

        let file = std::fs::File::open(path)?;
        Self::from_reader(file, columns)
    }

    pub fn from_reader<R: Read>(reader: R, columns: &ColumnMapping) -> Result<Self, DatasetError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let mut records = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            let line = record.position().map(|pos| pos.line()).unwrap_or_default();
            records.push((line, record));
        }

        Self::from_records(&headers, records, columns)
    }

    /// First worksheet of the workbook; its first row is the header.
    fn from_workbook(path: &Path, columns: &ColumnMapping) -> Result<Self, DatasetError> {
        let mut workbook = open_workbook_auto(path)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(DatasetError::NoWorksheet)??;

        let header_line = range.start().map(|(row, _)| u64::from(row) + 1).unwrap_or(1);
        let mut rows = range.rows();
        let headers = match rows.next() {
            Some(header) => header.iter().map(cell_text).collect::<StringRecord>(),
            None => StringRecord::new(),
        };
        let records = rows
            .enumerate()
            .map(|(index, row)| {
                let record = row.iter().map(cell_text).collect::<StringRecord>();
                (header_line + 1 + index as u64, record)
            })
            .filter(|(_, record)| record.iter().any(|cell| !cell.is_empty()))
            .collect();

        Self::from_records(&headers, records, columns)
    }

    fn from_records(
        headers: &StringRecord,
        records: Vec<(u64, StringRecord)>,
        columns: &ColumnMapping,
    ) -> Result<Self, DatasetError> {
        let indexes = ColumnIndexes::resolve(headers, columns)?;
        let detail_columns = indexes
            .details
            .iter()
            .map(|index| headers[*index].to_string())
            .collect();

        let mut rows = Vec::with_capacity(records.len());
        for (line, record) in &records {
            let cell = |index: usize| record.get(index).unwrap_or_default();
            let required = |index: usize, column: &str| {
                let value = cell(index);
                if value.is_empty() {
                    Err(DatasetError::EmptyCell {
                        line: *line,
                        column: column.to_string(),
                    })
                } else {
                    Ok(value)
                }
            };

            let participant_id = ParticipantId::parse(required(
                indexes.participant,
                &columns.participant,
            )?);
            let question_id = QuestionId::parse(required(indexes.question, &columns.question)?);

            rows.push(ResponseRow {
                participant_id,
                question_id,
                selected_answer: normalize_answer(cell(indexes.selected_answer)),
                key_answer: normalize_answer(cell(indexes.key_answer)),
                details: indexes
                    .details
                    .iter()
                    .map(|index| cell(*index).to_string())
                    .collect(),
            });
        }

        debug!(rows = rows.len(), "response sheet parsed");
        Ok(Self {
            detail_columns,
            rows,
        })
    }

    pub fn rows(&self) -> &[ResponseRow] {
        &self.rows
    }

    pub fn detail_columns(&self) -> &[String] {
        &self.detail_columns
    }

    /// Distinct question ids in ascending natural order; defines Q1..QN.
    pub fn question_order(&self) -> Vec<QuestionId> {
        self.rows
            .iter()
            .map(|row| row.question_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn participant_count(&self) -> usize {
        self.rows
            .iter()
            .map(|row| &row.participant_id)
            .collect::<BTreeSet<_>>()
            .len()
    }
}

/// Whole-number floats drop their fraction so ids read the same as in CSV.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(value) => value.trim().to_string(),
        Data::Float(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
            format!("{}", *value as i64)
        }
        other => other.to_string().trim().to_string(),
    }
}
