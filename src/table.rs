//! Counts-table ingest and the augmented output table.

use std::io;

use tracing::warn;

use crate::config::InvalidPolicy;
use crate::error::AnalysisError;
use crate::models::{AnalysisResult, Category, IssueAction, RowIssue, SpeakerRecord};

pub const SPEAKER_COLUMN: &str = "Speakers";

pub const REQUIRED_COLUMNS: [&str; 5] = [
    SPEAKER_COLUMN,
    "Lecture",
    "Instruction",
    "Question",
    "Response",
];

/// Records that passed ingest, plus whatever the policy recovered from.
#[derive(Debug, Clone, Default)]
pub struct CountsTable {
    pub records: Vec<SpeakerRecord>,
    pub issues: Vec<RowIssue>,
}

/// Look up every required header, failing with all missing names at once.
pub fn column_indices(
    headers: &csv::StringRecord,
    required: &[&str],
) -> Result<Vec<usize>, AnalysisError> {
    let mut indices = Vec::with_capacity(required.len());
    let mut missing = Vec::new();

    for name in required {
        match headers.iter().position(|h| h.trim() == *name) {
            Some(index) => indices.push(index),
            None => missing.push(*name),
        }
    }

    if missing.is_empty() {
        Ok(indices)
    } else {
        Err(AnalysisError::schema(missing))
    }
}

/// A usable count is finite and non-negative. `-0` comes back as `0` so
/// that dividing by it gives `+inf`.
pub fn check_count(value: f64) -> Option<f64> {
    (value.is_finite() && value >= 0.0).then_some(value + 0.0)
}

fn parse_count(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().and_then(check_count)
}

/// Apply `policy` to one count cell.
///
/// `Ok(Some(v))` keeps the value, `Ok(None)` drops the row, `Err` aborts.
pub fn resolve_count(
    policy: InvalidPolicy,
    row: usize,
    column: &str,
    raw: &str,
    issues: &mut Vec<RowIssue>,
) -> Result<Option<f64>, AnalysisError> {
    match parse_count(raw) {
        Some(value) => Ok(Some(value)),
        None => recover(policy, row, column, raw, issues),
    }
}

/// [`resolve_count`] for a count that is already a number.
pub fn resolve_value(
    policy: InvalidPolicy,
    row: usize,
    column: &str,
    value: f64,
    issues: &mut Vec<RowIssue>,
) -> Result<Option<f64>, AnalysisError> {
    match check_count(value) {
        Some(value) => Ok(Some(value)),
        None => recover(policy, row, column, &value.to_string(), issues),
    }
}

fn recover(
    policy: InvalidPolicy,
    row: usize,
    column: &str,
    raw: &str,
    issues: &mut Vec<RowIssue>,
) -> Result<Option<f64>, AnalysisError> {
    let action = match policy {
        InvalidPolicy::Abort => return Err(AnalysisError::invalid(row, column, raw)),
        InvalidPolicy::SkipRow => IssueAction::Skipped,
        InvalidPolicy::TreatAsZero => IssueAction::Zeroed,
    };
    warn!(row, column, value = raw, ?action, "invalid count");
    issues.push(RowIssue {
        row,
        column: column.to_string(),
        value: raw.to_string(),
        action,
    });

    Ok(match action {
        IssueAction::Zeroed => Some(0.0),
        IssueAction::Skipped => None,
    })
}

/// An empty speaker id cannot be zeroed, so anything but `Abort` skips it.
pub fn resolve_speaker(
    policy: InvalidPolicy,
    row: usize,
    raw: &str,
    issues: &mut Vec<RowIssue>,
) -> Result<bool, AnalysisError> {
    if !raw.trim().is_empty() {
        return Ok(true);
    }
    if policy == InvalidPolicy::Abort {
        return Err(AnalysisError::invalid(row, SPEAKER_COLUMN, raw));
    }
    warn!(row, "empty speaker id, skipping row");
    issues.push(RowIssue {
        row,
        column: SPEAKER_COLUMN.to_string(),
        value: raw.to_string(),
        action: IssueAction::Skipped,
    });
    Ok(false)
}

/// Read a counts table from CSV. Row numbers in errors are 1-based data rows.
pub fn read_counts<R: io::Read>(
    reader: R,
    policy: InvalidPolicy,
) -> Result<CountsTable, AnalysisError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let indices = column_indices(&headers, &REQUIRED_COLUMNS)?;
    let mut table = CountsTable::default();

    'rows: for (i, result) in reader.records().enumerate() {
        let record = result?;
        let row = i + 1;
        let cell = |slot: usize| record.get(indices[slot]).unwrap_or("");

        let speaker = cell(0);
        if !resolve_speaker(policy, row, speaker, &mut table.issues)? {
            continue;
        }

        let mut counts = [0.0f64; 4];
        for (slot, category) in Category::ALL.iter().enumerate() {
            match resolve_count(policy, row, category.column(), cell(slot + 1), &mut table.issues)? {
                Some(value) => counts[slot] = value,
                None => continue 'rows,
            }
        }

        table.records.push(SpeakerRecord::new(
            speaker.trim(),
            counts[0],
            counts[1],
            counts[2],
            counts[3],
        ));
    }

    Ok(table)
}

/// Write a plain counts table in the layout [`read_counts`] accepts.
pub fn write_counts<W: io::Write>(
    writer: W,
    records: &[SpeakerRecord],
) -> Result<(), AnalysisError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(REQUIRED_COLUMNS)?;
    for record in records {
        writer.write_record(counts_fields(record))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the input columns followed by `pnr`, `idir` and `Quadrant`.
pub fn write_augmented<W: io::Write>(
    writer: W,
    result: &AnalysisResult,
) -> Result<(), AnalysisError> {
    let mut writer = csv::Writer::from_writer(writer);
    let mut header: Vec<&str> = REQUIRED_COLUMNS.to_vec();
    header.extend(["pnr", "idir", "Quadrant"]);
    writer.write_record(&header)?;

    for row in &result.rows {
        let mut fields = counts_fields(&row.record);
        fields.push(row.metrics.pnr.to_string());
        fields.push(row.metrics.idir.to_string());
        fields.push(row.quadrant.to_string());
        writer.write_record(&fields)?;
    }
    writer.flush()?;
    Ok(())
}

fn counts_fields(record: &SpeakerRecord) -> Vec<String> {
    let mut fields = vec![record.speaker_id.clone()];
    fields.extend(Category::ALL.iter().map(|c| record.count(*c).to_string()));
    fields
}
