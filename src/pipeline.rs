use std::collections::HashSet;
use std::io;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::models::{AnalysisResult, AnalysisRow, Category, RowIssue, SpeakerRecord, SummaryStats};
use crate::table::{self, CountsTable};
use crate::{quadrant, ratios};

/// Counts table in, augmented table + summary + quadrant groups out.
pub struct AnalysisPipeline {
    config: AnalysisConfig,
}

impl Default for AnalysisPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisPipeline {
    pub fn new() -> Self {
        Self {
            config: AnalysisConfig::default(),
        }
    }

    pub fn with_config(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Parse a counts CSV and analyse it.
    pub fn run_csv<R: io::Read>(&self, reader: R) -> Result<AnalysisResult, AnalysisError> {
        let table = table::read_counts(reader, self.config.on_invalid)?;
        self.run_table(table)
    }

    pub fn run(&self, records: Vec<SpeakerRecord>) -> Result<AnalysisResult, AnalysisError> {
        self.run_table(CountsTable {
            records,
            issues: Vec::new(),
        })
    }

    fn run_table(&self, table: CountsTable) -> Result<AnalysisResult, AnalysisError> {
        let run_id = Uuid::new_v4();
        let CountsTable { records, mut issues } = table;
        info!(%run_id, rows = records.len(), strict = self.config.strict, "analysis started");

        let records = self.validate(records, &mut issues)?;
        if records.is_empty() {
            return Err(AnalysisError::EmptyInput);
        }
        warn_on_duplicates(&records);

        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let metrics = if self.config.strict {
                ratios::compute_strict(&record)?
            } else {
                ratios::compute(&record)
            };
            let quadrant = quadrant::classify(&metrics);
            debug!(speaker = %record.speaker_id, pnr = metrics.pnr, idir = metrics.idir, %quadrant, "classified");
            rows.push(AnalysisRow {
                record,
                metrics,
                quadrant,
            });
        }

        let summary = summarize(&rows);
        let groups = quadrant::aggregate(
            rows.iter()
                .map(|row| (row.record.speaker_id.as_str(), row.quadrant)),
        );

        info!(%run_id, rows = rows.len(), quadrants = groups.len(), issues = issues.len(), "analysis finished");
        Ok(AnalysisResult {
            run_id,
            generated_at: Utc::now(),
            rows,
            summary,
            groups,
            issues,
        })
    }

    /// Re-check records that did not come through the CSV reader.
    fn validate(
        &self,
        records: Vec<SpeakerRecord>,
        issues: &mut Vec<RowIssue>,
    ) -> Result<Vec<SpeakerRecord>, AnalysisError> {
        let policy = self.config.on_invalid;
        let mut kept = Vec::with_capacity(records.len());

        'records: for (i, mut record) in records.into_iter().enumerate() {
            let row = i + 1;
            if !table::resolve_speaker(policy, row, &record.speaker_id, issues)? {
                continue;
            }
            for category in Category::ALL {
                let value = record.count(category);
                match table::resolve_value(policy, row, category.column(), value, issues)? {
                    Some(value) => set_count(&mut record, category, value),
                    None => continue 'records,
                }
            }
            kept.push(record);
        }

        Ok(kept)
    }
}

fn set_count(record: &mut SpeakerRecord, category: Category, value: f64) {
    match category {
        Category::Lecture => record.lecture_count = value,
        Category::Instruction => record.instruction_count = value,
        Category::Question => record.question_count = value,
        Category::Response => record.response_count = value,
    }
}

fn warn_on_duplicates(records: &[SpeakerRecord]) {
    let mut seen = HashSet::new();
    for record in records {
        if !seen.insert(record.speaker_id.as_str()) {
            warn!(speaker = %record.speaker_id, "speaker appears more than once");
        }
    }
}

/// Max/min over a column, ignoring NaN. `None` when nothing is left.
fn extent<I: Iterator<Item = f64>>(values: I) -> Option<(f64, f64)> {
    values
        .filter(|v| !v.is_nan())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((max, min)) => Some((max.max(v), min.min(v))),
        })
}

pub fn summarize(rows: &[AnalysisRow]) -> SummaryStats {
    let pnr = extent(rows.iter().map(|r| r.metrics.pnr));
    let idir = extent(rows.iter().map(|r| r.metrics.idir));
    SummaryStats {
        max_pnr: pnr.map(|(max, _)| max),
        min_pnr: pnr.map(|(_, min)| min),
        max_idir: idir.map(|(max, _)| max),
        min_idir: idir.map(|(_, min)| min),
    }
}
