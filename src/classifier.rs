//! Utterance classifier boundary.
//!
//! The model itself lives outside this crate. [`Classifier`] is the seam;
//! [`HttpClassifier`] talks to an inference service over JSON:
//!
//! ```text
//! POST {base_url}/classify  {"text": "..."}                       -> {"label": "...", "confidence": 0.93}
//! POST {base_url}/predict   {"role": "Teacher", "utterance": "..."} -> {"label": "..."}
//! ```

use std::collections::HashMap;
use std::io;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ClassifierConfig;
use crate::error::{AnalysisError, ClassifierError};
use crate::models::{Category, Label, Prediction, Role, SpeakerRecord};
use crate::table::{self, SPEAKER_COLUMN};

pub const ROLE_COLUMN: &str = "Role";
pub const UTTERANCE_COLUMN: &str = "Utterance";
pub const LABEL_COLUMN: &str = "Predicted_Label";

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Label a free-standing utterance, with the model's confidence.
    async fn classify_text(&self, text: &str) -> Result<Prediction, ClassifierError>;

    /// Label an utterance spoken by someone in `role`.
    async fn predict_label(&self, role: Role, utterance: &str) -> Result<Label, ClassifierError>;
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    role: Role,
    utterance: &'a str,
}

#[derive(Deserialize)]
struct ClassifyResponse {
    label: String,
    confidence: f64,
}

#[derive(Deserialize)]
struct PredictResponse {
    label: String,
}

pub struct HttpClassifier {
    base_url: String,
    client: Client,
}

impl HttpClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let base_url = config
            .base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                ClassifierError::Unavailable("no classifier base URL configured".to_string())
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { base_url, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

/// Reject confidences the model could not have meant.
pub fn check_confidence(confidence: f64) -> Result<f64, ClassifierError> {
    if (0.0..=1.0).contains(&confidence) {
        Ok(confidence)
    } else {
        Err(ClassifierError::InvalidResponse(format!(
            "confidence {confidence} outside [0, 1]"
        )))
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify_text(&self, text: &str) -> Result<Prediction, ClassifierError> {
        let response: ClassifyResponse = self
            .client
            .post(self.url("classify"))
            .json(&ClassifyRequest { text })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(Prediction {
            label: Label::new(response.label),
            confidence: check_confidence(response.confidence)?,
        })
    }

    async fn predict_label(&self, role: Role, utterance: &str) -> Result<Label, ClassifierError> {
        let response: PredictResponse = self
            .client
            .post(self.url("predict"))
            .json(&PredictRequest { role, utterance })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(Label::new(response.label))
    }
}

/// Label every `Role`/`Utterance` row and write the table back with a
/// `Predicted_Label` column. Nothing is written unless every row succeeds.
pub async fn classify_rows<C, R, W>(classifier: &C, reader: R, writer: W) -> anyhow::Result<usize>
where
    C: Classifier + ?Sized,
    R: io::Read,
    W: io::Write,
{
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = reader.headers()?.clone();
    let indices = table::column_indices(&headers, &[ROLE_COLUMN, UTTERANCE_COLUMN])?;

    let mut rows = Vec::new();
    for result in reader.records() {
        rows.push(result?);
    }
    info!(rows = rows.len(), "classifying utterances");

    let mut labels = Vec::with_capacity(rows.len());
    for (i, record) in rows.iter().enumerate() {
        let row = i + 1;
        let raw_role = record.get(indices[0]).unwrap_or("");
        let role: Role = raw_role
            .parse()
            .map_err(|_| AnalysisError::invalid(row, ROLE_COLUMN, raw_role))?;
        let utterance = record.get(indices[1]).unwrap_or("");

        let label = classifier
            .predict_label(role, utterance)
            .await
            .with_context(|| format!("prediction failed for row {row}"))?;
        debug!(row, %role, %label, "predicted");
        labels.push(label);
    }

    let mut writer = csv::Writer::from_writer(writer);
    let mut header: Vec<&str> = headers.iter().collect();
    header.push(LABEL_COLUMN);
    writer.write_record(&header)?;
    for (record, label) in rows.iter().zip(&labels) {
        let mut fields: Vec<&str> = record.iter().collect();
        fields.resize(headers.len(), "");
        fields.push(label.as_str());
        writer.write_record(&fields)?;
    }
    writer.flush()?;

    Ok(labels.len())
}

/// Count labelled utterances per speaker into a counts table.
///
/// Speakers come from `Speakers`, or `Role` when the table has no speaker
/// column. Labels outside the four counted categories are ignored.
pub fn tally<R: io::Read>(reader: R) -> Result<Vec<SpeakerRecord>, AnalysisError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader.headers()?.clone();

    let speaker_column = if headers.iter().any(|h| h.trim() == SPEAKER_COLUMN) {
        SPEAKER_COLUMN
    } else {
        ROLE_COLUMN
    };
    let indices = table::column_indices(&headers, &[speaker_column, LABEL_COLUMN])?;

    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut records: Vec<SpeakerRecord> = Vec::new();
    let mut ignored = 0usize;

    for (i, result) in reader.records().enumerate() {
        let record = result?;
        let speaker = record.get(indices[0]).unwrap_or("");
        if speaker.is_empty() {
            warn!(row = i + 1, "row without a speaker, not counted");
            continue;
        }

        let Some(category) = Label::new(record.get(indices[1]).unwrap_or("")).category() else {
            ignored += 1;
            continue;
        };

        let position = *positions.entry(speaker.to_string()).or_insert_with(|| {
            records.push(SpeakerRecord::new(speaker, 0.0, 0.0, 0.0, 0.0));
            records.len() - 1
        });
        let entry = &mut records[position];
        match category {
            Category::Lecture => entry.lecture_count += 1.0,
            Category::Instruction => entry.instruction_count += 1.0,
            Category::Question => entry.question_count += 1.0,
            Category::Response => entry.response_count += 1.0,
        }
    }

    if ignored > 0 {
        info!(ignored, "labels outside the counted categories were skipped");
    }
    Ok(records)
}
