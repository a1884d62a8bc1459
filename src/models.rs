use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row of per-speaker utterance-category counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerRecord {
    pub speaker_id: String,
    pub lecture_count: f64,
    pub instruction_count: f64,
    pub question_count: f64,
    pub response_count: f64,
}

impl SpeakerRecord {
    pub fn new(
        speaker_id: impl Into<String>,
        lecture_count: f64,
        instruction_count: f64,
        question_count: f64,
        response_count: f64,
    ) -> Self {
        Self {
            speaker_id: speaker_id.into(),
            lecture_count,
            instruction_count,
            question_count,
            response_count,
        }
    }

    /// Count for a category, in the same order as the input table columns.
    pub fn count(&self, category: Category) -> f64 {
        match category {
            Category::Lecture => self.lecture_count,
            Category::Instruction => self.instruction_count,
            Category::Question => self.question_count,
            Category::Response => self.response_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub pnr: f64,
    pub idir: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quadrant {
    Q1,
    Q2,
    Q3,
    Q4,
    /// Either ratio is NaN, so neither threshold comparison means anything.
    Undefined,
}

impl Quadrant {
    pub const ALL: [Quadrant; 5] = [
        Quadrant::Q1,
        Quadrant::Q2,
        Quadrant::Q3,
        Quadrant::Q4,
        Quadrant::Undefined,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Quadrant::Q1 => "Q1",
            Quadrant::Q2 => "Q2",
            Quadrant::Q3 => "Q3",
            Quadrant::Q4 => "Q4",
            Quadrant::Undefined => "Undefined",
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRow {
    pub record: SpeakerRecord,
    pub metrics: DerivedMetrics,
    pub quadrant: Quadrant,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SummaryStats {
    pub max_pnr: Option<f64>,
    pub min_pnr: Option<f64>,
    pub max_idir: Option<f64>,
    pub min_idir: Option<f64>,
}

pub type QuadrantGroups = BTreeMap<Quadrant, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueAction {
    Skipped,
    Zeroed,
}

/// A cell the ingest step recovered from instead of aborting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowIssue {
    pub row: usize,
    pub column: String,
    pub value: String,
    pub action: IssueAction,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub rows: Vec<AnalysisRow>,
    pub summary: SummaryStats,
    pub groups: QuadrantGroups,
    pub issues: Vec<RowIssue>,
}

/// The four counted utterance categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Lecture,
    Instruction,
    Question,
    Response,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Lecture,
        Category::Instruction,
        Category::Question,
        Category::Response,
    ];

    /// Column header used for this category in counts tables.
    pub fn column(&self) -> &'static str {
        match self {
            Category::Lecture => "Lecture",
            Category::Instruction => "Instruction",
            Category::Question => "Question",
            Category::Response => "Response",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Teacher,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Teacher => "Teacher",
            Role::Student => "Student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            other => Err(format!("unknown role {other:?} (expected Teacher or Student)")),
        }
    }
}

/// Label produced by the external model. Any string is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(pub String);

impl Label {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn category(&self) -> Option<Category> {
        match self.0.trim().to_ascii_lowercase().as_str() {
            "lecture" => Some(Category::Lecture),
            "instruction" => Some(Category::Instruction),
            "question" => Some(Category::Question),
            "response" => Some(Category::Response),
            _ => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: Label,
    pub confidence: f64,
}
