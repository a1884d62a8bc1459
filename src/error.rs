//! Error types for the analysis core and the classifier boundary.

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("missing required column(s): {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("input table has no rows")]
    EmptyInput,

    #[error("invalid value {value:?} in row {row}, column {column}")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("{ratio} is undefined for speaker {speaker}: {denominator} is zero")]
    ComputationAmbiguity {
        speaker: String,
        ratio: &'static str,
        denominator: &'static str,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    pub fn schema<I, S>(missing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AnalysisError::Schema {
            missing: missing.into_iter().map(Into::into).collect(),
        }
    }

    pub fn invalid(row: usize, column: &str, value: impl Into<String>) -> Self {
        AnalysisError::InvalidValue {
            row,
            column: column.to_string(),
            value: value.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("classifier request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("classifier returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("classifier unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_names_every_missing_column() {
        let err = AnalysisError::schema(["Question", "Response"]);
        assert_eq!(
            err.to_string(),
            "missing required column(s): Question, Response"
        );
    }

    #[test]
    fn invalid_value_names_row_and_column() {
        let err = AnalysisError::invalid(3, "Lecture", "abc");
        assert_eq!(err.to_string(), "invalid value \"abc\" in row 3, column Lecture");
    }
}
