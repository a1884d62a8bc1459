//! Configuration file support.
//!
//! Every setting has a default, so the file is optional. Values given on the
//! command line win over the file.
//!
//! ```toml
//! [analysis]
//! on_invalid = "skip_row"
//! strict = false
//!
//! [classifier]
//! base_url = "http://localhost:8000"
//! timeout_secs = 30
//! ```

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// What to do with a count cell that is missing, non-numeric or negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum InvalidPolicy {
    #[default]
    Abort,
    #[value(name = "skip_row")]
    SkipRow,
    #[value(name = "treat_as_zero")]
    TreatAsZero,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub on_invalid: InvalidPolicy,
    /// Raise on zero denominators instead of producing inf/NaN ratios.
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

impl AppConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load `path` when given, otherwise fall back to defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.analysis.on_invalid, InvalidPolicy::Abort);
        assert!(!config.analysis.strict);
        assert_eq!(config.classifier.timeout_secs, 30);
    }

    #[test]
    fn parses_every_section() {
        let toml = r#"
            [analysis]
            on_invalid = "treat_as_zero"
            strict = true

            [classifier]
            base_url = "http://model.local:8000"
            timeout_secs = 5
        "#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.analysis.on_invalid, InvalidPolicy::TreatAsZero);
        assert!(config.analysis.strict);
        assert_eq!(
            config.classifier.base_url.as_deref(),
            Some("http://model.local:8000")
        );
        assert_eq!(config.classifier.timeout_secs, 5);
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[analysis]\non_invalid = \"skip_row\"").unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.analysis.on_invalid, InvalidPolicy::SkipRow);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(AppConfig::load(Some(missing.as_path())).is_err());
    }
}
