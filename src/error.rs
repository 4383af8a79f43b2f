//! Error types shared across the engine

use thiserror::Error;

/// A file that could not be analyzed, with the reason
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct SkippedFile {
    pub filename: String,
    pub reason: String,
}

/// Whole-run failures. Per-file problems never surface here.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("no valid files to analyze ({} skipped)", skipped.len())]
    NoValidFiles { skipped: Vec<SkippedFile> },

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("analysis worker failed: {0}")]
    Worker(String),
}

/// Problems loading or validating a risk catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("duplicate risk id: {0}")]
    DuplicateId(String),

    #[error("risk {risk} references undescribed framework {framework}")]
    UnknownFramework { risk: String, framework: String },

    #[error("invalid catalog: {0}")]
    Invalid(String),
}

/// Failures of the external classifier. Always recovered by fallback scoring.
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("classifier disabled: {0}")]
    Disabled(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("classifier returned status {0}")]
    Status(u16),

    #[error("classifier response missing content")]
    MissingContent,

    #[error("malformed classifier JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("classifier answer out of schema: {0}")]
    Schema(String),
}

impl ClassifierError {
    /// The classifier cannot answer at all, as opposed to one bad answer
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            ClassifierError::Disabled(_) | ClassifierError::Http(_) | ClassifierError::Status(_)
        )
    }
}
