//! AgentRisk Library
//!
//! Risk and compliance scoring for source files of agentic AI systems.

pub mod analyzer;
pub mod catalog;
pub mod classifier;
pub mod collect;
pub mod compliance;
pub mod config;
pub mod decode;
pub mod error;
pub mod report;
pub mod web;

use serde::{Deserialize, Serialize};

pub use analyzer::{Engine, FileAnalysis, SystemAnalysis};
pub use error::EngineError;

/// A file handed to the engine: name plus raw, undecoded bytes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    /// Convenience for tests and text inputs
    pub fn from_text(filename: impl Into<String>, text: &str) -> Self {
        Self::new(filename, text.as_bytes().to_vec())
    }
}

/// Risk level derived from a 0-100 score. Higher score means higher risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    #[default]
    Minimal,
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Minimal => write!(f, "MINIMAL"),
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
            RiskLevel::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Threshold scheme used to turn a score into a [`RiskLevel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LevelScheme {
    /// HIGH / MEDIUM / LOW
    #[default]
    ThreeTier,
    /// CRITICAL / HIGH / MEDIUM / LOW / MINIMAL
    FiveTier,
}

impl LevelScheme {
    pub fn level_of(&self, score: f64) -> RiskLevel {
        match self {
            LevelScheme::ThreeTier => {
                if score >= 70.0 {
                    RiskLevel::High
                } else if score >= 40.0 {
                    RiskLevel::Medium
                } else {
                    RiskLevel::Low
                }
            }
            LevelScheme::FiveTier => {
                if score >= 80.0 {
                    RiskLevel::Critical
                } else if score >= 65.0 {
                    RiskLevel::High
                } else if score >= 40.0 {
                    RiskLevel::Medium
                } else if score >= 20.0 {
                    RiskLevel::Low
                } else {
                    RiskLevel::Minimal
                }
            }
        }
    }
}

/// Severity of a single security issue found by the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
        }
    }
}

/// Purpose of a file inside the analyzed system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    EntryPoint,
    Security,
    Configuration,
    ApiLayer,
    DataModel,
    Testing,
    BusinessLogic,
    Documentation,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Classification::EntryPoint => write!(f, "entry_point"),
            Classification::Security => write!(f, "security"),
            Classification::Configuration => write!(f, "configuration"),
            Classification::ApiLayer => write!(f, "api_layer"),
            Classification::DataModel => write!(f, "data_model"),
            Classification::Testing => write!(f, "testing"),
            Classification::BusinessLogic => write!(f, "business_logic"),
            Classification::Documentation => write!(f, "documentation"),
        }
    }
}

/// Where a score came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// External classifier answered
    Ai,
    /// Local keyword/regex scoring only
    Fallback,
    /// Some files or checks used the classifier, some fell back
    Mixed,
}

impl std::fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisMode::Ai => write!(f, "ai"),
            AnalysisMode::Fallback => write!(f, "fallback"),
            AnalysisMode::Mixed => write!(f, "mixed"),
        }
    }
}

/// Clamp a score into [0, 100]. NaN collapses to 0.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_tier_thresholds() {
        let scheme = LevelScheme::ThreeTier;
        assert_eq!(scheme.level_of(70.0), RiskLevel::High);
        assert_eq!(scheme.level_of(69.9), RiskLevel::Medium);
        assert_eq!(scheme.level_of(40.0), RiskLevel::Medium);
        assert_eq!(scheme.level_of(39.9), RiskLevel::Low);
        assert_eq!(scheme.level_of(0.0), RiskLevel::Low);
    }

    #[test]
    fn test_five_tier_thresholds() {
        let scheme = LevelScheme::FiveTier;
        assert_eq!(scheme.level_of(100.0), RiskLevel::Critical);
        assert_eq!(scheme.level_of(80.0), RiskLevel::Critical);
        assert_eq!(scheme.level_of(65.0), RiskLevel::High);
        assert_eq!(scheme.level_of(40.0), RiskLevel::Medium);
        assert_eq!(scheme.level_of(20.0), RiskLevel::Low);
        assert_eq!(scheme.level_of(19.9), RiskLevel::Minimal);
    }

    #[test]
    fn test_higher_score_never_lowers_level() {
        for scheme in [LevelScheme::ThreeTier, LevelScheme::FiveTier] {
            let mut previous = RiskLevel::Minimal;
            for step in 0..=1000 {
                let level = scheme.level_of(step as f64 / 10.0);
                assert!(level >= previous);
                previous = level;
            }
        }
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(-5.0), 0.0);
        assert_eq!(clamp_score(150.0), 100.0);
        assert_eq!(clamp_score(42.5), 42.5);
        assert_eq!(clamp_score(f64::NAN), 0.0);
    }

    #[test]
    fn test_classification_serializes_snake_case() {
        let json = serde_json::to_string(&Classification::ApiLayer).unwrap();
        assert_eq!(json, "\"api_layer\"");
    }
}
