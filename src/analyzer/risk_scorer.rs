//! Risk scoring based on multiple factors
//!
//! All formulas here are linear and deterministic. They never look at the
//! external classifier except through the `ai_score` input of
//! [`combined_risk_score`].

use super::correlator::CrossFileAnalysis;
use super::detector::PatternScore;
use super::scanner::SecurityIssue;
use super::FileAnalysis;
use crate::catalog::Catalog;
use crate::{clamp_score, LevelScheme, RiskLevel, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Starting point of every file score
pub const FILE_BASE_SCORE: f64 = 20.0;
/// Weight of the mean pattern score in the file score
pub const PATTERN_WEIGHT: f64 = 0.6;
pub const HIGH_ISSUE_POINTS: f64 = 30.0;
pub const OTHER_ISSUE_POINTS: f64 = 15.0;
pub const GOOD_PRACTICE_REDUCTION: f64 = 5.0;
pub const CROSS_RISK_PENALTY: f64 = 15.0;
pub const ARCHITECTURE_BONUS: f64 = 10.0;
pub const ARCHITECTURE_BONUS_THRESHOLD: f64 = 80.0;
/// AI component used when the classifier is unavailable
pub const DEFAULT_AI_SCORE: f64 = 30.0;
pub const AI_WEIGHT: f64 = 0.7;
/// Weight of the raw keyword sum in a per-risk score
pub const KEYWORD_WEIGHT: f64 = 0.2;
/// Weight of the raw severity-indicator sum in a per-risk score
pub const SEVERITY_WEIGHT: f64 = 0.1;

/// Tunable scoring constants, one set per product variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScoringProfile {
    #[default]
    Standard,
    Enterprise,
}

impl ScoringProfile {
    pub fn keyword_increment(&self) -> f64 {
        match self {
            ScoringProfile::Standard => 20.0,
            ScoringProfile::Enterprise => 15.0,
        }
    }

    pub fn severity_increment(&self) -> f64 {
        match self {
            ScoringProfile::Standard => 30.0,
            ScoringProfile::Enterprise => 25.0,
        }
    }

    pub fn level_scheme(&self) -> LevelScheme {
        match self {
            ScoringProfile::Standard => LevelScheme::ThreeTier,
            ScoringProfile::Enterprise => LevelScheme::FiveTier,
        }
    }
}

impl std::fmt::Display for ScoringProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoringProfile::Standard => write!(f, "standard"),
            ScoringProfile::Enterprise => write!(f, "enterprise"),
        }
    }
}

impl std::str::FromStr for ScoringProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(ScoringProfile::Standard),
            "enterprise" => Ok(ScoringProfile::Enterprise),
            other => Err(format!("unknown scoring profile: {}", other)),
        }
    }
}

/// Count catalog good-practice markers present in `content`
pub fn good_practices_found(content: &str, catalog: &Catalog) -> usize {
    catalog
        .good_practices()
        .iter()
        .filter(|p| !p.is_empty() && content.contains(p.as_str()))
        .count()
}

/// `20 + mean(pattern)·0.6 + Σ issue points − 5·good practices`, clamped
pub fn file_score(
    pattern_scores: &BTreeMap<String, PatternScore>,
    security_issues: &[SecurityIssue],
    content: &str,
    catalog: &Catalog,
) -> f64 {
    let pattern_mean = if pattern_scores.is_empty() {
        0.0
    } else {
        pattern_scores.values().map(|p| p.score).sum::<f64>() / pattern_scores.len() as f64
    };

    let security: f64 = security_issues
        .iter()
        .map(|issue| match issue.severity {
            Severity::High => HIGH_ISSUE_POINTS,
            _ => OTHER_ISSUE_POINTS,
        })
        .sum();

    let reduction = GOOD_PRACTICE_REDUCTION * good_practices_found(content, catalog) as f64;

    clamp_score(FILE_BASE_SCORE + pattern_mean * PATTERN_WEIGHT + security - reduction)
}

/// `mean(file scores) + 15·cross risks − bonus`, clamped
pub fn global_score(files: &[FileAnalysis], cross: &CrossFileAnalysis) -> f64 {
    if files.is_empty() {
        return 0.0;
    }
    let average = files.iter().map(|f| f.file_score).sum::<f64>() / files.len() as f64;
    let penalty = CROSS_RISK_PENALTY * cross.cross_file_risks.len() as f64;
    let bonus = if cross.architecture.completeness > ARCHITECTURE_BONUS_THRESHOLD {
        ARCHITECTURE_BONUS
    } else {
        0.0
    };
    clamp_score(average + penalty - bonus)
}

/// `ai·0.7 + keywords·0.2 + indicators·0.1`, clamped. The pattern inputs
/// are the raw sums from the detector; critical patterns do not count.
pub fn combined_risk_score(ai_score: f64, keyword_score: f64, severity_score: f64) -> f64 {
    clamp_score(
        clamp_score(ai_score) * AI_WEIGHT
            + keyword_score * KEYWORD_WEIGHT
            + severity_score * SEVERITY_WEIGHT,
    )
}

/// Remediation priority, 1 (most urgent) to 5
pub fn remediation_priority(score: f64, level: RiskLevel, framework_count: usize) -> u8 {
    let base = 5 - (clamp_score(score) / 20.0).floor() as i64;
    let impacted = if level >= RiskLevel::High {
        framework_count as i64
    } else {
        0
    };
    (base - impacted).clamp(1, 5) as u8
}

/// Estimated remediation cost band
pub fn remediation_cost(score: f64) -> &'static str {
    if score >= 80.0 {
        "High (R$ 50k - R$ 200k)"
    } else if score >= 65.0 {
        "Medium-High (R$ 20k - R$ 50k)"
    } else if score >= 40.0 {
        "Medium (R$ 5k - R$ 20k)"
    } else if score >= 20.0 {
        "Low (R$ 1k - R$ 5k)"
    } else {
        "Minimal (< R$ 1k)"
    }
}

/// Estimated remediation timeline band
pub fn remediation_timeline(score: f64) -> &'static str {
    if score >= 80.0 {
        "Immediate (1-2 weeks)"
    } else if score >= 65.0 {
        "Urgent (2-4 weeks)"
    } else if score >= 40.0 {
        "Medium term (1-2 months)"
    } else if score >= 20.0 {
        "Long term (2-3 months)"
    } else {
        "Planned (3+ months)"
    }
}
