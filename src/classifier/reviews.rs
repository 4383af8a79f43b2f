//! Classifier reviews beyond per-risk scoring
//!
//! File profile, deep security review, dependency risk and the
//! system-wide review. Each one has a local fallback, so a run without a
//! classifier still fills every field.

use super::{number_like, parse_level, string_list, text_field};
use crate::error::ClassifierError;
use crate::{clamp_score, AnalysisMode, Classification, RiskLevel};
use serde::{Deserialize, Serialize};

/// Characters of the file shown to the profile prompt
pub const PROFILE_EXCERPT_CHARS: usize = 500;
/// Characters of the file shown to the security prompt
pub const SECURITY_EXCERPT_CHARS: usize = 2000;
pub const DEFAULT_SECURITY_RELEVANCE: u8 = 5;
pub const DEFAULT_SECURITY_SCORE: f64 = 50.0;
pub const DEFAULT_DEPENDENCY_SCORE: f64 = 30.0;
pub const DEFAULT_MAINTAINABILITY_SCORE: f64 = 50.0;
/// Dependencies listed in the dependency prompt
const PROMPT_DEPENDENCIES: usize = 20;
/// File classifications listed in the system prompt
const PROMPT_CLASSIFICATIONS: usize = 10;

// ============================================================================
// File profile
// ============================================================================

/// What a file is for and how much it matters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileProfile {
    /// Free-form category from the classifier, or the local classification
    pub category: String,
    pub purpose: String,
    pub criticality: RiskLevel,
    pub architectural_role: String,
    /// 0-10
    pub security_relevance: u8,
    pub mode: AnalysisMode,
}

impl FileProfile {
    pub fn prompt(filename: &str, excerpt: &str) -> String {
        format!(
            "Classify the role of this file in its system.\n\
             File: {filename}\n\
             \n\
             Code excerpt:\n{excerpt}\n\
             \n\
             Return schema exactly:\n\
             {{\n\
               \"category\": \"security\"|\"api\"|\"data\"|\"config\"|\"ui\"|\"business_logic\"|\"testing\"|\"infrastructure\",\n\
               \"purpose\": string,\n\
               \"criticality\": \"critical\"|\"high\"|\"medium\"|\"low\",\n\
               \"architectural_role\": string,\n\
               \"security_relevance\": number (0..10)\n\
             }}\n\
             No markdown."
        )
    }

    /// `category` is required
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ClassifierError> {
        let category = value
            .get("category")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ClassifierError::Schema("missing category".to_string()))?;

        let criticality = value
            .get("criticality")
            .and_then(|v| v.as_str())
            .map(parse_level)
            .unwrap_or(RiskLevel::Medium);

        Ok(Self {
            category: category.trim().to_string(),
            purpose: text_field(value.get("purpose")),
            criticality,
            architectural_role: text_field(value.get("architectural_role")),
            security_relevance: value
                .get("security_relevance")
                .and_then(number_like)
                .map(|n| n.clamp(0.0, 10.0).round() as u8)
                .unwrap_or(DEFAULT_SECURITY_RELEVANCE),
            mode: AnalysisMode::Ai,
        })
    }

    pub fn fallback(classification: Classification) -> Self {
        Self {
            category: classification.to_string(),
            purpose: "Basic analysis - classifier unavailable".to_string(),
            criticality: RiskLevel::Medium,
            architectural_role: "unknown".to_string(),
            security_relevance: DEFAULT_SECURITY_RELEVANCE,
            mode: AnalysisMode::Fallback,
        }
    }
}

// ============================================================================
// Deep security review
// ============================================================================

/// Classifier security audit of one file. `security_score` is 0 (very
/// secure) to 100 (very insecure).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityReview {
    pub security_score: f64,
    pub vulnerabilities: Vec<String>,
    pub critical_issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub owasp_categories: Vec<String>,
    pub mode: AnalysisMode,
}

impl SecurityReview {
    pub fn prompt(filename: &str, excerpt: &str) -> String {
        format!(
            "Perform a deep security review of this code.\n\
             File: {filename}\n\
             \n\
             Code excerpt:\n{excerpt}\n\
             \n\
             Check for injection (SQL, XSS, command), broken authentication or\n\
             authorization, sensitive data exposure, missing input validation,\n\
             insecure configuration, and missing logging or monitoring.\n\
             \n\
             Return schema exactly:\n\
             {{\n\
               \"security_score\": number (0..100, 0 very secure, 100 very insecure),\n\
               \"vulnerabilities\": [string],\n\
               \"critical_issues\": [string],\n\
               \"recommendations\": [string],\n\
               \"owasp_categories\": [string]\n\
             }}\n\
             No markdown."
        )
    }

    /// `security_score` is required
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ClassifierError> {
        let security_score = value
            .get("security_score")
            .and_then(number_like)
            .ok_or_else(|| ClassifierError::Schema("missing numeric security_score".to_string()))?;

        Ok(Self {
            security_score: clamp_score(security_score),
            vulnerabilities: string_list(value.get("vulnerabilities")),
            critical_issues: string_list(value.get("critical_issues")),
            recommendations: string_list(value.get("recommendations")),
            owasp_categories: string_list(value.get("owasp_categories")),
            mode: AnalysisMode::Ai,
        })
    }

    pub fn fallback() -> Self {
        Self {
            security_score: DEFAULT_SECURITY_SCORE,
            vulnerabilities: vec![],
            critical_issues: vec![],
            recommendations: vec!["Manual security review required".to_string()],
            owasp_categories: vec![],
            mode: AnalysisMode::Fallback,
        }
    }
}

// ============================================================================
// Dependency risk
// ============================================================================

/// Risk carried by a file's imports. Only built for files that import
/// something.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyRisk {
    pub dependencies: Vec<String>,
    /// 0-100, higher is riskier
    pub risk_score: f64,
    pub critical_dependencies: Vec<String>,
    pub recommendations: Vec<String>,
    pub vulnerability_alerts: Vec<String>,
    pub mode: AnalysisMode,
}

impl DependencyRisk {
    pub fn prompt(filename: &str, dependencies: &[String]) -> String {
        let listed: Vec<&str> = dependencies
            .iter()
            .take(PROMPT_DEPENDENCIES)
            .map(String::as_str)
            .collect();
        format!(
            "Assess the dependencies imported by {filename}: {}\n\
             \n\
             Consider known outdated releases, libraries with vulnerabilities,\n\
             unmaintained packages, potential conflicts and unnecessary imports.\n\
             \n\
             Return schema exactly:\n\
             {{\n\
               \"risk_score\": number (0..100),\n\
               \"critical_dependencies\": [string],\n\
               \"recommendations\": [string],\n\
               \"vulnerability_alerts\": [string]\n\
             }}\n\
             No markdown.",
            listed.join(", ")
        )
    }

    /// Every field is optional; a missing score reads as
    /// [`DEFAULT_DEPENDENCY_SCORE`]
    pub fn from_value(
        value: &serde_json::Value,
        dependencies: &[String],
    ) -> Result<Self, ClassifierError> {
        Ok(Self {
            dependencies: dependencies.to_vec(),
            risk_score: value
                .get("risk_score")
                .and_then(number_like)
                .map(clamp_score)
                .unwrap_or(DEFAULT_DEPENDENCY_SCORE),
            critical_dependencies: string_list(value.get("critical_dependencies")),
            recommendations: string_list(value.get("recommendations")),
            vulnerability_alerts: string_list(value.get("vulnerability_alerts")),
            mode: AnalysisMode::Ai,
        })
    }

    pub fn fallback(dependencies: &[String]) -> Self {
        Self {
            dependencies: dependencies.to_vec(),
            risk_score: DEFAULT_DEPENDENCY_SCORE,
            critical_dependencies: vec![],
            recommendations: vec!["Review dependencies manually".to_string()],
            vulnerability_alerts: vec![],
            mode: AnalysisMode::Fallback,
        }
    }
}

// ============================================================================
// System review
// ============================================================================

/// Aggregate facts about a run, sent to the system prompt. Holds no file
/// names or content.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemContext {
    pub total_files: usize,
    pub total_lines: usize,
    /// Sorted, deduplicated
    pub file_types: Vec<String>,
    pub classifications: Vec<Classification>,
    pub cross_file_risks: Vec<String>,
    pub architecture_completeness: f64,
}

/// Architecture-level review of the whole system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemReview {
    pub architecture_assessment: String,
    pub security_posture: String,
    pub scalability_analysis: String,
    /// 0-100, higher is easier to maintain
    pub maintainability_score: f64,
    pub technical_debt_level: String,
    pub deployment_readiness: String,
    pub risk_hotspots: Vec<String>,
    pub strategic_recommendations: Vec<String>,
    pub mode: AnalysisMode,
}

impl SystemReview {
    pub fn prompt(context: &SystemContext) -> String {
        let classifications: Vec<String> = context
            .classifications
            .iter()
            .take(PROMPT_CLASSIFICATIONS)
            .map(|c| c.to_string())
            .collect();
        let cross = if context.cross_file_risks.is_empty() {
            "none".to_string()
        } else {
            context.cross_file_risks.join(", ")
        };

        format!(
            "Review this software system as a whole.\n\
             Total files: {}\n\
             File types: {}\n\
             Total lines: {}\n\
             File classifications: {}\n\
             Cross-file risks: {}\n\
             Architecture completeness: {:.0}%\n\
             \n\
             Return schema exactly:\n\
             {{\n\
               \"architecture_assessment\": string,\n\
               \"security_posture\": string,\n\
               \"scalability_analysis\": string,\n\
               \"maintainability_score\": number (0..100, higher is easier to maintain),\n\
               \"technical_debt_level\": string,\n\
               \"deployment_readiness\": string,\n\
               \"risk_hotspots\": [string],\n\
               \"strategic_recommendations\": [string]\n\
             }}\n\
             No markdown.",
            context.total_files,
            context.file_types.join(", "),
            context.total_lines,
            classifications.join(", "),
            cross,
            context.architecture_completeness,
        )
    }

    /// Every field is optional; a missing score reads as
    /// [`DEFAULT_MAINTAINABILITY_SCORE`]
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ClassifierError> {
        Ok(Self {
            architecture_assessment: text_field(value.get("architecture_assessment")),
            security_posture: text_field(value.get("security_posture")),
            scalability_analysis: text_field(value.get("scalability_analysis")),
            maintainability_score: value
                .get("maintainability_score")
                .and_then(number_like)
                .map(clamp_score)
                .unwrap_or(DEFAULT_MAINTAINABILITY_SCORE),
            technical_debt_level: text_field(value.get("technical_debt_level")),
            deployment_readiness: text_field(value.get("deployment_readiness")),
            risk_hotspots: string_list(value.get("risk_hotspots")),
            strategic_recommendations: string_list(value.get("strategic_recommendations")),
            mode: AnalysisMode::Ai,
        })
    }

    /// Local review. `hotspots` are the files and cross-file findings the
    /// engine already rates HIGH or worse.
    pub fn fallback(hotspots: Vec<String>) -> Self {
        let risk_hotspots = if hotspots.is_empty() {
            vec!["Manual analysis needed".to_string()]
        } else {
            hotspots
        };
        Self {
            architecture_assessment: "Classifier unavailable".to_string(),
            security_posture: "Requires manual analysis".to_string(),
            scalability_analysis: "Not assessed".to_string(),
            maintainability_score: DEFAULT_MAINTAINABILITY_SCORE,
            technical_debt_level: "Medium".to_string(),
            deployment_readiness: "Requires assessment".to_string(),
            risk_hotspots,
            strategic_recommendations: vec!["Enable classifier analysis".to_string()],
            mode: AnalysisMode::Fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_parsing() {
        let profile = FileProfile::from_value(&json!({
            "category": "api",
            "purpose": "HTTP handlers",
            "criticality": "critical",
            "security_relevance": 14
        }))
        .unwrap();
        assert_eq!(profile.category, "api");
        assert_eq!(profile.criticality, RiskLevel::Critical);
        assert_eq!(profile.security_relevance, 10);
        assert_eq!(profile.architectural_role, "");
        assert_eq!(profile.mode, AnalysisMode::Ai);
    }

    #[test]
    fn test_profile_requires_category() {
        assert!(FileProfile::from_value(&json!({"purpose": "x"})).is_err());
        assert!(FileProfile::from_value(&json!({"category": "  "})).is_err());
    }

    #[test]
    fn test_profile_fallback_uses_local_classification() {
        let profile = FileProfile::fallback(Classification::Security);
        assert_eq!(profile.category, "security");
        assert_eq!(profile.criticality, RiskLevel::Medium);
        assert_eq!(profile.security_relevance, DEFAULT_SECURITY_RELEVANCE);
        assert_eq!(profile.mode, AnalysisMode::Fallback);
    }

    #[test]
    fn test_security_review_requires_score() {
        assert!(SecurityReview::from_value(&json!({"vulnerabilities": []})).is_err());
        let review = SecurityReview::from_value(&json!({
            "security_score": "85",
            "vulnerabilities": [{"sqli": 4}],
            "owasp_categories": ["A03:2021-Injection"]
        }))
        .unwrap();
        assert_eq!(review.security_score, 85.0);
        assert_eq!(review.vulnerabilities, vec![r#"{"sqli":4}"#]);
        assert_eq!(review.owasp_categories, vec!["A03:2021-Injection"]);
    }

    #[test]
    fn test_security_review_fallback() {
        let review = SecurityReview::fallback();
        assert_eq!(review.security_score, DEFAULT_SECURITY_SCORE);
        assert!(review.owasp_categories.is_empty());
        assert_eq!(review.mode, AnalysisMode::Fallback);
    }

    #[test]
    fn test_dependency_risk_defaults() {
        let deps = vec!["requests".to_string(), "os".to_string()];
        let risk = DependencyRisk::from_value(&json!({"critical_dependencies": ["requests"]}), &deps)
            .unwrap();
        assert_eq!(risk.risk_score, DEFAULT_DEPENDENCY_SCORE);
        assert_eq!(risk.critical_dependencies, vec!["requests"]);
        assert_eq!(risk.dependencies, deps);

        let fallback = DependencyRisk::fallback(&deps);
        assert_eq!(fallback.risk_score, 30.0);
        assert_eq!(fallback.mode, AnalysisMode::Fallback);
    }

    #[test]
    fn test_dependency_prompt_lists_imports() {
        let deps = vec!["requests".to_string(), "yaml".to_string()];
        let prompt = DependencyRisk::prompt("client.py", &deps);
        assert!(prompt.contains("client.py: requests, yaml"));
    }

    #[test]
    fn test_system_review_parsing_and_fallback() {
        let review = SystemReview::from_value(&json!({
            "architecture_assessment": {"layers": 3},
            "maintainability_score": 72,
            "risk_hotspots": ["payments"]
        }))
        .unwrap();
        assert_eq!(review.architecture_assessment, r#"{"layers":3}"#);
        assert_eq!(review.maintainability_score, 72.0);
        assert_eq!(review.risk_hotspots, vec!["payments"]);

        let fallback = SystemReview::fallback(vec![]);
        assert_eq!(fallback.maintainability_score, DEFAULT_MAINTAINABILITY_SCORE);
        assert_eq!(fallback.risk_hotspots, vec!["Manual analysis needed"]);
        assert_eq!(
            SystemReview::fallback(vec!["api.py".to_string()]).risk_hotspots,
            vec!["api.py"]
        );
    }

    #[test]
    fn test_system_prompt_has_no_file_names() {
        let context = SystemContext {
            total_files: 2,
            total_lines: 40,
            file_types: vec!["JSON".to_string(), "Python".to_string()],
            classifications: vec![Classification::Configuration, Classification::ApiLayer],
            cross_file_risks: vec!["api_without_auth".to_string()],
            architecture_completeness: 25.0,
        };
        let prompt = SystemReview::prompt(&context);
        assert!(prompt.contains("File types: JSON, Python"));
        assert!(prompt.contains("configuration, api_layer"));
        assert!(prompt.contains("Cross-file risks: api_without_auth"));
        assert!(prompt.contains("maintainability_score"));
    }
}
