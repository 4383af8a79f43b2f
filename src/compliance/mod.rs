//! Compliance analysis per framework
//!
//! Each (file, framework) pair is checked by the classifier when it can,
//! otherwise by fixed local rules. Compliance scores measure conformance:
//! higher is better, unlike risk scores.

use crate::analyzer::scanner::SecurityIssue;
use crate::catalog::{Catalog, ComplianceFramework, FrameworkInfo};
use crate::classifier::{self, AiComplianceVerdict, RiskClassifier};
use crate::error::ClassifierError;
use crate::{clamp_score, AnalysisMode, RiskLevel};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const FALLBACK_BASE_SCORE: f64 = 80.0;
pub const FALLBACK_VIOLATION_PENALTY: f64 = 15.0;

/// A compliance finding in one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceViolation {
    pub framework: ComplianceFramework,
    pub article: String,
    pub description: String,
    pub severity: RiskLevel,
    pub filename: String,
    pub evidence: Vec<String>,
    pub remediation: Vec<String>,
}

/// Result of checking one file against one framework
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameworkCheck {
    pub framework: ComplianceFramework,
    pub filename: String,
    /// 0-100, higher is more compliant
    pub compliance_score: f64,
    pub violations: Vec<ComplianceViolation>,
    pub recommendations: Vec<String>,
    pub mode: AnalysisMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Compliant,
    Attention,
    NonCompliant,
}

impl ComplianceStatus {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            ComplianceStatus::Compliant
        } else if score >= 60.0 {
            ComplianceStatus::Attention
        } else {
            ComplianceStatus::NonCompliant
        }
    }
}

impl std::fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComplianceStatus::Compliant => write!(f, "compliant"),
            ComplianceStatus::Attention => write!(f, "attention"),
            ComplianceStatus::NonCompliant => write!(f, "non-compliant"),
        }
    }
}

/// Aggregate over all files for one framework
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameworkCompliance {
    pub framework: ComplianceFramework,
    pub name: String,
    pub score: f64,
    pub status: ComplianceStatus,
    pub violations_count: usize,
    /// Distinct articles, first-seen order
    pub articles_violated: Vec<String>,
    pub penalty: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Immediate,
    ShortTerm,
    MediumTerm,
}

impl Urgency {
    pub fn for_severity(severity: RiskLevel) -> Self {
        match severity {
            RiskLevel::Critical | RiskLevel::High => Urgency::Immediate,
            RiskLevel::Medium => Urgency::ShortTerm,
            _ => Urgency::MediumTerm,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Urgency::Immediate => "Immediate (0-30 days)",
            Urgency::ShortTerm => "Short term (30-90 days)",
            Urgency::MediumTerm => "Medium term (90-180 days)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationItem {
    pub framework: ComplianceFramework,
    pub article: String,
    pub filename: String,
    pub severity: RiskLevel,
    pub urgency: Urgency,
    pub timeline: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationTimeline {
    pub immediate: usize,
    pub short_term: usize,
    pub medium_term: usize,
    pub estimated_total_time: String,
    /// Most urgent first
    pub details: Vec<RemediationItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyExposure {
    pub framework: ComplianceFramework,
    pub name: String,
    pub violations: usize,
    pub highest_severity: RiskLevel,
    pub penalty: String,
}

/// Compliance section of a system analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub overall_score: f64,
    pub status: ComplianceStatus,
    pub frameworks: Vec<FrameworkCompliance>,
    pub violations: Vec<ComplianceViolation>,
    pub remediation_timeline: RemediationTimeline,
    pub penalty_exposure: Vec<PenaltyExposure>,
}

/// What a compliance check needs to know about a file
pub struct FileSubject<'a> {
    pub filename: &'a str,
    pub file_type: &'a str,
    pub content: &'a str,
    pub security_issues: &'a [SecurityIssue],
}

fn any_term(content_lower: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| content_lower.contains(t))
}

const PERSONAL_DATA_TERMS: [&str; 5] = ["cpf", "email", "phone", "address", "personal"];

/// Deterministic rules used when the classifier is unavailable
pub fn local_violations(framework: ComplianceFramework, subject: &FileSubject) -> Vec<ComplianceViolation> {
    let content = subject.content.to_lowercase();
    let filename = subject.filename;
    let mut violations = Vec::new();

    let mut add = |article: &str, severity: RiskLevel, description: &str, evidence: String, remediation: &[&str]| {
        violations.push(ComplianceViolation {
            framework,
            article: article.to_string(),
            description: description.to_string(),
            severity,
            filename: filename.to_string(),
            evidence: vec![evidence],
            remediation: remediation.iter().map(|r| r.to_string()).collect(),
        });
    };

    match framework {
        ComplianceFramework::EuAiAct => {
            if any_term(&content, &["decision", "predict", "classify", "recommend"])
                && !any_term(&content, &["human", "approval"])
            {
                add(
                    "Art. 14",
                    RiskLevel::High,
                    "AI system without adequate human oversight",
                    format!("Automated decisions in {}", filename),
                    &["Implement human oversight", "Add manual approval step"],
                );
            }
            if !any_term(&content, &["transparent", "explain"]) {
                add(
                    "Art. 13",
                    RiskLevel::Medium,
                    "Lack of transparency in the AI system",
                    format!("No explainability found in {}", filename),
                    &["Implement explainability", "Log decision rationale"],
                );
            }
        }
        ComplianceFramework::LgpdBrazil => {
            if any_term(&content, &PERSONAL_DATA_TERMS) && !any_term(&content, &["consent", "legal_basis"]) {
                add(
                    "Art. 7",
                    RiskLevel::High,
                    "Personal data processed without a clear legal basis",
                    format!("Personal data handled in {}", filename),
                    &["Define the legal basis", "Implement consent collection"],
                );
            }
            if any_term(&content, &["health", "race", "religion", "biometric"]) {
                add(
                    "Art. 9",
                    RiskLevel::High,
                    "Possible processing of sensitive personal data",
                    format!("Sensitive data indicators in {}", filename),
                    &["Apply special protections", "Obtain specific consent"],
                );
            }
        }
        ComplianceFramework::GdprEu => {
            if any_term(&content, &PERSONAL_DATA_TERMS) && !any_term(&content, &["encrypt", "hash"]) {
                add(
                    "Art. 32",
                    RiskLevel::High,
                    "Personal data processed without encryption or pseudonymisation",
                    format!("Unprotected personal data in {}", filename),
                    &["Encrypt personal data at rest and in transit", "Pseudonymise identifiers"],
                );
            }
        }
        ComplianceFramework::SoxUs => {
            if any_term(&content, &["ledger", "transaction", "invoice", "financial"])
                && !any_term(&content, &["audit", "logging"])
            {
                add(
                    "Sec. 404",
                    RiskLevel::Medium,
                    "Financial processing without internal control evidence",
                    format!("Financial operations without audit trail in {}", filename),
                    &["Add audit logging", "Document internal controls"],
                );
            }
        }
        ComplianceFramework::BaselIii => {
            if any_term(&content, &["credit", "capital", "exposure"])
                && !any_term(&content, &["stress_test", "monitor"])
            {
                add(
                    "Pillar 2",
                    RiskLevel::Medium,
                    "Risk exposure logic without supervisory monitoring",
                    format!("Credit or capital logic without monitoring in {}", filename),
                    &["Add stress testing", "Monitor exposure limits"],
                );
            }
        }
        ComplianceFramework::PciDss => {
            if any_term(&content, &["card", "credit", "payment", "pan"])
                && !any_term(&content, &["encrypt", "hash"])
            {
                add(
                    "Req. 3",
                    RiskLevel::High,
                    "Cardholder data without cryptographic protection",
                    format!("Unencrypted payment data in {}", filename),
                    &["Encrypt cardholder data", "Apply tokenization"],
                );
            }
            if let Some(issue) = subject
                .security_issues
                .iter()
                .find(|i| i.issue_type == "hardcoded_secrets")
            {
                add(
                    "Req. 2",
                    RiskLevel::High,
                    "Hardcoded credentials or vendor-supplied secrets",
                    format!("{} line {}: {}", filename, issue.line_number, issue.line_text),
                    &["Move secrets to a vault", "Rotate exposed credentials"],
                );
            }
        }
    }

    violations
}

/// `max(0, 80 − 15·violations)`
pub fn fallback_score(violations: usize) -> f64 {
    clamp_score(FALLBACK_BASE_SCORE - FALLBACK_VIOLATION_PENALTY * violations as f64)
}

/// Check one file against one framework. The error, if any, is the
/// classifier failure that forced local rules.
pub fn check_framework(
    framework: &FrameworkInfo,
    subject: &FileSubject,
    classifier: &dyn RiskClassifier,
    max_excerpt_chars: usize,
) -> (FrameworkCheck, Option<ClassifierError>) {
    let prompt = classifier::compliance_prompt(
        framework,
        subject.filename,
        subject.file_type,
        classifier::excerpt(subject.content, max_excerpt_chars),
    );
    let ai_result = classifier
        .classify(&prompt)
        .and_then(|value| AiComplianceVerdict::from_value(&value));

    match ai_result {
        Ok(verdict) => {
            let violations = verdict
                .violations
                .into_iter()
                .map(|v| ComplianceViolation {
                    framework: framework.id,
                    article: v.article,
                    description: v.description,
                    severity: v.severity,
                    filename: subject.filename.to_string(),
                    evidence: v.evidence,
                    remediation: v.remediation,
                })
                .collect();
            (
                FrameworkCheck {
                    framework: framework.id,
                    filename: subject.filename.to_string(),
                    compliance_score: verdict.compliance_score,
                    violations,
                    recommendations: verdict.recommendations,
                    mode: AnalysisMode::Ai,
                },
                None,
            )
        }
        Err(e) => {
            debug!(
                "Compliance check {} on {} fell back to local rules: {}",
                framework.id, subject.filename, e
            );
            let violations = local_violations(framework.id, subject);
            (
                FrameworkCheck {
                    framework: framework.id,
                    filename: subject.filename.to_string(),
                    compliance_score: fallback_score(violations.len()),
                    violations,
                    recommendations: vec![format!("Review {} manually", framework.name)],
                    mode: AnalysisMode::Fallback,
                },
                Some(e),
            )
        }
    }
}

/// Aggregate per-file checks into the system compliance report
pub fn build_report(checks: &[FrameworkCheck], catalog: &Catalog) -> ComplianceReport {
    let mut frameworks = Vec::new();
    let mut penalty_exposure = Vec::new();

    for info in catalog.frameworks() {
        let framework_checks: Vec<&FrameworkCheck> =
            checks.iter().filter(|c| c.framework == info.id).collect();
        if framework_checks.is_empty() {
            continue;
        }

        let score = clamp_score(
            framework_checks.iter().map(|c| c.compliance_score).sum::<f64>()
                / framework_checks.len() as f64,
        );
        let violations: Vec<&ComplianceViolation> =
            framework_checks.iter().flat_map(|c| c.violations.iter()).collect();

        let mut articles_violated: Vec<String> = Vec::new();
        for v in &violations {
            if !articles_violated.contains(&v.article) {
                articles_violated.push(v.article.clone());
            }
        }

        if let Some(highest_severity) = violations.iter().map(|v| v.severity).max() {
            penalty_exposure.push(PenaltyExposure {
                framework: info.id,
                name: info.name.clone(),
                violations: violations.len(),
                highest_severity,
                penalty: info.penalty.clone(),
            });
        }

        frameworks.push(FrameworkCompliance {
            framework: info.id,
            name: info.name.clone(),
            score,
            status: ComplianceStatus::from_score(score),
            violations_count: violations.len(),
            articles_violated,
            penalty: info.penalty.clone(),
        });
    }

    let overall_score = if frameworks.is_empty() {
        100.0
    } else {
        clamp_score(frameworks.iter().map(|f| f.score).sum::<f64>() / frameworks.len() as f64)
    };

    let violations: Vec<ComplianceViolation> =
        checks.iter().flat_map(|c| c.violations.iter().cloned()).collect();

    ComplianceReport {
        overall_score,
        status: ComplianceStatus::from_score(overall_score),
        frameworks,
        remediation_timeline: remediation_timeline(&violations),
        violations,
        penalty_exposure,
    }
}

pub fn remediation_timeline(violations: &[ComplianceViolation]) -> RemediationTimeline {
    let mut details: Vec<RemediationItem> = violations
        .iter()
        .map(|v| {
            let urgency = Urgency::for_severity(v.severity);
            RemediationItem {
                framework: v.framework,
                article: v.article.clone(),
                filename: v.filename.clone(),
                severity: v.severity,
                urgency,
                timeline: urgency.label().to_string(),
            }
        })
        .collect();
    // Stable: keeps discovery order inside each urgency bucket
    details.sort_by_key(|d| d.urgency);

    let count = |u: Urgency| details.iter().filter(|d| d.urgency == u).count();
    let immediate = count(Urgency::Immediate);
    let short_term = count(Urgency::ShortTerm);
    let medium_term = count(Urgency::MediumTerm);

    let estimated_total_time = if medium_term > 0 {
        "1-3 months"
    } else if short_term > 0 {
        "2-4 weeks"
    } else if immediate > 0 {
        "1-2 weeks"
    } else {
        "No remediation required"
    };

    RemediationTimeline {
        immediate,
        short_term,
        medium_term,
        estimated_total_time: estimated_total_time.to_string(),
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogVersion;
    use crate::classifier::DisabledClassifier;
    use crate::Severity;
    use serde_json::json;

    fn subject<'a>(filename: &'a str, content: &'a str, issues: &'a [SecurityIssue]) -> FileSubject<'a> {
        FileSubject {
            filename,
            file_type: "Python",
            content,
            security_issues: issues,
        }
    }

    fn articles(violations: &[ComplianceViolation]) -> Vec<&str> {
        violations.iter().map(|v| v.article.as_str()).collect()
    }

    struct FixedClassifier(serde_json::Value);

    impl RiskClassifier for FixedClassifier {
        fn name(&self) -> &str {
            "fixed"
        }
        fn classify(&self, _prompt: &str) -> Result<serde_json::Value, ClassifierError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_eu_ai_act_rules() {
        let s = subject("agent.py", "result = model.predict(x)", &[]);
        assert_eq!(
            articles(&local_violations(ComplianceFramework::EuAiAct, &s)),
            vec!["Art. 14", "Art. 13"]
        );

        let s = subject("agent.py", "predict then ask human approval; explain", &[]);
        assert!(local_violations(ComplianceFramework::EuAiAct, &s).is_empty());
    }

    #[test]
    fn test_lgpd_rules() {
        let s = subject("users.py", "user.email = form['email']\nhealth_record = load()", &[]);
        let v = local_violations(ComplianceFramework::LgpdBrazil, &s);
        assert_eq!(articles(&v), vec!["Art. 7", "Art. 9"]);
        assert!(v.iter().all(|v| v.severity == RiskLevel::High));

        let s = subject("users.py", "email collected with consent", &[]);
        assert!(local_violations(ComplianceFramework::LgpdBrazil, &s).is_empty());
    }

    #[test]
    fn test_gdpr_rule() {
        let s = subject("users.py", "store personal data", &[]);
        assert_eq!(articles(&local_violations(ComplianceFramework::GdprEu, &s)), vec!["Art. 32"]);
        let s = subject("users.py", "store personal data with encrypt()", &[]);
        assert!(local_violations(ComplianceFramework::GdprEu, &s).is_empty());
    }

    #[test]
    fn test_sox_and_basel_rules() {
        let s = subject("ledger.py", "post transaction to ledger", &[]);
        let v = local_violations(ComplianceFramework::SoxUs, &s);
        assert_eq!(articles(&v), vec!["Sec. 404"]);
        assert_eq!(v[0].severity, RiskLevel::Medium);

        let s = subject("risk.py", "compute capital exposure; monitor limits", &[]);
        assert!(local_violations(ComplianceFramework::BaselIii, &s).is_empty());
    }

    #[test]
    fn test_pci_dss_rules() {
        let issues = vec![SecurityIssue {
            issue_type: "hardcoded_secrets".to_string(),
            line_number: 2,
            line_text: "api_key = \"sk-live\"".to_string(),
            severity: Severity::High,
            description: String::new(),
        }];
        let s = subject("pay.py", "charge(card)\napi_key = \"sk-live\"", &issues);
        let v = local_violations(ComplianceFramework::PciDss, &s);
        assert_eq!(articles(&v), vec!["Req. 3", "Req. 2"]);
        assert_eq!(v[1].evidence, vec!["pay.py line 2: api_key = \"sk-live\""]);
    }

    #[test]
    fn test_fallback_score() {
        assert_eq!(fallback_score(0), 80.0);
        assert_eq!(fallback_score(2), 50.0);
        assert_eq!(fallback_score(6), 0.0);
    }

    #[test]
    fn test_check_falls_back_when_disabled() {
        let catalog = Catalog::builtin(CatalogVersion::Core).unwrap();
        let info = catalog.framework(ComplianceFramework::EuAiAct).unwrap();
        let s = subject("agent.py", "decision = classify(x)", &[]);
        let (check, err) = check_framework(info, &s, &DisabledClassifier::new("off"), 1000);
        assert_eq!(check.mode, AnalysisMode::Fallback);
        assert_eq!(check.compliance_score, 50.0);
        assert!(matches!(err, Some(ClassifierError::Disabled(_))));
    }

    #[test]
    fn test_check_uses_classifier_answer() {
        let catalog = Catalog::builtin(CatalogVersion::Core).unwrap();
        let info = catalog.framework(ComplianceFramework::GdprEu).unwrap();
        let classifier = FixedClassifier(json!({
            "violations": [{"article": "Art. 25", "description": "No privacy by design", "severity": "MEDIUM"}],
            "compliance_score": 62
        }));
        let s = subject("users.py", "", &[]);
        let (check, err) = check_framework(info, &s, &classifier, 1000);
        assert!(err.is_none());
        assert_eq!(check.mode, AnalysisMode::Ai);
        assert_eq!(check.compliance_score, 62.0);
        assert_eq!(check.violations[0].article, "Art. 25");
        assert_eq!(check.violations[0].filename, "users.py");
    }

    #[test]
    fn test_report_aggregation() {
        let catalog = Catalog::builtin(CatalogVersion::Core).unwrap();
        let classifier = DisabledClassifier::new("off");
        let files = [
            ("agent.py", "decision = classify(x)"),
            ("notes.py", "explain everything"),
        ];

        let mut checks = Vec::new();
        for (filename, content) in files {
            for info in catalog.frameworks() {
                let s = subject(filename, content, &[]);
                checks.push(check_framework(info, &s, &classifier, 1000).0);
            }
        }
        let report = build_report(&checks, &catalog);

        let eu = report
            .frameworks
            .iter()
            .find(|f| f.framework == ComplianceFramework::EuAiAct)
            .unwrap();
        // agent.py: two violations (50), notes.py: none (80)
        assert_eq!(eu.score, 65.0);
        assert_eq!(eu.status, ComplianceStatus::Attention);
        assert_eq!(eu.articles_violated, vec!["Art. 14", "Art. 13"]);
        assert_eq!(report.frameworks.len(), 6);
        assert!(report.overall_score >= 0.0 && report.overall_score <= 100.0);
        assert_eq!(report.penalty_exposure.len(), 1);
        assert_eq!(report.penalty_exposure[0].highest_severity, RiskLevel::High);
    }

    #[test]
    fn test_remediation_timeline_ordering() {
        let violation = |article: &str, severity| ComplianceViolation {
            framework: ComplianceFramework::EuAiAct,
            article: article.to_string(),
            description: String::new(),
            severity,
            filename: "a.py".to_string(),
            evidence: vec![],
            remediation: vec![],
        };
        let timeline = remediation_timeline(&[
            violation("Art. 13", RiskLevel::Medium),
            violation("Art. 14", RiskLevel::High),
            violation("Art. 99", RiskLevel::Low),
        ]);
        assert_eq!((timeline.immediate, timeline.short_term, timeline.medium_term), (1, 1, 1));
        assert_eq!(timeline.estimated_total_time, "1-3 months");
        let order: Vec<&str> = timeline.details.iter().map(|d| d.article.as_str()).collect();
        assert_eq!(order, vec!["Art. 14", "Art. 13", "Art. 99"]);
        assert_eq!(timeline.details[0].timeline, "Immediate (0-30 days)");
    }

    #[test]
    fn test_empty_timeline() {
        let timeline = remediation_timeline(&[]);
        assert_eq!(timeline.estimated_total_time, "No remediation required");
        assert!(timeline.details.is_empty());
    }

    #[test]
    fn test_status_thresholds() {
        assert_eq!(ComplianceStatus::from_score(80.0), ComplianceStatus::Compliant);
        assert_eq!(ComplianceStatus::from_score(60.0), ComplianceStatus::Attention);
        assert_eq!(ComplianceStatus::from_score(59.9), ComplianceStatus::NonCompliant);
    }
}
