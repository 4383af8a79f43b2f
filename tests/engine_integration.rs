use agentrisk::analyzer::{ScoringProfile, FALLBACK_EVIDENCE};
use agentrisk::catalog::{Catalog, CatalogVersion, ComplianceFramework};
use agentrisk::classifier::RiskClassifier;
use agentrisk::decode::TextEncoding;
use agentrisk::error::ClassifierError;
use agentrisk::{AnalysisMode, Classification, Engine, EngineError, RiskLevel, UploadedFile};
use serde_json::json;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Answers every risk with a fixed score unless the prompt names `fail_on`
struct MockClassifier {
    score: f64,
    fail_on: Option<&'static str>,
    panic_on: Option<&'static str>,
}

impl MockClassifier {
    fn scoring(score: f64) -> Self {
        Self {
            score,
            fail_on: None,
            panic_on: None,
        }
    }
}

impl RiskClassifier for MockClassifier {
    fn name(&self) -> &str {
        "mock"
    }

    fn classify(&self, prompt: &str) -> Result<serde_json::Value, ClassifierError> {
        if let Some(name) = self.panic_on {
            if prompt.contains(name) {
                panic!("mock classifier crashed on {}", name);
            }
        }
        if let Some(name) = self.fail_on {
            if prompt.contains(name) {
                return Err(ClassifierError::Status(503));
            }
        }
        if prompt.contains("compliance_score") {
            return Ok(json!({"violations": [], "compliance_score": 85}));
        }
        Ok(risk_answer(self.score))
    }
}

/// One answer that satisfies every non-compliance prompt
fn risk_answer(score: f64) -> serde_json::Value {
    json!({
        "score": score,
        "evidence": ["mock evidence"],
        "technical_details": "mock",
        "recommendations": ["mock fix"],
        "category": "business_logic",
        "criticality": "high",
        "security_score": 35,
        "risk_score": 45,
        "critical_dependencies": ["requests"],
        "maintainability_score": 65,
        "risk_hotspots": ["mock hotspot"]
    })
}

/// Answers risk prompts but rejects every compliance prompt, counting them
struct ComplianceOutage {
    compliance_calls: Arc<AtomicUsize>,
}

impl RiskClassifier for ComplianceOutage {
    fn name(&self) -> &str {
        "compliance-outage"
    }

    fn classify(&self, prompt: &str) -> Result<serde_json::Value, ClassifierError> {
        if prompt.contains("compliance_score") {
            self.compliance_calls.fetch_add(1, Ordering::SeqCst);
            return Err(ClassifierError::Status(503));
        }
        Ok(risk_answer(50.0))
    }
}

/// Always down, counting calls
struct DownClassifier {
    calls: Arc<AtomicUsize>,
}

impl RiskClassifier for DownClassifier {
    fn name(&self) -> &str {
        "down"
    }

    fn classify(&self, _prompt: &str) -> Result<serde_json::Value, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ClassifierError::Status(503))
    }
}

fn catalog() -> Catalog {
    Catalog::builtin(CatalogVersion::Core).unwrap()
}

fn offline_engine() -> Engine {
    Engine::offline(catalog(), ScoringProfile::Standard)
}

fn scenario_files() -> Vec<UploadedFile> {
    vec![
        UploadedFile::from_text("config.json", "password = \"x\""),
        UploadedFile::from_text("api.py", "def handle_request(): eval(input())"),
    ]
}

#[test]
fn integration_config_secret_and_unauthenticated_api() {
    let analysis = offline_engine().analyze_system(&scenario_files()).unwrap();

    let config = analysis.file("config.json").unwrap();
    let api = analysis.file("api.py").unwrap();
    assert_eq!(config.classification, Classification::Configuration);
    assert_eq!(api.classification, Classification::ApiLayer);

    assert!(analysis.cross_file_risks.len() >= 2);
    let exposure = analysis
        .cross_file_risks
        .iter()
        .find(|r| r.risk_type == "credentials_exposure")
        .unwrap();
    assert_eq!(exposure.affected_files, vec!["api.py"]);
    assert_eq!(exposure.severity, RiskLevel::High);
    assert!(analysis
        .cross_file_risks
        .iter()
        .any(|r| r.risk_type == "api_without_auth"));

    let eval_issue = api
        .security_issues
        .iter()
        .find(|i| i.issue_type == "dangerous_functions")
        .unwrap();
    assert_eq!(eval_issue.line_number, 1);

    // 20 + 20*0.6 + 30
    assert!((config.file_score - 62.0).abs() < 1e-9);
    // 20 + mean(9x30, 50)*0.6 + 30
    assert!((api.file_score - 69.2).abs() < 1e-9);

    let average = (config.file_score + api.file_score) / 2.0;
    assert!(analysis.global_score > average);
    assert!((analysis.global_score - (average + 30.0)).abs() < 1e-9);
    assert_eq!(analysis.global_level, RiskLevel::High);
    assert_eq!(analysis.architecture.completeness, 25.0);
}

#[test]
fn integration_api_with_security_layer_has_no_auth_risk() {
    let files = vec![
        UploadedFile::from_text("api.py", "@app.route('/x')\ndef x(): pass"),
        UploadedFile::from_text("auth.py", "def login(user): check(user)"),
    ];
    let analysis = offline_engine().analyze_system(&files).unwrap();
    assert!(analysis
        .cross_file_risks
        .iter()
        .all(|r| r.risk_type != "api_without_auth"));
}

#[test]
fn integration_whitespace_auth_placeholder_counts_as_security_layer() {
    let files = vec![
        UploadedFile::from_text("api.py", "@app.route('/x')\ndef x(): pass"),
        UploadedFile::from_text("auth.py", "\n"),
    ];
    let analysis = offline_engine().analyze_system(&files).unwrap();

    assert_eq!(analysis.files_analyzed, 2);
    assert!(analysis.skipped_files.is_empty());
    assert_eq!(
        analysis.file("auth.py").unwrap().classification,
        Classification::Security
    );
    assert!(analysis
        .cross_file_risks
        .iter()
        .all(|r| r.risk_type != "api_without_auth"));
}

#[test]
fn integration_enterprise_keyword_weight_in_combined_score() {
    let engine = Engine::offline(catalog(), ScoringProfile::Enterprise);
    let analysis = engine
        .analyze_system(&[UploadedFile::from_text("agent.py", "goal = 1")])
        .unwrap();

    let goal = analysis.files_data[0]
        .risk_assessments
        .iter()
        .find(|a| a.risk_id == "AGR001")
        .unwrap();
    assert_eq!(goal.keyword_score, 15.0);
    // 30 * 0.7 + 15 * 0.2
    assert!((goal.score - 24.0).abs() < 1e-9);
}

#[test]
fn integration_classifier_reviews_fill_every_section() {
    let engine = Engine::new(catalog(), ScoringProfile::Standard, Box::new(MockClassifier::scoring(40.0)));
    let analysis = engine
        .analyze_system(&[
            UploadedFile::from_text("client.py", "import requests\nrequests.get(url)\n"),
            UploadedFile::from_text("notes.md", "plain text"),
        ])
        .unwrap();

    let client = analysis.file("client.py").unwrap();
    assert_eq!(client.mode, AnalysisMode::Ai);
    assert_eq!(client.profile.category, "business_logic");
    assert_eq!(client.profile.criticality, RiskLevel::High);
    assert_eq!(client.security_review.security_score, 35.0);
    let deps = client.dependency_risk.as_ref().unwrap();
    assert_eq!(deps.dependencies, vec!["requests"]);
    assert_eq!(deps.risk_score, 45.0);
    assert_eq!(deps.critical_dependencies, vec!["requests"]);
    assert!(analysis.file("notes.md").unwrap().dependency_risk.is_none());

    assert_eq!(analysis.system_review.mode, AnalysisMode::Ai);
    assert_eq!(analysis.system_review.maintainability_score, 65.0);
    assert_eq!(analysis.system_review.risk_hotspots, vec!["mock hotspot"]);
    assert!(analysis.warnings.is_empty());
    assert_eq!(analysis.mode, AnalysisMode::Ai);
}

#[test]
fn integration_offline_system_review_lists_hotspots() {
    let analysis = offline_engine().analyze_system(&scenario_files()).unwrap();
    let review = &analysis.system_review;
    assert_eq!(review.mode, AnalysisMode::Fallback);
    assert_eq!(review.maintainability_score, 50.0);
    // Both files stay MEDIUM; only the HIGH cross-file findings remain
    assert_eq!(
        review.risk_hotspots,
        vec!["credentials_exposure", "api_without_auth"]
    );
}

#[test]
fn integration_classifier_failure_degrades_to_fallback() {
    let calls = Arc::new(AtomicUsize::new(0));
    let engine = Engine::new(
        catalog(),
        ScoringProfile::Standard,
        Box::new(DownClassifier {
            calls: Arc::clone(&calls),
        }),
    );

    let analysis = engine.analyze_system(&scenario_files()).unwrap();

    assert_eq!(analysis.mode, AnalysisMode::Fallback);
    assert_eq!(analysis.files_analyzed, 2);
    for file in &analysis.files_data {
        assert_eq!(file.risk_assessments.len(), 10);
        assert!(file
            .risk_assessments
            .iter()
            .all(|a| a.evidence.iter().any(|e| e == FALLBACK_EVIDENCE)));
        assert_eq!(file.warnings.len(), 1);
        assert!(file.warnings[0].contains("503"));
        assert_eq!(file.compliance_checks.len(), 6);
    }
    // One failed call per file plus the system review
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(analysis.system_review.mode, AnalysisMode::Fallback);
    assert_eq!(analysis.warnings.len(), 1);
    assert!(analysis.warnings[0].contains("503"));

    // Fallback compliance still flags the hardcoded secret under PCI DSS
    assert!(analysis
        .compliance
        .violations
        .iter()
        .any(|v| v.framework == ComplianceFramework::PciDss && v.article == "Req. 2"));
}

#[test]
fn integration_compliance_outage_stops_after_first_failure() {
    let compliance_calls = Arc::new(AtomicUsize::new(0));
    let engine = Engine::new(
        catalog(),
        ScoringProfile::Standard,
        Box::new(ComplianceOutage {
            compliance_calls: Arc::clone(&compliance_calls),
        }),
    );
    let analysis = engine
        .analyze_system(&[UploadedFile::from_text("agent.py", "x = 1")])
        .unwrap();

    let file = &analysis.files_data[0];
    assert_eq!(compliance_calls.load(Ordering::SeqCst), 1);
    assert_eq!(file.compliance_checks.len(), 6);
    assert!(file.compliance_checks.iter().all(|c| c.mode == AnalysisMode::Fallback));
    assert!(file.risk_assessments.iter().all(|a| a.source == AnalysisMode::Ai));
    assert_eq!(file.mode, AnalysisMode::Mixed);
    assert_eq!(file.warnings.len(), 1);
    assert!(file.warnings[0].contains("503"));
}

#[test]
fn integration_one_file_failure_does_not_affect_others() {
    let engine = Engine::new(
        catalog(),
        ScoringProfile::Standard,
        Box::new(MockClassifier {
            score: 60.0,
            fail_on: Some("bad.py"),
            panic_on: None,
        }),
    );
    let files = vec![
        UploadedFile::from_text("good.py", "x = 1"),
        UploadedFile::from_text("bad.py", "y = 2"),
    ];
    let analysis = engine.analyze_system(&files).unwrap();

    let good = analysis.file("good.py").unwrap();
    let bad = analysis.file("bad.py").unwrap();
    assert_eq!(good.mode, AnalysisMode::Ai);
    assert!(good.warnings.is_empty());
    assert!(good.risk_assessments.iter().all(|a| a.ai_score == Some(60.0)));
    assert_eq!(bad.mode, AnalysisMode::Fallback);
    assert_eq!(analysis.mode, AnalysisMode::Mixed);
}

#[test]
fn integration_classifier_scores_drive_assessments() {
    let engine = Engine::new(catalog(), ScoringProfile::Standard, Box::new(MockClassifier::scoring(90.0)));
    let analysis = engine
        .analyze_system(&[UploadedFile::from_text("agent.py", "x = 1")])
        .unwrap();

    let file = &analysis.files_data[0];
    for assessment in &file.risk_assessments {
        // 90 * 0.7, no pattern evidence
        assert!((assessment.score - 63.0).abs() < 1e-9);
        assert_eq!(assessment.level, RiskLevel::Medium);
        assert_eq!(assessment.evidence, vec!["mock evidence"]);
    }
    assert_eq!(analysis.compliance.overall_score, 85.0);
    assert_eq!(analysis.classifier, "mock");
}

#[test]
fn integration_no_valid_files() {
    let files = vec![
        UploadedFile::new("a.py", Vec::new()),
        UploadedFile::new("b.py", Vec::new()),
    ];
    match offline_engine().analyze_system(&files) {
        Err(EngineError::NoValidFiles { skipped }) => {
            let names: Vec<&str> = skipped.iter().map(|s| s.filename.as_str()).collect();
            assert_eq!(names, vec!["a.py", "b.py"]);
        }
        Ok(_) => panic!("expected NoValidFiles"),
        Err(e) => panic!("unexpected error: {}", e),
    }
}

#[test]
fn integration_latin1_file_is_decoded() {
    // "password = 'café'" in latin-1
    let mut bytes = b"password = 'caf".to_vec();
    bytes.push(0xE9);
    bytes.extend_from_slice(b"'");
    let analysis = offline_engine()
        .analyze_system(&[UploadedFile::new("legacy.py", bytes)])
        .unwrap();

    let file = &analysis.files_data[0];
    assert_eq!(file.encoding, TextEncoding::Latin1);
    assert!(file.content_preview.contains("café"));
    assert_eq!(file.security_issues.len(), 1);
}

#[test]
fn integration_repeat_runs_are_identical() {
    let engine = offline_engine();
    let first = engine.analyze_system(&scenario_files()).unwrap();
    let second = engine.analyze_system(&scenario_files()).unwrap();

    assert_eq!(first.files_data, second.files_data);
    assert_eq!(first.analysis_hash, second.analysis_hash);
    assert_eq!(first.global_score, second.global_score);
    assert_ne!(first.id, second.id);
}

#[tokio::test]
async fn integration_concurrent_matches_sequential() {
    let engine = Arc::new(offline_engine());
    let mut files = scenario_files();
    for i in 0..8 {
        files.push(UploadedFile::from_text(
            format!("module_{}.py", i),
            &format!("import os\n# goal {}\nresult = compute()\n", i),
        ));
    }

    let sequential = engine.analyze_system(&files).unwrap();
    let concurrent = Arc::clone(&engine)
        .analyze_system_concurrent(files, 3)
        .await
        .unwrap();

    assert_eq!(sequential.files_data, concurrent.files_data);
    assert_eq!(sequential.cross_file_risks, concurrent.cross_file_risks);
    assert_eq!(sequential.global_score, concurrent.global_score);
    assert_eq!(sequential.analysis_hash, concurrent.analysis_hash);
}

#[tokio::test]
async fn integration_crashed_worker_only_skips_its_file() {
    let engine = Arc::new(Engine::new(
        catalog(),
        ScoringProfile::Standard,
        Box::new(MockClassifier {
            score: 40.0,
            fail_on: None,
            panic_on: Some("boom.py"),
        }),
    ));
    let files = vec![
        UploadedFile::from_text("ok.py", "x = 1"),
        UploadedFile::from_text("boom.py", "y = 2"),
    ];

    let analysis = engine.analyze_system_concurrent(files, 2).await.unwrap();
    assert_eq!(analysis.files_analyzed, 1);
    assert_eq!(analysis.files_data[0].filename, "ok.py");
    assert_eq!(analysis.skipped_files.len(), 1);
    assert_eq!(analysis.skipped_files[0].filename, "boom.py");
    assert!(analysis.skipped_files[0].reason.contains("worker"));
}

#[test]
fn integration_custom_catalog_file() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    write!(
        file,
        r#"
version: custom/1
risks:
  - id: CUS001
    name: Ticket Escalation
    category: Operations
    compliance_frameworks: [SOX_US]
    keywords: [escalate]
    severity_indicators: [auto_close]
security_patterns:
  - category: hardcoded_secrets
    severity: MEDIUM
    description: Hardcoded credential
    patterns: ['(?i)\bpin\s*=\s*\d+']
frameworks:
  - id: SOX_US
    name: SOX
    penalty: Fines
"#
    )
    .unwrap();

    let catalog = Catalog::load_from_file(file.path(), CatalogVersion::Core).unwrap();
    let engine = Engine::offline(catalog, ScoringProfile::Standard);
    let analysis = engine
        .analyze_system(&[UploadedFile::from_text("tickets.py", "escalate(); pin = 1234")])
        .unwrap();

    let file = &analysis.files_data[0];
    assert_eq!(analysis.catalog_version, "custom/1");
    assert_eq!(file.risk_pattern_scores["CUS001"].score, 20.0);
    // 20 + 20*0.6 + 15 (MEDIUM issue)
    assert!((file.file_score - 47.0).abs() < 1e-9);
    assert_eq!(analysis.compliance.frameworks.len(), 1);
}
