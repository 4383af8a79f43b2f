//! Analysis engine
//!
//! Runs the per-file pipeline (decode, classify, detect, scan, score,
//! assess) and aggregates files into a [`SystemAnalysis`].

pub mod classify;
pub mod correlator;
pub mod detector;
pub mod risk_scorer;
pub mod scanner;

pub use correlator::{ArchitectureAssessment, CrossFileAnalysis, CrossFileRisk};
pub use detector::PatternScore;
pub use risk_scorer::ScoringProfile;
pub use scanner::SecurityIssue;

use crate::catalog::{Catalog, ComplianceFramework, RiskCatalogEntry};
use crate::classifier::reviews::{
    DependencyRisk, FileProfile, SecurityReview, SystemContext, SystemReview,
    PROFILE_EXCERPT_CHARS, SECURITY_EXCERPT_CHARS,
};
use crate::classifier::{self, AiRiskVerdict, ClassifierSession, DisabledClassifier, RiskClassifier};
use crate::compliance::{self, ComplianceReport, FileSubject, FrameworkCheck};
use crate::config::AppConfig;
use crate::decode::{self, TextEncoding};
use crate::error::{EngineError, SkippedFile};
use crate::{AnalysisMode, Classification, LevelScheme, RiskLevel, UploadedFile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Characters of content kept on each file for reports
pub const PREVIEW_CHARS: usize = 1000;
/// Highest-scoring assessments listed on the system result
pub const TOP_RISKS: usize = 5;
pub const FALLBACK_EVIDENCE: &str = "AI analysis unavailable - default score applied";

/// One catalog risk assessed on one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_id: String,
    pub risk_name: String,
    pub category: String,
    /// Blend of classifier and pattern evidence, 0-100
    pub score: f64,
    pub level: RiskLevel,
    pub pattern_score: f64,
    /// Unclamped keyword and indicator sums feeding `score`
    pub keyword_score: f64,
    pub severity_score: f64,
    /// None when the classifier did not answer
    pub ai_score: Option<f64>,
    pub matched_patterns: Vec<String>,
    pub evidence: Vec<String>,
    pub technical_details: String,
    pub recommendations: Vec<String>,
    pub compliance_frameworks: Vec<ComplianceFramework>,
    pub remediation_priority: u8,
    pub estimated_cost: String,
    pub timeline: String,
    pub source: AnalysisMode,
}

/// Everything known about one analyzed file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub filename: String,
    pub file_type: String,
    pub classification: Classification,
    pub encoding: TextEncoding,
    pub lines_count: usize,
    pub char_count: usize,
    pub risk_pattern_scores: BTreeMap<String, PatternScore>,
    pub security_issues: Vec<SecurityIssue>,
    pub file_score: f64,
    pub risk_level: RiskLevel,
    pub risk_assessments: Vec<RiskAssessment>,
    pub compliance_checks: Vec<FrameworkCheck>,
    pub dependencies: Vec<String>,
    pub profile: FileProfile,
    pub security_review: SecurityReview,
    /// None when the file imports nothing
    pub dependency_risk: Option<DependencyRisk>,
    pub mode: AnalysisMode,
    pub warnings: Vec<String>,
    /// First [`PREVIEW_CHARS`] characters, with "..." when cut
    pub content_preview: String,
}

#[cfg(test)]
impl FileAnalysis {
    /// Minimal analysis for correlator and scorer tests
    pub(crate) fn stub(filename: &str, classification: Classification) -> Self {
        Self {
            filename: filename.to_string(),
            file_type: classify::file_type(filename).to_string(),
            classification,
            encoding: TextEncoding::Utf8,
            lines_count: 0,
            char_count: 0,
            risk_pattern_scores: BTreeMap::new(),
            security_issues: vec![],
            file_score: 0.0,
            risk_level: RiskLevel::Low,
            risk_assessments: vec![],
            compliance_checks: vec![],
            dependencies: vec![],
            profile: FileProfile::fallback(classification),
            security_review: SecurityReview::fallback(),
            dependency_risk: None,
            mode: AnalysisMode::Fallback,
            warnings: vec![],
            content_preview: String::new(),
        }
    }
}

/// Highest-scoring per-risk assessments across the system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopRisk {
    pub filename: String,
    pub risk_id: String,
    pub risk_name: String,
    pub score: f64,
    pub level: RiskLevel,
}

/// Result of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemAnalysis {
    pub id: Uuid,
    pub analysis_date: DateTime<Utc>,
    /// First 8 hex chars of SHA-256 over `files_data`
    pub analysis_hash: String,
    pub catalog_version: String,
    pub profile: ScoringProfile,
    pub classifier: String,
    pub mode: AnalysisMode,
    pub files_analyzed: usize,
    pub total_lines: usize,
    /// Upload order
    pub files_data: Vec<FileAnalysis>,
    pub skipped_files: Vec<SkippedFile>,
    pub cross_file_risks: Vec<CrossFileRisk>,
    pub architecture: ArchitectureAssessment,
    pub global_score: f64,
    pub global_level: RiskLevel,
    pub compliance: ComplianceReport,
    pub top_risks: Vec<TopRisk>,
    pub system_review: SystemReview,
    /// Run-level warnings; per-file warnings stay on each file
    pub warnings: Vec<String>,
}

impl SystemAnalysis {
    pub fn file(&self, filename: &str) -> Option<&FileAnalysis> {
        self.files_data.iter().find(|f| f.filename == filename)
    }
}

/// The scoring engine. Immutable once built; share it behind an `Arc`.
pub struct Engine {
    catalog: Catalog,
    profile: ScoringProfile,
    level_scheme: LevelScheme,
    classifier: Box<dyn RiskClassifier>,
    max_excerpt_chars: usize,
    max_file_bytes: u64,
}

impl Engine {
    pub fn new(catalog: Catalog, profile: ScoringProfile, classifier: Box<dyn RiskClassifier>) -> Self {
        Self {
            catalog,
            profile,
            level_scheme: profile.level_scheme(),
            classifier,
            max_excerpt_chars: PREVIEW_CHARS,
            max_file_bytes: u64::MAX,
        }
    }

    /// Engine with no classifier: local scoring only
    pub fn offline(catalog: Catalog, profile: ScoringProfile) -> Self {
        Self::new(
            catalog,
            profile,
            Box::new(DisabledClassifier::new("offline mode")),
        )
    }

    /// Build catalog and classifier from configuration
    pub fn from_config(config: &AppConfig) -> Result<Self, EngineError> {
        let analysis = &config.analysis;
        let catalog = match &analysis.catalog_file {
            Some(path) => Catalog::load_from_file(path, analysis.catalog_version)?,
            None => Catalog::builtin(analysis.catalog_version)?,
        };
        info!(
            "Loaded catalog {} ({} risks, {})",
            catalog.version(),
            catalog.risks().len(),
            analysis.catalog_version
        );

        Ok(Self::new(catalog, analysis.profile, classifier::from_config(&config.classifier))
            .with_max_excerpt_chars(config.classifier.max_excerpt_chars)
            .with_max_file_bytes(analysis.max_file_bytes))
    }

    pub fn with_max_excerpt_chars(mut self, max_excerpt_chars: usize) -> Self {
        self.max_excerpt_chars = max_excerpt_chars;
        self
    }

    pub fn with_max_file_bytes(mut self, max_file_bytes: u64) -> Self {
        self.max_file_bytes = max_file_bytes;
        self
    }

    /// Override the profile's level scheme
    pub fn with_level_scheme(mut self, level_scheme: LevelScheme) -> Self {
        self.level_scheme = level_scheme;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn profile(&self) -> ScoringProfile {
        self.profile
    }

    pub fn level_scheme(&self) -> LevelScheme {
        self.level_scheme
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    pub fn classifier_enabled(&self) -> bool {
        self.classifier.is_enabled()
    }

    /// Analyze one uploaded file. `Err` means the file was skipped.
    pub fn analyze_file(&self, file: &UploadedFile) -> Result<FileAnalysis, SkippedFile> {
        if file.bytes.len() as u64 > self.max_file_bytes {
            return Err(SkippedFile {
                filename: file.filename.clone(),
                reason: format!("file exceeds {} bytes", self.max_file_bytes),
            });
        }

        let (content, encoding) = decode::decode_bytes(&file.bytes);
        if content.is_empty() {
            return Err(SkippedFile {
                filename: file.filename.clone(),
                reason: "empty file after decoding".to_string(),
            });
        }

        debug!("Analyzing {} ({}, {} bytes)", file.filename, encoding, file.bytes.len());
        Ok(self.analyze_content(&file.filename, &content, encoding))
    }

    /// Analyze already-decoded text
    pub fn analyze_content(&self, filename: &str, content: &str, encoding: TextEncoding) -> FileAnalysis {
        let mut warnings = Vec::new();
        if encoding == TextEncoding::Lossy {
            warnings.push("content is not valid text in any supported encoding, decoded lossily".to_string());
        }

        let file_type = classify::file_type(filename);
        let classification = classify::classify(filename, content);
        let risk_pattern_scores = detector::detect(content, &self.catalog, self.profile);
        let security_issues = scanner::scan(content, &self.catalog);
        let file_score =
            risk_scorer::file_score(&risk_pattern_scores, &security_issues, content, &self.catalog);

        let excerpt = classifier::excerpt(content, self.max_excerpt_chars);
        let dependencies = classify::extract_dependencies(content);
        let mut session = ClassifierSession::new(self.classifier.as_ref());

        let profile = session
            .ask(
                &FileProfile::prompt(filename, classifier::excerpt(content, PROFILE_EXCERPT_CHARS)),
                FileProfile::from_value,
            )
            .unwrap_or_else(|| FileProfile::fallback(classification));

        let risk_assessments: Vec<RiskAssessment> = self
            .catalog
            .risks()
            .iter()
            .map(|risk| {
                let verdict = session.ask(
                    &classifier::risk_prompt(risk, filename, excerpt),
                    AiRiskVerdict::from_value,
                );
                let pattern = risk_pattern_scores.get(&risk.id);
                self.assess_risk(risk, pattern, verdict)
            })
            .collect();

        let security_review = session
            .ask(
                &SecurityReview::prompt(filename, classifier::excerpt(content, SECURITY_EXCERPT_CHARS)),
                SecurityReview::from_value,
            )
            .unwrap_or_else(SecurityReview::fallback);

        let dependency_risk = (!dependencies.is_empty()).then(|| {
            session
                .ask(&DependencyRisk::prompt(filename, &dependencies), |value| {
                    DependencyRisk::from_value(value, &dependencies)
                })
                .unwrap_or_else(|| DependencyRisk::fallback(&dependencies))
        });

        let subject = FileSubject {
            filename,
            file_type,
            content,
            security_issues: &security_issues,
        };
        let compliance_checks: Vec<FrameworkCheck> = self
            .catalog
            .frameworks()
            .iter()
            .map(|framework| {
                let (check, error) = compliance::check_framework(
                    framework,
                    &subject,
                    session.active(),
                    self.max_excerpt_chars,
                );
                if let Some(e) = error {
                    session.record_failure(&e);
                }
                check
            })
            .collect();

        if let Some(reason) = session.first_failure() {
            warnings.push(format!("AI classifier unavailable, fallback scoring applied: {}", reason));
        }

        let sources = risk_assessments
            .iter()
            .map(|a| a.source)
            .chain(compliance_checks.iter().map(|c| c.mode))
            .chain([profile.mode, security_review.mode])
            .chain(dependency_risk.iter().map(|d| d.mode));

        FileAnalysis {
            filename: filename.to_string(),
            file_type: file_type.to_string(),
            classification,
            encoding,
            lines_count: content.split('\n').count(),
            char_count: content.chars().count(),
            risk_level: self.level_scheme.level_of(file_score),
            risk_pattern_scores,
            security_issues,
            file_score,
            mode: combine_modes(sources),
            risk_assessments,
            compliance_checks,
            dependencies,
            profile,
            security_review,
            dependency_risk,
            warnings,
            content_preview: content_preview(content),
        }
    }

    fn assess_risk(
        &self,
        risk: &RiskCatalogEntry,
        pattern: Option<&PatternScore>,
        verdict: Option<AiRiskVerdict>,
    ) -> RiskAssessment {
        let pattern_score = pattern.map(|p| p.score).unwrap_or(0.0);
        let keyword_score = pattern.map(|p| p.keyword_score).unwrap_or(0.0);
        let severity_score = pattern.map(|p| p.severity_score).unwrap_or(0.0);
        let matched_patterns = pattern.map(|p| p.matched_patterns.clone()).unwrap_or_default();

        let (ai_score, evidence, technical_details, recommendations, source) = match verdict {
            Some(v) => (
                Some(v.score),
                v.evidence,
                v.technical_details,
                v.recommendations,
                AnalysisMode::Ai,
            ),
            None => (
                None,
                vec![FALLBACK_EVIDENCE.to_string()],
                String::new(),
                vec!["Review manually".to_string()],
                AnalysisMode::Fallback,
            ),
        };

        let score = risk_scorer::combined_risk_score(
            ai_score.unwrap_or(risk_scorer::DEFAULT_AI_SCORE),
            keyword_score,
            severity_score,
        );
        let level = self.level_scheme.level_of(score);

        RiskAssessment {
            risk_id: risk.id.clone(),
            risk_name: risk.name.clone(),
            category: risk.category.clone(),
            score,
            level,
            pattern_score,
            keyword_score,
            severity_score,
            ai_score,
            matched_patterns,
            evidence,
            technical_details,
            recommendations,
            compliance_frameworks: risk.compliance_frameworks.clone(),
            remediation_priority: risk_scorer::remediation_priority(
                score,
                level,
                risk.compliance_frameworks.len(),
            ),
            estimated_cost: risk_scorer::remediation_cost(score).to_string(),
            timeline: risk_scorer::remediation_timeline(score).to_string(),
            source,
        }
    }

    /// Analyze all files sequentially
    pub fn analyze_system(&self, files: &[UploadedFile]) -> Result<SystemAnalysis, EngineError> {
        info!("Analyzing {} files (profile={})", files.len(), self.profile);
        let outcomes = files.iter().map(|file| self.analyze_file(file)).collect();
        self.assemble(outcomes)
    }

    /// Analyze files on blocking workers, at most `jobs` at a time. Results
    /// keep upload order; a crashed worker only skips its own file.
    pub async fn analyze_system_concurrent(
        self: Arc<Self>,
        files: Vec<UploadedFile>,
        jobs: usize,
    ) -> Result<SystemAnalysis, EngineError> {
        info!(
            "Analyzing {} files with {} workers (profile={})",
            files.len(),
            jobs.max(1),
            self.profile
        );
        let semaphore = Arc::new(Semaphore::new(jobs.max(1)));
        let mut handles = Vec::with_capacity(files.len());

        for file in files {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| EngineError::Worker(e.to_string()))?;
            let engine = Arc::clone(&self);
            let filename = file.filename.clone();
            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                engine.analyze_file(&file)
            });
            handles.push((filename, handle));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (filename, handle) in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    warn!("Analysis worker for {} failed: {}", filename, e);
                    outcomes.push(Err(SkippedFile {
                        filename,
                        reason: format!("analysis worker failed: {}", e),
                    }));
                }
            }
        }

        // The system review may call the blocking classifier
        let engine = Arc::clone(&self);
        tokio::task::spawn_blocking(move || engine.assemble(outcomes))
            .await
            .map_err(|e| EngineError::Worker(e.to_string()))?
    }

    fn assemble(
        &self,
        outcomes: Vec<Result<FileAnalysis, SkippedFile>>,
    ) -> Result<SystemAnalysis, EngineError> {
        let mut files_data = Vec::new();
        let mut skipped_files = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(analysis) => files_data.push(analysis),
                Err(skipped) => {
                    warn!("Skipping {}: {}", skipped.filename, skipped.reason);
                    skipped_files.push(skipped);
                }
            }
        }

        if files_data.is_empty() {
            return Err(EngineError::NoValidFiles {
                skipped: skipped_files,
            });
        }

        let cross = correlator::correlate(&files_data);
        let global_score = risk_scorer::global_score(&files_data, &cross);

        let checks: Vec<FrameworkCheck> = files_data
            .iter()
            .flat_map(|f| f.compliance_checks.iter().cloned())
            .collect();
        let compliance = compliance::build_report(&checks, &self.catalog);

        let mut top_risks: Vec<TopRisk> = files_data
            .iter()
            .flat_map(|f| {
                f.risk_assessments.iter().map(move |a| TopRisk {
                    filename: f.filename.clone(),
                    risk_id: a.risk_id.clone(),
                    risk_name: a.risk_name.clone(),
                    score: a.score,
                    level: a.level,
                })
            })
            .collect();
        top_risks.sort_by(|a, b| b.score.total_cmp(&a.score));
        top_risks.truncate(TOP_RISKS);

        let total_lines = files_data.iter().map(|f| f.lines_count).sum();
        let mut warnings = Vec::new();
        let system_review = self.review_system(&files_data, &cross, total_lines, &mut warnings);
        let mode = combine_modes(
            files_data
                .iter()
                .map(|f| f.mode)
                .chain(std::iter::once(system_review.mode)),
        );

        info!(
            "Analysis complete: {} files, {} skipped, {} cross-file risks, global score {:.1}",
            files_data.len(),
            skipped_files.len(),
            cross.cross_file_risks.len(),
            global_score
        );

        Ok(SystemAnalysis {
            id: Uuid::new_v4(),
            analysis_date: Utc::now(),
            analysis_hash: analysis_hash(&files_data),
            catalog_version: self.catalog.version().to_string(),
            profile: self.profile,
            classifier: self.classifier.name().to_string(),
            mode,
            files_analyzed: files_data.len(),
            total_lines,
            global_level: self.level_scheme.level_of(global_score),
            global_score,
            cross_file_risks: cross.cross_file_risks,
            architecture: cross.architecture,
            compliance,
            top_risks,
            system_review,
            warnings,
            skipped_files,
            files_data,
        })
    }

    fn review_system(
        &self,
        files: &[FileAnalysis],
        cross: &CrossFileAnalysis,
        total_lines: usize,
        warnings: &mut Vec<String>,
    ) -> SystemReview {
        let mut file_types: Vec<String> = files.iter().map(|f| f.file_type.clone()).collect();
        file_types.sort();
        file_types.dedup();

        let context = SystemContext {
            total_files: files.len(),
            total_lines,
            file_types,
            classifications: files.iter().map(|f| f.classification).collect(),
            cross_file_risks: cross
                .cross_file_risks
                .iter()
                .map(|r| r.risk_type.clone())
                .collect(),
            architecture_completeness: cross.architecture.completeness,
        };

        let mut session = ClassifierSession::new(self.classifier.as_ref());
        if let Some(review) = session.ask(&SystemReview::prompt(&context), SystemReview::from_value) {
            return review;
        }

        if let Some(reason) = session.first_failure() {
            warnings.push(format!("AI classifier unavailable, system review used defaults: {}", reason));
        }
        let hotspots = files
            .iter()
            .filter(|f| f.risk_level >= RiskLevel::High)
            .map(|f| f.filename.clone())
            .chain(
                cross
                    .cross_file_risks
                    .iter()
                    .filter(|r| r.severity >= RiskLevel::High)
                    .map(|r| r.risk_type.clone()),
            )
            .collect();
        SystemReview::fallback(hotspots)
    }
}

/// First [`PREVIEW_CHARS`] characters, marked with "..." when cut
fn content_preview(content: &str) -> String {
    let preview = classifier::excerpt(content, PREVIEW_CHARS);
    if preview.len() < content.len() {
        format!("{}...", preview)
    } else {
        preview.to_string()
    }
}

/// Ai if every source is Ai, Fallback if every source is Fallback (or
/// there are none), Mixed otherwise
fn combine_modes(modes: impl Iterator<Item = AnalysisMode>) -> AnalysisMode {
    let mut any_ai = false;
    let mut any_fallback = false;
    for mode in modes {
        match mode {
            AnalysisMode::Ai => any_ai = true,
            AnalysisMode::Fallback => any_fallback = true,
            AnalysisMode::Mixed => {
                any_ai = true;
                any_fallback = true;
            }
        }
    }
    match (any_ai, any_fallback) {
        (true, false) => AnalysisMode::Ai,
        (true, true) => AnalysisMode::Mixed,
        _ => AnalysisMode::Fallback,
    }
}

fn analysis_hash(files: &[FileAnalysis]) -> String {
    let bytes = serde_json::to_vec(files).unwrap_or_default();
    let digest = format!("{:x}", Sha256::digest(&bytes));
    digest[..8].to_string()
}
