//! External risk classifier
//!
//! The engine treats the classifier as an opaque `prompt -> JSON` function.
//! Every failure is recoverable: callers fall back to local scoring.

pub mod reviews;

use crate::catalog::{FrameworkInfo, RiskCatalogEntry};
use crate::config::ClassifierConfig;
use crate::error::ClassifierError;
use crate::{clamp_score, RiskLevel};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Compliance score assumed when the classifier answers without one
pub const DEFAULT_COMPLIANCE_SCORE: f64 = 70.0;

/// Something that answers a prompt with a JSON object
pub trait RiskClassifier: Send + Sync {
    /// Short label used in logs and status output
    fn name(&self) -> &str;

    fn classify(&self, prompt: &str) -> Result<serde_json::Value, ClassifierError>;

    /// Whether calling `classify` can ever succeed
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Always fails. Used when no API key is configured or the classifier is
/// switched off, so the engine runs in fallback-only mode.
pub struct DisabledClassifier {
    reason: String,
}

impl DisabledClassifier {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl RiskClassifier for DisabledClassifier {
    fn name(&self) -> &str {
        "disabled"
    }

    fn classify(&self, _prompt: &str) -> Result<serde_json::Value, ClassifierError> {
        Err(ClassifierError::Disabled(self.reason.clone()))
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Classifier calls made while analyzing one file. The first
/// "unavailable" error swaps in a [`DisabledClassifier`] for every later
/// call, so a dead endpoint costs one timeout per file.
pub struct ClassifierSession<'a> {
    classifier: &'a dyn RiskClassifier,
    down: Option<DisabledClassifier>,
    first_failure: Option<String>,
}

impl<'a> ClassifierSession<'a> {
    pub fn new(classifier: &'a dyn RiskClassifier) -> Self {
        Self {
            classifier,
            down: None,
            first_failure: None,
        }
    }

    /// The classifier to call next
    pub fn active(&self) -> &dyn RiskClassifier {
        match &self.down {
            Some(down) => down,
            None => self.classifier,
        }
    }

    pub fn record_failure(&mut self, error: &ClassifierError) {
        if error.is_unavailable() && self.down.is_none() {
            self.down = Some(DisabledClassifier::new(error.to_string()));
        }
        self.first_failure.get_or_insert_with(|| error.to_string());
    }

    /// Classify and validate. `None` means the caller falls back.
    pub fn ask<T>(
        &mut self,
        prompt: &str,
        parse: impl FnOnce(&serde_json::Value) -> Result<T, ClassifierError>,
    ) -> Option<T> {
        match self.active().classify(prompt).and_then(|value| parse(&value)) {
            Ok(answer) => Some(answer),
            Err(e) => {
                debug!("Classifier answer rejected: {}", e);
                self.record_failure(&e);
                None
            }
        }
    }

    pub fn is_down(&self) -> bool {
        self.down.is_some()
    }

    /// First failure seen, if any
    pub fn first_failure(&self) -> Option<&str> {
        self.first_failure.as_deref()
    }
}

/// OpenAI-compatible chat completions client
pub struct LlmClassifier {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

impl LlmClassifier {
    pub fn new(config: &ClassifierConfig, api_key: String) -> Result<Self, ClassifierError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(config.timeout_secs))
                .build()?,
            api_key,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    fn call_chat(&self, prompt: &str) -> Result<String, ClassifierError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "response_format": {"type": "json_object"},
            "messages": [
                {"role": "system", "content": "You are a security and compliance auditor for agentic AI systems. Answer with strict JSON only."},
                {"role": "user", "content": prompt}
            ]
        });

        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ClassifierError::Status(status.as_u16()));
        }

        let v: serde_json::Value = resp.json()?;
        let content = v["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(ClassifierError::MissingContent)?;
        Ok(content.to_string())
    }
}

impl RiskClassifier for LlmClassifier {
    fn name(&self) -> &str {
        &self.model
    }

    fn classify(&self, prompt: &str) -> Result<serde_json::Value, ClassifierError> {
        let raw = self.call_chat(prompt)?;
        let value: serde_json::Value = serde_json::from_str(&strip_code_fence(&raw))?;
        if !value.is_object() {
            return Err(ClassifierError::Schema("expected a JSON object".to_string()));
        }
        debug!("Classifier answered {} bytes", raw.len());
        Ok(value)
    }
}

/// Build the classifier described by `config`. Missing key or a disabled
/// classifier yields a [`DisabledClassifier`], never an error.
pub fn from_config(config: &ClassifierConfig) -> Box<dyn RiskClassifier> {
    if !config.enabled {
        info!("Classifier disabled by configuration, using local scoring only");
        return Box::new(DisabledClassifier::new("disabled by configuration"));
    }

    let Some(api_key) = config.resolve_api_key() else {
        info!("No classifier API key found, using local scoring only");
        return Box::new(DisabledClassifier::new("no API key configured"));
    };

    match LlmClassifier::new(config, api_key) {
        Ok(classifier) => {
            info!("Classifier enabled: model={} base_url={}", config.model, config.base_url);
            Box::new(classifier)
        }
        Err(e) => {
            info!("Classifier client could not be built ({}), using local scoring only", e);
            Box::new(DisabledClassifier::new(e.to_string()))
        }
    }
}

pub fn strip_code_fence(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.starts_with("```") {
        let without_start = trimmed.trim_start_matches("```");
        let without_lang = without_start
            .strip_prefix("json")
            .or_else(|| without_start.strip_prefix("JSON"))
            .unwrap_or(without_start);
        return without_lang.trim().trim_end_matches("```").trim().to_string();
    }
    trimmed.to_string()
}

/// First `max_chars` characters of `content`, on a char boundary
pub fn excerpt(content: &str, max_chars: usize) -> &str {
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}

pub fn risk_prompt(risk: &RiskCatalogEntry, filename: &str, excerpt: &str) -> String {
    format!(
        "Analyze this code for one specific risk: {name} ({id})\n\
         Risk description: {description}\n\
         Category: {category}\n\
         File: {filename}\n\
         \n\
         Code excerpt:\n{excerpt}\n\
         \n\
         Return schema exactly:\n\
         {{\n\
           \"score\": number (0..100, higher means riskier),\n\
           \"evidence\": [string],\n\
           \"technical_details\": string,\n\
           \"recommendations\": [string]\n\
         }}\n\
         No markdown. Be technical and specific.",
        name = risk.name,
        id = risk.id,
        description = risk.description,
        category = risk.category,
    )
}

pub fn compliance_prompt(
    framework: &FrameworkInfo,
    filename: &str,
    file_type: &str,
    excerpt: &str,
) -> String {
    let articles = framework
        .articles
        .iter()
        .map(|a| format!("- {}: {}", a.reference, a.title))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Compliance review for {name} - {filename} ({file_type})\n\
         Check these articles specifically:\n{articles}\n\
         \n\
         Code excerpt:\n{excerpt}\n\
         \n\
         Return schema exactly:\n\
         {{\n\
           \"violations\": [{{\"article\": string, \"description\": string, \"severity\": \"HIGH\"|\"MEDIUM\"|\"LOW\", \"evidence\": [string], \"remediation\": [string]}}],\n\
           \"compliance_score\": number (0..100, higher means more compliant),\n\
           \"recommendations\": [string]\n\
         }}\n\
         Penalty exposure for reference: {penalty}\n\
         No markdown.",
        name = framework.name,
        penalty = framework.penalty,
    )
}

/// Per-risk verdict returned by the classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiRiskVerdict {
    pub score: f64,
    pub evidence: Vec<String>,
    pub technical_details: String,
    pub recommendations: Vec<String>,
}

impl AiRiskVerdict {
    /// Validate a classifier answer. `score` is required; the rest default.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ClassifierError> {
        let score = value
            .get("score")
            .and_then(number_like)
            .ok_or_else(|| ClassifierError::Schema("missing numeric score".to_string()))?;

        Ok(Self {
            score: clamp_score(score),
            evidence: string_list(value.get("evidence")),
            technical_details: text_field(value.get("technical_details")),
            recommendations: string_list(value.get("recommendations")),
        })
    }
}

/// One violation reported by the classifier for a framework
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiViolation {
    pub article: String,
    pub description: String,
    pub severity: RiskLevel,
    pub evidence: Vec<String>,
    pub remediation: Vec<String>,
}

/// Framework check returned by the classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiComplianceVerdict {
    pub violations: Vec<AiViolation>,
    pub compliance_score: f64,
    pub recommendations: Vec<String>,
}

impl AiComplianceVerdict {
    /// Missing `violations` means none; missing score means
    /// [`DEFAULT_COMPLIANCE_SCORE`]. A non-list `violations` is rejected.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ClassifierError> {
        let violations = match value.get("violations") {
            None | Some(serde_json::Value::Null) => Vec::new(),
            Some(serde_json::Value::Array(items)) => items.iter().map(parse_violation).collect(),
            Some(_) => {
                return Err(ClassifierError::Schema(
                    "violations must be a list".to_string(),
                ))
            }
        };

        let compliance_score = value
            .get("compliance_score")
            .and_then(number_like)
            .map(clamp_score)
            .unwrap_or(DEFAULT_COMPLIANCE_SCORE);

        Ok(Self {
            violations,
            compliance_score,
            recommendations: string_list(value.get("recommendations")),
        })
    }
}

fn parse_violation(item: &serde_json::Value) -> AiViolation {
    let text = |key: &str| {
        item.get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };
    AiViolation {
        article: text("article"),
        description: text("description"),
        severity: parse_level(&text("severity")),
        evidence: string_list(item.get("evidence")),
        remediation: string_list(item.get("remediation")),
    }
}

/// Lenient severity parsing; unknown values become MEDIUM
pub fn parse_level(value: &str) -> RiskLevel {
    match value.trim().to_uppercase().as_str() {
        "CRITICAL" => RiskLevel::Critical,
        "HIGH" => RiskLevel::High,
        "LOW" => RiskLevel::Low,
        "MINIMAL" => RiskLevel::Minimal,
        _ => RiskLevel::Medium,
    }
}

/// Accept numbers and numeric strings ("72", "72.5")
fn number_like(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Strings pass through, other JSON is rendered compactly
fn text_field(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn string_list(value: Option<&serde_json::Value>) -> Vec<String> {
    match value {
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(serde_json::Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}
