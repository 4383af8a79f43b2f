//! Keyword and severity-indicator detection per catalog risk

use super::risk_scorer::ScoringProfile;
use crate::catalog::Catalog;
use crate::clamp_score;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pattern evidence for one catalog risk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternScore {
    /// 0-100
    pub score: f64,
    /// Unclamped sum of keyword increments
    pub keyword_score: f64,
    /// Unclamped sum of severity-indicator increments
    pub severity_score: f64,
    /// Matched strings in the order they were scanned
    pub matched_patterns: Vec<String>,
}

/// Score every catalog risk against `content`.
///
/// Matching is plain substring containment on the lowercased text, so
/// `"target"` also matches inside `"retargeting"`. Each pattern counts at
/// most once. Scan order: keywords, severity indicators, critical patterns.
pub fn detect(
    content: &str,
    catalog: &Catalog,
    profile: ScoringProfile,
) -> BTreeMap<String, PatternScore> {
    let content_lower = content.to_lowercase();

    // Critical patterns don't depend on the risk, match them once.
    let critical: Vec<(&str, f64)> = catalog
        .critical_patterns()
        .iter()
        .filter(|c| !c.pattern.is_empty() && content_lower.contains(&c.pattern))
        .map(|c| (c.pattern.as_str(), c.increment))
        .collect();

    let mut scores = BTreeMap::new();

    for risk in catalog.risks() {
        let mut keyword_score = 0.0;
        let mut severity_score = 0.0;
        let mut matched_patterns = Vec::new();

        for keyword in &risk.keywords {
            if !keyword.is_empty() && content_lower.contains(keyword.as_str()) {
                keyword_score += profile.keyword_increment();
                matched_patterns.push(keyword.clone());
            }
        }

        for indicator in &risk.severity_indicators {
            if !indicator.is_empty() && content_lower.contains(indicator.as_str()) {
                severity_score += profile.severity_increment();
                matched_patterns.push(indicator.clone());
            }
        }

        let mut total = keyword_score + severity_score;
        for (pattern, increment) in &critical {
            total += increment;
            matched_patterns.push(pattern.to_string());
        }

        scores.insert(
            risk.id.clone(),
            PatternScore {
                score: clamp_score(total),
                keyword_score,
                severity_score,
                matched_patterns,
            },
        );
    }

    scores
}
