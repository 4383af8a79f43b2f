//! Line-level security scanner

use crate::catalog::Catalog;
use crate::Severity;
use serde::{Deserialize, Serialize};

/// A regex hit on one line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityIssue {
    /// Pattern group, e.g. "hardcoded_secrets"
    #[serde(rename = "type")]
    pub issue_type: String,
    /// 1-based
    pub line_number: usize,
    /// Trimmed line text
    pub line_text: String,
    pub severity: Severity,
    pub description: String,
}

/// Scan `content` line by line. Each matching pattern on a line emits one
/// issue, so one line can report several.
pub fn scan(content: &str, catalog: &Catalog) -> Vec<SecurityIssue> {
    let mut issues = Vec::new();

    for (index, line) in content.split('\n').enumerate() {
        for group in catalog.security_patterns() {
            for regex in group.compiled() {
                if regex.is_match(line) {
                    issues.push(SecurityIssue {
                        issue_type: group.category.clone(),
                        line_number: index + 1,
                        line_text: line.trim().to_string(),
                        severity: group.severity,
                        description: group.description.clone(),
                    });
                }
            }
        }
    }

    issues
}
