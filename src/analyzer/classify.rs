//! File metadata: type label, purpose classification, imported dependencies

use crate::Classification;
use regex::Regex;
use std::sync::OnceLock;

/// Maximum dependencies kept per file
pub const MAX_DEPENDENCIES: usize = 10;

/// Human label for a file extension
pub fn file_type(filename: &str) -> &'static str {
    let extension = std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "py" => "Python",
        "js" => "JavaScript",
        "ts" => "TypeScript",
        "java" => "Java",
        "cs" => "C#",
        "php" => "PHP",
        "rb" => "Ruby",
        "go" => "Go",
        "cpp" => "C++",
        "c" => "C",
        "rs" => "Rust",
        "json" => "JSON",
        "yaml" | "yml" => "YAML",
        "toml" => "TOML",
        "xml" => "XML",
        "sql" => "SQL",
        "md" => "Markdown",
        "txt" => "Text",
        "html" => "HTML",
        "css" => "CSS",
        "scss" => "SCSS",
        _ => "Unknown",
    }
}

/// Classify a file by name first, then by content. First match wins.
pub fn classify(filename: &str, content: &str) -> Classification {
    let name = std::path::Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename)
        .to_lowercase();
    let has = |terms: &[&str]| terms.iter().any(|t| name.contains(t));

    if has(&["main", "app", "index"]) {
        return Classification::EntryPoint;
    }
    if has(&["auth", "login", "security"]) {
        return Classification::Security;
    }
    if has(&["config", "setting", ".env"]) {
        return Classification::Configuration;
    }
    if has(&["api", "route", "endpoint"]) {
        return Classification::ApiLayer;
    }
    if has(&["model", "schema"]) {
        return Classification::DataModel;
    }
    if has(&["test", "spec"]) {
        return Classification::Testing;
    }
    if has(&["readme", "doc"]) || [".md", ".rst", ".txt"].iter().any(|e| name.ends_with(e)) {
        return Classification::Documentation;
    }

    let content_lower = content.to_lowercase();
    if ["@app.route", "router.", "fastapi"]
        .iter()
        .any(|t| content_lower.contains(t))
    {
        return Classification::ApiLayer;
    }
    if ["def test_", "#[test]"].iter().any(|t| content_lower.contains(t)) {
        return Classification::Testing;
    }

    Classification::BusinessLogic
}

fn import_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?im)^\s*import\s+([\w.]+)",
            r"(?im)^\s*from\s+([\w.]+)\s+import",
            r#"require\s*\(\s*['"]([^'"]+)['"]\s*\)"#,
            r#"@import\s+['"]([^'"]+)['"]"#,
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

/// Imported modules, deduplicated in first-seen order
pub fn extract_dependencies(content: &str) -> Vec<String> {
    let mut dependencies: Vec<String> = Vec::new();
    for regex in import_patterns() {
        for captures in regex.captures_iter(content) {
            if let Some(m) = captures.get(1) {
                let dependency = m.as_str().to_string();
                if !dependencies.contains(&dependency) {
                    dependencies.push(dependency);
                }
            }
        }
    }
    dependencies.truncate(MAX_DEPENDENCIES);
    dependencies
}
