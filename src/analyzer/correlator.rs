//! Cross-file correlation and architecture completeness

use super::FileAnalysis;
use crate::{Classification, RiskLevel};
use serde::{Deserialize, Serialize};

pub const CREDENTIALS_EXPOSURE: &str = "credentials_exposure";
pub const API_WITHOUT_AUTH: &str = "api_without_auth";

/// Weighted categories for architecture completeness. Sums to 100.
pub const ARCHITECTURE_WEIGHTS: [(Classification, f64); 6] = [
    (Classification::EntryPoint, 20.0),
    (Classification::ApiLayer, 15.0),
    (Classification::Security, 25.0),
    (Classification::Testing, 20.0),
    (Classification::Configuration, 10.0),
    (Classification::DataModel, 10.0),
];

/// A finding that only shows up when files are compared
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossFileRisk {
    #[serde(rename = "type")]
    pub risk_type: String,
    pub severity: RiskLevel,
    pub description: String,
    /// File that triggered the rule, if a single one did
    pub source_file: Option<String>,
    pub affected_files: Vec<String>,
}

/// Which architectural categories are present
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureAssessment {
    pub has_entry_point: bool,
    pub has_api_layer: bool,
    pub has_security: bool,
    pub has_testing: bool,
    pub has_configuration: bool,
    pub has_data_model: bool,
    /// 0-100
    pub completeness: f64,
    pub missing: Vec<Classification>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossFileAnalysis {
    pub cross_file_risks: Vec<CrossFileRisk>,
    pub architecture: ArchitectureAssessment,
}

/// Apply the fixed cross-file rules and measure architecture completeness
pub fn correlate(files: &[FileAnalysis]) -> CrossFileAnalysis {
    let mut cross_file_risks = Vec::new();

    // Configuration file leaking a secret exposes every other file
    for file in files {
        if file.classification != Classification::Configuration {
            continue;
        }
        let leaks_secret = file
            .security_issues
            .iter()
            .any(|issue| issue.issue_type == "hardcoded_secrets");
        if !leaks_secret {
            continue;
        }
        let affected_files = files
            .iter()
            .filter(|other| other.filename != file.filename)
            .map(|other| other.filename.clone())
            .collect();
        cross_file_risks.push(CrossFileRisk {
            risk_type: CREDENTIALS_EXPOSURE.to_string(),
            severity: RiskLevel::High,
            description: format!(
                "Configuration file {} contains hardcoded credentials used across the system",
                file.filename
            ),
            source_file: Some(file.filename.clone()),
            affected_files,
        });
    }

    let api_files: Vec<String> = files
        .iter()
        .filter(|f| f.classification == Classification::ApiLayer)
        .map(|f| f.filename.clone())
        .collect();
    let has_security = files
        .iter()
        .any(|f| f.classification == Classification::Security);

    if !api_files.is_empty() && !has_security {
        cross_file_risks.push(CrossFileRisk {
            risk_type: API_WITHOUT_AUTH.to_string(),
            severity: RiskLevel::High,
            description: "API without corresponding authentication layer".to_string(),
            source_file: None,
            affected_files: api_files,
        });
    }

    CrossFileAnalysis {
        cross_file_risks,
        architecture: assess_architecture(files),
    }
}

pub fn assess_architecture(files: &[FileAnalysis]) -> ArchitectureAssessment {
    let present = |c: Classification| files.iter().any(|f| f.classification == c);

    let mut completeness = 0.0;
    let mut missing = Vec::new();
    for (classification, weight) in ARCHITECTURE_WEIGHTS {
        if present(classification) {
            completeness += weight;
        } else {
            missing.push(classification);
        }
    }

    ArchitectureAssessment {
        has_entry_point: present(Classification::EntryPoint),
        has_api_layer: present(Classification::ApiLayer),
        has_security: present(Classification::Security),
        has_testing: present(Classification::Testing),
        has_configuration: present(Classification::Configuration),
        has_data_model: present(Classification::DataModel),
        completeness,
        missing,
    }
}
