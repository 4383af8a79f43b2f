//! Risk catalog definitions and loading
//!
//! The catalog is a single YAML document describing:
//! 1. Risk entries - keywords and severity indicators per named risk
//! 2. Critical patterns - risk-independent increments layered on every risk
//! 3. Security patterns - regex groups used by the line scanner
//! 4. Compliance frameworks - display metadata (articles, penalties)
//!
//! A built-in copy is embedded in the binary. A user file with the same
//! schema may replace it.

use crate::error::CatalogError;
use crate::Severity;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

const BUILTIN_CATALOG: &str = include_str!("agentic_risks.yaml");

/// Regulatory framework a risk maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceFramework {
    EuAiAct,
    LgpdBrazil,
    GdprEu,
    SoxUs,
    BaselIii,
    PciDss,
}

impl ComplianceFramework {
    pub const ALL: [ComplianceFramework; 6] = [
        ComplianceFramework::EuAiAct,
        ComplianceFramework::LgpdBrazil,
        ComplianceFramework::GdprEu,
        ComplianceFramework::SoxUs,
        ComplianceFramework::BaselIii,
        ComplianceFramework::PciDss,
    ];
}

impl std::fmt::Display for ComplianceFramework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComplianceFramework::EuAiAct => write!(f, "EU AI Act"),
            ComplianceFramework::LgpdBrazil => write!(f, "LGPD Brasil"),
            ComplianceFramework::GdprEu => write!(f, "GDPR Europe"),
            ComplianceFramework::SoxUs => write!(f, "SOX United States"),
            ComplianceFramework::BaselIii => write!(f, "Basel III"),
            ComplianceFramework::PciDss => write!(f, "PCI DSS"),
        }
    }
}

/// Which set of catalog entries is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CatalogVersion {
    /// The ten core agentic risks
    #[default]
    Core,
    /// Core plus the entries flagged `extended`
    Extended,
}

impl std::fmt::Display for CatalogVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogVersion::Core => write!(f, "core"),
            CatalogVersion::Extended => write!(f, "extended"),
        }
    }
}

impl std::str::FromStr for CatalogVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "core" => Ok(CatalogVersion::Core),
            "extended" => Ok(CatalogVersion::Extended),
            other => Err(format!("unknown catalog version: {}", other)),
        }
    }
}

/// A named risk with its detection patterns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskCatalogEntry {
    /// Unique key, e.g. "AGR003"
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub compliance_frameworks: Vec<ComplianceFramework>,
    /// Plain substrings, lowercase
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Stronger signals, lowercase
    #[serde(default)]
    pub severity_indicators: Vec<String>,
    /// Only part of the extended catalog
    #[serde(default)]
    pub extended: bool,
}

/// Risk-independent substring with its own increment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticalPattern {
    pub pattern: String,
    pub increment: f64,
}

/// A category of line-level security regexes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityPatternGroup {
    pub category: String,
    pub severity: Severity,
    pub description: String,
    pub patterns: Vec<String>,
    /// Compiled regexes (not serialized)
    #[serde(skip)]
    compiled: Vec<Regex>,
}

impl SecurityPatternGroup {
    pub fn compiled(&self) -> &[Regex] {
        &self.compiled
    }

    fn compile(&mut self) -> Result<(), CatalogError> {
        self.compiled = self
            .patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|source| CatalogError::Pattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(())
    }
}

/// One article/section of a framework
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub reference: String,
    pub title: String,
}

/// Display metadata for a compliance framework
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameworkInfo {
    pub id: ComplianceFramework,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub penalty: String,
    #[serde(default)]
    pub articles: Vec<Article>,
}

/// The catalog document as written on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDocument {
    pub version: String,
    pub risks: Vec<RiskCatalogEntry>,
    #[serde(default)]
    pub critical_patterns: Vec<CriticalPattern>,
    #[serde(default)]
    pub good_practices: Vec<String>,
    #[serde(default)]
    pub security_patterns: Vec<SecurityPatternGroup>,
    #[serde(default)]
    pub frameworks: Vec<FrameworkInfo>,
}

/// A validated, immutable catalog ready for scoring
#[derive(Debug, Clone)]
pub struct Catalog {
    version: String,
    catalog_version: CatalogVersion,
    risks: Vec<RiskCatalogEntry>,
    critical_patterns: Vec<CriticalPattern>,
    good_practices: Vec<String>,
    security_patterns: Vec<SecurityPatternGroup>,
    frameworks: Vec<FrameworkInfo>,
}

impl Catalog {
    /// The catalog embedded in the binary
    pub fn builtin(catalog_version: CatalogVersion) -> Result<Self, CatalogError> {
        Self::from_yaml_str(BUILTIN_CATALOG, catalog_version)
    }

    /// Load a catalog from a YAML file
    pub fn load_from_file(path: &Path, catalog_version: CatalogVersion) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_yaml_str(&content, catalog_version)?;
        debug!("Loaded catalog {} from {}", catalog.version, path.display());
        Ok(catalog)
    }

    pub fn from_yaml_str(content: &str, catalog_version: CatalogVersion) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_yaml::from_str(content)?;
        Self::from_document(document, catalog_version)
    }

    /// Validate a document and select the entries for `catalog_version`
    pub fn from_document(
        document: CatalogDocument,
        catalog_version: CatalogVersion,
    ) -> Result<Self, CatalogError> {
        if document.version.trim().is_empty() {
            return Err(CatalogError::Invalid("missing version".to_string()));
        }

        let described: HashSet<ComplianceFramework> =
            document.frameworks.iter().map(|f| f.id).collect();
        let mut seen = HashSet::new();

        for risk in &document.risks {
            if risk.id.trim().is_empty() || risk.name.trim().is_empty() {
                return Err(CatalogError::Invalid("risk without id or name".to_string()));
            }
            if !seen.insert(risk.id.clone()) {
                return Err(CatalogError::DuplicateId(risk.id.clone()));
            }
            for framework in &risk.compliance_frameworks {
                if !described.contains(framework) {
                    return Err(CatalogError::UnknownFramework {
                        risk: risk.id.clone(),
                        framework: format!("{:?}", framework),
                    });
                }
            }
        }

        let risks: Vec<RiskCatalogEntry> = document
            .risks
            .into_iter()
            .filter(|r| catalog_version == CatalogVersion::Extended || !r.extended)
            .map(|mut r| {
                r.keywords = r.keywords.iter().map(|k| k.to_lowercase()).collect();
                r.severity_indicators = r
                    .severity_indicators
                    .iter()
                    .map(|k| k.to_lowercase())
                    .collect();
                r
            })
            .collect();

        if risks.is_empty() {
            return Err(CatalogError::Invalid("catalog has no risks".to_string()));
        }

        let mut security_patterns = document.security_patterns;
        for group in &mut security_patterns {
            group.compile()?;
        }

        let critical_patterns = document
            .critical_patterns
            .into_iter()
            .map(|c| CriticalPattern {
                pattern: c.pattern.to_lowercase(),
                increment: c.increment,
            })
            .collect();

        Ok(Self {
            version: document.version,
            catalog_version,
            risks,
            critical_patterns,
            good_practices: document.good_practices,
            security_patterns,
            frameworks: document.frameworks,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn catalog_version(&self) -> CatalogVersion {
        self.catalog_version
    }

    pub fn risks(&self) -> &[RiskCatalogEntry] {
        &self.risks
    }

    pub fn risk(&self, id: &str) -> Option<&RiskCatalogEntry> {
        self.risks.iter().find(|r| r.id.eq_ignore_ascii_case(id))
    }

    pub fn critical_patterns(&self) -> &[CriticalPattern] {
        &self.critical_patterns
    }

    pub fn good_practices(&self) -> &[String] {
        &self.good_practices
    }

    pub fn security_patterns(&self) -> &[SecurityPatternGroup] {
        &self.security_patterns
    }

    pub fn frameworks(&self) -> &[FrameworkInfo] {
        &self.frameworks
    }

    pub fn framework(&self, id: ComplianceFramework) -> Option<&FrameworkInfo> {
        self.frameworks.iter().find(|f| f.id == id)
    }

    /// Penalty text for a framework, or a generic placeholder
    pub fn penalty_for(&self, id: ComplianceFramework) -> String {
        self.framework(id)
            .map(|f| f.penalty.clone())
            .unwrap_or_else(|| "Not specified".to_string())
    }

    /// Serialize the active entries back to YAML
    pub fn to_yaml(&self) -> Result<String, CatalogError> {
        let document = CatalogDocument {
            version: self.version.clone(),
            risks: self.risks.clone(),
            critical_patterns: self.critical_patterns.clone(),
            good_practices: self.good_practices.clone(),
            security_patterns: self.security_patterns.clone(),
            frameworks: self.frameworks.clone(),
        };
        Ok(serde_yaml::to_string(&document)?)
    }
}
