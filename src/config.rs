//! Application configuration
//!
//! Layered: built-in defaults, then a YAML file, then `AGENTRISK__*`
//! environment variables (e.g. `AGENTRISK__CLASSIFIER__MODEL=gpt-4o`).

use crate::analyzer::ScoringProfile;
use crate::catalog::CatalogVersion;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variables checked for the classifier API key, in order
pub const API_KEY_VARS: [&str; 2] = ["OPENAI_API_KEY", "AGENTRISK_API_KEY"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub profile: ScoringProfile,
    #[serde(default)]
    pub catalog_version: CatalogVersion,
    /// Replace the embedded catalog with this YAML file
    #[serde(default)]
    pub catalog_file: Option<PathBuf>,
    /// Worker count for concurrent analysis
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    /// Glob filters applied when walking directories
    #[serde(default = "default_include")]
    pub include: Vec<String>,
    /// Files larger than this are skipped
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Characters of file content embedded in each prompt
    #[serde(default = "default_max_excerpt_chars")]
    pub max_excerpt_chars: usize,
    /// Usually left empty and read from the environment
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_jobs() -> usize {
    4
}
fn default_include() -> Vec<String> {
    vec![]
}
fn default_max_file_bytes() -> u64 {
    5 * 1024 * 1024
}
fn default_enabled() -> bool {
    true
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_temperature() -> f32 {
    0.1
}
fn default_max_excerpt_chars() -> usize {
    1000
}
fn default_listen() -> String {
    "127.0.0.1:8787".to_string()
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            profile: ScoringProfile::default(),
            catalog_version: CatalogVersion::default(),
            catalog_file: None,
            jobs: default_jobs(),
            include: default_include(),
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
            max_excerpt_chars: default_max_excerpt_chars(),
            api_key: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl ClassifierConfig {
    /// API key from the config file, else the first non-empty env var
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Some(key.clone());
        }
        API_KEY_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|key| !key.trim().is_empty())
    }
}

/// `~/.agentrisk/config.yaml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".agentrisk").join("config.yaml"))
}

impl AppConfig {
    /// Load configuration. An explicit `path` must exist; the default
    /// location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                if let Some(default_path) = default_config_path() {
                    builder = builder.add_source(config::File::from(default_path).required(false));
                }
            }
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("AGENTRISK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}
