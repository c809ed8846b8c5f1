//! Configuration loading for DTDA.
//! Reads dtda.toml from the current directory or the path in the DTDA_CONFIG env var.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use dtda_engine::EngineConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub indra_db: IndraDbConfig,
    #[serde(default)]
    pub cbioportal: CbioPortalConfig,
    #[serde(default)]
    pub resources: ResourcesConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndraDbConfig {
    #[serde(default = "default_indra_url")]
    pub url: String,
    /// Falls back to DTDA_INDRA_API_KEY when unset.
    pub api_key: Option<String>,
    #[serde(default = "default_evidence_source")]
    pub evidence_source: String,
    #[serde(default = "default_relation_timeout")]
    pub timeout_secs: u64,
}

fn default_indra_url()        -> String { dtda_sources::indra::INDRA_DB_URL.to_string() }
fn default_evidence_source()  -> String { "tas".to_string() }
fn default_relation_timeout() -> u64    { 10 }

impl Default for IndraDbConfig {
    fn default() -> Self {
        Self {
            url: default_indra_url(),
            api_key: None,
            evidence_source: default_evidence_source(),
            timeout_secs: default_relation_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CbioPortalConfig {
    #[serde(default = "default_cbio_url")]
    pub url: String,
    #[serde(default = "default_cbio_timeout")]
    pub timeout_secs: u64,
}

fn default_cbio_url()     -> String { dtda_sources::cbioportal::CBIOPORTAL_API_URL.to_string() }
fn default_cbio_timeout() -> u64    { 30 }

impl Default for CbioPortalConfig {
    fn default() -> Self {
        Self { url: default_cbio_url(), timeout_secs: default_cbio_timeout() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourcesConfig {
    #[serde(default = "default_disease_map")]
    pub disease_map: String,
}

fn default_disease_map() -> String { "resources/cbio_efo_map.tsv".to_string() }

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self { disease_map: default_disease_map() }
    }
}

/// Cache bounds; absent or 0 keeps every entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    pub relation_capacity: Option<usize>,
    pub active_form_capacity: Option<usize>,
}


impl Config {
    /// Load configuration from dtda.toml.
    /// Checks DTDA_CONFIG env var first, then current directory.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("DTDA_CONFIG").unwrap_or_else(|_| "dtda.toml".to_string());
        Self::load_from(Path::new(&path))
    }

    /// A missing file means defaults; an unreadable or malformed one is an error.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("Malformed config {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// API key from the config file, else from DTDA_INDRA_API_KEY.
    pub fn indra_api_key(&self) -> Option<String> {
        self.indra_db
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("DTDA_INDRA_API_KEY").ok().filter(|k| !k.is_empty()))
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            relation_timeout: Duration::from_secs(self.indra_db.timeout_secs),
            evidence_source: self.indra_db.evidence_source.clone(),
            relation_cache_capacity: self.cache.relation_capacity,
            active_form_cache_capacity: self.cache.active_form_capacity,
        }
    }
}
