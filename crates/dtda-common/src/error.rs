use thiserror::Error;

#[derive(Debug, Error)]
pub enum DtdaError {
    /// The drug resolved to no targets under any of its lookup keys.
    #[error("Drug not found: {0}")]
    DrugNotFound(String),

    /// The disease is not in the study table, or none of its prefixes list a study.
    #[error("Disease not found: {0}")]
    DiseaseNotFound(String),

    #[error("Database has failed to respond after {timeout_secs} seconds looking up {query}")]
    DatabaseTimeout { query: String, timeout_secs: u64 },

    #[error("Invalid entity: {0}")]
    InvalidEntity(String),

    #[error("{service} responded with HTTP {status}")]
    Upstream { service: &'static str, status: u16 },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Security error: {0}")]
    SecurityError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DtdaError {
    /// True for the one failure the relation resolver converts into "skip".
    pub fn is_timeout(&self) -> bool {
        matches!(self, DtdaError::DatabaseTimeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, DtdaError>;
