//! Prior-art corpus sources.
//!
//! Provides the `CorpusSource` trait with a JSON-file and an HTTP
//! implementation. Both yield plain `PatentMaterialData` records; the scoring
//! engine never sees where they came from.

use priorart_model::PatentMaterialData;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from corpus operations.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Corpus not available")]
    Unavailable,
}

/// Trait for corpus sources (JSON file, HTTP service, etc.)
pub trait CorpusSource {
    /// Load every patent in the corpus.
    fn load(&self) -> impl Future<Output = Result<Vec<PatentMaterialData>, CorpusError>> + Send;

    /// Check that the corpus can be reached.
    fn health_check(&self) -> impl Future<Output = Result<(), CorpusError>> + Send;

    /// Get the source name for logging.
    fn name(&self) -> &'static str;
}

/// Parse a corpus document: either a bare array of patents or `{"patents": [...]}`.
pub fn parse_corpus(json: &str) -> Result<Vec<PatentMaterialData>, CorpusError> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| CorpusError::Parse(e.to_string()))?;

    let patents = match value {
        array @ serde_json::Value::Array(_) => array,
        serde_json::Value::Object(mut object) => object
            .remove("patents")
            .ok_or_else(|| CorpusError::Parse("Missing patents array".to_string()))?,
        _ => {
            return Err(CorpusError::Parse(
                "Expected an array of patents or an object with a patents field".to_string(),
            ))
        }
    };

    serde_json::from_value(patents).map_err(|e| CorpusError::Parse(e.to_string()))
}

/// Parse a single patent document.
pub fn parse_patent(json: &str) -> Result<PatentMaterialData, CorpusError> {
    serde_json::from_str(json).map_err(|e| CorpusError::Parse(e.to_string()))
}

/// Read a single patent from a JSON file.
pub async fn read_patent(path: &Path) -> Result<PatentMaterialData, CorpusError> {
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CorpusError::Io {
            path: path.display().to_string(),
            source,
        })?;
    parse_patent(&json)
}

/// Corpus stored in a local JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileCorpus {
    path: PathBuf,
}

impl JsonFileCorpus {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(&self, source: std::io::Error) -> CorpusError {
        CorpusError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl CorpusSource for JsonFileCorpus {
    async fn load(&self) -> Result<Vec<PatentMaterialData>, CorpusError> {
        tracing::debug!(path = %self.path.display(), "Reading corpus file");

        let json = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        let patents = parse_corpus(&json)?;

        tracing::info!(count = patents.len(), "Loaded corpus");
        Ok(patents)
    }

    async fn health_check(&self) -> Result<(), CorpusError> {
        let metadata = tokio::fs::metadata(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        if metadata.is_file() {
            Ok(())
        } else {
            Err(CorpusError::Unavailable)
        }
    }

    fn name(&self) -> &'static str {
        "json-file"
    }
}

/// HTTP corpus configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpCorpusConfig {
    /// Base URL of the patent service
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for HttpCorpusConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Corpus served over HTTP as JSON (`GET {base_url}/patents`).
pub struct HttpCorpus {
    config: HttpCorpusConfig,
    client: reqwest::Client,
}

impl HttpCorpus {
    /// Create a new HTTP corpus client.
    pub fn new(config: HttpCorpusConfig) -> Result<Self, CorpusError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CorpusError::Connection(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

impl CorpusSource for HttpCorpus {
    async fn load(&self) -> Result<Vec<PatentMaterialData>, CorpusError> {
        let url = self.endpoint("patents");
        tracing::debug!(url = %url, "Fetching corpus");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CorpusError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CorpusError::RequestFailed(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let json = response
            .text()
            .await
            .map_err(|e| CorpusError::Parse(e.to_string()))?;
        let patents = parse_corpus(&json)?;

        tracing::info!(count = patents.len(), "Loaded corpus");
        Ok(patents)
    }

    async fn health_check(&self) -> Result<(), CorpusError> {
        let response = self
            .client
            .get(self.endpoint("health"))
            .send()
            .await
            .map_err(|e| CorpusError::Connection(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CorpusError::Unavailable)
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
