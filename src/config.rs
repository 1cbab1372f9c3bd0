//! Configuration for the document Q&A service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Chat/embedding gateway configuration
    #[serde(default)]
    pub chat: ChatConfig,
    /// Vector index gateway configuration
    #[serde(default)]
    pub vector_index: VectorIndexConfig,
    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file, then apply environment overrides
    /// for secrets so API keys never have to live in the file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let mut config: AppConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Default configuration with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("PAPERCHAT_CHAT_API_KEY") {
            self.chat.api_key = key;
        }
        if let Ok(url) = std::env::var("PAPERCHAT_CHAT_BASE_URL") {
            self.chat.base_url = url;
        }
        if let Ok(key) = std::env::var("PAPERCHAT_VECTOR_API_KEY") {
            self.vector_index.api_key = key;
        }
        if let Ok(host) = std::env::var("PAPERCHAT_VECTOR_HOST") {
            self.vector_index.host = host;
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 25MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_upload_size: 25 * 1024 * 1024,
        }
    }
}

/// Chat and embedding gateway configuration (OpenAI-compatible API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// API base URL
    pub base_url: String,
    /// API key (usually supplied via PAPERCHAT_CHAT_API_KEY)
    #[serde(default)]
    pub api_key: String,
    /// Chat-completion model name
    pub completion_model: String,
    /// Embedding model name
    pub embedding_model: String,
    /// Embedding dimensions
    pub embedding_dimensions: usize,
    /// Temperature for generation
    pub temperature: f32,
    /// Maximum tokens per completion
    pub max_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            completion_model: "gpt-4-turbo-preview".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            embedding_dimensions: 1536,
            temperature: 0.3,
            max_tokens: 800,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Vector index gateway configuration (Pinecone-style REST API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndexConfig {
    /// Index host, e.g. "https://my-index-abc123.svc.pinecone.io"
    pub host: String,
    /// API key (usually supplied via PAPERCHAT_VECTOR_API_KEY)
    #[serde(default)]
    pub api_key: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:5080".to_string(),
            api_key: String::new(),
            timeout_secs: 30,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of nearest neighbors to request
    pub top_k: usize,
    /// Minimum similarity score for a match to contribute context
    pub min_score: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_score: 0.7,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database path
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let database_path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("paperchat")
            .join("paperchat.db");
        Self { database_path }
    }
}
