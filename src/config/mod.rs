//! Configuration management for kbrag
//!
//! Handles loading, saving, and validating configuration. The file is TOML;
//! a `.json` extension is read as JSON with the same section layout.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Provider endpoint and credentials
    #[serde(default)]
    pub api: ApiConfig,

    /// Model identifiers
    #[serde(default)]
    pub models: ModelsConfig,

    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunk: ChunkConfig,

    /// Knowledge source
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// Embedding cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// File logging
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Provider API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API key; when empty the key is read from `key_env`
    #[serde(default)]
    pub key: String,

    /// Environment variable consulted when `key` is empty
    #[serde(default = "default_api_key_env")]
    pub key_env: String,

    /// Provider endpoint, e.g. `https://api.openai.com/v1`
    #[serde(default = "default_api_base_url")]
    pub base_url: String,

    /// Timeout for a single embedding request
    #[serde(default = "default_embedding_timeout_secs")]
    pub embedding_timeout_secs: u64,

    /// Timeout for a single chat completion request
    #[serde(default = "default_completion_timeout_secs")]
    pub completion_timeout_secs: u64,
}

/// Model identifiers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default = "default_embedding_model")]
    pub embedding: String,

    #[serde(default = "default_chat_model")]
    pub chat: String,
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of passages used as grounding context
    #[serde(default = "default_retrieval_top_k")]
    pub top_k: usize,
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Line-start token that opens a new passage
    #[serde(default = "default_chunk_delimiter")]
    pub delimiter: String,
}

/// Knowledge source configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Path to the knowledge file (relative paths resolve against the config dir)
    #[serde(default)]
    pub path: Option<String>,
}

/// Embedding cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache directory (relative paths resolve against the config dir)
    #[serde(default = "default_cache_dir")]
    pub dir: String,

    /// Persist a recomputation even when some chunks failed to embed
    #[serde(default = "default_cache_persist_partial")]
    pub persist_partial: bool,
}

/// File logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for per-run log files; unset disables file logging
    #[serde(default = "default_logging_dir")]
    pub dir: Option<String>,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory that relative paths resolve against
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            key_env: default_api_key_env(),
            base_url: default_api_base_url(),
            embedding_timeout_secs: default_embedding_timeout_secs(),
            completion_timeout_secs: default_completion_timeout_secs(),
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            embedding: default_embedding_model(),
            chat: default_chat_model(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_retrieval_top_k(),
        }
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            delimiter: default_chunk_delimiter(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            persist_partial: default_cache_persist_partial(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_logging_dir(),
        }
    }
}

impl ApiConfig {
    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embedding_timeout_secs)
    }

    pub fn completion_timeout(&self) -> Duration {
        Duration::from_secs(self.completion_timeout_secs)
    }
}

impl Config {
    /// Get the default base directory for kbrag (~/.kbrag)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".kbrag")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Initialize paths configuration
    pub fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
            base_dir: base,
        };
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = if config_path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(&content)?
        } else {
            toml::from_str(&content)?
        };

        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            base_dir: base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a base directory, falling back to defaults
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            debug!("Loading config from {:?}", config.paths.config_file);
            let content = std::fs::read_to_string(&config.paths.config_file)?;
            let mut loaded: Config = toml::from_str(&content)?;
            loaded.paths = config.paths;
            config = loaded;
        } else {
            debug!("No config file found, using defaults");
        }

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Resolve the API key, preferring the inline value over the environment
    pub fn api_key(&self) -> Option<String> {
        if !self.api.key.trim().is_empty() {
            return Some(self.api.key.trim().to_string());
        }
        if self.api.key_env.is_empty() {
            return None;
        }
        std::env::var(&self.api.key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    /// Resolve a possibly-relative path against the config directory
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.paths.base_dir.join(path)
        }
    }

    /// Directory holding the persisted vectors, chunks and manifest
    pub fn cache_dir(&self) -> PathBuf {
        self.resolve_path(&self.cache.dir)
    }

    /// Configured knowledge file, if any
    pub fn corpus_path(&self) -> Option<PathBuf> {
        self.corpus.path.as_deref().map(|p| self.resolve_path(p))
    }

    /// Configured log directory, if file logging is enabled
    pub fn log_dir(&self) -> Option<PathBuf> {
        self.logging.dir.as_deref().map(|p| self.resolve_path(p))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.top_k == 0 {
            return Err(Error::Config(
                "retrieval.top_k must be a positive integer".to_string(),
            ));
        }

        if self.models.embedding.trim().is_empty() {
            return Err(Error::Config("models.embedding must be set".to_string()));
        }

        if self.models.chat.trim().is_empty() {
            return Err(Error::Config("models.chat must be set".to_string()));
        }

        if self.chunk.delimiter.is_empty() {
            return Err(Error::Config("chunk.delimiter must not be empty".to_string()));
        }

        if self.api.embedding_timeout_secs == 0 || self.api.completion_timeout_secs == 0 {
            return Err(Error::Config(
                "api timeouts must be positive".to_string(),
            ));
        }

        Url::parse(&self.api.base_url)
            .map_err(|e| Error::Config(format!("api.base_url is not a valid URL: {}", e)))?;

        Ok(())
    }
}
