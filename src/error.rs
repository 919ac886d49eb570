//! Custom error types for kbrag

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for kbrag operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider request timed out: {0}")]
    ProviderTimeout(String),

    #[error("Provider transport error: {0}")]
    ProviderTransport(String),

    #[error("Malformed provider response: {0}")]
    ProviderResponseMalformed(String),

    #[error("Embedding cache incomplete, missing {}", .0.display())]
    CacheMissing(PathBuf),

    #[error("Embedding cache corrupt: {0}")]
    CacheCorrupt(String),

    #[error("Cannot read knowledge source {}: {source}", .path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Error {
    /// Whether this failure came from the embedding/completion provider
    pub fn is_provider(&self) -> bool {
        matches!(
            self,
            Error::ProviderTimeout(_)
                | Error::ProviderTransport(_)
                | Error::ProviderResponseMalformed(_)
        )
    }

    /// Whether the persisted cache should be rebuilt instead of surfacing this error
    pub fn is_cache(&self) -> bool {
        matches!(self, Error::CacheMissing(_) | Error::CacheCorrupt(_))
    }
}

/// Classify reqwest failures into the provider taxonomy
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::ProviderTimeout(err.to_string())
        } else if err.is_decode() {
            Error::ProviderResponseMalformed(err.to_string())
        } else {
            Error::ProviderTransport(err.to_string())
        }
    }
}

/// Result type alias for kbrag
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_classification() {
        assert!(Error::ProviderTimeout("t".into()).is_provider());
        assert!(Error::ProviderResponseMalformed("m".into()).is_provider());
        assert!(!Error::CacheCorrupt("c".into()).is_provider());
    }

    #[test]
    fn test_cache_classification() {
        assert!(Error::CacheMissing(PathBuf::from("vectors.bin")).is_cache());
        assert!(Error::CacheCorrupt("rows".into()).is_cache());
        let unreadable = Error::SourceUnreadable {
            path: PathBuf::from("kb.txt"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(!unreadable.is_cache());
        assert!(unreadable.to_string().contains("kb.txt"));
    }
}
