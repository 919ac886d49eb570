//! Chat completion
//!
//! The completion provider turns an ordered list of role-tagged messages into
//! answer text. Real calls go to an OpenAI-compatible `/chat/completions`
//! endpoint; `ScriptedCompleter` stands in for it offline.

mod http_backend;
mod stub;

pub use http_backend::*;
pub use stub::*;

use crate::config::Config;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Trait for completion providers
#[async_trait]
pub trait Completer: Send + Sync {
    /// Generate a reply for the given conversation
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Create a completer based on configuration
pub fn create_completer(config: &Config) -> Result<Arc<dyn Completer>> {
    let completer = HttpCompleter::new(config)?;
    Ok(Arc::new(completer))
}
