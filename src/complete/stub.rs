use super::{ChatMessage, Completer};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Mutex;

/// Completer that returns a fixed reply (or always fails) and records every request
#[derive(Debug)]
pub struct ScriptedCompleter {
    reply: Option<String>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedCompleter {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Conversations received so far, oldest first
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Completer for ScriptedCompleter {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        if let Ok(mut guard) = self.requests.lock() {
            guard.push(messages.to_vec());
        }

        self.reply
            .clone()
            .ok_or_else(|| Error::ProviderTransport("scripted completer failure".to_string()))
    }

    fn model_name(&self) -> &str {
        "scripted-stub"
    }
}
