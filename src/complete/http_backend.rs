use super::{ChatMessage, Completer};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::provider_backend::ProviderClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

/// Completer backed by an OpenAI-compatible HTTP API
pub struct HttpCompleter {
    client: ProviderClient,
    model_id: String,
}

impl HttpCompleter {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_endpoint(
            &config.api.base_url,
            config.api_key().as_deref(),
            &config.models.chat,
            config.api.completion_timeout(),
        )
    }

    pub fn with_endpoint(
        base_url: &str,
        api_key: Option<&str>,
        model: &str,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: ProviderClient::new(base_url, api_key, timeout)?,
            model_id: model.to_string(),
        })
    }
}

#[async_trait]
impl Completer for HttpCompleter {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = ChatRequest {
            model: &self.model_id,
            messages,
        };
        let parsed: ChatResponse = self.client.post_json("chat/completions", &request).await?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                Error::ProviderResponseMalformed("response contained no message content".to_string())
            })?;

        debug!(model = %self.model_id, chars = content.len(), "Received completion");
        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completer(server: &MockServer, timeout: Duration) -> HttpCompleter {
        HttpCompleter::with_endpoint(&server.uri(), None, "chat-mini", timeout).unwrap()
    }

    fn messages() -> Vec<ChatMessage> {
        vec![
            ChatMessage::system("Answer using only the following content:\nLiu Fang likes singing"),
            ChatMessage::user("who likes singing"),
        ]
    }

    #[tokio::test]
    async fn test_complete_sends_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_json(json!({
                "model": "chat-mini",
                "messages": [
                    {"role": "system", "content": "Answer using only the following content:\nLiu Fang likes singing"},
                    {"role": "user", "content": "who likes singing"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "Liu Fang."}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let answer = completer(&server, Duration::from_secs(5))
            .complete(&messages())
            .await
            .unwrap();
        assert_eq!(answer, "Liu Fang.");
    }

    #[tokio::test]
    async fn test_complete_without_choices_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = completer(&server, Duration::from_secs(5))
            .complete(&messages())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProviderResponseMalformed(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_complete_unauthorized_is_transport() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let err = completer(&server, Duration::from_secs(5))
            .complete(&messages())
            .await
            .unwrap_err();
        match err {
            Error::ProviderTransport(msg) => assert!(msg.contains("401")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_complete_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let err = completer(&server, Duration::from_millis(200))
            .complete(&messages())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProviderTimeout(_)), "{err:?}");
    }
}
