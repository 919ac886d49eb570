use super::Embedder;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::provider_backend::ProviderClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum EmbeddingResponse {
    Data { data: Vec<EmbeddingData> },
    Embeddings { embeddings: Vec<Vec<f32>> },
    Vectors { vectors: Vec<Vec<f32>> },
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl EmbeddingResponse {
    fn into_first(self) -> Option<Vec<f32>> {
        match self {
            EmbeddingResponse::Data { data } => data.into_iter().next().map(|d| d.embedding),
            EmbeddingResponse::Embeddings { embeddings } => embeddings.into_iter().next(),
            EmbeddingResponse::Vectors { vectors } => vectors.into_iter().next(),
        }
    }
}

/// Embedder backed by an OpenAI-compatible HTTP API
pub struct HttpEmbedder {
    client: ProviderClient,
    model_id: String,
}

impl HttpEmbedder {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_endpoint(
            &config.api.base_url,
            config.api_key().as_deref(),
            &config.models.embedding,
            config.api.embedding_timeout(),
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
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbedRequest {
            model: &self.model_id,
            input: text,
        };
        let parsed: EmbeddingResponse = self.client.post_json("embeddings", &request).await?;

        let embedding = parsed.into_first().ok_or_else(|| {
            Error::ProviderResponseMalformed("response contained no embedding".to_string())
        })?;
        if embedding.is_empty() {
            return Err(Error::ProviderResponseMalformed(
                "provider returned an empty embedding".to_string(),
            ));
        }

        debug!(model = %self.model_id, dimension = embedding.len(), "Embedded text");
        Ok(embedding)
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn embedder(server: &MockServer, timeout: Duration) -> HttpEmbedder {
        HttpEmbedder::with_endpoint(
            &format!("{}/v1", server.uri()),
            Some("sk-test"),
            "embed-small",
            timeout,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_embed_openai_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_json(json!({"model": "embed-small", "input": "who likes singing"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"embedding": [0.25, -0.5, 1.0], "index": 0}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let vector = embedder(&server, Duration::from_secs(5))
            .embed("who likes singing")
            .await
            .unwrap();
        assert_eq!(vector, vec![0.25, -0.5, 1.0]);
    }

    #[tokio::test]
    async fn test_embed_alternate_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[1.0, 2.0]]})),
            )
            .mount(&server)
            .await;

        let vector = embedder(&server, Duration::from_secs(5)).embed("x").await.unwrap();
        assert_eq!(vector, vec![1.0, 2.0]);
    }

    #[tokio::test]
    async fn test_embed_missing_fields_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"object": "list"})))
            .mount(&server)
            .await;

        let err = embedder(&server, Duration::from_secs(5)).embed("x").await.unwrap_err();
        assert!(matches!(err, Error::ProviderResponseMalformed(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_embed_empty_data_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        let err = embedder(&server, Duration::from_secs(5)).embed("x").await.unwrap_err();
        assert!(matches!(err, Error::ProviderResponseMalformed(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_embed_http_error_is_transport() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&server)
            .await;

        let err = embedder(&server, Duration::from_secs(5)).embed("x").await.unwrap_err();
        assert!(matches!(err, Error::ProviderTransport(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_embed_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": [{"embedding": [1.0]}]}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let err = embedder(&server, Duration::from_millis(200))
            .embed("x")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProviderTimeout(_)), "{err:?}");
    }
}
