//! HTTP plumbing shared by the embedding and completion providers
//!
//! One client per call kind, each with its own timeout. Requests are sent
//! once: a timeout or transport failure is reported, never retried.

use crate::error::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub struct ProviderClient {
    client: Client,
    base_url: Url,
}

impl ProviderClient {
    /// Build a client for an OpenAI-compatible endpoint such as `https://api.openai.com/v1`
    pub fn new(base_url: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self> {
        // Url::join drops the last path segment unless the base ends with '/'
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized)
            .map_err(|e| Error::Config(format!("Invalid provider base URL: {}", e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key.map(str::trim).filter(|k| !k.is_empty()) {
            let auth = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|_| Error::Config("API key contains invalid characters".to_string()))?;
            headers.insert(AUTHORIZATION, auth);
        }

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::Config(format!("Invalid provider URL: {}", e)))
    }

    /// POST a JSON body and decode the JSON response
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        debug!("POST {}", url);

        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(Error::ProviderTransport(format!(
                "provider returned {}: {}",
                status, text
            )));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            Error::ProviderResponseMalformed(format!("unexpected response body: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = ProviderClient::new("https://api.example.com/v1", None, Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.endpoint("embeddings").unwrap().as_str(),
            "https://api.example.com/v1/embeddings"
        );

        let client = ProviderClient::new("https://api.example.com/v1/", None, Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.endpoint("/chat/completions").unwrap().as_str(),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            ProviderClient::new("::not a url", None, Duration::from_secs(1)),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_invalid_api_key() {
        assert!(ProviderClient::new("http://localhost", Some("bad\nkey"), Duration::from_secs(1)).is_err());
    }
}
