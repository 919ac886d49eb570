use super::Embedder;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Deterministic embedder for offline runs and tests.
///
/// A text gets the vector of the first rule whose keyword it contains, or the
/// fallback vector. Texts matching no rule and without a fallback fail with a
/// transport error, which is how tests simulate an unavailable provider.
#[derive(Debug, Default)]
pub struct KeywordEmbedder {
    rules: Vec<(String, Vec<f32>)>,
    failing: Vec<String>,
    fallback: Option<Vec<f32>>,
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Texts containing `keyword` embed to `vector`
    pub fn with_rule(mut self, keyword: impl Into<String>, vector: Vec<f32>) -> Self {
        self.rules.push((keyword.into(), vector));
        self
    }

    /// Texts containing `keyword` always fail, ahead of any rule
    pub fn failing_on(mut self, keyword: impl Into<String>) -> Self {
        self.failing.push(keyword.into());
        self
    }

    pub fn with_fallback(mut self, vector: Vec<f32>) -> Self {
        self.fallback = Some(vector);
        self
    }

    /// Number of `embed` calls so far, failed ones included
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.failing.iter().any(|k| text.contains(k.as_str())) {
            return Err(Error::ProviderTransport(format!(
                "stub embedder refused: {}",
                text
            )));
        }

        self.rules
            .iter()
            .find(|(keyword, _)| text.contains(keyword.as_str()))
            .map(|(_, vector)| vector.clone())
            .or_else(|| self.fallback.clone())
            .ok_or_else(|| Error::ProviderTransport(format!("no stub vector for: {}", text)))
    }

    fn model_name(&self) -> &str {
        "keyword-stub"
    }
}
