//! Retrieval-augmented answering
//!
//! `RetrievalOrchestrator` ties the pieces together: it opens the embedding
//! store once, embeds each question, picks the top passages and asks the
//! completion provider to answer from them. Provider failures never escape:
//! a failed query embedding means an empty context, a failed completion means
//! the fallback answer.

mod prompt;

pub use prompt::*;

use crate::complete::Completer;
use crate::config::Config;
use crate::embed::Embedder;
use crate::error::Result;
use crate::index::SimilarityResult;
use crate::store::EmbeddingStore;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// An answer together with the passages it was grounded on
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub question: String,
    pub answer: String,
    pub sources: Vec<SimilarityResult>,
}

pub struct RetrievalOrchestrator {
    store: EmbeddingStore,
    embedder: Arc<dyn Embedder>,
    completer: Arc<dyn Completer>,
    top_k: usize,
}

impl RetrievalOrchestrator {
    /// Open (or build) the embedding cache for `corpus_path`.
    ///
    /// Fails only when the knowledge file cannot be read or the config is
    /// unusable.
    pub async fn new(
        config: &Config,
        corpus_path: &Path,
        embedder: Arc<dyn Embedder>,
        completer: Arc<dyn Completer>,
    ) -> Result<Self> {
        let store = EmbeddingStore::open(config, corpus_path, embedder.as_ref()).await?;
        Ok(Self::with_store(config, store, embedder, completer))
    }

    /// Wrap an already opened store
    pub fn with_store(
        config: &Config,
        store: EmbeddingStore,
        embedder: Arc<dyn Embedder>,
        completer: Arc<dyn Completer>,
    ) -> Self {
        info!(
            "Retrieval ready: {} passages, embedding model {}, chat model {}",
            store.corpus().len(),
            embedder.model_name(),
            completer.model_name()
        );
        Self {
            store,
            embedder,
            completer,
            top_k: config.retrieval.top_k,
        }
    }

    pub fn store(&self) -> &EmbeddingStore {
        &self.store
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Top `retrieval.top_k` passages for `query`
    pub async fn retrieve(&self, query: &str) -> Vec<SimilarityResult> {
        self.retrieve_k(query, self.top_k).await
    }

    /// Top `k` passages for `query`.
    ///
    /// Empty when the query cannot be embedded or its dimension differs from
    /// the stored vectors (e.g. the cache was built with another model).
    pub async fn retrieve_k(&self, query: &str, k: usize) -> Vec<SimilarityResult> {
        let vector = match self.embedder.embed(query).await {
            Ok(v) => match self.store.corpus().dimension() {
                Some(dim) if dim != v.len() => {
                    warn!(
                        "Query embedding has dimension {} but stored vectors have {}; \
                         continuing without context (run 'kbrag reindex' after changing models)",
                        v.len(),
                        dim
                    );
                    None
                }
                _ => Some(v),
            },
            Err(e) => {
                error!("Query embedding failed, continuing without context: {}", e);
                None
            }
        };

        let results = self.store.corpus().search(vector.as_deref(), k);
        debug!("Retrieved {} passages for: {}", results.len(), query);
        results
    }

    /// Answer `question` from the knowledge file
    pub async fn answer(&self, question: &str) -> String {
        self.answer_with_sources(question).await.answer
    }

    /// Answer `question` and report the passages used as context
    pub async fn answer_with_sources(&self, question: &str) -> Answer {
        let sources = self.retrieve(question).await;
        let context = build_context(&sources);
        let messages = build_messages(&context, question);

        let answer = match self.completer.complete(&messages).await {
            Ok(text) => text,
            Err(e) => {
                error!("Completion failed: {}", e);
                FALLBACK_ANSWER.to_string()
            }
        };

        Answer {
            question: question.to_string(),
            answer,
            sources,
        }
    }
}
