//! Search command implementation

use crate::chunk::preview;
use crate::config::Config;
use crate::embed::Embedder;
use crate::error::{Error, Result};
use crate::index::SimilarityResult;
use crate::store::EmbeddingStore;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Search result for CLI display
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub query: String,
    pub k: usize,
    pub passages_searched: usize,
    pub results: Vec<SimilarityResult>,
}

/// Rank passages against `query` without calling the chat model.
///
/// Unlike `ask`, a failed query embedding is reported as an error here.
pub async fn cmd_search(
    config: &Config,
    corpus_path: &Path,
    query: &str,
    k: Option<usize>,
    embedder: &dyn Embedder,
) -> Result<SearchResult> {
    info!("Searching: {}", query);

    let k = k.unwrap_or(config.retrieval.top_k);
    let store = EmbeddingStore::open(config, corpus_path, embedder).await?;
    let vector = embedder.embed(query).await?;
    if let Some(dim) = store.corpus().dimension() {
        if dim != vector.len() {
            return Err(Error::Config(format!(
                "query embedding has dimension {} but the cache holds {}; run 'kbrag reindex' after changing models",
                vector.len(),
                dim
            )));
        }
    }
    let results = store.corpus().search(Some(vector.as_slice()), k);

    Ok(SearchResult {
        query: query.to_string(),
        k,
        passages_searched: store.corpus().len(),
        results,
    })
}

/// Print search results to console
pub fn print_search_results(result: &SearchResult) {
    println!("\n🔍 Query: {}\n", result.query);
    println!(
        "Top {} of {} passages:\n",
        result.results.len(),
        result.passages_searched
    );

    for (i, r) in result.results.iter().enumerate() {
        println!("{}. [passage {}, score: {:.3}]", i + 1, r.index, r.score);
        println!("   {}\n", preview(&r.chunk, 200).replace('\n', " "));
    }
}
