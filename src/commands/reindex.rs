//! Reindex command - re-embed the whole knowledge file

use crate::config::Config;
use crate::embed::Embedder;
use crate::error::Result;
use crate::store::{CorpusOrigin, EmbeddingStore};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Reindex statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReindexStats {
    pub passages: usize,
    pub dropped: usize,
    pub persisted: bool,
    pub dimension: Option<usize>,
    pub elapsed_ms: u128,
}

/// Recompute every embedding, ignoring the cache's freshness
pub async fn cmd_reindex(
    config: &Config,
    corpus_path: &Path,
    embedder: &dyn Embedder,
) -> Result<ReindexStats> {
    info!("Starting reindex of {}", corpus_path.display());
    let started = Instant::now();

    let store = EmbeddingStore::rebuild(config, corpus_path, embedder).await?;
    let (dropped, persisted) = match store.origin() {
        CorpusOrigin::Recomputed { dropped, persisted } => (dropped, persisted),
        CorpusOrigin::Loaded => (0, true),
    };

    Ok(ReindexStats {
        passages: store.corpus().len(),
        dropped,
        persisted,
        dimension: store.corpus().dimension(),
        elapsed_ms: started.elapsed().as_millis(),
    })
}

/// Print reindex statistics to console
pub fn print_reindex_stats(stats: &ReindexStats) {
    println!("\n🔄 Reindex Complete\n");
    println!("Passages embedded: {}", stats.passages);
    if let Some(dimension) = stats.dimension {
        println!("Dimension: {}", dimension);
    }
    if stats.dropped > 0 {
        println!("Passages dropped: {}", stats.dropped);
    }
    if !stats.persisted {
        println!("⚠ Cache not saved; it will be rebuilt on next use");
    }
    println!("Took: {:.1}s", stats.elapsed_ms as f64 / 1000.0);
}
