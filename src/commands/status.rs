//! Status command implementation

use crate::config::Config;
use crate::error::Result;
use crate::store::{CacheStatus, EmbeddingStore};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Status information
#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub config_path: String,
    pub base_url: String,
    pub api_key_set: bool,
    pub embedding_model: String,
    pub chat_model: String,
    pub top_k: usize,
    pub corpus_path: Option<String>,
    pub cache: Option<CacheStatus>,
}

/// Get system status; never contacts a provider
pub fn cmd_status(config: &Config, corpus_path: Option<&Path>) -> Result<StatusInfo> {
    info!("Getting status");

    Ok(StatusInfo {
        config_path: config.paths.config_file.display().to_string(),
        base_url: config.api.base_url.clone(),
        api_key_set: config.api_key().is_some(),
        embedding_model: config.models.embedding.clone(),
        chat_model: config.models.chat.clone(),
        top_k: config.retrieval.top_k,
        corpus_path: corpus_path.map(|p| p.display().to_string()),
        cache: corpus_path.map(|p| EmbeddingStore::status(config, p)),
    })
}

/// Print status to console
pub fn print_status(status: &StatusInfo) {
    println!("\n📊 kbrag Status\n");
    println!("Configuration: {}", status.config_path);
    println!("\nProvider:");
    println!("  URL: {}", status.base_url);
    println!(
        "  API key: {}",
        if status.api_key_set { "✓ set" } else { "✗ not set" }
    );
    println!("  Embedding model: {}", status.embedding_model);
    println!("  Chat model: {}", status.chat_model);
    println!("  Top k: {}", status.top_k);

    let Some(cache) = &status.cache else {
        println!("\nKnowledge file: not configured (set corpus.path or pass --corpus)");
        return;
    };

    println!("\nKnowledge file: {}", cache.source);
    match cache.source_mtime {
        Some(mtime) => println!("  Modified: {}", format_mtime(mtime)),
        None => println!("  ✗ Not readable"),
    }

    println!("\nEmbedding cache: {}", cache.cache_dir);
    let state = if !cache.missing_artifacts.is_empty() {
        "✗ Not built (run 'kbrag reindex' or ask a question)"
    } else if cache.error.is_some() {
        "✗ Corrupt (will be rebuilt on next use)"
    } else if cache.stale {
        "⚠ Stale (will be rebuilt on next use)"
    } else {
        "✓ Fresh"
    };
    println!("  Status: {}", state);
    if let Some(recorded) = &cache.recorded_source {
        println!("  Built for: {}", recorded);
    }
    if let Some(recorded) = cache.recorded_mtime {
        println!("  Built from: {}", format_mtime(recorded));
    }
    if let Some(passages) = cache.passages {
        println!("  Passages: {}", passages);
    }
    if let Some(dimension) = cache.dimension {
        println!("  Dimension: {}", dimension);
    }
    for missing in &cache.missing_artifacts {
        println!("  Missing: {}", missing);
    }
    if let Some(error) = &cache.error {
        println!("  Error: {}", error);
    }
}

fn format_mtime(secs: f64) -> String {
    chrono::DateTime::from_timestamp_millis((secs * 1000.0) as i64)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("{} (epoch seconds)", secs))
}
