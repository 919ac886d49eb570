//! Embedding cache
//!
//! This module owns the passage/vector pair for one knowledge file:
//! - Deciding whether the on-disk cache is still valid
//! - Recomputing passages and embeddings when it is not
//! - Persisting and restoring the three cache artifacts

mod codec;
mod manifest;

pub use codec::*;
pub use manifest::*;

use crate::chunk::{preview, Chunker};
use crate::config::Config;
use crate::embed::Embedder;
use crate::error::{Error, Result};
use crate::index::{self, SimilarityResult};
use crate::progress::embedding_progress;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const VECTORS_FILE: &str = "vectors.bin";
const CHUNKS_FILE: &str = "chunks.txt";
const MANIFEST_FILE: &str = "manifest.txt";
const SOURCE_FILE: &str = "source.txt";

/// Passages and their embeddings, kept in lockstep.
///
/// `vectors()[i]` is the embedding of `chunks()[i]`; construction fails when
/// the lengths disagree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    chunks: Vec<String>,
    vectors: Vec<Vec<f32>>,
}

impl Corpus {
    pub fn new(chunks: Vec<String>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if chunks.len() != vectors.len() {
            return Err(Error::CacheCorrupt(format!(
                "{} vectors for {} passages",
                vectors.len(),
                chunks.len()
            )));
        }
        Ok(Self { chunks, vectors })
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Embedding dimension, if there is at least one vector
    pub fn dimension(&self) -> Option<usize> {
        self.vectors.first().map(Vec::len)
    }

    /// Top-`k` passages for a query vector
    pub fn search(&self, query: Option<&[f32]>, k: usize) -> Vec<SimilarityResult> {
        index::search(query, &self.chunks, &self.vectors, k)
    }
}

/// File locations of the three cache artifacts
#[derive(Debug, Clone)]
pub struct CacheLayout {
    dir: PathBuf,
}

impl CacheLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn vectors_path(&self) -> PathBuf {
        self.dir.join(VECTORS_FILE)
    }

    pub fn chunks_path(&self) -> PathBuf {
        self.dir.join(CHUNKS_FILE)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    pub fn source_path(&self) -> PathBuf {
        self.dir.join(SOURCE_FILE)
    }

    /// Artifacts that are not present on disk
    pub fn missing_artifacts(&self) -> Vec<PathBuf> {
        [
            self.vectors_path(),
            self.chunks_path(),
            self.source_path(),
            self.manifest_path(),
        ]
        .into_iter()
        .filter(|p| !p.is_file())
        .collect()
    }

    /// Knowledge file the cached passages were computed from
    pub fn recorded_source(&self) -> Result<String> {
        read_artifact(&self.source_path(), |p| std::fs::read_to_string(p))
    }

    /// Whether the cache must be recomputed for `source`.
    ///
    /// Stale when any artifact is missing, the cache was computed from a
    /// different knowledge file, the manifest is unreadable, the source cannot
    /// be stat'ed, or the source is strictly newer than the recorded
    /// modification time.
    pub fn is_stale(&self, source: &Path) -> bool {
        if let Some(missing) = self.missing_artifacts().first() {
            debug!("Cache artifact missing: {}", missing.display());
            return true;
        }

        let identity = source_identity(source);
        match self.recorded_source() {
            Ok(recorded) if recorded == identity => {}
            Ok(recorded) => {
                info!(
                    "Embedding cache belongs to {}, not {}; recomputing",
                    recorded, identity
                );
                return true;
            }
            Err(e) => {
                warn!("Ignoring unreadable source record: {}", e);
                return true;
            }
        }

        let recorded = match Manifest::read(&self.manifest_path()) {
            Ok(m) => m,
            Err(e) => {
                warn!("Ignoring unreadable manifest: {}", e);
                return true;
            }
        };

        let current = match Manifest::capture(source) {
            Ok(m) => m,
            Err(e) => {
                warn!("Cannot stat {}: {}", source.display(), e);
                return true;
            }
        };

        recorded.is_outdated_by(&current)
    }

    /// Write vectors, passages, the source record and the manifest.
    ///
    /// The old manifest is removed first and the new one written last, so an
    /// interrupted write leaves a cache that reads as stale.
    pub fn persist(&self, corpus: &Corpus, manifest: &Manifest, source: &Path) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        match std::fs::remove_file(self.manifest_path()) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let matrix = encode_matrix(corpus.vectors())?;
        let chunks = encode_chunks(corpus.chunks())?;
        std::fs::write(self.vectors_path(), matrix)?;
        std::fs::write(self.chunks_path(), chunks)?;
        std::fs::write(self.source_path(), source_identity(source))?;
        manifest.write(&self.manifest_path())?;

        info!(
            "Persisted {} passages to {}",
            corpus.len(),
            self.dir.display()
        );
        Ok(())
    }

    /// Restore the corpus from disk
    pub fn load(&self) -> Result<Corpus> {
        if let Some(missing) = self.missing_artifacts().into_iter().next() {
            return Err(Error::CacheMissing(missing));
        }
        // The manifest only has to be well-formed here; freshness is is_stale's job
        Manifest::read(&self.manifest_path())?;

        let bytes = read_artifact(&self.vectors_path(), |p| std::fs::read(p))?;
        let vectors = decode_matrix(&bytes)?;

        let text = read_artifact(&self.chunks_path(), |p| std::fs::read_to_string(p))?;
        let chunks = decode_chunks(&text)?;

        let corpus = Corpus::new(chunks, vectors)?;
        debug!(
            "Loaded {} passages (dimension {:?}) from {}",
            corpus.len(),
            corpus.dimension(),
            self.dir.display()
        );
        Ok(corpus)
    }
}

fn read_artifact<T>(path: &Path, read: impl FnOnce(&Path) -> std::io::Result<T>) -> Result<T> {
    read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::CacheMissing(path.to_path_buf()),
        _ => Error::CacheCorrupt(format!("cannot read {}: {}", path.display(), e)),
    })
}

/// Output of a recomputation
#[derive(Debug, Clone)]
pub struct Recomputed {
    pub corpus: Corpus,
    pub manifest: Manifest,
    /// Passages dropped because their embedding failed
    pub dropped: usize,
}

/// Read, chunk and embed the knowledge file.
///
/// Embeddings are requested one passage at a time. A passage whose embedding
/// fails, or comes back with a different dimension than the first one, is
/// dropped together with its text.
pub async fn recompute(
    source: &Path,
    chunker: &Chunker,
    embedder: &dyn Embedder,
) -> Result<Recomputed> {
    let unreadable = |e: std::io::Error| Error::SourceUnreadable {
        path: source.to_path_buf(),
        source: e,
    };

    let before = Manifest::capture(source).map_err(unreadable)?;
    let content = std::fs::read_to_string(source).map_err(unreadable)?;
    let after = Manifest::capture(source).map_err(unreadable)?;
    let (manifest, changed) = Manifest::settle(before, after);
    if changed {
        warn!(
            "{} changed while it was being read; the cache will be refreshed on next start",
            source.display()
        );
    }

    let passages = chunker.split(&content);
    info!(
        "Split {} into {} passages; embedding with {}",
        source.display(),
        passages.len(),
        embedder.model_name()
    );

    let progress = embedding_progress(passages.len() as u64);
    let mut chunks = Vec::with_capacity(passages.len());
    let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(passages.len());
    let mut dropped = 0;

    for (i, passage) in passages.into_iter().enumerate() {
        progress.inc(1);
        match embedder.embed(&passage).await {
            Ok(vector) if vector.is_empty() => {
                warn!(passage = i, "Dropping passage: provider returned an empty embedding");
                dropped += 1;
            }
            Ok(vector) => {
                if let Some(dim) = vectors.first().map(Vec::len) {
                    if vector.len() != dim {
                        warn!(
                            passage = i,
                            "Dropping passage: embedding dimension {} differs from {}",
                            vector.len(),
                            dim
                        );
                        dropped += 1;
                        continue;
                    }
                }
                debug!(passage = i, "Embedded: {}", preview(&passage, 60));
                chunks.push(passage);
                vectors.push(vector);
            }
            Err(e) => {
                warn!(
                    passage = i,
                    error = %e,
                    "Dropping passage whose embedding failed: {}",
                    preview(&passage, 60)
                );
                dropped += 1;
            }
        }
    }
    progress.finish_and_clear();

    let corpus = Corpus::new(chunks, vectors)?;
    if dropped > 0 {
        warn!("{} of {} passages could not be embedded", dropped, corpus.len() + dropped);
    }

    Ok(Recomputed {
        corpus,
        manifest,
        dropped,
    })
}

/// Where the in-memory corpus came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CorpusOrigin {
    Loaded,
    Recomputed { dropped: usize, persisted: bool },
}

/// Snapshot of the cache state, gathered without calling any provider
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub source: String,
    /// Knowledge file the cache was computed from, if recorded
    pub recorded_source: Option<String>,
    pub cache_dir: String,
    pub source_mtime: Option<f64>,
    pub recorded_mtime: Option<f64>,
    pub missing_artifacts: Vec<String>,
    pub stale: bool,
    pub passages: Option<usize>,
    pub dimension: Option<usize>,
    pub error: Option<String>,
}

/// The passage/vector pair for one knowledge file, fixed after construction
pub struct EmbeddingStore {
    layout: CacheLayout,
    source: PathBuf,
    corpus: Corpus,
    origin: CorpusOrigin,
}

impl EmbeddingStore {
    /// Load the cache when it is fresh, otherwise recompute and persist it.
    ///
    /// Only an unreadable knowledge file is an error; a missing or corrupt
    /// cache falls back to recomputation.
    pub async fn open(config: &Config, source: &Path, embedder: &dyn Embedder) -> Result<Self> {
        let layout = CacheLayout::new(config.cache_dir());
        let chunker = Chunker::new(&config.chunk.delimiter)?;

        if layout.is_stale(source) {
            info!("Embedding cache for {} is stale or absent", source.display());
        } else {
            match layout.load() {
                Ok(corpus) => {
                    info!(
                        "Loaded {} cached passages from {}",
                        corpus.len(),
                        layout.dir().display()
                    );
                    return Ok(Self {
                        layout,
                        source: source.to_path_buf(),
                        corpus,
                        origin: CorpusOrigin::Loaded,
                    });
                }
                Err(e) if e.is_cache() => {
                    warn!("Cached embeddings unusable, recomputing: {}", e);
                }
                Err(e) => return Err(e),
            }
        }

        Self::recompute_into(layout, &chunker, source, embedder, config.cache.persist_partial).await
    }

    /// Recompute and persist regardless of cache freshness
    pub async fn rebuild(config: &Config, source: &Path, embedder: &dyn Embedder) -> Result<Self> {
        let layout = CacheLayout::new(config.cache_dir());
        let chunker = Chunker::new(&config.chunk.delimiter)?;
        Self::recompute_into(layout, &chunker, source, embedder, config.cache.persist_partial).await
    }

    async fn recompute_into(
        layout: CacheLayout,
        chunker: &Chunker,
        source: &Path,
        embedder: &dyn Embedder,
        persist_partial: bool,
    ) -> Result<Self> {
        let Recomputed {
            corpus,
            manifest,
            dropped,
        } = recompute(source, chunker, embedder).await?;

        let persisted = if dropped > 0 && !persist_partial {
            warn!("Not persisting an incomplete cache; failed passages will be retried next start");
            false
        } else {
            match layout.persist(&corpus, &manifest, source) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Could not persist embedding cache, keeping it in memory: {}", e);
                    false
                }
            }
        };

        Ok(Self {
            layout,
            source: source.to_path_buf(),
            corpus,
            origin: CorpusOrigin::Recomputed { dropped, persisted },
        })
    }

    /// Inspect the cache for `source` without embedding anything
    pub fn status(config: &Config, source: &Path) -> CacheStatus {
        let layout = CacheLayout::new(config.cache_dir());
        let missing = layout.missing_artifacts();

        let (passages, dimension, error) = if missing.is_empty() {
            match layout.load() {
                Ok(corpus) => (Some(corpus.len()), corpus.dimension(), None),
                Err(e) => (None, None, Some(e.to_string())),
            }
        } else {
            (None, None, None)
        };

        CacheStatus {
            source: source.display().to_string(),
            recorded_source: layout.recorded_source().ok(),
            cache_dir: layout.dir().display().to_string(),
            source_mtime: Manifest::capture(source).ok().map(|m| m.source_mtime),
            recorded_mtime: Manifest::read(&layout.manifest_path())
                .ok()
                .map(|m| m.source_mtime),
            missing_artifacts: missing.iter().map(|p| p.display().to_string()).collect(),
            stale: layout.is_stale(source),
            passages,
            dimension,
            error,
        }
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn origin(&self) -> CorpusOrigin {
        self.origin
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }
}
