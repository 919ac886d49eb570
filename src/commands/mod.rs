//! CLI commands implementation

pub mod ask;
pub mod init;
pub mod reindex;
pub mod search;
pub mod status;

pub use ask::*;
pub use init::*;
pub use reindex::*;
pub use search::*;
pub use status::*;

use crate::config::Config;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Knowledge file from the command line, else from `corpus.path`
pub fn resolve_corpus(config: &Config, cli_override: Option<&Path>) -> Result<PathBuf> {
    cli_override
        .map(Path::to_path_buf)
        .or_else(|| config.corpus_path())
        .ok_or_else(|| {
            Error::Config(
                "No knowledge file configured. Set corpus.path or pass --corpus.".to_string(),
            )
        })
}
