//! Init command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

const STARTER_CORPUS: &str = "knowledge.txt";
const STARTER_LOG_DIR: &str = "logs";

const STARTER_CONTENT: &str = "\
# About this file
Each passage starts with a line beginning with \"# \".
Replace these passages with your own notes.

# Example
Liu Fang likes singing.
";

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub base_dir: PathBuf,
    pub config_path: PathBuf,
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitReport {
    pub config_path: PathBuf,
    pub corpus_path: PathBuf,
    /// False when an existing knowledge file was left untouched
    pub corpus_created: bool,
}

/// Write a default config and a starter knowledge file
pub fn cmd_init(options: InitOptions) -> Result<InitReport> {
    let InitOptions {
        base_dir,
        config_path,
        force,
    } = options;

    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Config already exists at {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    let mut config = Config::default();
    config.paths.base_dir = base_dir;
    config.paths.config_file = config_path.clone();
    config.corpus.path = Some(STARTER_CORPUS.to_string());
    config.logging.dir = Some(STARTER_LOG_DIR.to_string());
    config.validate()?;
    config.save()?;

    let corpus_path = config.resolve_path(STARTER_CORPUS);
    let corpus_created = !corpus_path.exists();
    if corpus_created {
        std::fs::write(&corpus_path, STARTER_CONTENT)?;
        info!("Created starter knowledge file {}", corpus_path.display());
    }

    Ok(InitReport {
        config_path,
        corpus_path,
        corpus_created,
    })
}

pub fn print_init_report(report: &InitReport) {
    println!("✓ kbrag initialized successfully");
    println!("  Config: {}", report.config_path.display());
    if report.corpus_created {
        println!("  Knowledge file: {} (new)", report.corpus_path.display());
    } else {
        println!("  Knowledge file: {} (kept)", report.corpus_path.display());
    }
    println!("\nNext steps:");
    println!("  1. Put your passages in the knowledge file");
    println!("  2. Export OPENAI_API_KEY or set api.key in the config");
    println!("  3. Ask: kbrag ask \"who likes singing?\"");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn options(tmp: &TempDir, force: bool) -> InitOptions {
        InitOptions {
            base_dir: tmp.path().to_path_buf(),
            config_path: tmp.path().join("config.toml"),
            force,
        }
    }

    #[test]
    fn test_init_writes_loadable_config() {
        let tmp = TempDir::new().unwrap();
        let report = cmd_init(options(&tmp, false)).unwrap();

        assert!(report.corpus_created);
        let config = Config::load(&report.config_path).unwrap();
        assert_eq!(config.corpus_path(), Some(tmp.path().join(STARTER_CORPUS)));
        assert_eq!(config.log_dir(), Some(tmp.path().join(STARTER_LOG_DIR)));
        assert!(std::fs::read_to_string(&report.corpus_path)
            .unwrap()
            .starts_with("# "));
    }

    #[test]
    fn test_init_refuses_overwrite_without_force() {
        let tmp = TempDir::new().unwrap();
        cmd_init(options(&tmp, false)).unwrap();
        assert!(matches!(
            cmd_init(options(&tmp, false)),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_init_force_keeps_knowledge_file() {
        let tmp = TempDir::new().unwrap();
        cmd_init(options(&tmp, false)).unwrap();
        std::fs::write(tmp.path().join(STARTER_CORPUS), "# mine\n").unwrap();

        let report = cmd_init(options(&tmp, true)).unwrap();
        assert!(!report.corpus_created);
        assert_eq!(
            std::fs::read_to_string(&report.corpus_path).unwrap(),
            "# mine\n"
        );
    }
}
