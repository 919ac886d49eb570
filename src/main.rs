//! kbrag CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use kbrag::{
    commands::{
        cmd_ask, cmd_init, cmd_reindex, cmd_search, cmd_status, print_answer, print_init_report,
        print_reindex_stats, print_search_results, print_status, resolve_corpus, InitOptions,
    },
    complete::create_completer,
    config::Config,
    embed::create_embedder,
    error::Result,
    progress::LogWriterFactory,
};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "kbrag")]
#[command(version, about = "Ask questions about a local knowledge file", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "KBRAG_CONFIG")]
    config: Option<PathBuf>,

    /// Knowledge file (overrides corpus.path)
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a config file and a starter knowledge file
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Answer a question from the knowledge file
    Ask {
        /// The question
        #[arg(required = true)]
        question: Vec<String>,

        /// Also print the passages used as context
        #[arg(long)]
        sources: bool,
    },

    /// Show the passages closest to a query
    Search {
        /// The search query
        query: String,

        /// Number of passages (defaults to retrieval.top_k)
        #[arg(short)]
        k: Option<usize>,
    },

    /// Show configuration and cache status
    Status,

    /// Re-embed the knowledge file regardless of cache freshness
    Reindex,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Handle completions command (doesn't need config)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "kbrag", &mut std::io::stdout());
        return Ok(());
    }

    // Handle init command specially (doesn't need existing config)
    if let Commands::Init { force } = cli.command {
        init_logging(cli.verbose, None);
        return handle_init(cli.config, force, cli.json);
    }

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_logging(cli.verbose, None);
            return Err(e);
        }
    };
    init_logging(cli.verbose, config.log_dir().as_deref());

    match cli.command {
        Commands::Ask { question, sources } => {
            let corpus = resolve_corpus(&config, cli.corpus.as_deref())?;
            let embedder = create_embedder(&config)?;
            let completer = create_completer(&config)?;
            let question = question.join(" ");

            let answer = cmd_ask(&config, &corpus, &question, embedder, completer).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&answer)?);
            } else {
                print_answer(&answer, sources);
            }
        }

        Commands::Search { query, k } => {
            let corpus = resolve_corpus(&config, cli.corpus.as_deref())?;
            let embedder = create_embedder(&config)?;

            let result = cmd_search(&config, &corpus, &query, k, embedder.as_ref()).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_search_results(&result);
            }
        }

        Commands::Status => {
            let corpus = resolve_corpus(&config, cli.corpus.as_deref()).ok();
            let status = cmd_status(&config, corpus.as_deref())?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }

        Commands::Reindex => {
            let corpus = resolve_corpus(&config, cli.corpus.as_deref())?;
            let embedder = create_embedder(&config)?;

            let stats = cmd_reindex(&config, &corpus, embedder.as_ref()).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_reindex_stats(&stats);
            }
        }

        Commands::Init { .. } | Commands::Completions { .. } => unreachable!(),
    }

    Ok(())
}

/// Console logging through the progress-aware writer, plus a per-run log file
/// when `log_dir` is set
fn init_logging(verbose: bool, log_dir: Option<&Path>) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let mut file_error = None;
    let file_layer = log_dir.and_then(|dir| match open_log_file(dir) {
        Ok(file) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        ),
        Err(e) => {
            file_error = Some(format!("Cannot open log file in {}: {}", dir.display(), e));
            None
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(LogWriterFactory))
        .with(file_layer)
        .with(filter)
        .init();

    if let Some(message) = file_error {
        tracing::warn!("{}", message);
    }
}

fn open_log_file(dir: &Path) -> std::io::Result<File> {
    std::fs::create_dir_all(dir)?;
    let name = format!("kbrag_{}.log", chrono::Local::now().format("%Y%m%d_%H%M%S"));
    File::create(dir.join(name))
}

fn handle_init(config_arg: Option<PathBuf>, force: bool, json: bool) -> Result<()> {
    // A .toml argument names the file; anything else names the directory
    let (base_dir, config_path) = match config_arg {
        Some(path) if path.extension().is_some_and(|e| e == "toml") => {
            let base = path
                .parent()
                .map(PathBuf::from)
                .unwrap_or_else(Config::default_base_dir);
            (base, path)
        }
        Some(dir) => (dir.clone(), dir.join("config.toml")),
        None => {
            let base = Config::default_base_dir();
            (base.clone(), base.join("config.toml"))
        }
    };

    let report = cmd_init(InitOptions {
        base_dir,
        config_path,
        force,
    })?;
    info!("Initialized {}", report.config_path.display());

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_init_report(&report);
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::load_from(None),
    }
}
