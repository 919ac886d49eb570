//! Ask command implementation

use crate::chunk::preview;
use crate::complete::Completer;
use crate::config::Config;
use crate::embed::Embedder;
use crate::error::Result;
use crate::rag::{Answer, RetrievalOrchestrator};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Answer one question from the knowledge file
pub async fn cmd_ask(
    config: &Config,
    corpus_path: &Path,
    question: &str,
    embedder: Arc<dyn Embedder>,
    completer: Arc<dyn Completer>,
) -> Result<Answer> {
    info!("Question: {}", question);
    let rag = RetrievalOrchestrator::new(config, corpus_path, embedder, completer).await?;
    Ok(rag.answer_with_sources(question).await)
}

/// Print an answer to console
pub fn print_answer(answer: &Answer, show_sources: bool) {
    println!("{}", answer.answer);

    if !show_sources {
        return;
    }

    println!("\nSources:");
    if answer.sources.is_empty() {
        println!("  (none)");
    }
    for (i, source) in answer.sources.iter().enumerate() {
        println!(
            "{}. [passage {}, score: {:.3}] {}",
            i + 1,
            source.index,
            source.score,
            preview(&source.chunk, 120).replace('\n', " ")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complete::ScriptedCompleter;
    use crate::embed::KeywordEmbedder;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_ask_returns_answer_and_sources() {
        let tmp = TempDir::new().unwrap();
        let corpus = tmp.path().join("kb.txt");
        std::fs::write(&corpus, "# Liu Fang likes singing\n# Wang Hua likes painting\n").unwrap();

        let mut config = Config::default();
        config.init_paths(Some(tmp.path().to_path_buf()));
        config.retrieval.top_k = 1;

        let embedder = Arc::new(
            KeywordEmbedder::new()
                .with_rule("singing", vec![1.0, 0.0])
                .with_rule("painting", vec![0.0, 1.0]),
        );
        let answer = cmd_ask(
            &config,
            &corpus,
            "who likes painting?",
            embedder,
            Arc::new(ScriptedCompleter::replying("Wang Hua")),
        )
        .await
        .unwrap();

        assert_eq!(answer.answer, "Wang Hua");
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(answer.sources[0].chunk, "Wang Hua likes painting");
    }
}
