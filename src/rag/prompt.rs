use crate::complete::ChatMessage;
use crate::index::SimilarityResult;

/// Prefix of the system message; the retrieved context follows it directly
pub const SYSTEM_PREFIX: &str = "Answer using only the following content:\n";

/// Reply used whenever the completion provider fails
pub const FALLBACK_ANSWER: &str = "Sorry, I cannot answer this right now.";

/// Retrieved passages joined with newlines, in ranking order
pub fn build_context(results: &[SimilarityResult]) -> String {
    results
        .iter()
        .map(|r| r.chunk.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// System message carrying the context, then the raw question
pub fn build_messages(context: &str, question: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(format!("{}{}", SYSTEM_PREFIX, context)),
        ChatMessage::user(question),
    ]
}
