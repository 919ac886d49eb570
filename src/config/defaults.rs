//! Default values for configuration

/// Default environment variable holding the provider API key
pub fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// Environment variable overriding the default provider endpoint
pub const API_BASE_URL_ENV: &str = "KBRAG_API_BASE_URL";

/// Provider endpoint used when neither the config nor the environment sets one
pub const FALLBACK_API_BASE_URL: &str = "https://api.openai.com/v1";

/// Default provider endpoint (OpenAI-compatible)
pub fn default_api_base_url() -> String {
    std::env::var(API_BASE_URL_ENV).unwrap_or_else(|_| FALLBACK_API_BASE_URL.to_string())
}

/// Embedding requests are short, so they get the tighter bound
pub fn default_embedding_timeout_secs() -> u64 {
    30
}

/// Generation takes longer than embedding
pub fn default_completion_timeout_secs() -> u64 {
    120
}

/// Default embedding model
pub fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

/// Default chat model
pub fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Default number of passages fed to the completion call
pub fn default_retrieval_top_k() -> usize {
    3
}

/// Default heading delimiter (matched at line start)
pub fn default_chunk_delimiter() -> String {
    "# ".to_string()
}

/// Default cache directory, relative to the config directory
pub fn default_cache_dir() -> String {
    "embeddings".to_string()
}

/// Keep incomplete recomputations in memory only
pub fn default_cache_persist_partial() -> bool {
    false
}

/// Default log directory, relative to the config directory
pub fn default_logging_dir() -> Option<String> {
    None
}
