use serde::{Deserialize, Serialize};
use std::env;

/// Configuration for the hosted language-model extractor.
///
/// Built once at startup from the environment; an absent credential yields
/// `None` from [`AiConfig::from_env`] and the AI pass is simply skipped.
/// Nothing downstream probes the environment again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

impl AiConfig {
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("OPENAI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        Some(Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key,
            model: env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            temperature: 0.1,
            timeout_seconds: 120,
        })
    }
}
