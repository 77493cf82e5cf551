use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::provider::Provider;

/// Top-level configuration, loaded from `config/config.json` under the
/// project root. Every field defaults individually, so a sparse or missing
/// file still yields a working configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub system: SystemConfig,
    pub api: ApiConfig,
    pub error_handling: ErrorHandlingConfig,
    pub paths: PathsConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub log_level: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub provider: Provider,
    /// Model override; each provider has its own default.
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub rate_limit_requests_per_minute: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Gemini,
            model: None,
            max_tokens: 4096,
            temperature: 0.3,
            timeout_secs: 30,
            max_retries: 3,
            rate_limit_requests_per_minute: 60,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorHandlingConfig {
    pub exponential_backoff_base: u32,
    pub max_backoff_seconds: u64,
    pub circuit_breaker_threshold: u32,
    pub circuit_breaker_timeout_secs: u64,
}

impl Default for ErrorHandlingConfig {
    fn default() -> Self {
        Self {
            exponential_backoff_base: 2,
            max_backoff_seconds: 60,
            circuit_breaker_threshold: 5,
            circuit_breaker_timeout_secs: 300,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub chats_dir: String,
    pub logs_dir: String,
    pub chat_index: String,
    pub context_summary: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            chats_dir: "chats".into(),
            logs_dir: "logs".into(),
            chat_index: "chats/chat_index.json".into(),
            context_summary: "chats/context_summary.json".into(),
        }
    }
}

impl Config {
    /// Load from a JSON file. Missing or malformed files fall back to
    /// defaults with a warning rather than failing startup.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "malformed config, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}
