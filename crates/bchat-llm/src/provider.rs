use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::instrument;

use bchat_core::errors::GatewayError;

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const GEMINI_DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Sampling parameters shared by both providers.
#[derive(Clone, Debug)]
pub struct CompletionOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.3,
        }
    }
}

/// The one outbound dependency: accepts a text prompt, returns raw text
/// expected to contain a single JSON object.
#[async_trait]
pub trait SummaryProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn complete(&self, prompt: &str) -> Result<String, GatewayError>;
}

/// Anthropic messages API, non-streaming.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    options: CompletionOptions,
}

impl AnthropicProvider {
    pub fn new(api_key: SecretString, model: Option<String>, options: CompletionOptions) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: ANTHROPIC_BASE_URL.to_string(),
            model: model.unwrap_or_else(|| ANTHROPIC_DEFAULT_MODEL.to_string()),
            options,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl SummaryProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "claude"
    }

    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn complete(&self, prompt: &str) -> Result<String, GatewayError> {
        let body = json!({
            "model": self.model,
            "max_tokens": self.options.max_tokens,
            "temperature": self.options.temperature,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::NetworkError(e.to_string()))?;

        let status = response.status().as_u16();
        let raw = response
            .text()
            .await
            .map_err(|e| GatewayError::NetworkError(e.to_string()))?;
        if !(200..300).contains(&status) {
            return Err(GatewayError::from_status(status, raw));
        }

        let parsed: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| GatewayError::InvalidRequest(format!("unparsable response body: {e}")))?;
        parsed["content"][0]["text"]
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| GatewayError::InvalidRequest("response missing content text".into()))
    }
}

/// Gemini generateContent API, requesting a JSON-typed response.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    options: CompletionOptions,
}

impl GeminiProvider {
    pub fn new(api_key: SecretString, model: Option<String>, options: CompletionOptions) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
            model: model.unwrap_or_else(|| GEMINI_DEFAULT_MODEL.to_string()),
            options,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl SummaryProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn complete(&self, prompt: &str) -> Result<String, GatewayError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "maxOutputTokens": self.options.max_tokens,
                "temperature": self.options.temperature,
                "responseMimeType": "application/json",
            },
        });

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url,
            self.model,
            self.api_key.expose_secret()
        );
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::NetworkError(e.to_string()))?;

        let status = response.status().as_u16();
        let raw = response
            .text()
            .await
            .map_err(|e| GatewayError::NetworkError(e.to_string()))?;
        if !(200..300).contains(&status) {
            return Err(GatewayError::from_status(status, raw));
        }

        let parsed: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| GatewayError::InvalidRequest(format!("unparsable response body: {e}")))?;
        parsed["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| GatewayError::InvalidRequest("response missing candidate text".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names() {
        let anthropic = AnthropicProvider::new(
            SecretString::from("test-key".to_string()),
            None,
            CompletionOptions::default(),
        );
        assert_eq!(anthropic.name(), "claude");

        let gemini = GeminiProvider::new(
            SecretString::from("test-key".to_string()),
            Some("gemini-2.0-flash".into()),
            CompletionOptions::default(),
        );
        assert_eq!(gemini.name(), "gemini");
        assert_eq!(gemini.model, "gemini-2.0-flash");
    }

    #[test]
    fn default_models_applied() {
        let anthropic = AnthropicProvider::new(
            SecretString::from("k".to_string()),
            None,
            CompletionOptions::default(),
        );
        assert_eq!(anthropic.model, ANTHROPIC_DEFAULT_MODEL);
    }
}
