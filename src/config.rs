//! Copilot configuration parsed from environment variables.

use crate::llm::types::LlmError;

pub const SERVICE_NAME: &str = "ReformDental Copilot";
pub const PLACEHOLDER_API_KEY: &str = "sk-your-key-here";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_PORT: u16 = 8100;
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopilotConfig {
    /// Raw `OPENAI_API_KEY`; may be the placeholder. Use [`Self::usable_api_key`].
    pub api_key: Option<String>,
    pub model: String,
    pub port: u16,
    pub openai_base_url: String,
    pub connect_timeout_secs: u64,
}

impl CopilotConfig {
    /// Build typed config from the process environment.
    ///
    /// - `OPENAI_API_KEY`: credential; unset or placeholder disables chat
    /// - `OPENAI_MODEL`: default `gpt-4o-mini`
    /// - `PORT`: default 8100
    /// - `OPENAI_BASE_URL`: default `OpenAI` API base URL
    /// - `OPENAI_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if `PORT` is not a valid port number.
    pub fn from_env() -> Result<Self, LlmError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if `PORT` is not a valid port number.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LlmError> {
        let api_key = lookup("OPENAI_API_KEY");
        let model = lookup("OPENAI_MODEL")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| LlmError::ConfigParse(format!("invalid PORT '{raw}': {e}")))?,
            None => DEFAULT_PORT,
        };
        let openai_base_url = lookup("OPENAI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let connect_timeout_secs = lookup("OPENAI_CONNECT_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS);

        Ok(Self { api_key, model, port, openai_base_url, connect_timeout_secs })
    }

    /// The credential, unless it is absent, empty, or the placeholder value.
    #[must_use]
    pub fn usable_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.is_empty() && *key != PLACEHOLDER_API_KEY)
    }

    #[must_use]
    pub fn api_key_configured(&self) -> bool {
        self.usable_api_key().is_some()
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
