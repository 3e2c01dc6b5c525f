//! Client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Endpoint configuration for a chat-completions vision model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Server base URL (e.g., "http://localhost:5001")
    pub api_url: String,

    /// Bearer token, if the server is password protected
    pub api_key: Option<String>,

    /// Model name; local single-model servers ignore it
    pub model: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum tokens to generate per call
    pub max_tokens: u32,

    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub min_p: f32,
}

impl VisionConfig {
    /// Create a new configuration for the given base URL
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Self::default()
        }
    }

    /// Set the bearer token
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_secs = seconds;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Full chat-completions URL
    ///
    /// Accepts base URLs with or without a trailing `/v1`.
    pub fn completions_url(&self) -> String {
        let base = self.api_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }

    /// Model listing URL, used as a liveness probe
    pub fn models_url(&self) -> String {
        let base = self.api_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{}/models", base)
        } else {
            format!("{}/v1/models", base)
        }
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5001".to_string(),
            api_key: None,
            model: None,
            timeout_secs: 120,
            max_tokens: 250,
            temperature: 0.1,
            top_p: 1.0,
            top_k: 0,
            min_p: 0.05,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completions_url_variants() {
        assert_eq!(
            VisionConfig::new("http://localhost:5001").completions_url(),
            "http://localhost:5001/v1/chat/completions"
        );
        assert_eq!(
            VisionConfig::new("http://localhost:5001/").completions_url(),
            "http://localhost:5001/v1/chat/completions"
        );
        assert_eq!(
            VisionConfig::new("http://127.0.0.1:8080/v1/").completions_url(),
            "http://127.0.0.1:8080/v1/chat/completions"
        );
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: VisionConfig =
            serde_json::from_str(r#"{"api_url": "http://gpu-box:5001", "max_tokens": 400}"#)
                .unwrap();
        assert_eq!(config.api_url, "http://gpu-box:5001");
        assert_eq!(config.max_tokens, 400);
        assert_eq!(config.timeout_secs, 120);
        assert!(config.api_key.is_none());
    }
}
