//! HTTP client for chat-completions calls

use crate::types::{ChatMessage, ChatRequest, ChatResponse, ContentPart, ImageUrl, MessageContent};
use crate::{InferenceError, InferenceResult, VisionBackend, VisionConfig, VisionRequest};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// HTTP client for a local OpenAI-compatible vision endpoint
#[derive(Debug, Clone)]
pub struct VisionClient {
    client: Client,
    config: VisionConfig,
}

impl VisionClient {
    /// Create a new client from configuration
    pub fn new(config: VisionConfig) -> InferenceResult<Self> {
        if config.api_url.trim().is_empty() {
            return Err(InferenceError::InvalidConfig("api_url is empty".into()));
        }
        if config.timeout_secs == 0 {
            return Err(InferenceError::InvalidConfig(
                "timeout_secs must be positive".into(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| InferenceError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Build authorization header value
    fn auth_header(&self) -> Option<String> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .map(|k| format!("Bearer {}", k))
    }

    fn build_request(&self, request: &VisionRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref().filter(|s| !s.is_empty()) {
            messages.push(ChatMessage {
                role: "system",
                content: MessageContent::Text(system.to_string()),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: MessageContent::Parts(vec![
                ContentPart::Text {
                    text: request.instruction.clone(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: request.image.data_url(),
                    },
                },
            ]),
        });

        ChatRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            top_k: self.config.top_k,
            min_p: self.config.min_p,
            stream: false,
        }
    }

    /// Handle the HTTP response
    async fn handle_response(response: reqwest::Response) -> InferenceResult<String> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| InferenceError::InvalidResponse(format!("{}: {}", e, truncate(&body))))?;

        parsed.into_text().ok_or(InferenceError::EmptyResponse)
    }

    /// Check whether the endpoint answers at all
    #[instrument(skip(self), fields(url = %self.config.api_url))]
    pub async fn is_online(&self) -> bool {
        let probe = self
            .client
            .get(self.config.models_url())
            .timeout(Duration::from_secs(3));
        match probe.send().await {
            Ok(response) => {
                debug!(status = %response.status(), "Endpoint answered");
                true
            }
            Err(e) => {
                warn!(error = %e, "Endpoint offline");
                false
            }
        }
    }
}

#[async_trait]
impl VisionBackend for VisionClient {
    #[instrument(skip(self, request), fields(image_len = request.image.base64.len()))]
    async fn complete(&self, request: &VisionRequest) -> InferenceResult<String> {
        let body = self.build_request(request);
        let mut http = self.client.post(self.config.completions_url()).json(&body);

        if let Some(auth) = self.auth_header() {
            http = http.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = http.send().await?;
        let text = Self::handle_response(response).await?;
        debug!(chars = text.len(), "Received completion");
        Ok(text)
    }
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
