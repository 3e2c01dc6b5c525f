//! Inference backend abstraction

use crate::InferenceResult;
use async_trait::async_trait;

/// Image embedded in a request
#[derive(Debug, Clone)]
pub struct ImagePayload {
    /// Base64 of the encoded image bytes
    pub base64: String,
    /// MIME type of the encoded bytes
    pub mime: &'static str,
}

impl ImagePayload {
    pub fn jpeg(base64: impl Into<String>) -> Self {
        Self {
            base64: base64.into(),
            mime: "image/jpeg",
        }
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.base64)
    }
}

/// One captioning call: an instruction about one image
#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub system: Option<String>,
    pub instruction: String,
    pub image: ImagePayload,
}

/// Something that turns an image plus instruction into raw model text
///
/// Implementations must not impose their own concurrency limits; callers
/// decide how many requests are in flight.
#[async_trait]
pub trait VisionBackend: Send + Sync {
    async fn complete(&self, request: &VisionRequest) -> InferenceResult<String>;
}
