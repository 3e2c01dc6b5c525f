//! Vision Client - chat-completions client for a local vision model
//!
//! Sends one instruction plus one embedded image to an
//! OpenAI-chat-completions-compatible endpoint and returns the raw text the
//! model produced. Retries, admission control and parsing belong to the
//! caller; this crate only speaks the wire protocol.

pub mod backend;
pub mod config;
pub mod error;
pub mod http;
pub mod types;

pub use backend::{ImagePayload, VisionBackend, VisionRequest};
pub use config::VisionConfig;
pub use error::{InferenceError, InferenceResult};
pub use http::VisionClient;
