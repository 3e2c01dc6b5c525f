//! # indexer
//!
//! Walks a photo directory, asks a vision model for keywords and a caption
//! per image, cleans both up and writes them into the file's own metadata
//! together with a pixel identifier and a processing status. Runs are
//! resumable: a file whose status says it is done is not sent to the model
//! again.
//!
//! ## Layout
//!
//! - [`discovery`] finds candidate images
//! - [`resolver`] decides what to do with each one from its current tags
//! - [`imaging`] decodes, fingerprints and downsizes
//! - [`inference`] runs the captioning protocol under an admission bound
//! - [`repair`] recovers structured fields from malformed model output
//! - [`keywords`] normalizes and filters keywords
//! - [`pipeline`] drives every file through those stages on a worker pool

pub mod cli;
pub mod core;
pub mod discovery;
pub mod imaging;
pub mod inference;
pub mod keywords;
pub mod pipeline;
pub mod repair;
pub mod resolver;
pub mod utils;

// Re-exports
pub use crate::core::{IndexError, IndexResult, IndexerConfig, RunContext};
pub use inference::{Captioner, Sleeper, TokioSleeper};
pub use keywords::KeywordRules;
pub use pipeline::{Pipeline, StatusReport, survey};
