pub mod config;
pub mod context;
pub mod error;

pub use config::{
    Backoff, BackoffKind, CaptionPolicy, CaptionProtocol, IndexerConfig, Instructions,
    KeywordPolicy, ReprocessMode,
};
pub use context::RunContext;
pub use error::{IndexError, IndexResult};
