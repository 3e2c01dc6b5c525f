//! Indexer configuration
//!
//! Precedence, lowest first: built-in defaults, the JSON config file,
//! environment (`INDEXER_*`, `.env` included), command-line flags.
//!
//! | Variable | Field |
//! |----------|-------|
//! | INDEXER_API_URL | endpoint.api_url |
//! | INDEXER_API_KEY | endpoint.api_key |
//! | INDEXER_MODEL | endpoint.model |
//! | INDEXER_TIMEOUT_SECS | endpoint.timeout_secs |
//! | INDEXER_WORKERS | concurrency.workers |
//! | INDEXER_INFERENCE_CONCURRENCY | concurrency.inference |
//! | INDEXER_EXIFTOOL | gateway.exiftool |
//! | INDEXER_DRY_RUN | dry_run |

use super::{IndexError, IndexResult};
use crate::keywords::KeywordRules;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use vision_client::VisionConfig;

pub const CONFIG_ENV: &str = "INDEXER_CONFIG";
const APP_DIR: &str = "image-indexer";
const CONFIG_FILE: &str = "config.json";

/// Default extension set (matched case-insensitively)
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    // JPEG family
    "jpg", "jpeg", "jpe", "jif", "jfif", "jfi", "jp2", "j2k", "jpf", "jpx", "jpm", "mj2",
    // other raster formats
    "png", "gif", "tiff", "tif", "webp", "heif", "heic",
    // RAW family
    "raw", "arw", "cr2", "cr3", "dng", "nef", "nrw", "orf", "pef", "raf", "rw2", "srw", "x3f",
    "erf", "kdc", "rwl",
];

/// Prompt texts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Instructions {
    pub system: String,
    /// Single call returning keywords and a description
    pub one_step: String,
    /// First call of the two-step protocol
    pub keyword_stage: String,
    /// Second call of the two-step protocol
    pub caption_stage: String,
    /// Append the first call's keywords to the caption-stage instruction
    pub keywords_in_caption_stage: bool,
}

impl Default for Instructions {
    fn default() -> Self {
        Self {
            system: "You describe images and generate keywords for a photo library.".into(),
            one_step: "Return a JSON object with two keys. \"Description\": two sentences \
                describing the image, naming the subject, setting and any visible text. \
                \"Keywords\": a list of up to 20 short keywords (one or two words each) \
                covering objects, people, place, colours, mood and style. \
                Return only the JSON object."
                .into(),
            keyword_stage: "Return a JSON object with one key, \"Keywords\": a list of up \
                to 20 short keywords (one or two words each) covering objects, people, \
                place, colours, mood and style. Return only the JSON object."
                .into(),
            caption_stage: "Describe the image in two sentences. Name the subject, the \
                setting and any visible text. Answer with the description only."
                .into(),
            keywords_in_caption_stage: false,
        }
    }
}

/// One combined call or keyword call followed by caption call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptionProtocol {
    #[default]
    OneStep,
    TwoStep,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Files processed at once
    pub workers: usize,
    /// Inference calls in flight at once
    pub inference: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            inference: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    Fixed,
    #[default]
    Exponential,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Extra tries of a single inference call on transport errors
    pub call_retries: u32,
    /// Attempts per file for inference, parse and write failures
    pub max_attempts: u32,
    pub backoff: BackoffKind,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    /// Per-invocation limit for the metadata tool
    pub metadata_timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            call_retries: 2,
            max_attempts: 3,
            backoff: BackoffKind::Exponential,
            backoff_base_ms: 1_000,
            backoff_max_ms: 30_000,
            metadata_timeout_secs: 30,
        }
    }
}

impl RetryConfig {
    pub fn backoff(&self) -> Backoff {
        Backoff {
            kind: self.backoff,
            base: Duration::from_millis(self.backoff_base_ms),
            max: Duration::from_millis(self.backoff_max_ms.max(self.backoff_base_ms)),
        }
    }
}

/// Deterministic delay schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub kind: BackoffKind,
    pub base: Duration,
    pub max: Duration,
}

impl Backoff {
    /// Delay after failed attempt number `attempt` (1-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        match self.kind {
            BackoffKind::Fixed => self.base,
            BackoffKind::Exponential => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                self.base.saturating_mul(factor).min(self.max)
            }
        }
    }
}

/// How generated keywords combine with keywords already on the file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordPolicy {
    #[default]
    Append,
    Prepend,
    Replace,
}

/// How a generated caption combines with the file's description
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptionPolicy {
    #[default]
    Replace,
    /// Keep the existing text and add the caption in a `<generated>` block
    Append,
    /// Only fill empty descriptions
    KeepExisting,
    /// Never touch the description
    Disabled,
}

/// Which settled files get processed again
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ReprocessMode {
    /// Only unprocessed and interrupted files
    #[default]
    Skip,
    /// Also files marked failed
    Failed,
    /// Everything that is readable
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub recursive: bool,
    pub extensions: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Longest side sent to the model, in pixels
    pub max_dimension: u32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self { max_dimension: 448 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub exiftool: String,
    /// Leave ExifTool's `*_original` copies behind
    pub keep_backup: bool,
    /// Treat files failing ExifTool validation as corrupted
    pub validate: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            exiftool: "exiftool".into(),
            keep_backup: false,
            validate: true,
        }
    }
}

/// Full indexer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    pub endpoint: VisionConfig,
    pub instructions: Instructions,
    pub protocol: CaptionProtocol,
    pub concurrency: ConcurrencyConfig,
    pub retry: RetryConfig,
    pub keywords: KeywordRules,
    pub keyword_policy: KeywordPolicy,
    pub caption_policy: CaptionPolicy,
    pub reprocess: ReprocessMode,
    pub discovery: DiscoveryConfig,
    pub image: ImageConfig,
    pub gateway: GatewayConfig,
    /// Generate and report but never write
    pub dry_run: bool,
    /// Give files with keywords but no status a `Done` status instead of
    /// reprocessing them
    pub mark_orphans: bool,
    /// Recompute the pixel identifier of `Done` files and reprocess on change
    pub verify_fingerprint: bool,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            endpoint: VisionConfig::default(),
            instructions: Instructions::default(),
            protocol: CaptionProtocol::default(),
            concurrency: ConcurrencyConfig::default(),
            retry: RetryConfig::default(),
            keywords: KeywordRules::default(),
            keyword_policy: KeywordPolicy::default(),
            caption_policy: CaptionPolicy::default(),
            reprocess: ReprocessMode::default(),
            discovery: DiscoveryConfig::default(),
            image: ImageConfig::default(),
            gateway: GatewayConfig::default(),
            dry_run: false,
            mark_orphans: true,
            verify_fingerprint: false,
        }
    }
}

impl IndexerConfig {
    /// `$INDEXER_CONFIG`, else `<config dir>/image-indexer/config.json`
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_ENV)
            && !path.is_empty()
        {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join(CONFIG_FILE)
    }

    /// Load from a JSON file; a missing file gives the defaults
    pub fn load(path: &Path) -> IndexResult<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(IndexError::io(path, e)),
        };
        serde_json::from_str(&text)
            .map_err(|e| IndexError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Write as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> IndexResult<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| IndexError::io(parent, e))?;
        }
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| IndexError::Config(e.to_string()))?;
        std::fs::write(path, text).map_err(|e| IndexError::io(path, e))
    }

    /// Apply `INDEXER_*` variables from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply `INDEXER_*` variables from any lookup
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("INDEXER_API_URL").filter(|v| !v.is_empty()) {
            self.endpoint.api_url = url;
        }
        if let Some(key) = lookup("INDEXER_API_KEY") {
            self.endpoint.api_key = Some(key).filter(|k| !k.is_empty());
        }
        if let Some(model) = lookup("INDEXER_MODEL") {
            self.endpoint.model = Some(model).filter(|m| !m.is_empty());
        }
        if let Some(timeout) = lookup("INDEXER_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.endpoint.timeout_secs = timeout;
        }
        if let Some(workers) = lookup("INDEXER_WORKERS").and_then(|v| v.parse().ok()) {
            self.concurrency.workers = workers;
        }
        if let Some(inference) =
            lookup("INDEXER_INFERENCE_CONCURRENCY").and_then(|v| v.parse().ok())
        {
            self.concurrency.inference = inference;
        }
        if let Some(exiftool) = lookup("INDEXER_EXIFTOOL").filter(|v| !v.is_empty()) {
            self.gateway.exiftool = exiftool;
        }
        if let Some(dry_run) = lookup("INDEXER_DRY_RUN").and_then(|v| v.parse().ok()) {
            self.dry_run = dry_run;
        }
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> IndexResult<()> {
        if self.endpoint.api_url.trim().is_empty() {
            return Err(IndexError::Config("endpoint.api_url is empty".into()));
        }
        if self.endpoint.timeout_secs == 0 {
            return Err(IndexError::Config("endpoint.timeout_secs must be positive".into()));
        }
        if self.concurrency.workers == 0 || self.concurrency.inference == 0 {
            return Err(IndexError::Config("concurrency bounds must be at least 1".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(IndexError::Config("retry.max_attempts must be at least 1".into()));
        }
        if self.keywords.min_length > self.keywords.max_length {
            return Err(IndexError::Config(format!(
                "keywords.min_length ({}) exceeds keywords.max_length ({})",
                self.keywords.min_length, self.keywords.max_length
            )));
        }
        if self.image.max_dimension == 0 {
            return Err(IndexError::Config("image.max_dimension must be positive".into()));
        }
        if self.discovery.extensions.is_empty() {
            return Err(IndexError::Config("discovery.extensions is empty".into()));
        }
        Ok(())
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.retry.metadata_timeout_secs.max(1))
    }
}
