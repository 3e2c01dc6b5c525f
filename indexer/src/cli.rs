//! Command line interface

use crate::core::{CaptionProtocol, IndexerConfig, ReprocessMode, config::CONFIG_ENV};
use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

/// Top-level CLI entry point.
#[derive(Debug, Parser)]
#[command(
    name = "indexer",
    version,
    about = "Tag images with model-generated keywords and captions"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (JSON). Defaults to the per-user config directory.
    #[arg(long, global = true, env = CONFIG_ENV, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Log level or filter directive, overridden by RUST_LOG.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Log as JSON lines on stderr.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Also write daily rotating log files into this directory.
    #[arg(long, global = true, value_hint = ValueHint::DirPath)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate and write metadata for every image under a directory.
    Index(IndexArgs),
    /// Report each image's processing state without changing anything.
    Status(StatusArgs),
    /// Show or save the effective configuration.
    Config(ConfigArgs),
}

/// How progress is reported on stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum EventFormat {
    /// Human-readable progress lines.
    #[default]
    Text,
    /// One JSON progress event per line.
    Json,
    /// Nothing but the final summary.
    Quiet,
}

#[derive(Debug, Args)]
pub struct IndexArgs {
    /// Directory to index.
    #[arg(value_hint = ValueHint::DirPath)]
    pub directory: PathBuf,

    /// Which previously tagged files to process again.
    #[arg(long, value_enum)]
    pub reprocess: Option<ReprocessMode>,

    /// Ask for keywords and the caption in separate requests.
    #[arg(long, conflicts_with = "one_step")]
    pub two_step: bool,

    /// Ask for keywords and the caption in one request.
    #[arg(long)]
    pub one_step: bool,

    /// Generate and report, but write nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Only index the top-level directory.
    #[arg(long)]
    pub no_crawl: bool,

    /// Recompute identifiers of finished files and redo changed images.
    #[arg(long)]
    pub verify: bool,

    /// Files processed concurrently.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Model requests in flight at once.
    #[arg(long)]
    pub inference_concurrency: Option<usize>,

    /// OpenAI-compatible endpoint base URL.
    #[arg(long, value_hint = ValueHint::Url)]
    pub api_url: Option<String>,

    /// Model name sent with each request.
    #[arg(long)]
    pub model: Option<String>,

    /// Progress output on stdout.
    #[arg(long, value_enum, default_value_t = EventFormat::Text)]
    pub events: EventFormat,
}

impl IndexArgs {
    /// Apply flags on top of file and environment configuration
    pub fn apply_to(&self, config: &mut IndexerConfig) {
        if let Some(reprocess) = self.reprocess {
            config.reprocess = reprocess;
        }
        if self.two_step {
            config.protocol = CaptionProtocol::TwoStep;
        } else if self.one_step {
            config.protocol = CaptionProtocol::OneStep;
        }
        if self.dry_run {
            config.dry_run = true;
        }
        if self.no_crawl {
            config.discovery.recursive = false;
        }
        if self.verify {
            config.verify_fingerprint = true;
        }
        if let Some(workers) = self.workers {
            config.concurrency.workers = workers;
        }
        if let Some(inference) = self.inference_concurrency {
            config.concurrency.inference = inference;
        }
        if let Some(url) = &self.api_url {
            config.endpoint.api_url = url.clone();
        }
        if let Some(model) = &self.model {
            config.endpoint.model = Some(model.clone());
        }
    }
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Directory to survey.
    #[arg(value_hint = ValueHint::DirPath)]
    pub directory: PathBuf,

    /// Only the top-level directory.
    #[arg(long)]
    pub no_crawl: bool,

    /// Print the per-file report as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Print the effective configuration (the default action).
    #[arg(long)]
    pub show: bool,

    /// Write the effective configuration to the config file.
    #[arg(long)]
    pub save: bool,
}
