use anyhow::Context;
use clap::Parser;
use indexer::cli::{Cli, Commands, ConfigArgs, EventFormat, IndexArgs, StatusArgs};
use indexer::discovery::discover;
use indexer::utils::init_logger_with_file;
use indexer::{IndexerConfig, Pipeline, RunContext, survey};
use meta_gateway::{ExifTool, ExifToolOptions, MetadataStore};
use shared::{FileOutcome, ProgressEvent, RunSummary};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use vision_client::VisionClient;

const EXIT_PROBLEMS: u8 = 1;
const EXIT_ERROR: u8 = 2;
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Err(e) = init_logger_with_file(&cli.log_level, cli.log_json, cli.log_dir.as_deref()) {
        eprintln!("Failed to initialize logging: {:#}", e);
        return ExitCode::from(EXIT_ERROR);
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config_path = cli.config.clone().unwrap_or_else(IndexerConfig::default_path);
    let mut config = IndexerConfig::load(&config_path)?;
    config.apply_env();

    match cli.command {
        Commands::Index(args) => index(config, args).await,
        Commands::Status(args) => status(config, args).await,
        Commands::Config(args) => show_config(config, config_path, args),
    }
}

async fn index(mut config: IndexerConfig, args: IndexArgs) -> anyhow::Result<ExitCode> {
    args.apply_to(&mut config);
    config.validate()?;

    let exiftool = exiftool(&config).await?;
    let client = VisionClient::new(config.endpoint.clone())?;
    if !client.is_online().await {
        anyhow::bail!("Vision endpoint {} is not reachable", config.endpoint.api_url);
    }

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let (tx, rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(print_events(rx, args.events));

    let ctx = Arc::new(RunContext::new(cancel).with_events(tx));
    let pipeline = Pipeline::new(config, Arc::new(exiftool), Arc::new(client))?;
    let result = pipeline.run(&args.directory, ctx.clone()).await;

    // closes the event channel
    drop(ctx);
    let _ = printer.await;

    let summary = result?;
    if args.events != EventFormat::Json {
        print_summary(&summary);
    }

    Ok(if summary.cancelled > 0 {
        ExitCode::from(EXIT_CANCELLED)
    } else if summary.has_problems() {
        ExitCode::from(EXIT_PROBLEMS)
    } else {
        ExitCode::SUCCESS
    })
}

async fn status(mut config: IndexerConfig, args: StatusArgs) -> anyhow::Result<ExitCode> {
    if args.no_crawl {
        config.discovery.recursive = false;
    }
    config.validate()?;

    let exiftool: Arc<dyn MetadataStore> = Arc::new(exiftool(&config).await?);
    let files = {
        let root = args.directory.clone();
        let discovery = config.discovery.clone();
        tokio::task::spawn_blocking(move || discover(&root, &discovery)).await??
    };
    let report = survey(files, exiftool, config.concurrency.workers).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for file in &report.files {
            match &file.detail {
                Some(detail) => println!("{:<12} {}  ({})", file.state, file.path.display(), detail),
                None => println!("{:<12} {}", file.state, file.path.display()),
            }
        }
        println!();
        println!("{} files", report.total);
        for (state, count) in &report.counts {
            println!("  {:<12} {}", state, count);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn show_config(config: IndexerConfig, path: PathBuf, args: ConfigArgs) -> anyhow::Result<ExitCode> {
    if args.show || !args.save {
        println!("# {}", path.display());
        println!("{}", serde_json::to_string_pretty(&config)?);
    }
    if args.save {
        config.validate()?;
        config.save(&path)?;
        println!("Saved {}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}

async fn exiftool(config: &IndexerConfig) -> anyhow::Result<ExifTool> {
    let exiftool = ExifTool::new(config.gateway.exiftool.clone()).with_options(ExifToolOptions {
        keep_backup: config.gateway.keep_backup,
        validate: config.gateway.validate,
        timeout: config.metadata_timeout(),
    });
    let version = exiftool
        .version()
        .await
        .with_context(|| format!("ExifTool ({}) is not usable", config.gateway.exiftool))?;
    tracing::info!(%version, "ExifTool found");
    Ok(exiftool)
}

/// Ctrl+C or SIGTERM stops new work; started commits finish
async fn cancel_on_signal(cancel: CancellationToken) {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, finishing files in progress..."),
        _ = terminate => tracing::info!("Received SIGTERM, finishing files in progress..."),
        _ = cancel.cancelled() => return,
    }
    cancel.cancel();
}

async fn print_events(mut rx: mpsc::UnboundedReceiver<ProgressEvent>, format: EventFormat) {
    while let Some(event) = rx.recv().await {
        match format {
            EventFormat::Quiet => {}
            EventFormat::Json => match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::warn!(error = %e, "Could not serialize progress event"),
            },
            EventFormat::Text => print_text_event(&event),
        }
    }
}

fn print_text_event(event: &ProgressEvent) {
    match event {
        ProgressEvent::RunStarted { root } => println!("Indexing {}", root.display()),
        ProgressEvent::Discovered { total } => println!("Found {} images", total),
        ProgressEvent::FileFinished { report, totals } => {
            let label = match report.outcome {
                FileOutcome::Committed => "done",
                FileOutcome::Previewed => "preview",
                FileOutcome::Skipped { .. } => "skipped",
                FileOutcome::Corrupted => "CORRUPT",
                FileOutcome::Failed { .. } => "FAILED",
                FileOutcome::Cancelled => "cancelled",
            };
            println!(
                "[{}/{}] {:<9} {}",
                totals.finished(),
                totals.discovered,
                label,
                report.path.display()
            );
            if let Some(generated) = &report.generated
                && report.outcome == FileOutcome::Previewed
            {
                println!("          keywords: {}", generated.keywords.join(", "));
                if let Some(description) = &generated.description {
                    println!("          description: {}", description);
                }
            }
        }
        ProgressEvent::RunFinished { .. } => {}
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!(
        "{} discovered: {} committed, {} previewed, {} skipped, {} corrupted, {} failed, {} cancelled",
        summary.discovered,
        summary.committed,
        summary.previewed,
        summary.skipped,
        summary.corrupted,
        summary.failed,
        summary.cancelled
    );
    for problem in &summary.problems {
        println!("  {} [{}] {}", problem.path.display(), problem.kind, problem.message);
    }
}
