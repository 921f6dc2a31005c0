use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use pipod_indexer::{
    CancelFlag, EventSender, ProcessReport, ProcessingPipeline, ReductionOutcome, ScanReport,
    Session,
};
use std::path::PathBuf;

mod progress;
mod query;
mod transfer;

use transfer::{RsyncTransfer, Transfer};

#[derive(Parser)]
#[command(name = "pipod")]
#[command(about = "Build and query a similarity-searchable music library", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Media root (defaults to current directory)
    #[arg(long, global = true, default_value = ".")]
    dir: PathBuf,

    /// Config file (defaults to <dir>/pipod.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Print results as JSON on stdout (implies --quiet)
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the raw store with the media directory and drop deleted files
    Scan,

    /// Scan, extract features for new files and rebuild the library
    Process(ProcessArgs),

    /// Nearest and furthest tracks for an anchor
    Query(QueryArgs),

    /// Process, then mirror media and library to the playback device
    Sync(SyncArgs),
}

#[derive(Args)]
struct ProcessArgs {
    /// Extraction workers (overrides config and PIPOD_WORKERS)
    #[arg(long)]
    workers: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum Space {
    /// Full-length extractor vectors
    Raw,
    /// Reduced library vectors
    Compressed,
}

#[derive(Args)]
pub(crate) struct QueryArgs {
    /// Substring of the anchor's file name (random anchor when omitted)
    #[arg(long)]
    pub anchor: Option<String>,

    /// Vector space to compare in
    #[arg(long, value_enum, default_value_t = Space::Compressed)]
    pub space: Space,

    /// Weight dimensions by their share of corpus variance
    #[arg(long)]
    pub weighted: bool,

    /// Number of nearest and furthest tracks (defaults to config `neighbors`)
    #[arg(short = 'k', long = "neighbors")]
    pub k: Option<usize>,

    /// Seed for the random anchor
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write a 2-D projection of the space as JSON for plotting
    #[arg(long)]
    pub projection_out: Option<PathBuf>,
}

#[derive(Args)]
struct SyncArgs {
    /// Destination, e.g. pi@pipod.local:/home/pi/music (overrides config)
    #[arg(long)]
    remote: Option<String>,

    /// Transfer what is on disk without running `process` first
    #[arg(long)]
    skip_process: bool,

    /// Extraction workers (overrides config and PIPOD_WORKERS)
    #[arg(long)]
    workers: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();
    if cli.json {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let session = Session::open(&cli.dir, cli.config.as_deref())
        .await
        .with_context(|| format!("Failed to open media root {}", cli.dir.display()))?;

    match cli.command {
        Commands::Scan => run_scan(session, cli.json).await?,
        Commands::Process(args) => run_process(session, args.workers, cli.json).await?,
        Commands::Query(args) => query::run_query(session, args, cli.json).await?,
        Commands::Sync(args) => run_sync(session, args, cli.json).await?,
    }

    Ok(())
}

async fn run_scan(session: Session, json: bool) -> Result<()> {
    let report = ProcessingPipeline::new(session)
        .scan()
        .await
        .context("Scan failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_scan(&report);
    }
    Ok(())
}

async fn run_process(mut session: Session, workers: Option<usize>, json: bool) -> Result<()> {
    if workers.is_some() {
        session.config_mut().workers = workers;
    }
    let report = process_with_progress(session, !json).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_process(&report);
    }
    Ok(())
}

/// Run the full pipeline with a progress bar and Ctrl-C cancellation.
async fn process_with_progress(session: Session, show_progress: bool) -> Result<ProcessReport> {
    let (events, rx) = EventSender::channel();
    let cancel = CancelFlag::new();
    let progress = progress::spawn_progress(rx, show_progress);

    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupted: finishing in-flight files, skipping the rest");
                cancel.cancel();
            }
        })
    };

    let mut pipeline = ProcessingPipeline::new(session)
        .with_events(events)
        .with_cancel_flag(cancel);
    let result = pipeline.process().await;
    drop(pipeline);
    interrupt.abort();
    let _ = progress.await;

    result.context("Processing failed")
}

async fn run_sync(mut session: Session, args: SyncArgs, json: bool) -> Result<()> {
    if args.workers.is_some() {
        session.config_mut().workers = args.workers;
    }
    let remote = args
        .remote
        .or_else(|| session.config().transfer.remote.clone())
        .context("No destination: pass --remote or set [transfer] remote in pipod.toml")?;

    let report = if args.skip_process {
        None
    } else {
        Some(process_with_progress(session.clone(), !json).await?)
    };

    let transfer = RsyncTransfer::new(&session.config().transfer.program, remote);
    transfer
        .mirror(session.root(), &session.library_path())
        .await
        .context("Transfer failed; local stores were not modified")?;

    if json {
        let summary = serde_json::json!({
            "process": report,
            "remote": transfer.remote(),
            "synced": true,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        if let Some(report) = &report {
            print_process(report);
        }
        println!("Synced to {}", transfer.remote());
    }
    Ok(())
}

fn print_scan(report: &ScanReport) {
    println!(
        "Total: {}, new: {}, deleted: {}",
        report.total,
        report.added.len(),
        report.removed.len()
    );
    for path in &report.removed {
        println!("  - {path}");
    }
}

fn print_process(report: &ProcessReport) {
    print_scan(&report.scan);
    println!(
        "Extracted {} new files in {}ms",
        report.extracted, report.time_ms
    );
    if !report.cancelled.is_empty() {
        println!("Cancelled before {} files", report.cancelled.len());
        for path in &report.cancelled {
            println!("  ~ {path}");
        }
    }
    for failure in &report.failures {
        println!("  ! {}: {}", failure.path, failure.reason);
    }
    match &report.reduction {
        ReductionOutcome::Reduced {
            items,
            components,
            explained_variance,
        } => println!(
            "Library rebuilt: {items} tracks x {components} components ({:.1}% variance kept)",
            explained_variance * 100.0
        ),
        ReductionOutcome::Skipped { items, minimum } => println!(
            "Library not rebuilt: {items} tracks, at least {minimum} needed"
        ),
    }
}
