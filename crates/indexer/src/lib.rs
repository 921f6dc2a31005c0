//! # Pipod Indexer
//!
//! Keeps a media directory, its raw feature store and its compressed library in step.
//!
//! ## Pipeline
//!
//! ```text
//! Media root
//!     │
//!     ├──> Scanning   (walk + reconcile, apply deletions, save)
//!     │      └─> added / removed
//!     │
//!     ├──> Extracting (bounded worker pool, merge in path order, save)
//!     │      └─> raw_features.json
//!     │
//!     └──> Reducing   (standardize + PCA over the whole corpus, N ≥ min_corpus)
//!            └─> library.json
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use pipod_indexer::{ProcessingPipeline, Session};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let session = Session::open("/srv/music", None).await?;
//!     let mut pipeline = ProcessingPipeline::new(session);
//!     let report = pipeline.process().await?;
//!
//!     println!("{} new, {} failed", report.extracted, report.failures.len());
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod events;
mod extractor;
mod limits;
mod pipeline;
mod reconcile;
mod scanner;
mod session;
mod stats;

pub use config::{
    ExtractorConfig, ExtractorKind, PipodConfig, TransferConfig, DEFAULT_MIN_CORPUS,
    DEFAULT_NEIGHBORS, DEFAULT_STUB_DIM,
};
pub use error::{IndexerError, Result};
pub use events::{CancelFlag, EventReceiver, EventSender, PipelineEvent, PipelineState};
pub use extractor::{
    build_extractor, CommandExtractor, ExtractError, FeatureExtractor, StubExtractor,
};
pub use pipeline::ProcessingPipeline;
pub use reconcile::{FileSetReconciler, Reconciliation};
pub use scanner::{FileScanner, DEFAULT_EXTENSIONS};
pub use session::Session;
pub use stats::{ExtractionFailure, ProcessReport, ReductionOutcome, ScanReport};
