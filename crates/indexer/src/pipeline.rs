use crate::error::{IndexerError, Result};
use crate::events::{CancelFlag, EventSender, PipelineEvent, PipelineState};
use crate::extractor::{build_extractor, ExtractError, FeatureExtractor};
use crate::reconcile::FileSetReconciler;
use crate::session::Session;
use crate::stats::{ProcessReport, ReductionOutcome, ScanReport};
use pipod_feature_store::{CompressedLibrary, RawFeatureStore};
use pipod_reducer::{Corpus, CorpusReducer};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Scan → extract → reduce over one media root.
///
/// Per-file problems are recorded in the report and skipped; anything that would leave the
/// stores inconsistent aborts the run instead. The state always returns to `Idle`.
pub struct ProcessingPipeline {
    session: Session,
    extractor: Option<Arc<dyn FeatureExtractor>>,
    events: EventSender,
    cancel: CancelFlag,
    state: PipelineState,
}

enum FileOutcome {
    Extracted(Vec<f32>),
    Failed(String),
    Cancelled,
}

impl ProcessingPipeline {
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            session,
            extractor: None,
            events: EventSender::disabled(),
            cancel: CancelFlag::new(),
            state: PipelineState::Idle,
        }
    }

    /// Use this extractor instead of the one described by the session config.
    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<dyn FeatureExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    #[must_use]
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub const fn state(&self) -> PipelineState {
        self.state
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    fn set_state(&mut self, state: PipelineState) {
        if self.state != state {
            log::debug!("Pipeline {:?} -> {:?}", self.state, state);
            self.state = state;
            self.events.send(PipelineEvent::StateChanged { state });
        }
    }

    /// Reconcile and apply removals only.
    pub async fn scan(&mut self) -> Result<ScanReport> {
        let result = self.run_scan().await;
        self.set_state(PipelineState::Idle);
        result
    }

    /// Full run: reconcile, extract new files, rebuild the library.
    pub async fn process(&mut self) -> Result<ProcessReport> {
        let result = self.run_process().await;
        self.set_state(PipelineState::Idle);
        result
    }

    async fn run_scan(&mut self) -> Result<ScanReport> {
        let mut store = RawFeatureStore::load(self.session.raw_store_path()).await?;
        self.set_state(PipelineState::Scanning);
        self.reconcile_and_prune(&mut store).await
    }

    async fn run_process(&mut self) -> Result<ProcessReport> {
        let started = Instant::now();
        let extractor = match &self.extractor {
            Some(extractor) => extractor.clone(),
            None => build_extractor(&self.session.config().extractor)?,
        };
        extractor
            .check_available()
            .map_err(IndexerError::ExtractorUnavailable)?;

        let mut store = RawFeatureStore::load(self.session.raw_store_path()).await?;
        match store.extractor() {
            Some(tag) if tag != extractor.id() && !store.is_empty() => {
                return Err(IndexerError::ExtractorMismatch {
                    store: tag.to_string(),
                    configured: extractor.id().to_string(),
                });
            }
            _ => {}
        }

        self.set_state(PipelineState::Scanning);
        let scan = self.reconcile_and_prune(&mut store).await?;
        let mut report = ProcessReport::new(scan);

        self.set_state(PipelineState::Extracting);
        let added = report.scan.added.clone();
        let outcomes = self.extract_all(&extractor, &added).await?;

        let retag = store.extractor() != Some(extractor.id());
        if retag {
            store.set_extractor(extractor.id());
        }
        for (key, outcome) in outcomes {
            match outcome {
                FileOutcome::Extracted(vector) => match store.upsert(key.clone(), vector) {
                    Ok(()) => report.extracted += 1,
                    Err(err) => {
                        log::warn!("Skipping {key}: {err}");
                        report.add_failure(key, err.to_string());
                    }
                },
                FileOutcome::Failed(reason) => report.add_failure(key, reason),
                FileOutcome::Cancelled => {
                    log::debug!("Cancelled before extracting {key}");
                    report.cancelled.push(key);
                }
            }
        }
        if !report.cancelled.is_empty() {
            log::warn!(
                "Cancelled: {} files were not processed",
                report.cancelled.len()
            );
            self.events.send(PipelineEvent::ExtractionCancelled {
                skipped: report.cancelled.clone(),
            });
        }
        if report.extracted > 0 || retag {
            store.save().await?;
        }
        log::info!(
            "Extracted {} new files ({} failed)",
            report.extracted,
            report.failures.len()
        );

        self.set_state(PipelineState::Reducing);
        report.reduction = self.reduce(&store).await?;
        report.time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        Ok(report)
    }

    async fn reconcile_and_prune(&self, store: &mut RawFeatureStore) -> Result<ScanReport> {
        let reconciler =
            FileSetReconciler::new(self.session.root(), &self.session.config().extensions);
        let reconciliation = reconciler.reconcile(&store.key_set())?;

        let mut pruned = 0;
        for key in &reconciliation.removed {
            log::debug!("Removing deleted file {key}");
            if store.delete(key) {
                pruned += 1;
            }
        }
        if pruned > 0 {
            store.save().await?;
        }

        let report = ScanReport {
            total: reconciliation.disk.len(),
            added: reconciliation.added,
            removed: reconciliation.removed,
        };
        self.events.send(PipelineEvent::Scanned {
            total: report.total,
            added: report.added.len(),
            removed: report.removed.len(),
        });
        Ok(report)
    }

    /// Run the extractor over `keys` on a bounded blocking pool. Results come back keyed and
    /// sorted so merging does not depend on completion order.
    async fn extract_all(
        &self,
        extractor: &Arc<dyn FeatureExtractor>,
        keys: &[String],
    ) -> Result<BTreeMap<String, FileOutcome>> {
        let total = keys.len();
        self.events.send(PipelineEvent::ExtractionStarted { total });
        let mut outcomes = BTreeMap::new();
        if total == 0 {
            return Ok(outcomes);
        }

        let workers = self.session.config().worker_count();
        log::info!("Extracting features for {total} files with {workers} workers");
        let permits = Arc::new(Semaphore::new(workers));
        let mut join = JoinSet::new();
        for key in keys {
            let key = key.clone();
            let path = self.session.root().join(&key);
            let extractor = extractor.clone();
            let permits = permits.clone();
            let cancel = self.cancel.clone();
            join.spawn(async move {
                let outcome = extract_one(extractor, path, permits, cancel).await;
                (key, outcome)
            });
        }

        let mut done = 0;
        while let Some(joined) = join.join_next().await {
            let (key, outcome) = joined.map_err(|err| {
                IndexerError::Other(format!("Extraction worker panicked: {err}"))
            })?;
            match &outcome {
                FileOutcome::Extracted(_) => {
                    done += 1;
                    log::debug!("Extracted {key}");
                    self.events.send(PipelineEvent::FileExtracted {
                        path: key.clone(),
                        done,
                        total,
                    });
                }
                FileOutcome::Failed(reason) => {
                    done += 1;
                    log::warn!("Skipping {key}: {reason}");
                    self.events.send(PipelineEvent::FileFailed {
                        path: key.clone(),
                        reason: reason.clone(),
                        done,
                        total,
                    });
                }
                FileOutcome::Cancelled => {}
            }
            outcomes.insert(key, outcome);
        }
        Ok(outcomes)
    }

    async fn reduce(&self, store: &RawFeatureStore) -> Result<ReductionOutcome> {
        let items = store.len();
        let minimum = self.session.config().min_corpus;
        if items < minimum {
            log::warn!(
                "Only {items} items in the raw store (need {minimum}); library left untouched"
            );
            self.events
                .send(PipelineEvent::ReductionSkipped { items, minimum });
            return Ok(ReductionOutcome::Skipped { items, minimum });
        }

        let corpus = Corpus::from_store(store)?;
        let reducer = CorpusReducer::new(self.session.config().reducer_config())?;
        let (reducer, reduction) = tokio::task::spawn_blocking(move || {
            let reduction = reducer.reduce(&corpus);
            (reducer, reduction)
        })
        .await
        .map_err(|err| IndexerError::Other(format!("Reduction task failed: {err}")))?;
        let reduction = reduction?;

        let library = CompressedLibrary::from_entries(
            self.session.library_path(),
            self.session.deploy_dir(),
            reducer.to_library_entries(&reduction),
        )?;
        library.save().await?;

        let components = reduction.components();
        self.events
            .send(PipelineEvent::Reduced { items, components });
        Ok(ReductionOutcome::Reduced {
            items,
            components,
            explained_variance: reduction.explained_variance(),
        })
    }
}

async fn extract_one(
    extractor: Arc<dyn FeatureExtractor>,
    path: PathBuf,
    permits: Arc<Semaphore>,
    cancel: CancelFlag,
) -> FileOutcome {
    let Ok(_permit) = permits.acquire_owned().await else {
        return FileOutcome::Cancelled;
    };
    if cancel.is_cancelled() {
        return FileOutcome::Cancelled;
    }
    let result = tokio::task::spawn_blocking(move || extractor.extract(&path)).await;
    match result {
        Ok(Ok(vector)) => FileOutcome::Extracted(vector),
        Ok(Err(err)) => FileOutcome::Failed(describe(&err)),
        Err(err) => FileOutcome::Failed(format!("extractor panicked: {err}")),
    }
}

fn describe(err: &ExtractError) -> String {
    match err {
        ExtractError::Io(io) => format!("unreadable: {io}"),
        other => other.to_string(),
    }
}
