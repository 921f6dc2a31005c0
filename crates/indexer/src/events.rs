use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Phase the pipeline is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Scanning,
    Extracting,
    Reducing,
}

/// Progress published while the pipeline runs, in the order things happen.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    StateChanged {
        state: PipelineState,
    },
    Scanned {
        total: usize,
        added: usize,
        removed: usize,
    },
    ExtractionStarted {
        total: usize,
    },
    FileExtracted {
        path: String,
        done: usize,
        total: usize,
    },
    FileFailed {
        path: String,
        reason: String,
        done: usize,
        total: usize,
    },
    ExtractionCancelled {
        skipped: Vec<String>,
    },
    Reduced {
        items: usize,
        components: usize,
    },
    ReductionSkipped {
        items: usize,
        minimum: usize,
    },
}

pub type EventReceiver = mpsc::UnboundedReceiver<PipelineEvent>;

/// Sending half of the progress channel. A dropped receiver is not an error.
#[derive(Debug, Clone, Default)]
pub struct EventSender {
    inner: Option<mpsc::UnboundedSender<PipelineEvent>>,
}

impl EventSender {
    #[must_use]
    pub fn channel() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { inner: Some(tx) }, rx)
    }

    #[must_use]
    pub const fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn send(&self, event: PipelineEvent) {
        if let Some(tx) = &self.inner {
            let _ = tx.send(event);
        }
    }
}

/// Cooperative, per-file cancellation shared between the pipeline and its controller.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
