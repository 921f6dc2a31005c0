use serde::{Deserialize, Serialize};

/// Result of reconciling the raw store with the media directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Media files currently on disk
    pub total: usize,

    /// Files on disk with no raw vector yet
    pub added: Vec<String>,

    /// Store entries whose file is gone (already deleted from the store)
    pub removed: Vec<String>,
}

/// A file the extractor or the store refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionFailure {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReductionOutcome {
    /// The library was rebuilt.
    Reduced {
        items: usize,
        components: usize,
        explained_variance: f64,
    },
    /// Too few raw entries; the library was left untouched.
    Skipped { items: usize, minimum: usize },
}

/// Everything `process` did in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessReport {
    pub scan: ScanReport,

    /// Files newly added to the raw store
    pub extracted: usize,

    pub failures: Vec<ExtractionFailure>,

    /// Files not attempted because the run was cancelled, sorted
    pub cancelled: Vec<String>,

    pub reduction: ReductionOutcome,

    /// Time taken in milliseconds
    pub time_ms: u64,
}

impl ProcessReport {
    #[must_use]
    pub fn new(scan: ScanReport) -> Self {
        Self {
            scan,
            extracted: 0,
            failures: Vec::new(),
            cancelled: Vec::new(),
            reduction: ReductionOutcome::Skipped {
                items: 0,
                minimum: 0,
            },
            time_ms: 0,
        }
    }

    pub fn add_failure(&mut self, path: impl Into<String>, reason: impl Into<String>) {
        self.failures.push(ExtractionFailure {
            path: path.into(),
            reason: reason.into(),
        });
    }
}
