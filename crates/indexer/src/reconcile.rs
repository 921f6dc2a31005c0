use crate::error::Result;
use crate::scanner::FileScanner;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

/// Difference between the files on disk and the keys in the raw store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    /// Every recognized file on disk (`D`).
    pub disk: BTreeSet<String>,
    /// `D \ S`, sorted.
    pub added: Vec<String>,
    /// `S \ D`, sorted.
    pub removed: Vec<String>,
}

impl Reconciliation {
    /// Pure set difference of a disk snapshot against store keys.
    #[must_use]
    pub fn compute(disk: BTreeSet<String>, store_keys: &HashSet<String>) -> Self {
        let added = disk
            .iter()
            .filter(|key| !store_keys.contains(*key))
            .cloned()
            .collect();
        let mut removed: Vec<String> = store_keys
            .iter()
            .filter(|key| !disk.contains(*key))
            .cloned()
            .collect();
        removed.sort();
        Self {
            disk,
            added,
            removed,
        }
    }
}

/// Diffs the media directory against a store's key set. Never mutates a store.
pub struct FileSetReconciler {
    scanner: FileScanner,
}

impl FileSetReconciler {
    pub fn new<I, S>(root: impl AsRef<Path>, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            scanner: FileScanner::new(root).with_extensions(extensions),
        }
    }

    pub fn reconcile(&self, store_keys: &HashSet<String>) -> Result<Reconciliation> {
        let disk = self.scanner.scan()?;
        let reconciliation = Reconciliation::compute(disk, store_keys);
        log::info!(
            "Reconciled: {} on disk, {} new, {} deleted",
            reconciliation.disk.len(),
            reconciliation.added.len(),
            reconciliation.removed.len()
        );
        Ok(reconciliation)
    }
}
