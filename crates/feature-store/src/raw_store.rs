use crate::atomic::{read_if_exists, write_json_atomic};
use crate::error::{FeatureStoreError, Result};
use crate::vector_map::VectorMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const RAW_STORE_SCHEMA_VERSION: u32 = 2;

/// Persisted map of media path to raw feature vector.
///
/// Entries are only created by successful extraction and only removed by reconciliation. All
/// vectors share one dimensionality; the first insert fixes it.
#[derive(Debug, Clone)]
pub struct RawFeatureStore {
    path: PathBuf,
    extractor: Option<String>,
    dim: Option<usize>,
    entries: VectorMap,
}

#[derive(Debug, Deserialize)]
struct PersistedRawStore {
    schema_version: u32,
    #[serde(default)]
    extractor: Option<String>,
    #[serde(default)]
    dim: Option<usize>,
    entries: VectorMap,
}

#[derive(Serialize)]
struct PersistedRawStoreRef<'a> {
    schema_version: u32,
    extractor: Option<&'a str>,
    dim: Option<usize>,
    entries: &'a VectorMap,
}

impl RawFeatureStore {
    /// Empty, unsaved store bound to `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            extractor: None,
            dim: None,
            entries: VectorMap::new(),
        }
    }

    /// Load from disk. A missing file yields an empty store; a malformed one is an error.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let Some(bytes) = read_if_exists(path).await? else {
            log::debug!("No raw store at {}, starting empty", path.display());
            return Ok(Self::new(path));
        };
        let store = Self::from_slice(path, &bytes)?;
        log::info!(
            "Loaded raw store {} ({} entries, dim {:?})",
            path.display(),
            store.len(),
            store.dim
        );
        Ok(store)
    }

    fn from_slice(path: &Path, bytes: &[u8]) -> Result<Self> {
        let malformed = |reason: String| FeatureStoreError::Malformed {
            path: path.display().to_string(),
            reason,
        };

        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|err| malformed(err.to_string()))?;
        let Some(object) = value.as_object() else {
            return Err(malformed("expected a JSON object".to_string()));
        };

        let (extractor, declared_dim, entries) = if object.contains_key("schema_version") {
            let persisted: PersistedRawStore =
                serde_json::from_slice(bytes).map_err(|err| malformed(err.to_string()))?;
            if persisted.schema_version != RAW_STORE_SCHEMA_VERSION {
                return Err(FeatureStoreError::UnsupportedSchema {
                    path: path.display().to_string(),
                    found: persisted.schema_version,
                    expected: RAW_STORE_SCHEMA_VERSION,
                });
            }
            (persisted.extractor, persisted.dim, persisted.entries)
        } else {
            // Legacy layout: a bare `{ path: [f32] }` map with no extractor tag.
            log::info!(
                "Upgrading legacy raw store layout at {} (extractor unknown)",
                path.display()
            );
            let entries: VectorMap =
                serde_json::from_slice(bytes).map_err(|err| malformed(err.to_string()))?;
            (None, None, entries)
        };

        let dim = validate_dimensions(path, declared_dim, &entries)?;
        Ok(Self {
            path: path.to_path_buf(),
            extractor,
            dim,
            entries,
        })
    }

    /// Atomically persist the store.
    pub async fn save(&self) -> Result<()> {
        let persisted = PersistedRawStoreRef {
            schema_version: RAW_STORE_SCHEMA_VERSION,
            extractor: self.extractor.as_deref(),
            dim: self.dim,
            entries: &self.entries,
        };
        write_json_atomic(&self.path, &persisted).await?;
        log::info!(
            "Saved raw store {} ({} entries)",
            self.path.display(),
            self.entries.len()
        );
        Ok(())
    }

    /// Insert or replace the vector for `key`.
    ///
    /// Fails without touching the store when the vector is empty or disagrees with the fixed
    /// dimensionality. Vectors are never padded or truncated.
    pub fn upsert(&mut self, key: impl Into<String>, vector: Vec<f32>) -> Result<()> {
        let key = key.into();
        if vector.is_empty() {
            return Err(FeatureStoreError::EmptyVector(key));
        }
        match self.dim {
            Some(expected) if expected != vector.len() => {
                return Err(FeatureStoreError::InvalidDimension {
                    path: key,
                    expected,
                    actual: vector.len(),
                });
            }
            Some(_) => {}
            None => self.dim = Some(vector.len()),
        }
        self.entries.insert(key, vector);
        Ok(())
    }

    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if self.entries.is_empty() {
            self.dim = None;
        }
        removed
    }

    #[must_use]
    pub fn key_set(&self) -> HashSet<String> {
        self.entries.keys().map(str::to_string).collect()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f32])> {
        self.entries.iter()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[f32]> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn dim(&self) -> Option<usize> {
        self.dim
    }

    #[must_use]
    pub fn extractor(&self) -> Option<&str> {
        self.extractor.as_deref()
    }

    pub fn set_extractor(&mut self, id: impl Into<String>) {
        self.extractor = Some(id.into());
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn entries(&self) -> &VectorMap {
        &self.entries
    }
}

fn validate_dimensions(
    path: &Path,
    declared: Option<usize>,
    entries: &VectorMap,
) -> Result<Option<usize>> {
    let mut dim = declared;
    for (key, vector) in entries.iter() {
        if vector.is_empty() {
            return Err(FeatureStoreError::EmptyVector(key.to_string()));
        }
        match dim {
            Some(expected) if expected != vector.len() => {
                log::error!(
                    "Raw store {} mixes vector dimensions ({} vs {} at '{key}')",
                    path.display(),
                    expected,
                    vector.len()
                );
                return Err(FeatureStoreError::InvalidDimension {
                    path: key.to_string(),
                    expected,
                    actual: vector.len(),
                });
            }
            Some(_) => {}
            None => dim = Some(vector.len()),
        }
    }
    if entries.is_empty() {
        return Ok(None);
    }
    Ok(dim)
}
