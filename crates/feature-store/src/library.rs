use crate::atomic::{read_if_exists, write_json_atomic};
use crate::error::{FeatureStoreError, Result};
use crate::vector_map::VectorMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const LIBRARY_SCHEMA_VERSION: u32 = 2;

/// The compressed library: one reduced vector per media path plus the deployment tag.
///
/// It is rebuilt wholesale after every reduction and never patched in place, because the
/// projection basis depends on the whole corpus.
#[derive(Debug, Clone)]
pub struct CompressedLibrary {
    path: PathBuf,
    dir: String,
    entries: VectorMap,
}

#[derive(Debug, Deserialize)]
struct PersistedLibrary {
    #[serde(default)]
    schema_version: Option<u32>,
    #[serde(default)]
    dir: String,
    files: VectorMap,
}

#[derive(Serialize)]
struct PersistedLibraryRef<'a> {
    schema_version: u32,
    dir: &'a str,
    files: &'a VectorMap,
}

impl CompressedLibrary {
    /// Build a library from reduced vectors; every vector must share one length.
    pub fn from_entries(
        path: impl AsRef<Path>,
        dir: impl Into<String>,
        entries: VectorMap,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        check_uniform(&path, &entries)?;
        Ok(Self {
            path,
            dir: dir.into(),
            entries,
        })
    }

    /// Load a library, or `None` when no file exists yet.
    pub async fn load_if_exists(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        let Some(bytes) = read_if_exists(path).await? else {
            return Ok(None);
        };
        Self::from_slice(path, &bytes).map(Some)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Self::load_if_exists(path).await?.ok_or_else(|| {
            FeatureStoreError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("library {} does not exist", path.display()),
            ))
        })
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

        let canonical = object.get("files").is_some_and(serde_json::Value::is_object);
        let (dir, entries) = if canonical {
            let persisted: PersistedLibrary =
                serde_json::from_slice(bytes).map_err(|err| malformed(err.to_string()))?;
            if let Some(found) = persisted.schema_version {
                if found != LIBRARY_SCHEMA_VERSION {
                    return Err(FeatureStoreError::UnsupportedSchema {
                        path: path.display().to_string(),
                        found,
                        expected: LIBRARY_SCHEMA_VERSION,
                    });
                }
            }
            (persisted.dir, persisted.files)
        } else {
            // Legacy flat `{ path: [f32] }` layout, read-only.
            log::info!("Reading legacy flat library layout at {}", path.display());
            let entries: VectorMap =
                serde_json::from_slice(bytes).map_err(|err| malformed(err.to_string()))?;
            (String::new(), entries)
        };

        check_uniform(path, &entries)?;
        Ok(Self {
            path: path.to_path_buf(),
            dir,
            entries,
        })
    }

    /// Atomically persist in the canonical `{ dir, files }` layout.
    pub async fn save(&self) -> Result<()> {
        let persisted = PersistedLibraryRef {
            schema_version: LIBRARY_SCHEMA_VERSION,
            dir: &self.dir,
            files: &self.entries,
        };
        write_json_atomic(&self.path, &persisted).await?;
        log::info!(
            "Saved library {} ({} entries, k = {})",
            self.path.display(),
            self.entries.len(),
            self.dimension().unwrap_or(0)
        );
        Ok(())
    }

    /// Entries keyed by `dir`-joined paths, dropping those whose file is gone.
    ///
    /// This is the view a playback device takes of a mirrored library.
    #[must_use]
    pub fn resolve_existing(&self) -> VectorMap {
        let base = Path::new(&self.dir);
        let mut resolved = VectorMap::new();
        for (key, vector) in self.entries.iter() {
            let full = base.join(key);
            if full.is_file() {
                resolved.insert(full.to_string_lossy().into_owned(), vector.to_vec());
            } else {
                log::warn!(
                    "Dropping '{}' from library: file does not exist",
                    full.display()
                );
            }
        }
        resolved
    }

    /// Shared vector length, `None` for an empty library.
    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        self.entries.iter().next().map(|(_, vector)| vector.len())
    }

    #[must_use]
    pub fn dir(&self) -> &str {
        &self.dir
    }

    #[must_use]
    pub const fn entries(&self) -> &VectorMap {
        &self.entries
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
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn check_uniform(path: &Path, entries: &VectorMap) -> Result<()> {
    let mut expected = None;
    for (key, vector) in entries.iter() {
        match expected {
            None => expected = Some(vector.len()),
            Some(len) if len != vector.len() => {
                return Err(FeatureStoreError::InvalidDimension {
                    path: format!("{}: {key}", path.display()),
                    expected: len,
                    actual: vector.len(),
                });
            }
            Some(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample() -> VectorMap {
        [("b.flac", [0.5, -0.25]), ("a.mp3", [0.1234, 1.0])]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_vec()))
            .collect()
    }

    #[tokio::test]
    async fn writes_canonical_layout() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("library.json");
        let library = CompressedLibrary::from_entries(&path, "/home/pi/music", sample()).unwrap();
        library.save().await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["dir"], "/home/pi/music");
        assert_eq!(raw["schema_version"], LIBRARY_SCHEMA_VERSION);
        assert!(raw["files"]["a.mp3"].is_array());

        let loaded = CompressedLibrary::load(&path).await.unwrap();
        assert_eq!(loaded.dir(), "/home/pi/music");
        assert_eq!(loaded.entries(), &sample());
        assert_eq!(loaded.dimension(), Some(2));
    }

    #[tokio::test]
    async fn reads_legacy_flat_layout() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("library.json");
        tokio::fs::write(&path, br#"{"x.mp3": [1.0, 2.0, 3.0], "files.mp3": [0.0, 0.0, 1.0]}"#)
            .await
            .unwrap();
        let loaded = CompressedLibrary::load(&path).await.unwrap();
        assert_eq!(loaded.dir(), "");
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.dimension(), Some(3));
    }

    #[tokio::test]
    async fn missing_library_is_none() {
        let tmp = TempDir::new().unwrap();
        let loaded = CompressedLibrary::load_if_exists(tmp.path().join("library.json"))
            .await
            .unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn rejects_ragged_vectors() {
        let mut entries = sample();
        entries.insert("c.mp3".to_string(), vec![1.0]);
        assert!(CompressedLibrary::from_entries("library.json", "", entries).is_err());
    }

    #[test]
    fn resolve_existing_drops_missing_files() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.mp3"), b"x").unwrap();
        let library = CompressedLibrary::from_entries(
            tmp.path().join("library.json"),
            tmp.path().to_string_lossy(),
            sample(),
        )
        .unwrap();

        let resolved = library.resolve_existing();
        assert_eq!(resolved.len(), 1);
        let key = tmp.path().join("a.mp3").to_string_lossy().into_owned();
        assert_eq!(resolved.get(&key), Some(&[0.1234, 1.0][..]));
    }
}
