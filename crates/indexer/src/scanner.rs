use crate::error::{IndexerError, Result};
use pipod_feature_store::{is_pipod_artifact_name, normalize_key};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Extensions recognized when nothing is configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &["mp3", "flac", "wav", "m4a"];

/// Scanner for media files under a root directory.
pub struct FileScanner {
    root: PathBuf,
    extensions: Vec<String>,
}

impl FileScanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
        }
    }

    /// Replace the recognized extensions. Leading dots and case are ignored.
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    /// Store keys of every matching file, sorted.
    ///
    /// Any walk error aborts the scan: a directory we failed to read must not look like a
    /// directory whose files were deleted.
    pub fn scan(&self) -> Result<BTreeSet<String>> {
        if !self.root.is_dir() {
            return Err(IndexerError::InvalidPath(format!(
                "Not a directory: {}",
                self.root.display()
            )));
        }

        let mut files = BTreeSet::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden_dir(entry));

        for result in walker {
            let entry = result.map_err(|err| IndexerError::Walk {
                path: err
                    .path()
                    .unwrap_or(self.root.as_path())
                    .display()
                    .to_string(),
                reason: err.to_string(),
            })?;
            let path = entry.path();
            if !is_regular_file(&entry) {
                if entry.path_is_symlink() && !entry.path().exists() {
                    log::debug!("Skipping dangling symlink {}", path.display());
                }
                continue;
            }
            if entry
                .file_name()
                .to_str()
                .is_some_and(|name| is_pipod_artifact_name(name) || is_apple_double(name))
            {
                continue;
            }
            if !self.is_media_file(path) {
                continue;
            }
            match normalize_key(&self.root, path) {
                Some(key) => {
                    files.insert(key);
                }
                None => log::warn!(
                    "Skipping {}: outside root or not valid UTF-8",
                    path.display()
                ),
            }
        }

        log::info!(
            "Found {} media files under {}",
            files.len(),
            self.root.display()
        );
        Ok(files)
    }

    fn is_media_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .is_some_and(|ext| self.extensions.iter().any(|candidate| *candidate == ext))
    }
}

/// Plain files, plus symlinks whose target is a file. Symlinked directories are never entered.
fn is_regular_file(entry: &DirEntry) -> bool {
    let file_type = entry.file_type();
    file_type.is_file() || (file_type.is_symlink() && entry.path().is_file())
}

fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

/// macOS resource-fork sidecars (`._song.mp3`) left behind on non-HFS volumes.
fn is_apple_double(name: &str) -> bool {
    name.starts_with("._")
}
