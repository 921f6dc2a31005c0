use crate::config::PipodConfig;
use crate::error::{IndexerError, Result};
use pipod_feature_store::{library_path_for_root, raw_store_path_for_root};
use std::path::{Path, PathBuf};

/// One media root with its resolved configuration. Everything the pipeline and the query
/// command need is carried here instead of in process-wide state.
#[derive(Debug, Clone)]
pub struct Session {
    root: PathBuf,
    config: PipodConfig,
}

impl Session {
    pub fn new(root: impl AsRef<Path>, config: PipodConfig) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(IndexerError::InvalidPath(format!(
                "Media root is not a directory: {}",
                root.display()
            )));
        }
        config.validate()?;
        let root = root.canonicalize()?;
        Ok(Self { root, config })
    }

    /// Resolve config for `root` (explicit file, `pipod.toml`, env) and open a session.
    pub async fn open(root: impl AsRef<Path>, config_path: Option<&Path>) -> Result<Self> {
        let root = root.as_ref();
        let config = PipodConfig::resolve(root, config_path).await?;
        Self::new(root, config)
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub const fn config(&self) -> &PipodConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut PipodConfig {
        &mut self.config
    }

    #[must_use]
    pub fn raw_store_path(&self) -> PathBuf {
        raw_store_path_for_root(&self.root)
    }

    #[must_use]
    pub fn library_path(&self) -> PathBuf {
        library_path_for_root(&self.root)
    }

    /// `dir` tag written into the library: the configured deployment directory, else the root.
    #[must_use]
    pub fn deploy_dir(&self) -> String {
        self.config
            .deploy_dir
            .clone()
            .unwrap_or_else(|| self.root.to_string_lossy().into_owned())
    }
}
