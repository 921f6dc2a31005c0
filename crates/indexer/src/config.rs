use crate::error::{IndexerError, Result};
use crate::limits::{clamp_workers, default_workers, parse_workers};
use crate::scanner::DEFAULT_EXTENSIONS;
use pipod_feature_store::CONFIG_FILE_NAME;
use pipod_reducer::{ReducerConfig, DEFAULT_MAX_COMPONENTS, DEFAULT_PRECISION};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_MIN_CORPUS: usize = 5;
pub const DEFAULT_NEIGHBORS: usize = 5;
pub const DEFAULT_STUB_DIM: usize = 32;

/// Library-level settings, read from `pipod.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipodConfig {
    /// Recognized media extensions (case-insensitive).
    pub extensions: Vec<String>,
    /// Ceiling on compressed vector length.
    pub k_max: usize,
    /// Below this many raw entries the library is left untouched.
    pub min_corpus: usize,
    /// Default K for similarity queries.
    pub neighbors: usize,
    /// Extraction worker count; derived from the host when unset.
    pub workers: Option<usize>,
    /// Deployment tag written as the library's `dir`; defaults to the media root.
    pub deploy_dir: Option<String>,
    pub extractor: ExtractorConfig,
    pub transfer: TransferConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorKind {
    #[default]
    Command,
    Stub,
}

impl ExtractorKind {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "command" => Ok(Self::Command),
            "stub" => Ok(Self::Stub),
            other => Err(IndexerError::Config(format!(
                "Unsupported extractor kind '{other}' (expected 'command' or 'stub')"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractorConfig {
    pub kind: ExtractorKind,
    /// Program invoked as `program [args..] <file>`; must print a JSON float array.
    pub program: Option<String>,
    pub args: Vec<String>,
    /// Tag recorded in the raw store. Change it whenever the extractor's vector space changes.
    pub id: Option<String>,
    /// Output dimension of the stub extractor.
    pub dim: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            kind: ExtractorKind::Command,
            program: None,
            args: Vec::new(),
            id: None,
            dim: DEFAULT_STUB_DIM,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransferConfig {
    pub program: String,
    /// Destination such as `pi@192.168.1.50:/home/pi/music`.
    pub remote: Option<String>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            program: "rsync".to_string(),
            remote: None,
        }
    }
}

impl Default for PipodConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
            k_max: DEFAULT_MAX_COMPONENTS,
            min_corpus: DEFAULT_MIN_CORPUS,
            neighbors: DEFAULT_NEIGHBORS,
            workers: None,
            deploy_dir: None,
            extractor: ExtractorConfig::default(),
            transfer: TransferConfig::default(),
        }
    }
}

impl PipodConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|err| IndexerError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|err| {
            IndexerError::Config(format!("read {}: {err}", path.display()))
        })?;
        let config = Self::from_toml_str(&raw)
            .map_err(|err| IndexerError::Config(format!("{}: {err}", path.display())))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Explicit file if given, else `<root>/pipod.toml` if present, else defaults; then
    /// environment overrides.
    pub async fn resolve(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path).await?,
            None => {
                let candidate = root.join(CONFIG_FILE_NAME);
                if candidate.is_file() {
                    Self::load(&candidate).await?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env()?;
        Ok(config)
    }

    /// `PIPOD_EXTRACTOR` selects the extractor kind, `PIPOD_WORKERS` the pool size.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(raw) = std::env::var("PIPOD_EXTRACTOR") {
            if !raw.trim().is_empty() {
                self.extractor.kind = ExtractorKind::parse(&raw)?;
            }
        }
        if let Ok(raw) = std::env::var("PIPOD_WORKERS") {
            self.workers = Some(parse_workers(Some(&raw), self.worker_count()));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.k_max == 0 {
            return Err(IndexerError::Config("k_max must be at least 1".to_string()));
        }
        if self.min_corpus == 0 {
            return Err(IndexerError::Config(
                "min_corpus must be at least 1".to_string(),
            ));
        }
        if self.extensions.is_empty() {
            return Err(IndexerError::Config(
                "extensions must not be empty".to_string(),
            ));
        }
        if self.extractor.kind == ExtractorKind::Stub && self.extractor.dim == 0 {
            return Err(IndexerError::Config(
                "extractor.dim must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.map_or_else(default_workers, clamp_workers)
    }

    #[must_use]
    pub fn reducer_config(&self) -> ReducerConfig {
        ReducerConfig {
            max_components: self.k_max,
            precision: DEFAULT_PRECISION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(PipodConfig::from_toml_str("").unwrap(), PipodConfig::default());
    }

    #[test]
    fn parses_nested_sections() {
        let config = PipodConfig::from_toml_str(
            r#"
k_max = 3
extensions = ["mp3", "ogg"]
deploy_dir = "/home/pi/music"

[extractor]
kind = "command"
program = "pipod-extract"
args = ["--model", "effnet"]
id = "effnet-discogs-1"

[transfer]
remote = "pi@pipod.local:/home/pi/music"
"#,
        )
        .unwrap();
        assert_eq!(config.k_max, 3);
        assert_eq!(config.extractor.program.as_deref(), Some("pipod-extract"));
        assert_eq!(config.extractor.args, vec!["--model", "effnet"]);
        assert_eq!(config.transfer.program, "rsync");
        assert_eq!(config.min_corpus, DEFAULT_MIN_CORPUS);
    }

    #[test]
    fn rejects_unknown_keys_and_bad_values() {
        assert!(PipodConfig::from_toml_str("kmax = 3").is_err());
        assert!(PipodConfig::from_toml_str("k_max = 0").is_err());
        assert!(PipodConfig::from_toml_str("[extractor]\nkind = \"magic\"").is_err());
    }

    #[test]
    fn explicit_workers_are_clamped() {
        let config = PipodConfig {
            workers: Some(0),
            ..PipodConfig::default()
        };
        assert_eq!(config.worker_count(), 1);
    }
}
