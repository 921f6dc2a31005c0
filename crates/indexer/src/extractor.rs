use crate::config::{ExtractorConfig, ExtractorKind};
use crate::error::{IndexerError, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("{0}")]
    Unavailable(String),

    #[error("Failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Extractor produced invalid output for {path}: {reason}")]
    InvalidOutput { path: String, reason: String },
}

/// Turns one media file into a fixed-length feature vector.
///
/// `extract` is blocking and is called from a worker pool, so implementations must be
/// `Send + Sync`. Vectors from one extractor must always share a length.
pub trait FeatureExtractor: Send + Sync {
    /// Tag recorded in the raw store; stores with a different tag are not mixed.
    fn id(&self) -> &str;

    /// Cheap availability check run before any store mutation.
    fn check_available(&self) -> std::result::Result<(), ExtractError>;

    fn extract(&self, path: &Path) -> std::result::Result<Vec<f32>, ExtractError>;
}

/// Runs `program [args..] <file>` and parses a JSON float array from stdout.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    id: String,
    program: String,
    args: Vec<String>,
}

impl CommandExtractor {
    pub fn new(program: impl Into<String>, args: Vec<String>, id: Option<String>) -> Self {
        let program = program.into();
        let id = id.unwrap_or_else(|| command_id(&program, &args));
        Self { id, program, args }
    }
}

/// `command:<name>:<hash of program and args>`, so changing a model flag changes the tag.
fn command_id(program: &str, args: &[String]) -> String {
    let name = Path::new(program)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(program);
    let mut invocation = program.as_bytes().to_vec();
    for arg in args {
        invocation.push(0);
        invocation.extend_from_slice(arg.as_bytes());
    }
    format!("command:{name}:{:016x}", fnv1a_64(&invocation))
}

impl FeatureExtractor for CommandExtractor {
    fn id(&self) -> &str {
        &self.id
    }

    fn check_available(&self) -> std::result::Result<(), ExtractError> {
        if find_program(&self.program).is_some() {
            return Ok(());
        }
        Err(ExtractError::Unavailable(format!(
            "extractor program '{}' was not found",
            self.program
        )))
    }

    fn extract(&self, path: &Path) -> std::result::Result<Vec<f32>, ExtractError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .output()?;
        let display = path.display().to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = match stderr.lines().rev().find(|line| !line.trim().is_empty()) {
                Some(line) => format!("{} ({})", output.status, line.trim()),
                None => output.status.to_string(),
            };
            return Err(ExtractError::Decode {
                path: display,
                reason,
            });
        }
        parse_vector(&display, &output.stdout)
    }
}

fn parse_vector(path: &str, stdout: &[u8]) -> std::result::Result<Vec<f32>, ExtractError> {
    let values: Vec<f64> =
        serde_json::from_slice(stdout).map_err(|err| ExtractError::InvalidOutput {
            path: path.to_string(),
            reason: err.to_string(),
        })?;
    if values.is_empty() {
        return Err(ExtractError::InvalidOutput {
            path: path.to_string(),
            reason: "empty vector".to_string(),
        });
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ExtractError::InvalidOutput {
            path: path.to_string(),
            reason: "non-finite value".to_string(),
        });
    }
    #[allow(clippy::cast_possible_truncation)]
    let vector = values.into_iter().map(|v| v as f32).collect();
    Ok(vector)
}

/// Resolve a program the way a shell would: paths with a separator are used as-is,
/// bare names are searched on `PATH`.
fn find_program(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|full| full.is_file())
}

/// Deterministic content-hash vectors for dry runs and tests.
#[derive(Debug, Clone)]
pub struct StubExtractor {
    dim: usize,
    id: String,
}

impl StubExtractor {
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            id: format!("stub-{dim}"),
        }
    }
}

impl FeatureExtractor for StubExtractor {
    fn id(&self) -> &str {
        &self.id
    }

    fn check_available(&self) -> std::result::Result<(), ExtractError> {
        if self.dim == 0 {
            return Err(ExtractError::Unavailable(
                "stub extractor dimension must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn extract(&self, path: &Path) -> std::result::Result<Vec<f32>, ExtractError> {
        let bytes = std::fs::read(path)?;
        Ok(stub_features(&bytes, self.dim))
    }
}

fn stub_features(bytes: &[u8], dim: usize) -> Vec<f32> {
    let mut state = fnv1a_64(bytes) ^ (dim as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    (0..dim)
        .map(|_| {
            let high = (splitmix64(&mut state) >> 32) as u32;
            let unit = f32::from_bits(0x3f80_0000 | (high >> 9)) - 1.0;
            unit.mul_add(2.0, -1.0)
        })
        .collect()
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

const fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Instantiate the configured extractor.
pub fn build_extractor(config: &ExtractorConfig) -> Result<Arc<dyn FeatureExtractor>> {
    match config.kind {
        ExtractorKind::Stub => {
            let stub = StubExtractor::new(config.dim);
            Ok(Arc::new(match &config.id {
                Some(id) => StubExtractor { id: id.clone(), ..stub },
                None => stub,
            }))
        }
        ExtractorKind::Command => {
            let program = config.program.as_deref().ok_or_else(|| {
                IndexerError::Config(
                    "extractor.program is required for kind = \"command\" \
                     (or set PIPOD_EXTRACTOR=stub)"
                        .to_string(),
                )
            })?;
            Ok(Arc::new(CommandExtractor::new(
                program,
                config.args.clone(),
                config.id.clone(),
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn stub_is_deterministic_and_bounded() {
        let temp = tempdir().unwrap();
        let a = temp.path().join("a.mp3");
        let b = temp.path().join("b.mp3");
        std::fs::write(&a, b"first track").unwrap();
        std::fs::write(&b, b"second track").unwrap();

        let stub = StubExtractor::new(8);
        let first = stub.extract(&a).unwrap();
        assert_eq!(first.len(), 8);
        assert_eq!(first, stub.extract(&a).unwrap());
        assert_ne!(first, stub.extract(&b).unwrap());
        assert!(first.iter().all(|v| (-1.0..=1.0).contains(v)));
        assert_eq!(stub.id(), "stub-8");
    }

    #[test]
    fn stub_reports_unreadable_files() {
        let temp = tempdir().unwrap();
        let stub = StubExtractor::new(4);
        assert!(matches!(
            stub.extract(&temp.path().join("missing.mp3")),
            Err(ExtractError::Io(_))
        ));
    }

    #[test]
    fn parses_json_arrays_only() {
        assert_eq!(parse_vector("a", b"[1, 2.5, -3]\n").unwrap(), vec![1.0, 2.5, -3.0]);
        assert!(parse_vector("a", b"[]").is_err());
        assert!(parse_vector("a", b"{\"x\": 1}").is_err());
        assert!(parse_vector("a", b"not json").is_err());
    }

    #[test]
    fn missing_program_is_unavailable() {
        let extractor =
            CommandExtractor::new("/nonexistent/pipod-extract-xyz", Vec::new(), None);
        assert!(matches!(
            extractor.check_available(),
            Err(ExtractError::Unavailable(_))
        ));
        assert!(extractor.id().starts_with("command:pipod-extract-xyz:"));
    }

    #[test]
    fn default_command_id_tracks_arguments() {
        let args = |model: &str| vec!["--model".to_string(), model.to_string()];
        let a = CommandExtractor::new("pipod-extract", args("a"), None);
        let b = CommandExtractor::new("pipod-extract", args("b"), None);
        assert_ne!(a.id(), b.id());
        assert_eq!(
            a.id(),
            CommandExtractor::new("pipod-extract", args("a"), None).id()
        );
        // "--model a" must not collide with "--model" "a" folded into one argument
        let joined = CommandExtractor::new("pipod-extract", vec!["--model a".to_string()], None);
        assert_ne!(a.id(), joined.id());

        let pinned = CommandExtractor::new("pipod-extract", args("b"), Some("vggish".to_string()));
        assert_eq!(pinned.id(), "vggish");
    }

    #[test]
    fn command_kind_requires_a_program() {
        let config = ExtractorConfig::default();
        assert!(build_extractor(&config).is_err());

        let stub = ExtractorConfig {
            kind: ExtractorKind::Stub,
            dim: 3,
            ..ExtractorConfig::default()
        };
        assert_eq!(build_extractor(&stub).unwrap().id(), "stub-3");
    }
}
