use async_trait::async_trait;
use pipod_feature_store::{CONFIG_FILE_NAME, LIBRARY_FILE_NAME, RAW_STORE_FILE_NAME};
use std::path::Path;
use thiserror::Error;
use tokio::process::Command;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Transfer program '{0}' not found")]
    NotFound(String),

    #[error("'{program}' exited with {status}: {stderr}")]
    NonZeroExit {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Nothing to push: {0} does not exist (run `pipod process` first)")]
    MissingLibrary(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Moves a processed media root onto the playback device.
#[async_trait]
pub trait Transfer: Send + Sync {
    /// Mirror media first, then publish the library, so the device never sees library
    /// entries for files that have not arrived yet.
    async fn mirror(&self, root: &Path, library: &Path) -> Result<(), TransferError>;
}

pub struct RsyncTransfer {
    program: String,
    remote: String,
}

impl RsyncTransfer {
    pub fn new(program: impl Into<String>, remote: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            remote: remote.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    fn media_args(&self, root: &Path) -> Vec<String> {
        let mut args = vec!["-a".to_string(), "--delete".to_string()];
        for excluded in [
            RAW_STORE_FILE_NAME,
            LIBRARY_FILE_NAME,
            CONFIG_FILE_NAME,
            "*.json.tmp",
        ] {
            args.push(format!("--exclude={excluded}"));
        }
        args.push(format!("{}/", root.display()));
        args.push(format!("{}/", self.remote));
        args
    }

    fn library_args(&self, library: &Path) -> Vec<String> {
        vec![
            "-a".to_string(),
            library.display().to_string(),
            format!("{}/{LIBRARY_FILE_NAME}", self.remote),
        ]
    }

    async fn run(&self, args: &[String]) -> Result<(), TransferError> {
        log::debug!("{} {}", self.program, args.join(" "));
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .await
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::NotFound => TransferError::NotFound(self.program.clone()),
                _ => TransferError::Io(err),
            })?;
        if !output.status.success() {
            return Err(TransferError::NonZeroExit {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Transfer for RsyncTransfer {
    async fn mirror(&self, root: &Path, library: &Path) -> Result<(), TransferError> {
        if !library.is_file() {
            return Err(TransferError::MissingLibrary(library.display().to_string()));
        }
        log::info!("Mirroring {} to {}", root.display(), self.remote);
        self.run(&self.media_args(root)).await?;
        log::info!("Publishing {LIBRARY_FILE_NAME}");
        self.run(&self.library_args(library)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn media_pass_excludes_local_stores() {
        let transfer = RsyncTransfer::new("rsync", "pi@pipod.local:/music/");
        let args = transfer.media_args(Path::new("/srv/music"));
        assert!(args.contains(&"--delete".to_string()));
        assert!(args.contains(&"--exclude=raw_features.json".to_string()));
        assert!(args.contains(&"--exclude=library.json".to_string()));
        assert_eq!(args[args.len() - 2], "/srv/music/");
        assert_eq!(args[args.len() - 1], "pi@pipod.local:/music/");

        let library = transfer.library_args(Path::new("/srv/music/library.json"));
        assert_eq!(library[2], "pi@pipod.local:/music/library.json");
    }

    #[tokio::test]
    async fn missing_program_and_failures_are_reported() {
        let temp = tempdir().unwrap();
        let library = temp.path().join(LIBRARY_FILE_NAME);
        std::fs::write(&library, b"{}").unwrap();

        let missing = RsyncTransfer::new("pipod-no-such-rsync", "dest");
        assert!(matches!(
            missing.mirror(temp.path(), &library).await,
            Err(TransferError::NotFound(_))
        ));

        let failing = RsyncTransfer::new("false", "dest");
        assert!(matches!(
            failing.mirror(temp.path(), &library).await,
            Err(TransferError::NonZeroExit { .. })
        ));
    }

    #[tokio::test]
    async fn refuses_to_push_without_a_library() {
        let temp = tempdir().unwrap();
        let transfer = RsyncTransfer::new("true", "dest");
        assert!(matches!(
            transfer
                .mirror(temp.path(), &temp.path().join(LIBRARY_FILE_NAME))
                .await,
            Err(TransferError::MissingLibrary(_))
        ));
    }
}
