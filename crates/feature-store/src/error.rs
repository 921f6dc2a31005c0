use thiserror::Error;

pub type Result<T> = std::result::Result<T, FeatureStoreError>;

#[derive(Error, Debug)]
pub enum FeatureStoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Malformed store {path}: {reason}")]
    Malformed { path: String, reason: String },

    #[error("Invalid vector dimension for '{path}': expected {expected}, got {actual}")]
    InvalidDimension {
        path: String,
        expected: usize,
        actual: usize,
    },

    #[error("Empty feature vector for '{0}'")]
    EmptyVector(String),

    #[error("Unsupported schema_version {found} in {path} (expected {expected})")]
    UnsupportedSchema {
        path: String,
        found: u32,
        expected: u32,
    },
}
