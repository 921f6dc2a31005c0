use crate::extractor::ExtractError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Feature store error: {0}")]
    FeatureStoreError(#[from] pipod_feature_store::FeatureStoreError),

    #[error("Reducer error: {0}")]
    ReducerError(#[from] pipod_reducer::ReducerError),

    #[error("Feature extractor unavailable: {0}")]
    ExtractorUnavailable(#[source] ExtractError),

    #[error(
        "Raw store was produced by extractor '{store}' but '{configured}' is configured; \
         refusing to mix vector spaces"
    )]
    ExtractorMismatch { store: String, configured: String },

    #[error("Failed to walk {path}: {reason}")]
    Walk { path: String, reason: String },

    #[error("Invalid media path: {0}")]
    InvalidPath(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}
