use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimilarityError>;

#[derive(Error, Debug)]
pub enum SimilarityError {
    #[error("Index is empty")]
    EmptyIndex,

    #[error("No match found for anchor '{0}'")]
    NoMatch(String),

    #[error("Anchor index {index} out of range for {len} items")]
    AnchorOutOfRange { index: usize, len: usize },

    #[error("Inconsistent vector dimension for '{path}': expected {expected}, got {actual}")]
    InvalidDimension {
        path: String,
        expected: usize,
        actual: usize,
    },
}
