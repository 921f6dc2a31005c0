use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReducerError>;

#[derive(Error, Debug)]
pub enum ReducerError {
    #[error("Corpus is empty")]
    EmptyCorpus,

    #[error("Inconsistent vector dimension for '{path}': expected {expected}, got {actual}")]
    InvalidDimension {
        path: String,
        expected: usize,
        actual: usize,
    },

    #[error("Non-finite value in vector for '{0}'")]
    NonFinite(String),

    #[error("Invalid reducer configuration: {0}")]
    InvalidConfig(String),
}
