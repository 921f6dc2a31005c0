//! # Pi Pod Reducer
//!
//! Corpus-wide dimensionality reduction for the compressed library.
//!
//! ```text
//! raw store (N x D)
//!     │
//!     ├──> standardize columns (mean 0, std 1; constant columns scale by 1)
//!     │
//!     ├──> PCA: leading k = min(K_max, N) eigenvectors (Jacobi, deterministic signs)
//!     │
//!     └──> scores rounded to 4 decimals for library.json
//! ```
//!
//! The projection basis is a function of the whole corpus, so every run refits from scratch.

mod corpus;
mod eigen;
mod error;
mod reducer;
mod standardize;

pub use corpus::Corpus;
pub use eigen::symmetric_eigen;
pub use error::{ReducerError, Result};
pub use reducer::{
    CorpusReducer, Reduction, ReducerConfig, DEFAULT_MAX_COMPONENTS, DEFAULT_PRECISION,
};
pub use standardize::{standardize, ColumnStats};
