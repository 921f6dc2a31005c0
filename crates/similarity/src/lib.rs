//! # Pi Pod Similarity
//!
//! Nearest/furthest ranking over a vector space taken from either store.
//!
//! ```text
//! vectors (N x d) ──> [variance weights] ──> unit rows ──> cosine distance row
//!                                                              │
//!                                  anchor (name match | random)┘──> nearest-K / furthest-K
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use pipod_feature_store::CompressedLibrary;
//! use pipod_similarity::SimilarityIndex;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let library = CompressedLibrary::load("music/library.json").await?;
//!     let index = SimilarityIndex::from_map(library.entries())?.with_variance_weighting();
//!     let ranking = index.query(Some("blackbird"), 5, &mut rand::thread_rng())?;
//!     for neighbor in &ranking.nearest {
//!         println!("{:.4}  {}", neighbor.distance, neighbor.name);
//!     }
//!     Ok(())
//! }
//! ```

mod anchor;
mod distance;
mod error;
mod index;
mod ranking;
mod weighting;

pub use anchor::resolve_anchor;
pub use distance::cosine_distance;
pub use error::{Result, SimilarityError};
pub use index::{Neighbor, Ranking, SimilarityIndex};
pub use ranking::{rank_row, RankedIndices, DEFAULT_NEIGHBORS};
pub use weighting::variance_weights;
