//! # Pi Pod Feature Store
//!
//! Persisted vector stores for a media library.
//!
//! ## Artifacts
//!
//! ```text
//! <media root>/
//!     ├── raw_features.json   path -> raw feature vector (extractor output, fixed dim)
//!     └── library.json        { dir, files: path -> compressed vector (k dims) }
//! ```
//!
//! Both files are written atomically (temp file + rename). Both loaders accept the legacy
//! flat `{ path: [f32] }` layout and upgrade it in memory; only the versioned layout is written.
//!
//! ## Example
//!
//! ```no_run
//! use pipod_feature_store::{raw_store_path_for_root, RawFeatureStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let root = std::path::Path::new("./music");
//!     let mut store = RawFeatureStore::load(raw_store_path_for_root(root)).await?;
//!     store.upsert("Artist/song.mp3", vec![0.1, 0.2, 0.3])?;
//!     store.save().await?;
//!     Ok(())
//! }
//! ```

mod atomic;
mod error;
mod library;
mod paths;
mod raw_store;
mod vector_map;

pub use error::{FeatureStoreError, Result};
pub use library::{CompressedLibrary, LIBRARY_SCHEMA_VERSION};
pub use paths::{
    is_pipod_artifact_name, key_basename, library_path_for_root, normalize_key,
    raw_store_path_for_root, CONFIG_FILE_NAME, LIBRARY_FILE_NAME, RAW_STORE_FILE_NAME,
};
pub use raw_store::{RawFeatureStore, RAW_STORE_SCHEMA_VERSION};
pub use vector_map::VectorMap;
