use crate::error::{ReducerError, Result};
use ndarray::Array2;
use pipod_feature_store::RawFeatureStore;

/// A frozen, ordered snapshot of the raw store: row `i` belongs to `keys[i]`.
///
/// Row order is the store's insertion order and is what downstream tie-breaks refer to.
#[derive(Debug, Clone)]
pub struct Corpus {
    keys: Vec<String>,
    matrix: Array2<f64>,
}

impl Corpus {
    pub fn from_store(store: &RawFeatureStore) -> Result<Self> {
        Self::from_entries(store.iter())
    }

    pub fn from_entries<'a, I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a [f32])>,
    {
        let mut keys = Vec::new();
        let mut values = Vec::new();
        let mut dim = None;

        for (key, vector) in entries {
            let expected = *dim.get_or_insert(vector.len());
            if vector.is_empty() || vector.len() != expected {
                return Err(ReducerError::InvalidDimension {
                    path: key.to_string(),
                    expected,
                    actual: vector.len(),
                });
            }
            if vector.iter().any(|value| !value.is_finite()) {
                return Err(ReducerError::NonFinite(key.to_string()));
            }
            keys.push(key.to_string());
            values.extend(vector.iter().map(|&value| f64::from(value)));
        }

        let Some(dim) = dim else {
            return Err(ReducerError::EmptyCorpus);
        };
        let matrix = Array2::from_shape_vec((keys.len(), dim), values)
            .map_err(|err| ReducerError::InvalidConfig(err.to_string()))?;
        Ok(Self { keys, matrix })
    }

    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// N×D matrix of raw values.
    #[must_use]
    pub const fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[must_use]
    pub fn dim(&self) -> usize {
        self.matrix.ncols()
    }
}
