use crate::anchor::resolve_anchor;
use crate::distance::{distance_matrix, distance_row, normalize_rows};
use crate::error::{Result, SimilarityError};
use crate::ranking::rank_row;
use crate::weighting::{apply_weights, variance_weights};
use ndarray::{Array1, Array2};
use pipod_feature_store::{key_basename, VectorMap};
use rand::Rng;
use serde::Serialize;

/// In-memory view over one vector space (raw or compressed) for similarity queries.
///
/// Vectors are copied in at full precision; nothing here writes back to a store.
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    keys: Vec<String>,
    vectors: Array2<f64>,
    weights: Option<Array1<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Neighbor {
    pub index: usize,
    pub path: String,
    pub name: String,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking {
    pub anchor: usize,
    pub anchor_path: String,
    pub weighted: bool,
    pub nearest: Vec<Neighbor>,
    pub furthest: Vec<Neighbor>,
}

impl SimilarityIndex {
    pub fn from_entries<'a, I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a [f32])>,
    {
        let mut keys = Vec::new();
        let mut values = Vec::new();
        let mut dim = None;
        for (key, vector) in entries {
            let expected = *dim.get_or_insert(vector.len());
            if vector.len() != expected {
                return Err(SimilarityError::InvalidDimension {
                    path: key.to_string(),
                    expected,
                    actual: vector.len(),
                });
            }
            keys.push(key.to_string());
            values.extend(vector.iter().map(|&v| f64::from(v)));
        }
        let Some(dim) = dim else {
            return Err(SimilarityError::EmptyIndex);
        };
        let vectors = Array2::from_shape_vec((keys.len(), dim), values).map_err(|_| {
            SimilarityError::InvalidDimension {
                path: String::new(),
                expected: dim,
                actual: 0,
            }
        })?;
        Ok(Self {
            keys,
            vectors,
            weights: None,
        })
    }

    pub fn from_map(map: &VectorMap) -> Result<Self> {
        Self::from_entries(map.iter())
    }

    /// Scale each dimension by `sqrt(var_d / Σvar)` before measuring distances.
    #[must_use]
    pub fn with_variance_weighting(mut self) -> Self {
        self.weights = Some(variance_weights(&self.vectors));
        self
    }

    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.keys
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
        self.vectors.ncols()
    }

    #[must_use]
    pub const fn is_weighted(&self) -> bool {
        self.weights.is_some()
    }

    fn metric_space(&self) -> Array2<f64> {
        let space = match &self.weights {
            Some(weights) => apply_weights(&self.vectors, weights),
            None => self.vectors.clone(),
        };
        normalize_rows(&space)
    }

    /// Pairwise N×N cosine distances under the current metric.
    #[must_use]
    pub fn distance_matrix(&self) -> Array2<f64> {
        distance_matrix(&self.metric_space())
    }

    pub fn resolve_anchor<R: Rng + ?Sized>(&self, query: Option<&str>, rng: &mut R) -> Result<usize> {
        resolve_anchor(&self.keys, query, rng)
    }

    /// Nearest/furthest `k` rows for `anchor`.
    pub fn rank(&self, anchor: usize, k: usize) -> Result<Ranking> {
        if anchor >= self.len() {
            return Err(SimilarityError::AnchorOutOfRange {
                index: anchor,
                len: self.len(),
            });
        }
        let distances = distance_row(&self.metric_space(), anchor);
        let ranked = rank_row(&distances, anchor, k);
        let neighbor = |index: usize| Neighbor {
            index,
            path: self.keys[index].clone(),
            name: key_basename(&self.keys[index]).to_string(),
            distance: distances[index],
        };
        Ok(Ranking {
            anchor,
            anchor_path: self.keys[anchor].clone(),
            weighted: self.is_weighted(),
            nearest: ranked.nearest.into_iter().map(neighbor).collect(),
            furthest: ranked.furthest.into_iter().map(neighbor).collect(),
        })
    }

    /// Resolve the anchor from `query` and rank around it.
    pub fn query<R: Rng + ?Sized>(
        &self,
        query: Option<&str>,
        k: usize,
        rng: &mut R,
    ) -> Result<Ranking> {
        let anchor = self.resolve_anchor(query, rng)?;
        log::info!("Anchor: {}", self.keys[anchor]);
        self.rank(anchor, k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn index(rows: &[(&str, Vec<f32>)]) -> SimilarityIndex {
        SimilarityIndex::from_entries(rows.iter().map(|(k, v)| (*k, v.as_slice()))).unwrap()
    }

    #[test]
    fn rejects_ragged_and_empty_input() {
        let ragged = [("a", vec![1.0, 2.0]), ("b", vec![1.0])];
        assert!(SimilarityIndex::from_entries(ragged.iter().map(|(k, v)| (*k, v.as_slice()))).is_err());
        assert!(matches!(
            SimilarityIndex::from_map(&VectorMap::new()),
            Err(SimilarityError::EmptyIndex)
        ));
    }

    #[test]
    fn anchor_never_ranks_itself() {
        let idx = index(&[
            ("a.mp3", vec![1.0, 0.0]),
            ("a-copy.mp3", vec![1.0, 0.0]),
            ("b.mp3", vec![0.0, 1.0]),
        ]);
        let ranking = idx.rank(0, 5).unwrap();
        assert!(ranking.nearest.iter().all(|n| n.index != 0));
        assert!(ranking.furthest.iter().all(|n| n.index != 0));
        assert_eq!(ranking.nearest[0].path, "a-copy.mp3");
        assert!(ranking.nearest[0].distance.abs() < 1e-12);
    }

    #[test]
    fn out_of_range_anchor_is_an_error() {
        let idx = index(&[("a.mp3", vec![1.0])]);
        assert!(matches!(
            idx.rank(3, 1),
            Err(SimilarityError::AnchorOutOfRange { index: 3, len: 1 })
        ));
    }

    #[test]
    fn query_by_name() {
        let idx = index(&[
            ("x/first.mp3", vec![1.0, 0.1]),
            ("x/Second Song.mp3", vec![0.1, 1.0]),
        ]);
        let mut rng = StdRng::seed_from_u64(3);
        let ranking = idx.query(Some("second"), 5, &mut rng).unwrap();
        assert_eq!(ranking.anchor, 1);
        assert_eq!(ranking.nearest[0].name, "first.mp3");
    }
}
