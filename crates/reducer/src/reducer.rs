use crate::corpus::Corpus;
use crate::eigen::symmetric_eigen;
use crate::error::{ReducerError, Result};
use crate::standardize::standardize;
use ndarray::{s, Array2, Axis};
use pipod_feature_store::VectorMap;

pub const DEFAULT_MAX_COMPONENTS: usize = 5;
pub const DEFAULT_PRECISION: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReducerConfig {
    /// Ceiling on output components (`K_max`).
    pub max_components: usize,
    /// Decimal digits kept in the persisted library.
    pub precision: u32,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            max_components: DEFAULT_MAX_COMPONENTS,
            precision: DEFAULT_PRECISION,
        }
    }
}

/// Standardize-then-PCA over a whole corpus. Holds no state between runs.
#[derive(Debug, Clone, Default)]
pub struct CorpusReducer {
    config: ReducerConfig,
}

/// Full-precision output of one reduction.
#[derive(Debug, Clone)]
pub struct Reduction {
    keys: Vec<String>,
    scores: Array2<f64>,
    explained_variance_ratio: Vec<f64>,
}

impl CorpusReducer {
    pub fn new(config: ReducerConfig) -> Result<Self> {
        if config.max_components == 0 {
            return Err(ReducerError::InvalidConfig(
                "max_components must be at least 1".to_string(),
            ));
        }
        Ok(Self { config })
    }

    #[must_use]
    pub const fn config(&self) -> ReducerConfig {
        self.config
    }

    /// Output width for a corpus of `n` vectors of dimension `dim`.
    #[must_use]
    pub fn components_for(&self, n: usize, dim: usize) -> usize {
        self.config.max_components.min(n).min(dim)
    }

    /// Refit the projection on the entire corpus and project every row.
    pub fn reduce(&self, corpus: &Corpus) -> Result<Reduction> {
        let k = self.components_for(corpus.len(), corpus.dim());
        let reduction = project(corpus, k)?;
        log::info!(
            "Compressed {} raw dimensions -> {} components over {} items (explained variance {:.2}%)",
            corpus.dim(),
            reduction.components(),
            corpus.len(),
            reduction.explained_variance() * 100.0
        );
        Ok(reduction)
    }

    /// Two-component projection for plotting. Not rounded.
    pub fn project_2d(&self, corpus: &Corpus) -> Result<Reduction> {
        project(corpus, 2.min(corpus.len()).min(corpus.dim()))
    }

    /// Rounded vectors in corpus order, ready for the library file.
    #[must_use]
    pub fn to_library_entries(&self, reduction: &Reduction) -> VectorMap {
        reduction.rounded(self.config.precision)
    }
}

fn project(corpus: &Corpus, k: usize) -> Result<Reduction> {
    if corpus.is_empty() {
        return Err(ReducerError::EmptyCorpus);
    }
    let x = standardize(corpus.matrix());
    let (n, dim) = x.dim();

    // Decompose whichever of XᵀX (D×D) or XXᵀ (N×N) is smaller; both yield the same scores.
    let (eigenvalues, mut scores) = if dim <= n {
        let covariance = x.t().dot(&x);
        let (values, vectors) = symmetric_eigen(&covariance);
        let basis = vectors.slice(s![.., ..k]).to_owned();
        (values, x.dot(&basis))
    } else {
        let gram = x.dot(&x.t());
        let (values, vectors) = symmetric_eigen(&gram);
        let mut scores = vectors.slice(s![.., ..k]).to_owned();
        for (j, mut column) in scores.axis_iter_mut(Axis(1)).enumerate() {
            column *= values[j].max(0.0).sqrt();
        }
        (values, scores)
    };

    orient_components(&mut scores);

    let total: f64 = eigenvalues.iter().map(|v| v.max(0.0)).sum();
    let explained_variance_ratio = eigenvalues
        .iter()
        .take(k)
        .map(|v| if total > 0.0 { v.max(0.0) / total } else { 0.0 })
        .collect();

    Ok(Reduction {
        keys: corpus.keys().to_vec(),
        scores,
        explained_variance_ratio,
    })
}

/// Flip each component so its largest-magnitude score is positive.
fn orient_components(scores: &mut Array2<f64>) {
    for mut column in scores.axis_iter_mut(Axis(1)) {
        let mut pivot = 0.0_f64;
        for &value in column.iter() {
            if value.abs() > pivot.abs() {
                pivot = value;
            }
        }
        if pivot < 0.0 {
            column.mapv_inplace(|v| -v);
        }
    }
}

impl Reduction {
    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// N×k full-precision scores.
    #[must_use]
    pub const fn scores(&self) -> &Array2<f64> {
        &self.scores
    }

    #[must_use]
    pub fn components(&self) -> usize {
        self.scores.ncols()
    }

    #[must_use]
    pub fn explained_variance_ratio(&self) -> &[f64] {
        &self.explained_variance_ratio
    }

    /// Share of total variance kept by all components.
    #[must_use]
    pub fn explained_variance(&self) -> f64 {
        self.explained_variance_ratio.iter().sum()
    }

    /// Scores rounded to `digits` decimals, keyed by path in corpus order.
    #[must_use]
    pub fn rounded(&self, digits: u32) -> VectorMap {
        self.keys
            .iter()
            .zip(self.scores.rows())
            .map(|(key, row)| {
                let vector: Vec<f32> = row.iter().map(|&v| round_to(v, digits) as f32).collect();
                (key.clone(), vector)
            })
            .collect()
    }
}

fn round_to(value: f64, digits: u32) -> f64 {
    let scale = 10_f64.powi(digits as i32);
    // `+ 0.0` folds negative zero so identical corpora serialize identically.
    (value * scale).round() / scale + 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn corpus(rows: &[Vec<f32>]) -> Corpus {
        let keys: Vec<String> = (0..rows.len()).map(|i| format!("track{i}.mp3")).collect();
        Corpus::from_entries(keys.iter().map(String::as_str).zip(rows.iter().map(Vec::as_slice)))
            .unwrap()
    }

    fn sample_rows() -> Vec<Vec<f32>> {
        vec![
            vec![120.0, 1.0, 0.3, 5.0, 0.0, 2.0, 9.0, 1.5],
            vec![95.0, 2.0, 0.1, 4.0, 1.0, 2.5, 7.0, 0.5],
            vec![140.0, 0.5, 0.9, 6.5, 0.2, 1.0, 8.0, 2.5],
            vec![100.0, 3.0, 0.4, 3.0, 0.7, 3.5, 6.0, 1.0],
            vec![128.0, 1.5, 0.6, 5.5, 0.4, 2.2, 9.5, 2.0],
            vec![88.0, 2.5, 0.2, 2.5, 0.9, 3.0, 5.5, 0.2],
        ]
    }

    #[test]
    fn output_width_is_min_of_ceiling_and_corpus() {
        let reducer = CorpusReducer::default();
        let reduction = reducer.reduce(&corpus(&sample_rows())).unwrap();
        assert_eq!(reduction.components(), 5);

        let small = corpus(&sample_rows()[..3]);
        assert_eq!(reducer.reduce(&small).unwrap().components(), 3);
    }

    #[test]
    fn reduction_is_deterministic() {
        let reducer = CorpusReducer::default();
        let a = reducer.to_library_entries(&reducer.reduce(&corpus(&sample_rows())).unwrap());
        let b = reducer.to_library_entries(&reducer.reduce(&corpus(&sample_rows())).unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn components_are_ordered_and_uncorrelated() {
        let reduction = CorpusReducer::default()
            .reduce(&corpus(&sample_rows()))
            .unwrap();
        let ratio = reduction.explained_variance_ratio();
        assert!((1..ratio.len()).all(|i| ratio[i - 1] >= ratio[i] - 1e-12));
        assert!(reduction.explained_variance() <= 1.0 + 1e-9);

        let scores = reduction.scores();
        let cross = scores.t().dot(scores);
        for i in 0..cross.nrows() {
            for j in 0..cross.ncols() {
                if i != j {
                    assert!(cross[[i, j]].abs() < 1e-6, "components {i},{j} correlate");
                }
            }
        }
    }

    #[test]
    fn covariance_and_gram_paths_agree() {
        // 3 rows x 4 columns takes the Gram path; check it against a direct covariance basis.
        let rows = vec![
            vec![1.0, 2.0, 0.0, 4.0],
            vec![2.0, 1.0, 1.0, 3.0],
            vec![0.0, 0.0, 3.0, 1.0],
        ];
        let c = corpus(&rows);
        let via_gram = project(&c, 2).unwrap();

        let x = standardize(c.matrix());
        let (_, vectors) = symmetric_eigen(&x.t().dot(&x));
        let mut direct = x.dot(&vectors.slice(s![.., ..2]));
        orient_components(&mut direct);

        for (a, b) in via_gram.scores().iter().zip(direct.iter()) {
            assert!((a - b).abs() < 1e-8, "{a} vs {b}");
        }
    }

    #[test]
    fn rounding_keeps_four_decimals() {
        assert_eq!(round_to(0.123_456, 4), 0.1235);
        assert_eq!(round_to(-0.000_01, 4).to_bits(), 0.0_f64.to_bits());
    }

    #[test]
    fn rejects_zero_ceiling() {
        assert!(CorpusReducer::new(ReducerConfig {
            max_components: 0,
            precision: 4
        })
        .is_err());
    }
}
