use ndarray::{Array1, Array2, Axis};

/// Per-dimension weights `sqrt(var_d / Σvar)` over the rows of `vectors`.
///
/// Returns all-ones when the corpus has no variance at all, so weighting degrades to the plain
/// metric.
#[must_use]
pub fn variance_weights(vectors: &Array2<f64>) -> Array1<f64> {
    let n = vectors.nrows().max(1) as f64;
    let mean = vectors.sum_axis(Axis(0)) / n;
    let centered = vectors - &mean;
    let variance = centered.mapv(|v| v * v).sum_axis(Axis(0)) / n;
    let total = variance.sum();
    if total <= 0.0 {
        return Array1::ones(vectors.ncols());
    }
    variance.mapv(|var| (var / total).sqrt())
}

/// Column-scaled copy of `vectors`. The input is left untouched.
#[must_use]
pub fn apply_weights(vectors: &Array2<f64>, weights: &Array1<f64>) -> Array2<f64> {
    vectors * weights
}
