use ndarray::{Array1, Array2, ArrayView1, Axis};

/// Rows scaled to unit length. Zero rows stay zero, so they sit at distance 1 from everything.
#[must_use]
pub fn normalize_rows(vectors: &Array2<f64>) -> Array2<f64> {
    let mut normalized = vectors.clone();
    for mut row in normalized.axis_iter_mut(Axis(0)) {
        let norm = row.dot(&row).sqrt();
        if norm > 0.0 {
            row /= norm;
        }
    }
    normalized
}

/// `1 - cos(a, b)`, clamped to `[0, 2]`.
#[must_use]
pub fn cosine_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    (1.0 - a.dot(&b) / (norm_a * norm_b)).clamp(0.0, 2.0)
}

/// Distances from row `anchor` of already-normalized vectors; the anchor itself is exactly 0.
#[must_use]
pub fn distance_row(normalized: &Array2<f64>, anchor: usize) -> Array1<f64> {
    let anchor_row = normalized.row(anchor);
    let mut row = normalized.dot(&anchor_row).mapv(|sim| (1.0 - sim).clamp(0.0, 2.0));
    row[anchor] = 0.0;
    row
}

/// Full symmetric N×N cosine-distance matrix with a zero diagonal.
#[must_use]
pub fn distance_matrix(normalized: &Array2<f64>) -> Array2<f64> {
    let mut matrix = normalized
        .dot(&normalized.t())
        .mapv(|sim| (1.0 - sim).clamp(0.0, 2.0));
    for i in 0..matrix.nrows() {
        matrix[[i, i]] = 0.0;
    }
    // Float noise can make (i, j) and (j, i) differ in the last bit.
    for i in 0..matrix.nrows() {
        for j in (i + 1)..matrix.ncols() {
            matrix[[j, i]] = matrix[[i, j]];
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn cosine_distance_ignores_magnitude() {
        let a = array![1.0, 0.0];
        let b = array![10.0, 0.0];
        let c = array![0.0, 3.0];
        let d = array![-2.0, 0.0];
        assert!(cosine_distance(a.view(), b.view()).abs() < 1e-12);
        assert!((cosine_distance(a.view(), c.view()) - 1.0).abs() < 1e-12);
        assert!((cosine_distance(a.view(), d.view()) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn zero_vector_is_unit_distance_except_to_itself() {
        let vectors = array![[0.0, 0.0], [1.0, 1.0]];
        let matrix = distance_matrix(&normalize_rows(&vectors));
        assert_eq!(matrix[[0, 0]], 0.0);
        assert!((matrix[[0, 1]] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn row_matches_matrix() {
        let vectors = array![[1.0, 2.0, 0.5], [0.3, -1.0, 2.0], [4.0, 0.1, 0.0]];
        let normalized = normalize_rows(&vectors);
        let matrix = distance_matrix(&normalized);
        let row = distance_row(&normalized, 1);
        for j in 0..3 {
            assert!((matrix[[1, j]] - row[j]).abs() < 1e-12);
            assert_eq!(matrix[[1, j]], matrix[[j, 1]]);
        }
        assert_eq!(row[1], 0.0);
    }
}
