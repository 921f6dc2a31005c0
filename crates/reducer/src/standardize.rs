use ndarray::{Array1, Array2, Axis};

/// Per-column statistics used for standardization.
#[derive(Debug, Clone)]
pub struct ColumnStats {
    pub mean: Array1<f64>,
    /// Population standard deviation; zero-variance columns carry a scale of 1.
    pub scale: Array1<f64>,
}

impl ColumnStats {
    #[must_use]
    pub fn fit(x: &Array2<f64>) -> Self {
        let n = x.nrows().max(1) as f64;
        let mean = x.sum_axis(Axis(0)) / n;
        let centered = x - &mean;
        let variance = centered.mapv(|v| v * v).sum_axis(Axis(0)) / n;
        let scale = variance.mapv(|var| {
            let std = var.sqrt();
            if std > f64::EPSILON {
                std
            } else {
                1.0
            }
        });
        Self { mean, scale }
    }

    #[must_use]
    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.mean) / &self.scale
    }
}

/// Zero-mean, unit-variance columns.
#[must_use]
pub fn standardize(x: &Array2<f64>) -> Array2<f64> {
    ColumnStats::fit(x).transform(x)
}
