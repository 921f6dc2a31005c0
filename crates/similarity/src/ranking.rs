use ndarray::Array1;
use std::cmp::Ordering;

pub const DEFAULT_NEIGHBORS: usize = 5;

/// Nearest and furthest row indices for one distance row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedIndices {
    pub nearest: Vec<usize>,
    pub furthest: Vec<usize>,
}

/// Rank every row except `anchor` by its distance.
///
/// `nearest` ascends, `furthest` descends; equal distances keep corpus order. When there are
/// more than `2k` candidates the furthest set is drawn from rows outside `nearest`, so the two
/// never overlap.
#[must_use]
pub fn rank_row(distances: &Array1<f64>, anchor: usize, k: usize) -> RankedIndices {
    let mut candidates: Vec<usize> = (0..distances.len()).filter(|&i| i != anchor).collect();
    let k = k.min(candidates.len());

    // Stable sort: ties stay in index order.
    candidates.sort_by(|&a, &b| cmp_distance(distances[a], distances[b]));
    let nearest = candidates[..k].to_vec();

    let mut pool = if candidates.len() > 2 * k {
        candidates[k..].to_vec()
    } else {
        candidates
    };
    pool.sort_by(|&a, &b| cmp_distance(distances[b], distances[a]));
    pool.truncate(k);

    RankedIndices {
        nearest,
        furthest: pool,
    }
}

fn cmp_distance(a: f64, b: f64) -> Ordering {
    a.total_cmp(&b)
}
