use pipod_similarity::{SimilarityIndex, DEFAULT_NEIGHBORS};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

fn corpus(n: usize, dim: usize) -> Vec<(String, Vec<f32>)> {
    // Deterministic, non-uniform spread per dimension.
    (0..n)
        .map(|i| {
            let vector = (0..dim)
                .map(|d| {
                    let phase = (i * 7 + d * 3) as f32;
                    phase.sin() * (d as f32 + 1.0) + (i as f32) * 0.05
                })
                .collect();
            (format!("Album/track{i:02}.mp3"), vector)
        })
        .collect()
}

fn index_of(rows: &[(String, Vec<f32>)]) -> SimilarityIndex {
    SimilarityIndex::from_entries(rows.iter().map(|(k, v)| (k.as_str(), v.as_slice())))
        .expect("index")
}

#[test]
fn self_distance_is_zero_and_matrix_is_symmetric() {
    let index = index_of(&corpus(9, 6));
    let matrix = index.distance_matrix();
    for i in 0..index.len() {
        assert_eq!(matrix[[i, i]], 0.0);
        for j in 0..index.len() {
            assert_eq!(matrix[[i, j]], matrix[[j, i]]);
            assert!((0.0..=2.0).contains(&matrix[[i, j]]));
        }
    }
}

#[test]
fn nearest_and_furthest_are_disjoint_for_large_corpora() {
    let k = DEFAULT_NEIGHBORS;
    let index = index_of(&corpus(2 * k + 3, 8));
    for anchor in 0..index.len() {
        let ranking = index.rank(anchor, k).expect("rank");
        let nearest: HashSet<usize> = ranking.nearest.iter().map(|n| n.index).collect();
        let furthest: HashSet<usize> = ranking.furthest.iter().map(|n| n.index).collect();

        assert_eq!(nearest.len(), k);
        assert_eq!(furthest.len(), k);
        assert!(nearest.is_disjoint(&furthest), "anchor {anchor}");
        assert!(!nearest.contains(&anchor));
        assert!(!furthest.contains(&anchor));

        assert!(ranking
            .nearest
            .windows(2)
            .all(|w| w[0].distance <= w[1].distance));
        assert!(ranking
            .furthest
            .windows(2)
            .all(|w| w[0].distance >= w[1].distance));
    }
}

#[test]
fn empty_query_resolves_to_a_valid_anchor() {
    let index = index_of(&corpus(6, 4));
    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let anchor = index.resolve_anchor(None, &mut rng).expect("anchor");
        assert!(anchor < index.len());
    }
}

#[test]
fn variance_weighting_changes_the_metric_not_the_vectors() {
    let rows = vec![
        ("a.mp3".to_string(), vec![1.0_f32, 10.0, 0.1]),
        ("b.mp3".to_string(), vec![1.1, -8.0, 0.2]),
        ("c.mp3".to_string(), vec![0.9, 3.0, 0.1]),
        ("d.mp3".to_string(), vec![1.0, -2.0, 0.3]),
    ];
    let plain = index_of(&rows);
    let weighted = index_of(&rows).with_variance_weighting();

    let a = plain.distance_matrix();
    let b = weighted.distance_matrix();
    let changed = a
        .iter()
        .zip(b.iter())
        .any(|(x, y)| (x - y).abs() > 1e-9);
    assert!(changed, "weighting should move at least one distance");
    assert!(weighted.is_weighted());

    // Source rows are untouched.
    assert_eq!(rows[0].1, vec![1.0_f32, 10.0, 0.1]);
}
