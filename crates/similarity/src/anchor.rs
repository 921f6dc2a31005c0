use crate::error::{Result, SimilarityError};
use pipod_feature_store::key_basename;
use rand::Rng;

/// Pick the anchor row.
///
/// With a non-blank query: the first key (in corpus order) whose basename contains the query,
/// case-insensitively. Surrounding whitespace is part of the query. Without one: a uniformly
/// random row.
pub fn resolve_anchor<R: Rng + ?Sized>(
    keys: &[String],
    query: Option<&str>,
    rng: &mut R,
) -> Result<usize> {
    if keys.is_empty() {
        return Err(SimilarityError::EmptyIndex);
    }

    let Some(query) = query.filter(|q| !q.trim().is_empty()) else {
        let index = rng.gen_range(0..keys.len());
        log::debug!("No anchor query; picked random index {index}");
        return Ok(index);
    };

    let needle = query.to_lowercase();
    keys.iter()
        .position(|key| key_basename(key).to_lowercase().contains(&needle))
        .ok_or_else(|| SimilarityError::NoMatch(query.to_string()))
}
