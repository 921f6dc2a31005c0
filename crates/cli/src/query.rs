use crate::{QueryArgs, Space};
use anyhow::{Context as AnyhowContext, Result};
use pipod_feature_store::{CompressedLibrary, RawFeatureStore, VectorMap};
use pipod_indexer::Session;
use pipod_reducer::{Corpus, CorpusReducer};
use pipod_similarity::{Ranking, SimilarityIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Serialize)]
struct QueryOutput<'a> {
    space: &'a str,
    #[serde(flatten)]
    ranking: &'a Ranking,
}

#[derive(Serialize)]
struct ProjectionPoint<'a> {
    path: &'a str,
    x: f64,
    y: f64,
    role: &'static str,
}

#[derive(Serialize)]
struct Projection<'a> {
    space: &'a str,
    anchor: &'a str,
    points: Vec<ProjectionPoint<'a>>,
}

pub async fn run_query(session: Session, args: QueryArgs, json: bool) -> Result<()> {
    let vectors = load_space(&session, args.space).await?;
    let mut index = SimilarityIndex::from_map(&vectors)
        .with_context(|| format!("Cannot query the {} space", space_name(args.space)))?;
    if args.weighted {
        index = index.with_variance_weighting();
    }

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let k = args.k.unwrap_or(session.config().neighbors);
    let ranking = index.query(args.anchor.as_deref(), k, &mut rng)?;

    if let Some(out) = &args.projection_out {
        write_projection(out, &vectors, &ranking, args.space).await?;
    }

    if json {
        let output = QueryOutput {
            space: space_name(args.space),
            ranking: &ranking,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_ranking(&ranking);
    }
    Ok(())
}

async fn load_space(session: &Session, space: Space) -> Result<VectorMap> {
    match space {
        Space::Raw => {
            let store = RawFeatureStore::load(session.raw_store_path())
                .await
                .context("Failed to load raw store")?;
            Ok(store.entries().clone())
        }
        Space::Compressed => {
            let path = session.library_path();
            let library = CompressedLibrary::load_if_exists(&path)
                .await
                .context("Failed to load library")?
                .with_context(|| {
                    format!("{} not found; run `pipod process` first", path.display())
                })?;
            Ok(library.entries().clone())
        }
    }
}

const fn space_name(space: Space) -> &'static str {
    match space {
        Space::Raw => "raw",
        Space::Compressed => "compressed",
    }
}

fn print_ranking(ranking: &Ranking) {
    let weighting = if ranking.weighted { " (variance weighted)" } else { "" };
    println!("Anchor: {}{weighting}", ranking.anchor_path);
    println!();
    println!("Nearest:");
    for (i, neighbor) in ranking.nearest.iter().enumerate() {
        println!("  {}. {} ({:.4})", i + 1, neighbor.path, neighbor.distance);
    }
    println!();
    println!("Furthest:");
    for (i, neighbor) in ranking.furthest.iter().enumerate() {
        println!("  {}. {} ({:.4})", i + 1, neighbor.path, neighbor.distance);
    }
}

/// Two-component projection of the queried space, tagged with each point's role.
async fn write_projection(
    out: &Path,
    vectors: &VectorMap,
    ranking: &Ranking,
    space: Space,
) -> Result<()> {
    let corpus = Corpus::from_entries(vectors.iter())?;
    let reduction = CorpusReducer::default().project_2d(&corpus)?;

    let mut roles: HashMap<usize, &'static str> = HashMap::new();
    roles.insert(ranking.anchor, "anchor");
    for neighbor in &ranking.nearest {
        roles.insert(neighbor.index, "nearest");
    }
    for neighbor in &ranking.furthest {
        roles.insert(neighbor.index, "furthest");
    }

    let scores = reduction.scores();
    let points = reduction
        .keys()
        .iter()
        .enumerate()
        .map(|(i, path)| ProjectionPoint {
            path,
            x: scores[[i, 0]],
            y: if scores.ncols() > 1 { scores[[i, 1]] } else { 0.0 },
            role: roles.get(&i).copied().unwrap_or("other"),
        })
        .collect();
    let projection = Projection {
        space: space_name(space),
        anchor: &ranking.anchor_path,
        points,
    };

    tokio::fs::write(out, serde_json::to_vec_pretty(&projection)?)
        .await
        .with_context(|| format!("Failed to write projection to {}", out.display()))?;
    log::info!("Wrote 2-D projection to {}", out.display());
    Ok(())
}
