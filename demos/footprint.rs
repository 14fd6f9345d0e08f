// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! Builds each structure at its default size, loads a synthetic workload and logs
//! the resulting memory footprint and accuracy.
//!
//! ```text
//! RUST_LOG=footprint=info,approx_index=debug cargo run --example footprint
//! ```

use approx_index::config::{CuckooConfig, LshConfig, MinHashConfig, QuantizerConfig};
use approx_index::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), IndexError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "footprint=info,approx_index=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut rng = StdRng::seed_from_u64(2026);

    // Frequency
    let cms = CountMinSketch::new_default();
    for _ in 0..100_000 {
        // Minimum of two draws skews toward low ids.
        let id = rng.random_range(0..1000u32).min(rng.random_range(0..1000));
        cms.add(format!("user-{}", id));
    }
    let candidates: Vec<String> = (0..50).map(|i| format!("user-{}", i)).collect();
    let hot = cms.heavy_hitters(&candidates, 150);
    tracing::info!(
        width = cms.width(),
        depth = cms.depth(),
        bytes = cms.memory_usage(),
        error_bound = cms.error_bound(),
        heavy_hitters = hot.len(),
        "count-min sketch"
    );

    // Membership
    let filter = CuckooFilter::from_config(&CuckooConfig {
        capacity: 100_000,
        seed: Some(7),
        ..Default::default()
    });
    let failed = (0..100_000).filter(|i| !filter.add(format!("url-{}", i))).count();
    let false_positives = (0..100_000)
        .filter(|i| filter.contains(format!("absent-{}", i)))
        .count();
    let stats = filter.stats();
    tracing::info!(
        bytes = filter.memory_usage(),
        load_factor = stats.load_factor,
        failed,
        false_positive_rate = false_positives as f64 / 100_000.0,
        "cuckoo filter"
    );

    // Vector distance
    let config = QuantizerConfig::default();
    let pq = ProductQuantizer::from_config(&config);
    let vectors: Vec<Vec<f32>> = (0..1000)
        .map(|_| (0..config.dimension).map(|_| rng.random::<f32>()).collect())
        .collect();
    pq.train_with_rng(&vectors, 5, &mut rng)?;
    let database = pq.encode_batch(&vectors)?;
    let nearest = pq.search(&vectors[0], &database, 5)?;
    tracing::info!(
        raw_bytes = vectors.len() * config.dimension * 4,
        coded_bytes = database.len() * pq.num_subvectors(),
        codebook_bytes = pq.memory_usage(),
        compression_ratio = pq.compression_ratio(),
        top_hit = ?nearest.first().map(|(i, _)| *i),
        "product quantizer"
    );

    // Set similarity
    let mh = MinHash::from_config(&MinHashConfig::default());
    let lsh = MinHashLsh::from_config(&LshConfig::default());
    let base: Vec<String> = (0..200).map(|i| format!("shingle-{}", i)).collect();
    for doc in 0..100 {
        let tokens = base.iter().skip(doc).take(100);
        lsh.add(format!("doc-{}", doc), &mh.compute_signature(tokens))?;
    }
    let query = mh.compute_signature(base.iter().take(100));
    let candidates = lsh.query_with_counts(&query)?;
    tracing::info!(
        bands = lsh.bands(),
        rows_per_band = lsh.rows_per_band(),
        predicted_threshold = lsh.predicted_threshold(),
        indexed = lsh.len(),
        candidates = candidates.len(),
        "minhash lsh"
    );

    Ok(())
}
