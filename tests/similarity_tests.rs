// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

use approx_index::config::{LshConfig, MinHashConfig};
use approx_index::{ApproxIndex, IndexError, MinHash, MinHashLsh, StructureKind};
use std::collections::HashMap;

fn tokens(range: std::ops::Range<u32>, prefix: &str) -> Vec<String> {
    range.map(|i| format!("{}{}", prefix, i)).collect()
}

// ============================================================================
// MinHash
// ============================================================================

#[test]
fn test_minhash_identical_sets() {
    let mh = MinHash::new(128);
    let a = mh.compute_signature(["a", "b", "c"]);
    let b = mh.compute_signature(["c", "b", "a", "a"]);
    assert_eq!(mh.estimate_similarity(&a, &b), 1.0);
}

#[test]
fn test_minhash_disjoint_sets() {
    let mh = MinHash::new(128);
    let a = mh.compute_signature(tokens(0..50, "left-"));
    let b = mh.compute_signature(tokens(0..50, "right-"));
    assert!(mh.estimate_similarity(&a, &b) < 0.05);
}

#[test]
fn test_minhash_estimates_half_overlap() {
    // |A ∩ B| = 20, |A ∪ B| = 40.
    let a = tokens(0..30, "t");
    let b = tokens(10..40, "t");

    let mut sum = 0.0;
    for seed in 0..8 {
        let mh = MinHash::with_seed(128, seed);
        let sim = mh.estimate_similarity(&mh.compute_signature(&a), &mh.compute_signature(&b));
        assert!((sim - 0.5).abs() < 0.2, "seed {} estimated {}", seed, sim);
        sum += sim;
    }
    assert!((sum / 8.0 - 0.5).abs() < 0.15);
}

#[test]
fn test_minhash_text_signatures() {
    let mh = MinHash::default();
    assert_eq!(mh.num_hashes(), 128);
    let a = mh.compute_signature_from_text("The quick brown fox");
    let b = mh.compute_signature_from_text("the QUICK, brown fox!");
    assert_eq!(a, b);
}

#[test]
fn test_minhash_length_mismatch() {
    let short = MinHash::new(64);
    let long = MinHash::new(128);
    let a = short.compute_signature(["x"]);
    let b = long.compute_signature(["x"]);

    assert_eq!(long.estimate_similarity(&a, &b), 0.0);
    assert_eq!(
        long.try_estimate_similarity(&a, &b),
        Err(IndexError::IncompatibleSignature {
            expected: 64,
            actual: 128,
        })
    );
}

#[test]
fn test_minhash_seed_mismatch() {
    let a = MinHash::with_seed(32, 1).compute_signature(["x"]);
    let b = MinHash::with_seed(32, 2).compute_signature(["x"]);
    assert_eq!(a.try_jaccard(&b), Err(IndexError::SeedMismatch));
}

#[test]
fn test_minhash_zero_hashes() {
    let mh = MinHash::new(0);
    let a = mh.compute_signature(["x"]);
    assert!(a.is_empty());
    assert_eq!(mh.estimate_similarity(&a, &a), 0.0);
}

#[test]
fn test_signature_merge_is_union() {
    let mh = MinHash::new(64);
    let a = mh.compute_signature(["a", "b"]);
    let b = mh.compute_signature(["c"]);
    let union = mh.compute_signature(["a", "b", "c"]);
    assert_eq!(a.merge(&b).unwrap(), union);

    let other = MinHash::new(32).compute_signature(["a"]);
    assert!(a.merge(&other).is_err());
}

#[test]
fn test_find_similar() {
    let mh = MinHash::from_config(&MinHashConfig {
        num_hashes: 128,
        seed: 7,
    });
    let mut docs = HashMap::new();
    docs.insert("same", mh.compute_signature(tokens(0..20, "w")));
    docs.insert("close", mh.compute_signature(tokens(2..20, "w")));
    docs.insert("far", mh.compute_signature(tokens(100..120, "w")));

    let query = mh.compute_signature(tokens(0..20, "w"));
    let hits = mh.find_similar(&query, &docs, 0.6);

    let ids: Vec<&str> = hits.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, vec!["same", "close"]);
    assert_eq!(hits[0].1, 1.0);
}

#[test]
fn test_seeds_are_reproducible() {
    let a = MinHash::with_seed(16, 99);
    let b = MinHash::with_seed(16, 99);
    assert_eq!(a.seeds(), b.seeds());
    assert_eq!(a, b);
}

// ============================================================================
// LSH
// ============================================================================

#[test]
fn test_lsh_band_split() {
    let lsh = MinHashLsh::new(0.5, 128);
    assert_eq!(lsh.bands(), 32);
    assert_eq!(lsh.rows_per_band(), 4);
    assert_eq!(lsh.num_hashes(), 128);
    assert!((lsh.predicted_threshold() - 0.42).abs() < 0.01);

    let lsh = MinHashLsh::from_config(&LshConfig {
        threshold: 0.8,
        num_hashes: 100,
    });
    assert_eq!(lsh.bands() * lsh.rows_per_band(), 100);
}

#[test]
fn test_lsh_invalid_threshold_falls_back() {
    let lsh = MinHashLsh::new(1.5, 64);
    assert_eq!(lsh.bands(), 64);
    assert_eq!(lsh.rows_per_band(), 1);

    let lsh = MinHashLsh::new(0.5, 0);
    assert_eq!(lsh.num_hashes(), 1);
}

#[test]
fn test_lsh_finds_similar_sets() {
    let lsh = MinHashLsh::new(0.5, 128);
    let mut hits = 0;

    // Jaccard 40 / 60 ≈ 0.67, well above the split's threshold.
    for trial in 0..50u64 {
        let mh = MinHash::with_seed(128, trial);
        let base = tokens(0..50, "s");
        let near = tokens(10..60, "s");

        lsh.clear();
        lsh.add("base", &mh.compute_signature(&base)).unwrap();
        let found = lsh.query(&mh.compute_signature(&near)).unwrap();
        if found.iter().any(|id| id == "base") {
            hits += 1;
        }
    }
    assert!(hits >= 40, "only {} of 50 recalled", hits);
}

#[test]
fn test_lsh_rarely_matches_dissimilar_sets() {
    let mh = MinHash::new(128);
    let lsh = MinHashLsh::new(0.8, 128);
    for i in 0..20u32 {
        let doc = tokens(i * 100..i * 100 + 30, "d");
        lsh.add(format!("doc-{}", i), &mh.compute_signature(&doc))
            .unwrap();
    }
    let query = mh.compute_signature(tokens(10_000..10_030, "d"));
    assert!(lsh.query(&query).unwrap().len() <= 2);
}

#[test]
fn test_lsh_ranks_by_band_hits() {
    let mh = MinHash::new(128);
    let lsh = MinHashLsh::new(0.5, 128);
    let exact = tokens(0..40, "r");
    let partial = tokens(5..45, "r");

    lsh.add("partial", &mh.compute_signature(&partial)).unwrap();
    lsh.add("exact", &mh.compute_signature(&exact)).unwrap();

    let ranked = lsh.query_with_counts(&mh.compute_signature(&exact)).unwrap();
    assert_eq!(ranked[0], ("exact".to_string(), 32));
    assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));
    assert_eq!(lsh.query(&mh.compute_signature(&exact)).unwrap()[0], "exact");
}

#[test]
fn test_lsh_remove() {
    let mh = MinHash::new(128);
    let lsh = MinHashLsh::new(0.5, 128);
    let sig = mh.compute_signature(["a", "b", "c"]);

    lsh.add("doc", &sig).unwrap();
    assert_eq!(lsh.len(), 1);
    assert!(lsh.remove("doc", &sig).unwrap());
    assert!(lsh.query(&sig).unwrap().is_empty());
    assert!(lsh.is_empty());
    assert!(!lsh.remove("doc", &sig).unwrap());
}

#[test]
fn test_lsh_duplicate_ids() {
    let mh = MinHash::new(128);
    let lsh = MinHashLsh::new(0.5, 128);
    let sig = mh.compute_signature(["x"]);

    lsh.add("dup", &sig).unwrap();
    lsh.add("dup", &sig).unwrap();
    assert_eq!(lsh.len(), 1);

    assert!(lsh.remove("dup", &sig).unwrap());
    assert_eq!(lsh.query(&sig).unwrap(), vec!["dup".to_string()]);
    assert!(lsh.remove("dup", &sig).unwrap());
    assert!(lsh.is_empty());
}

#[test]
fn test_lsh_rejects_wrong_signature_length() {
    let lsh = MinHashLsh::new(0.5, 128);
    let sig = MinHash::new(64).compute_signature(["x"]);
    let expected = IndexError::IncompatibleSignature {
        expected: 128,
        actual: 64,
    };

    assert_eq!(lsh.add("x", &sig), Err(expected.clone()));
    assert_eq!(lsh.query(&sig), Err(expected.clone()));
    assert_eq!(lsh.remove("x", &sig), Err(expected));
    assert!(lsh.is_empty());
}

#[test]
fn test_lsh_index_surface() {
    let mh = MinHash::new(128);
    let lsh = MinHashLsh::new(0.5, 128);
    assert_eq!(lsh.kind(), StructureKind::MinHashLsh);
    assert_eq!(lsh.memory_usage(), 0);
    assert!(ApproxIndex::is_empty(&lsh));

    lsh.add("doc", &mh.compute_signature(["k"])).unwrap();
    assert!(lsh.memory_usage() > 0);
    assert!(lsh.validate().is_ok());
    assert!(!ApproxIndex::is_empty(&lsh));
}
