// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

use approx_index::*;
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

// ============================================================================
// Strategies
// ============================================================================

fn arb_stream() -> impl Strategy<Value = Vec<(String, u32)>> {
    prop::collection::vec(("[a-z]{1,3}", 1u32..50), 0..200)
}

fn arb_token_set() -> impl Strategy<Value = HashSet<String>> {
    prop::collection::hash_set("[a-z0-9]{1,6}", 0..40)
}

fn sketch_of(stream: &[(String, u32)]) -> CountMinSketch {
    let cms = CountMinSketch::with_dimensions(100, 3);
    for (key, count) in stream {
        cms.increment(key, *count);
    }
    cms
}

// ============================================================================
// Count-Min Sketch
// ============================================================================

proptest! {
    #[test]
    fn count_min_never_underestimates(stream in arb_stream()) {
        let cms = sketch_of(&stream);
        let mut truth: HashMap<&str, u32> = HashMap::new();
        for (key, count) in &stream {
            *truth.entry(key.as_str()).or_insert(0) += count;
        }
        for (key, count) in truth {
            prop_assert!(cms.estimate(key) >= count);
        }
    }

    #[test]
    fn count_min_merge_dominates_unified_stream(a in arb_stream(), b in arb_stream()) {
        let merged = sketch_of(&a);
        merged.merge(&sketch_of(&b)).unwrap();

        let mut both = a.clone();
        both.extend(b.iter().cloned());
        let unified = sketch_of(&both);

        for (key, _) in &both {
            prop_assert!(merged.estimate(key) >= unified.estimate(key));
        }
        prop_assert_eq!(merged.total(), unified.total());
    }

    #[test]
    fn count_min_merge_commutes(a in arb_stream(), b in arb_stream()) {
        let ab = sketch_of(&a);
        ab.merge(&sketch_of(&b)).unwrap();
        let ba = sketch_of(&b);
        ba.merge(&sketch_of(&a)).unwrap();

        for (key, _) in a.iter().chain(&b) {
            prop_assert_eq!(ab.estimate(key), ba.estimate(key));
        }
    }
}

// ============================================================================
// Cuckoo Filter
// ============================================================================

proptest! {
    #[test]
    fn cuckoo_has_no_false_negatives(
        keys in prop::collection::vec("[a-z0-9]{1,8}", 0..300),
        seed in any::<u64>(),
    ) {
        let filter = CuckooFilter::with_seed(256, 4, seed);
        let mut stored = Vec::new();
        for key in &keys {
            if filter.add(key) {
                stored.push(key);
            }
        }
        for key in stored {
            prop_assert!(filter.contains(key));
        }
        prop_assert!(filter.load_factor() <= 1.0);
        prop_assert!(filter.validate().is_ok());
    }

    #[test]
    fn cuckoo_delete_keeps_other_keys(
        keys in prop::collection::hash_set("[a-z]{4,8}", 1..100),
        seed in any::<u64>(),
    ) {
        let filter = CuckooFilter::with_seed(1000, 4, seed);
        let keys: Vec<String> = keys.into_iter().collect();
        for key in &keys {
            prop_assert!(filter.add(key));
        }
        let (gone, kept) = keys.split_at(keys.len() / 2);
        for key in gone {
            prop_assert!(filter.delete(key));
        }
        for key in kept {
            prop_assert!(filter.contains(key));
        }
        prop_assert_eq!(filter.count(), kept.len());
    }
}

// ============================================================================
// MinHash
// ============================================================================

proptest! {
    #[test]
    fn minhash_similarity_is_bounded(a in arb_token_set(), b in arb_token_set(), seed in any::<u64>()) {
        let mh = MinHash::with_seed(64, seed);
        let sa = mh.compute_signature(&a);
        let sb = mh.compute_signature(&b);

        let sim = mh.estimate_similarity(&sa, &sb);
        prop_assert!((0.0..=1.0).contains(&sim));
        prop_assert_eq!(sim, mh.estimate_similarity(&sb, &sa));
        prop_assert_eq!(mh.estimate_similarity(&sa, &sa), 1.0);
    }

    #[test]
    fn minhash_signature_ignores_order(mut tokens in prop::collection::vec("[a-z]{1,4}", 1..30)) {
        let mh = MinHash::new(32);
        let forward = mh.compute_signature(&tokens);
        tokens.reverse();
        prop_assert_eq!(forward, mh.compute_signature(&tokens));
    }

    #[test]
    fn lsh_always_finds_exact_duplicates(a in arb_token_set()) {
        let mh = MinHash::new(64);
        let lsh = MinHashLsh::new(0.7, 64);
        let sig = mh.compute_signature(&a);
        lsh.add("doc", &sig).unwrap();
        prop_assert_eq!(lsh.query(&sig).unwrap(), vec!["doc".to_string()]);
    }
}
