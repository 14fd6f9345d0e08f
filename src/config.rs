// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! Construction parameters for every structure.
//!
//! All configs deserialize with missing fields filled from `Default`, so a caller can
//! keep only the overrides in its own config file.
//!
//! # Example
//!
//! ```
//! use approx_index::config::CuckooConfig;
//!
//! let config: CuckooConfig = serde_json::from_str(r#"{"capacity": 1000}"#).unwrap();
//! assert_eq!(config.capacity, 1000);
//! assert_eq!(config.bucket_size, 4);
//! assert_eq!(config.max_kicks, 500);
//! ```

use serde::{Deserialize, Serialize};

/// Count-Min Sketch error bounds: estimates exceed the true count by at most
/// `epsilon * N` with probability at least `1 - delta`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountMinConfig {
    pub epsilon: f64,
    pub delta: f64,
}

impl Default for CountMinConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.001,
            delta: 0.001,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CuckooConfig {
    /// Expected number of keys.
    pub capacity: usize,
    /// Fingerprint slots per bucket.
    pub bucket_size: usize,
    /// Relocations attempted before an insertion is reported as failed.
    pub max_kicks: usize,
    /// Seed for the relocation walk; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for CuckooConfig {
    fn default() -> Self {
        Self {
            capacity: 1_000_000,
            bucket_size: crate::cuckoo::DEFAULT_BUCKET_SIZE,
            max_kicks: crate::cuckoo::DEFAULT_MAX_KICKS,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantizerConfig {
    pub dimension: usize,
    pub num_subvectors: usize,
    /// Centroids per segment codebook (at most 256, one byte per code).
    pub code_size: usize,
}

impl Default for QuantizerConfig {
    fn default() -> Self {
        Self {
            dimension: 384,
            num_subvectors: 8,
            code_size: 256,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinHashConfig {
    pub num_hashes: usize,
    pub seed: u64,
}

impl Default for MinHashConfig {
    fn default() -> Self {
        Self {
            num_hashes: 128,
            seed: crate::minhash::DEFAULT_SEED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LshConfig {
    /// Target Jaccard similarity at which candidates start colliding.
    pub threshold: f64,
    pub num_hashes: usize,
}

impl Default for LshConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            num_hashes: 128,
        }
    }
}
