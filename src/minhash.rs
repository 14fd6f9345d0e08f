// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! MinHash signatures for Jaccard similarity estimation.
//!
//! For each seed `s_i`, position `i` of a signature holds the minimum over the token set
//! of a seeded hash of `fnv64a(token) XOR (s_i · 0x517cc1b727220a95)`. Two sets agree at a
//! position with probability equal to their Jaccard similarity `|A ∩ B| / |A ∪ B|`, so the
//! fraction of agreeing positions estimates it with variance `J(1 - J) / num_hashes`.
//!
//! The seeded value passes through a 64-bit finalizer before the minimum is taken, so
//! every seed induces an independent-looking permutation of the token hashes.

use crate::config::MinHashConfig;
use crate::error::{IndexError, Result};
use crate::hash::{fnv64a, fnv64a_words, mix64};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Seed used by [`MinHash::new`].
pub const DEFAULT_SEED: u64 = 42;

const SEED_MULTIPLIER: u64 = 0x517c_c1b7_2722_0a95;

/// A MinHash signature: one running minimum per hash seed.
///
/// Signatures are only comparable when they have the same length and come from the same
/// seed set; the seed set is recorded as a tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MinHashSignature {
    values: Vec<u64>,
    seed_tag: u64,
}

impl MinHashSignature {
    pub fn values(&self) -> &[u64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True if both signatures have the same length and seed set.
    pub fn is_compatible(&self, other: &MinHashSignature) -> bool {
        self.values.len() == other.values.len() && self.seed_tag == other.seed_tag
    }

    /// Fraction of positions on which the two signatures agree.
    ///
    /// Returns 0 for incompatible signatures; see [`MinHashSignature::try_jaccard`].
    pub fn jaccard(&self, other: &MinHashSignature) -> f64 {
        self.try_jaccard(other).unwrap_or(0.0)
    }

    pub fn try_jaccard(&self, other: &MinHashSignature) -> Result<f64> {
        self.check_compatible(other)?;
        if self.values.is_empty() {
            return Ok(0.0);
        }
        let matches = self
            .values
            .iter()
            .zip(&other.values)
            .filter(|(a, b)| a == b)
            .count();
        Ok(matches as f64 / self.values.len() as f64)
    }

    /// Signature of the union of the two underlying sets (element-wise minimum).
    pub fn merge(&self, other: &MinHashSignature) -> Result<MinHashSignature> {
        self.check_compatible(other)?;
        Ok(MinHashSignature {
            values: self
                .values
                .iter()
                .zip(&other.values)
                .map(|(&a, &b)| a.min(b))
                .collect(),
            seed_tag: self.seed_tag,
        })
    }

    fn check_compatible(&self, other: &MinHashSignature) -> Result<()> {
        if self.values.len() != other.values.len() {
            return Err(IndexError::IncompatibleSignature {
                expected: self.values.len(),
                actual: other.values.len(),
            });
        }
        if self.seed_tag != other.seed_tag {
            return Err(IndexError::SeedMismatch);
        }
        Ok(())
    }
}

/// MinHash signature generator.
///
/// Immutable after construction, so it can be shared freely across threads.
///
/// # Example
///
/// ```
/// use approx_index::MinHash;
///
/// let mh = MinHash::new(128);
/// let a = mh.compute_signature_from_text("the quick brown fox");
/// let b = mh.compute_signature_from_text("The quick brown dog");
///
/// assert_eq!(mh.estimate_similarity(&a, &a), 1.0);
/// let sim = mh.estimate_similarity(&a, &b);
/// assert!((0.0..=1.0).contains(&sim));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinHash {
    seeds: Vec<u64>,
    seed_tag: u64,
}

impl MinHash {
    /// Creates a generator with `num_hashes` seeds drawn from [`DEFAULT_SEED`].
    pub fn new(num_hashes: usize) -> Self {
        Self::with_seed(num_hashes, DEFAULT_SEED)
    }

    pub fn with_seed(num_hashes: usize, seed: u64) -> Self {
        Self::with_rng(num_hashes, &mut StdRng::seed_from_u64(seed))
    }

    pub fn with_rng<R: Rng + ?Sized>(num_hashes: usize, rng: &mut R) -> Self {
        let seeds: Vec<u64> = (0..num_hashes).map(|_| rng.random()).collect();
        let seed_tag = fnv64a_words(&seeds);
        debug!(num_hashes, "minhash generator created");
        Self { seeds, seed_tag }
    }

    pub fn from_config(config: &MinHashConfig) -> Self {
        Self::with_seed(config.num_hashes, config.seed)
    }

    pub fn num_hashes(&self) -> usize {
        self.seeds.len()
    }

    pub fn seeds(&self) -> &[u64] {
        &self.seeds
    }

    /// Signature of a token set. Duplicate tokens do not change the result; an empty set
    /// yields all `u64::MAX`.
    pub fn compute_signature<I, T>(&self, tokens: I) -> MinHashSignature
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let mut values = vec![u64::MAX; self.seeds.len()];
        for token in tokens {
            let h = fnv64a(token.as_ref());
            for (min, &seed) in values.iter_mut().zip(&self.seeds) {
                let v = mix64(h ^ seed.wrapping_mul(SEED_MULTIPLIER));
                if v < *min {
                    *min = v;
                }
            }
        }
        MinHashSignature {
            values,
            seed_tag: self.seed_tag,
        }
    }

    /// Tokenizes `text` with [`tokenize`] and signs the tokens.
    pub fn compute_signature_from_text(&self, text: &str) -> MinHashSignature {
        self.compute_signature(tokenize(text))
    }

    /// Estimated Jaccard similarity, in `[0, 1]`.
    ///
    /// Mismatched lengths or seed sets give 0. Use
    /// [`MinHash::try_estimate_similarity`] to tell that apart from disjoint sets.
    pub fn estimate_similarity(&self, a: &MinHashSignature, b: &MinHashSignature) -> f64 {
        a.jaccard(b)
    }

    pub fn try_estimate_similarity(
        &self,
        a: &MinHashSignature,
        b: &MinHashSignature,
    ) -> Result<f64> {
        a.try_jaccard(b)
    }

    /// Linear scan of `candidates`, keeping those at or above `threshold`, most similar
    /// first. Incompatible candidates never match.
    pub fn find_similar<'a, K, I>(
        &self,
        query: &MinHashSignature,
        candidates: I,
        threshold: f64,
    ) -> Vec<(K, f64)>
    where
        K: Clone + 'a,
        I: IntoIterator<Item = (&'a K, &'a MinHashSignature)>,
    {
        let mut hits: Vec<(K, f64)> = candidates
            .into_iter()
            .filter_map(|(id, sig)| {
                let sim = query.try_jaccard(sig).ok()?;
                (sim >= threshold).then(|| (id.clone(), sim))
            })
            .collect();
        hits.sort_by(|a, b| b.1.total_cmp(&a.1));
        hits
    }
}

impl Default for MinHash {
    fn default() -> Self {
        Self::from_config(&MinHashConfig::default())
    }
}

/// Splits `text` into lowercase alphanumeric runs.
///
/// ```
/// assert_eq!(approx_index::tokenize("Hello, World-42!"), vec!["hello", "world", "42"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}
