// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

use crate::config::LshConfig;
use crate::enums::StructureKind;
use crate::error::{IndexError, Result};
use crate::hash::fnv64a_words;
use crate::minhash::MinHashSignature;
use crate::traits::ApproxIndex;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Default)]
struct LshState {
    /// Per band: band hash -> IDs whose signature has that band.
    tables: Vec<HashMap<u64, Vec<String>>>,
    /// ID -> number of live insertions.
    members: HashMap<String, usize>,
}

/// MinHash LSH - Sub-linear Candidate Retrieval
///
/// Splits each signature into `bands` bands of `rows_per_band` positions and files the
/// item under the hash of every band. Two items become candidates when at least one band
/// matches exactly, which happens with probability `1 - (1 - J^r)^b` for Jaccard
/// similarity `J`. The curve is steepest around `(1/b)^(1/r)`.
///
/// # Key Properties
///
/// - **Candidates, not answers**: a collision is necessary but not sufficient for high
///   similarity. Items below the threshold can collide; items above it can, rarely, miss.
/// - **Ranked**: `query` orders candidates by how many bands they share with the query.
///
/// # Example
///
/// ```
/// use approx_index::{MinHash, MinHashLsh};
///
/// let mh = MinHash::new(128);
/// let lsh = MinHashLsh::new(0.5, 128);
///
/// let doc = mh.compute_signature_from_text("rust sketches filters and quantizers");
/// lsh.add("doc-1", &doc).unwrap();
///
/// let hits = lsh.query(&doc).unwrap();
/// assert_eq!(hits, vec!["doc-1".to_string()]);
/// ```
pub struct MinHashLsh {
    num_hashes: usize,
    bands: usize,
    rows_per_band: usize,
    state: RwLock<LshState>,
}

impl MinHashLsh {
    /// Creates an index for `num_hashes`-long signatures, picking the band split whose
    /// predicted threshold `(1/b)^(1/r)` is closest to `threshold`.
    pub fn new(threshold: f64, num_hashes: usize) -> Self {
        let num_hashes = num_hashes.max(1);
        let (bands, rows_per_band) = choose_bands(threshold, num_hashes);
        debug!(
            threshold,
            num_hashes, bands, rows_per_band, "minhash lsh created"
        );
        Self {
            num_hashes,
            bands,
            rows_per_band,
            state: RwLock::new(LshState {
                tables: vec![HashMap::new(); bands],
                members: HashMap::new(),
            }),
        }
    }

    pub fn from_config(config: &LshConfig) -> Self {
        Self::new(config.threshold, config.num_hashes)
    }

    pub fn num_hashes(&self) -> usize {
        self.num_hashes
    }

    pub fn bands(&self) -> usize {
        self.bands
    }

    pub fn rows_per_band(&self) -> usize {
        self.rows_per_band
    }

    /// The similarity at which collision probability rises steeply for this split.
    pub fn predicted_threshold(&self) -> f64 {
        predicted_threshold(self.bands, self.rows_per_band)
    }

    /// Files `id` under every band of `signature`.
    pub fn add(&self, id: impl Into<String>, signature: &MinHashSignature) -> Result<()> {
        let hashes = self.band_hashes(signature)?;
        let id = id.into();

        let mut state = self.state.write();
        for (table, hash) in state.tables.iter_mut().zip(hashes) {
            table.entry(hash).or_default().push(id.clone());
        }
        trace!(id = %id, bands = self.bands, "lsh add");
        *state.members.entry(id).or_insert(0) += 1;
        Ok(())
    }

    /// Candidate IDs sharing at least one band with `signature`, most shared bands first.
    pub fn query(&self, signature: &MinHashSignature) -> Result<Vec<String>> {
        Ok(self
            .query_with_counts(signature)?
            .into_iter()
            .map(|(id, _)| id)
            .collect())
    }

    /// Candidates with the number of bands each shares with `signature`, sorted by that
    /// count descending and then by ID.
    pub fn query_with_counts(&self, signature: &MinHashSignature) -> Result<Vec<(String, usize)>> {
        let hashes = self.band_hashes(signature)?;

        let state = self.state.read();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for (table, hash) in state.tables.iter().zip(hashes) {
            if let Some(ids) = table.get(&hash) {
                for id in ids {
                    *counts.entry(id.as_str()).or_insert(0) += 1;
                }
            }
        }

        let mut ranked: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(id, hits)| (id.to_string(), hits))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(ranked)
    }

    /// Removes one filing of `id` from each band of `signature`.
    ///
    /// The caller must pass the signature `id` was added with. Returns `false` if `id`
    /// was not found under any of its bands.
    pub fn remove(&self, id: &str, signature: &MinHashSignature) -> Result<bool> {
        let hashes = self.band_hashes(signature)?;

        let mut state = self.state.write();
        let mut removed = false;
        for (table, hash) in state.tables.iter_mut().zip(hashes) {
            let Some(bucket) = table.get_mut(&hash) else {
                continue;
            };
            if let Some(pos) = bucket.iter().position(|x| x == id) {
                bucket.swap_remove(pos);
                removed = true;
            }
            if bucket.is_empty() {
                table.remove(&hash);
            }
        }

        if removed {
            if let Some(n) = state.members.get_mut(id) {
                *n -= 1;
                if *n == 0 {
                    state.members.remove(id);
                }
            }
            trace!(id, "lsh remove");
        }
        Ok(removed)
    }

    /// Number of distinct IDs currently indexed.
    pub fn len(&self) -> usize {
        self.state.read().members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().members.is_empty()
    }

    pub fn clear(&self) {
        let mut state = self.state.write();
        state.tables.iter_mut().for_each(HashMap::clear);
        state.members.clear();
    }

    fn band_hashes(&self, signature: &MinHashSignature) -> Result<Vec<u64>> {
        if signature.len() != self.num_hashes {
            return Err(IndexError::IncompatibleSignature {
                expected: self.num_hashes,
                actual: signature.len(),
            });
        }
        Ok(signature
            .values()
            .chunks_exact(self.rows_per_band)
            .map(fnv64a_words)
            .collect())
    }
}

fn predicted_threshold(bands: usize, rows: usize) -> f64 {
    (1.0 / bands as f64).powf(1.0 / rows as f64)
}

/// Tries every divisor `b` of `num_hashes` and keeps the one whose predicted threshold is
/// closest to `threshold`. Falls back to one row per band.
fn choose_bands(threshold: f64, num_hashes: usize) -> (usize, usize) {
    if !(threshold.is_finite() && threshold > 0.0 && threshold <= 1.0) {
        warn!(threshold, "lsh threshold outside (0, 1], using one row per band");
        return (num_hashes, 1);
    }

    let mut best: Option<(usize, f64)> = None;
    for b in (1..=num_hashes).filter(|b| num_hashes % b == 0) {
        let error = (predicted_threshold(b, num_hashes / b) - threshold).abs();
        if error.is_finite() && best.map_or(true, |(_, e)| error < e) {
            best = Some((b, error));
        }
    }

    match best {
        Some((b, _)) => (b, num_hashes / b),
        None => {
            warn!(threshold, num_hashes, "no usable band split, using one row per band");
            (num_hashes, 1)
        }
    }
}

impl Clone for MinHashLsh {
    fn clone(&self) -> Self {
        Self {
            num_hashes: self.num_hashes,
            bands: self.bands,
            rows_per_band: self.rows_per_band,
            state: RwLock::new(self.state.read().clone()),
        }
    }
}

impl fmt::Debug for MinHashLsh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MinHashLsh")
            .field("bands", &self.bands)
            .field("rows_per_band", &self.rows_per_band)
            .field("len", &self.len())
            .finish()
    }
}

impl ApproxIndex for MinHashLsh {
    fn kind(&self) -> StructureKind {
        StructureKind::MinHashLsh
    }

    fn validate(&self) -> Result<()> {
        if self.bands * self.rows_per_band != self.num_hashes {
            return Err(IndexError::Validation(format!(
                "{} bands × {} rows does not cover {} hashes",
                self.bands, self.rows_per_band, self.num_hashes
            )));
        }
        let state = self.state.read();
        if state.tables.len() != self.bands {
            return Err(IndexError::Validation(format!(
                "Found {} band tables, expected {}",
                state.tables.len(),
                self.bands
            )));
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        MinHashLsh::is_empty(self)
    }

    fn memory_usage(&self) -> usize {
        let state = self.state.read();
        state
            .tables
            .iter()
            .flat_map(HashMap::iter)
            .map(|(_, ids)| {
                std::mem::size_of::<u64>() + ids.iter().map(String::len).sum::<usize>()
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choose_bands_closest_divisor() {
        // 128 hashes, 0.5: 32×4 predicts ~0.42, 16×8 ~0.71.
        assert_eq!(choose_bands(0.5, 128), (32, 4));
        assert_eq!(choose_bands(1.0, 64), (1, 64));
    }

    #[test]
    fn test_choose_bands_fallback() {
        assert_eq!(choose_bands(f64::NAN, 10), (10, 1));
        assert_eq!(choose_bands(0.0, 10), (10, 1));
    }

    #[test]
    fn test_split_always_covers_signature() {
        for n in 1..200 {
            let (b, r) = choose_bands(0.7, n);
            assert_eq!(b * r, n);
        }
    }
}
