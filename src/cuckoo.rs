// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

use crate::config::CuckooConfig;
use crate::enums::StructureKind;
use crate::error::{IndexError, Result};
use crate::hash::{fnv32a, fnv64a};
use crate::traits::ApproxIndex;
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

pub const DEFAULT_BUCKET_SIZE: usize = 4;
pub const DEFAULT_MAX_KICKS: usize = 500;

/// Fraction of slots the bucket count is sized for.
const TARGET_LOAD_FACTOR: f64 = 0.95;
/// Marks an empty slot. Real fingerprints are remapped away from it.
const EMPTY: u16 = 0;

#[derive(Clone)]
struct FilterState {
    /// `num_buckets × bucket_size` fingerprint slots.
    slots: Vec<u16>,
    count: usize,
    rng: StdRng,
}

/// Point-in-time occupancy of a [`CuckooFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterStats {
    pub count: usize,
    pub num_buckets: usize,
    pub bucket_size: usize,
    pub load_factor: f64,
}

/// Cuckoo Filter - Approximate Membership with Deletion
///
/// Stores a 16-bit fingerprint of each key in one of two candidate buckets,
/// `i1 = fnv64a(key) mod n` and `i2 = i1 XOR (fnv64a(fingerprint) mod n)`.
///
/// # Key Properties
///
/// - **No False Negatives**: a key whose `add` returned `true` and that was not deleted
///   is always reported by `contains`.
/// - **Deletion**: a fingerprint only ever lives in `i1` or `i2`, so removal is a probe of
///   two buckets. Two keys sharing a fingerprint and a bucket pair are indistinguishable,
///   so deleting one of them may remove the other's entry instead.
/// - **Bounded Insertion**: a full pair of buckets starts a random relocation walk of at
///   most `max_kicks` evictions. If the walk fails it is rolled back and `add` returns
///   `false`; no stored fingerprint is lost.
/// - **Multiset**: adding the same key twice stores two fingerprints, and it then takes
///   two deletes to remove it.
///
/// The bucket count is rounded up to a power of two so that the XOR alternate index is
/// its own inverse.
///
/// # Example
///
/// ```
/// use approx_index::CuckooFilter;
///
/// let filter = CuckooFilter::with_seed(1000, 4, 7);
/// assert!(filter.add("apple"));
/// assert!(filter.contains("apple"));
/// assert!(filter.delete("apple"));
/// assert!(!filter.contains("apple"));
/// ```
pub struct CuckooFilter {
    capacity: usize,
    num_buckets: usize,
    bucket_size: usize,
    max_kicks: usize,
    state: RwLock<FilterState>,
}

impl CuckooFilter {
    /// Creates a filter sized for `capacity` keys, seeding the relocation walk from the OS.
    pub fn new(capacity: usize, bucket_size: usize) -> Self {
        Self::build(capacity, bucket_size, DEFAULT_MAX_KICKS, StdRng::from_os_rng())
    }

    /// Creates a filter whose relocation walk is reproducible.
    pub fn with_seed(capacity: usize, bucket_size: usize, seed: u64) -> Self {
        Self::build(
            capacity,
            bucket_size,
            DEFAULT_MAX_KICKS,
            StdRng::seed_from_u64(seed),
        )
    }

    pub fn from_config(config: &CuckooConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::build(config.capacity, config.bucket_size, config.max_kicks, rng)
    }

    fn build(capacity: usize, bucket_size: usize, max_kicks: usize, rng: StdRng) -> Self {
        let bucket_size = bucket_size.max(1);
        let wanted = (capacity as f64 / bucket_size as f64 / TARGET_LOAD_FACTOR).ceil() as usize;
        let num_buckets = wanted.max(2).next_power_of_two();
        debug!(
            capacity,
            num_buckets, bucket_size, max_kicks, "cuckoo filter created"
        );
        Self {
            capacity,
            num_buckets,
            bucket_size,
            max_kicks,
            state: RwLock::new(FilterState {
                slots: vec![EMPTY; num_buckets * bucket_size],
                count: 0,
                rng,
            }),
        }
    }

    /// Inserts `key`. Returns `false` if the filter is too full to place it.
    pub fn add<K: AsRef<[u8]>>(&self, key: K) -> bool {
        let (fp, i1) = self.locate(key.as_ref());
        let i2 = self.alt_index(i1, fp);

        let mut guard = self.state.write();
        let state = &mut *guard;

        if self.try_place(state, i1, fp) || self.try_place(state, i2, fp) {
            state.count += 1;
            return true;
        }

        let mut bucket = if state.rng.random_bool(0.5) { i1 } else { i2 };
        let mut carried = fp;
        // (slot, previous fingerprint) for every eviction, to undo a failed walk.
        let mut evictions: Vec<(usize, u16)> = Vec::new();

        for _ in 0..self.max_kicks {
            let slot = bucket * self.bucket_size + state.rng.random_range(0..self.bucket_size);
            let evicted = std::mem::replace(&mut state.slots[slot], carried);
            evictions.push((slot, evicted));

            carried = evicted;
            bucket = self.alt_index(bucket, carried);
            if self.try_place(state, bucket, carried) {
                state.count += 1;
                return true;
            }
        }

        for (slot, previous) in evictions.into_iter().rev() {
            state.slots[slot] = previous;
        }
        debug!(
            count = state.count,
            max_kicks = self.max_kicks,
            "cuckoo insertion failed, filter too full"
        );
        false
    }

    /// True if `key`'s fingerprint is in one of its two buckets. May be a false positive.
    pub fn contains<K: AsRef<[u8]>>(&self, key: K) -> bool {
        let (fp, i1) = self.locate(key.as_ref());
        let i2 = self.alt_index(i1, fp);
        let state = self.state.read();
        self.bucket(&state, i1).contains(&fp) || self.bucket(&state, i2).contains(&fp)
    }

    /// Removes one copy of `key`'s fingerprint. Returns `false` if none was found.
    pub fn delete<K: AsRef<[u8]>>(&self, key: K) -> bool {
        let (fp, i1) = self.locate(key.as_ref());
        let i2 = self.alt_index(i1, fp);
        let mut state = self.state.write();
        for bucket in [i1, i2] {
            let start = bucket * self.bucket_size;
            let end = start + self.bucket_size;
            if let Some(pos) = state.slots[start..end].iter().position(|&s| s == fp) {
                state.slots[start + pos] = EMPTY;
                state.count -= 1;
                return true;
            }
        }
        false
    }

    /// Number of fingerprints currently stored.
    pub fn count(&self) -> usize {
        self.state.read().count
    }

    /// `count / (num_buckets × bucket_size)`, always within `[0, 1]`.
    pub fn load_factor(&self) -> f64 {
        self.count() as f64 / self.slot_count() as f64
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn num_buckets(&self) -> usize {
        self.num_buckets
    }

    pub fn bucket_size(&self) -> usize {
        self.bucket_size
    }

    pub fn max_kicks(&self) -> usize {
        self.max_kicks
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Removes every fingerprint. The relocation RNG keeps its state.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.slots.iter_mut().for_each(|s| *s = EMPTY);
        state.count = 0;
    }

    pub fn stats(&self) -> FilterStats {
        let count = self.count();
        FilterStats {
            count,
            num_buckets: self.num_buckets,
            bucket_size: self.bucket_size,
            load_factor: count as f64 / self.slot_count() as f64,
        }
    }

    fn slot_count(&self) -> usize {
        self.num_buckets * self.bucket_size
    }

    /// Fingerprint and primary bucket of a key.
    fn locate(&self, key: &[u8]) -> (u16, usize) {
        let fp = match (fnv32a(key) % 65535) as u16 {
            EMPTY => 1,
            fp => fp,
        };
        let i1 = (fnv64a(key) % self.num_buckets as u64) as usize;
        (fp, i1)
    }

    /// The other bucket `fp` may live in. Involutive because `num_buckets` is a power of two.
    fn alt_index(&self, bucket: usize, fp: u16) -> usize {
        let offset = (fnv64a(&fp.to_le_bytes()) % self.num_buckets as u64) as usize;
        bucket ^ offset
    }

    fn bucket<'a>(&self, state: &'a FilterState, bucket: usize) -> &'a [u16] {
        let start = bucket * self.bucket_size;
        &state.slots[start..start + self.bucket_size]
    }

    fn try_place(&self, state: &mut FilterState, bucket: usize, fp: u16) -> bool {
        let start = bucket * self.bucket_size;
        match state.slots[start..start + self.bucket_size]
            .iter_mut()
            .find(|s| **s == EMPTY)
        {
            Some(slot) => {
                *slot = fp;
                true
            }
            None => false,
        }
    }
}

impl Clone for CuckooFilter {
    fn clone(&self) -> Self {
        Self {
            capacity: self.capacity,
            num_buckets: self.num_buckets,
            bucket_size: self.bucket_size,
            max_kicks: self.max_kicks,
            state: RwLock::new(self.state.read().clone()),
        }
    }
}

impl fmt::Debug for CuckooFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CuckooFilter")
            .field("num_buckets", &self.num_buckets)
            .field("bucket_size", &self.bucket_size)
            .field("count", &self.count())
            .finish()
    }
}

impl ApproxIndex for CuckooFilter {
    fn kind(&self) -> StructureKind {
        StructureKind::CuckooFilter
    }

    fn validate(&self) -> Result<()> {
        let state = self.state.read();
        if state.slots.len() != self.slot_count() {
            return Err(IndexError::Validation(format!(
                "Filter holds {} slots, expected {}",
                state.slots.len(),
                self.slot_count()
            )));
        }
        let occupied = state.slots.iter().filter(|&&s| s != EMPTY).count();
        if occupied != state.count {
            return Err(IndexError::Validation(format!(
                "Filter counter is {} but {} slots are occupied",
                state.count, occupied
            )));
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        CuckooFilter::is_empty(self)
    }

    fn memory_usage(&self) -> usize {
        self.slot_count() * std::mem::size_of::<u16>()
    }
}
