// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

use crate::config::CountMinConfig;
use crate::enums::StructureKind;
use crate::error::{IndexError, Result};
use crate::hash::{fnv64, fnv64a};
use crate::traits::ApproxIndex;
use parking_lot::RwLock;
use std::fmt;
use tracing::{debug, warn};

/// Smallest number of columns a sketch is built with.
pub const MIN_WIDTH: usize = 100;
/// Smallest number of hash rows a sketch is built with.
pub const MIN_DEPTH: usize = 3;

#[derive(Clone)]
struct SketchState {
    /// Row-major `depth × width` counters.
    counters: Vec<u32>,
    /// Sum of all increments, saturating.
    total: u64,
}

/// Count-Min Sketch - Frequency Estimation
///
/// A `depth × width` matrix of `u32` counters. Each key touches one counter per row,
/// chosen by double hashing: `col_i = (fnv64a(key) + i * fnv64(key)) mod width`.
///
/// # Key Properties
///
/// - **Fixed Memory**: `width × depth × 4` bytes regardless of the number of distinct keys.
/// - **Conservative**: Estimates are never below the true count. Counters saturate at
///   `u32::MAX` instead of wrapping, so an overflowing counter stays an over-estimate.
/// - **Bounded Error**: with probability `1 - delta` an estimate exceeds the true count by
///   at most `epsilon * N`, where `N` is the total of all increments.
/// - **Mergeable**: Sketches with equal dimensions merge by element-wise addition.
///   Merging is commutative and associative but not idempotent.
///
/// # Example
///
/// ```
/// use approx_index::CountMinSketch;
///
/// let cms = CountMinSketch::new(0.01, 0.01);
/// cms.increment("apple", 2);
/// cms.add("banana");
///
/// assert!(cms.estimate("apple") >= 2);
/// assert!(cms.estimate("banana") >= 1);
/// assert_eq!(cms.estimate("cherry"), 0);
/// ```
pub struct CountMinSketch {
    width: usize,
    depth: usize,
    state: RwLock<SketchState>,
}

impl CountMinSketch {
    /// Builds a sketch from target error bounds.
    ///
    /// `width = ceil(e / epsilon)` and `depth = ceil(ln(1 / delta))`, clamped to at least
    /// [`MIN_WIDTH`] and [`MIN_DEPTH`]. Bounds outside `(0, 1)` fall back to `0.001`.
    pub fn new(epsilon: f64, delta: f64) -> Self {
        let epsilon = clamp_bound("epsilon", epsilon);
        let delta = clamp_bound("delta", delta);

        let width = ((std::f64::consts::E / epsilon).ceil() as usize).max(MIN_WIDTH);
        let depth = ((1.0 / delta).ln().ceil() as usize).max(MIN_DEPTH);
        Self::with_dimensions(width, depth)
    }

    /// Builds a sketch with `epsilon = delta = 0.001` (2719 × 7).
    pub fn new_default() -> Self {
        Self::from_config(&CountMinConfig::default())
    }

    pub fn from_config(config: &CountMinConfig) -> Self {
        Self::new(config.epsilon, config.delta)
    }

    /// Builds a sketch with explicit dimensions, clamped to the minimums.
    pub fn with_dimensions(width: usize, depth: usize) -> Self {
        let width = width.max(MIN_WIDTH);
        let depth = depth.max(MIN_DEPTH);
        debug!(width, depth, "count-min sketch created");
        Self {
            width,
            depth,
            state: RwLock::new(SketchState {
                counters: vec![0; width * depth],
                total: 0,
            }),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The relative error actually achieved by this width, `e / width`.
    pub fn epsilon(&self) -> f64 {
        std::f64::consts::E / self.width as f64
    }

    /// The failure probability actually achieved by this depth, `e^-depth`.
    pub fn delta(&self) -> f64 {
        (-(self.depth as f64)).exp()
    }

    /// Adds `count` occurrences of `key`.
    pub fn increment<K: AsRef<[u8]>>(&self, key: K, count: u32) {
        let positions: Vec<usize> = self.positions(key.as_ref()).collect();
        let mut state = self.state.write();
        for idx in positions {
            state.counters[idx] = state.counters[idx].saturating_add(count);
        }
        state.total = state.total.saturating_add(u64::from(count));
    }

    /// Adds a single occurrence of `key`.
    pub fn add<K: AsRef<[u8]>>(&self, key: K) {
        self.increment(key, 1);
    }

    /// Estimated count of `key`: the minimum over its `depth` counters.
    pub fn estimate<K: AsRef<[u8]>>(&self, key: K) -> u32 {
        let state = self.state.read();
        self.min_counter(&state, key.as_ref())
    }

    /// Filters caller-supplied candidates down to those whose estimate is at least
    /// `threshold`, keeping their input order.
    ///
    /// The sketch cannot enumerate its own keys, so the caller has to supply them.
    pub fn heavy_hitters<K>(&self, candidates: &[K], threshold: u32) -> Vec<(K, u32)>
    where
        K: AsRef<[u8]> + Clone,
    {
        let state = self.state.read();
        candidates
            .iter()
            .filter_map(|key| {
                let estimate = self.min_counter(&state, key.as_ref());
                (estimate >= threshold).then(|| (key.clone(), estimate))
            })
            .collect()
    }

    /// Adds every counter of `other` into this sketch.
    ///
    /// Fails without modifying `self` if the dimensions differ. Merging a sketch with
    /// itself doubles every count.
    pub fn merge(&self, other: &CountMinSketch) -> Result<()> {
        if self.width != other.width {
            return Err(IndexError::DimensionMismatch {
                what: "count-min width",
                expected: self.width,
                actual: other.width,
            });
        }
        if self.depth != other.depth {
            return Err(IndexError::DimensionMismatch {
                what: "count-min depth",
                expected: self.depth,
                actual: other.depth,
            });
        }

        // Snapshot first: holding both locks would deadlock on `a.merge(&a)`.
        let snapshot = other.state.read().clone();

        let mut state = self.state.write();
        for (dst, src) in state.counters.iter_mut().zip(&snapshot.counters) {
            *dst = dst.saturating_add(*src);
        }
        state.total = state.total.saturating_add(snapshot.total);
        Ok(())
    }

    /// Merges N sketches into a new one. All must share the first sketch's dimensions.
    pub fn merge_all(sketches: &[&CountMinSketch]) -> Result<Self> {
        let first = sketches.first().ok_or_else(|| {
            IndexError::InvalidParameter("merge_all needs at least one sketch".into())
        })?;
        let merged = Self::with_dimensions(first.width, first.depth);
        for sketch in sketches {
            merged.merge(sketch)?;
        }
        Ok(merged)
    }

    /// Sum of all increments applied (saturating).
    pub fn total(&self) -> u64 {
        self.state.read().total
    }

    /// Additive error bound `epsilon * N` for the current total.
    pub fn error_bound(&self) -> f64 {
        self.epsilon() * self.total() as f64
    }

    /// Resets every counter to zero.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.counters.iter_mut().for_each(|c| *c = 0);
        state.total = 0;
    }

    fn positions(&self, key: &[u8]) -> impl Iterator<Item = usize> {
        let h1 = fnv64a(key);
        let h2 = fnv64(key);
        let width = self.width;
        (0..self.depth).map(move |row| {
            let col = h1.wrapping_add((row as u64).wrapping_mul(h2)) % width as u64;
            row * width + col as usize
        })
    }

    fn min_counter(&self, state: &SketchState, key: &[u8]) -> u32 {
        self.positions(key)
            .map(|idx| state.counters[idx])
            .min()
            .unwrap_or(0)
    }
}

fn clamp_bound(name: &'static str, value: f64) -> f64 {
    if value.is_finite() && value > 0.0 && value < 1.0 {
        value
    } else {
        warn!(name, value, "count-min bound outside (0, 1), using 0.001");
        0.001
    }
}

impl Default for CountMinSketch {
    fn default() -> Self {
        Self::new_default()
    }
}

impl Clone for CountMinSketch {
    fn clone(&self) -> Self {
        Self {
            width: self.width,
            depth: self.depth,
            state: RwLock::new(self.state.read().clone()),
        }
    }
}

impl fmt::Debug for CountMinSketch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountMinSketch")
            .field("width", &self.width)
            .field("depth", &self.depth)
            .field("total", &self.total())
            .finish()
    }
}

impl ApproxIndex for CountMinSketch {
    fn kind(&self) -> StructureKind {
        StructureKind::CountMinSketch
    }

    fn validate(&self) -> Result<()> {
        let state = self.state.read();
        if state.counters.len() != self.width * self.depth {
            return Err(IndexError::Validation(format!(
                "Counter matrix holds {} cells, expected {}",
                state.counters.len(),
                self.width * self.depth
            )));
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.state.read().counters.iter().all(|&c| c == 0)
    }

    fn memory_usage(&self) -> usize {
        self.width * self.depth * std::mem::size_of::<u32>()
    }
}
