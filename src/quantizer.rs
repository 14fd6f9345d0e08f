// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

use crate::config::QuantizerConfig;
use crate::enums::StructureKind;
use crate::error::{IndexError, Result};
use crate::traits::ApproxIndex;
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;
use tracing::{debug, warn};

/// Largest codebook addressable by a one-byte code.
pub const MAX_CODE_SIZE: usize = 256;

#[derive(Clone)]
struct QuantizerState {
    /// Per segment, `codebook_len × subvector_dim` centroid coordinates, row-major.
    codebooks: Vec<Vec<f32>>,
    /// Live centroids per codebook. Below `code_size` when trained on fewer vectors.
    codebook_len: usize,
    trained: bool,
}

/// Query-to-centroid squared distances for every segment, built once per query.
///
/// With a table, scoring one code vector is `num_subvectors` lookups instead of
/// `num_subvectors × subvector_dim` arithmetic.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceTable {
    num_subvectors: usize,
    codebook_len: usize,
    /// `num_subvectors × codebook_len`, segment-major.
    values: Vec<f32>,
}

impl DistanceTable {
    pub fn num_subvectors(&self) -> usize {
        self.num_subvectors
    }

    pub fn codebook_len(&self) -> usize {
        self.codebook_len
    }

    /// Squared distance from the query's segment to centroid `code`.
    pub fn get(&self, segment: usize, code: u8) -> Option<f32> {
        if segment >= self.num_subvectors || code as usize >= self.codebook_len {
            return None;
        }
        Some(self.values[segment * self.codebook_len + code as usize])
    }

    /// Fast path: sums the table entries named by `codes`.
    ///
    /// Extra codes are ignored and an out-of-range code scores as infinitely far. Use
    /// [`ProductQuantizer::distance_with_table`] to get an error instead.
    #[inline]
    pub fn distance(&self, codes: &[u8]) -> f32 {
        codes
            .iter()
            .take(self.num_subvectors)
            .enumerate()
            .map(|(segment, &code)| self.get(segment, code).unwrap_or(f32::INFINITY))
            .sum()
    }

    fn check(&self, codes: &[u8]) -> Result<()> {
        if codes.len() != self.num_subvectors {
            return Err(IndexError::DimensionMismatch {
                what: "code length",
                expected: self.num_subvectors,
                actual: codes.len(),
            });
        }
        check_codes(codes, self.codebook_len)
    }
}

/// Product Quantizer - Lossy Vector Compression
///
/// Splits a `dimension`-long vector into `num_subvectors` contiguous segments and
/// replaces each segment by the index of its nearest centroid in that segment's
/// codebook. Codebooks are learned per segment with Lloyd's algorithm.
///
/// # Key Properties
///
/// - **Compression**: `dimension × 4` bytes of `f32` become `num_subvectors` bytes.
/// - **Asymmetric Distance**: queries stay unquantized; only the database side is coded.
/// - **Auto-correction**: if `dimension` is not divisible by `num_subvectors`, the
///   segment count becomes `gcd(dimension, num_subvectors)` and a warning is logged.
/// - **Untrained State**: before `train`, codebooks are all zeros. Every operation works
///   but distances are meaningless; check [`ProductQuantizer::is_trained`].
///
/// # Example
///
/// ```
/// use approx_index::ProductQuantizer;
/// use rand::{rngs::StdRng, Rng, SeedableRng};
///
/// let mut rng = StdRng::seed_from_u64(7);
/// let vectors: Vec<Vec<f32>> = (0..200)
///     .map(|_| (0..16).map(|_| rng.random::<f32>()).collect())
///     .collect();
///
/// let pq = ProductQuantizer::new(16, 4, 16);
/// pq.train_with_rng(&vectors, 10, &mut rng).unwrap();
///
/// let codes = pq.encode(&vectors[0]).unwrap();
/// assert_eq!(codes.len(), 4);
/// assert_eq!(pq.decode(&codes).unwrap().len(), 16);
/// ```
pub struct ProductQuantizer {
    dimension: usize,
    num_subvectors: usize,
    subvector_dim: usize,
    code_size: usize,
    state: RwLock<QuantizerState>,
}

impl ProductQuantizer {
    pub fn new(dimension: usize, num_subvectors: usize, code_size: usize) -> Self {
        let dimension = if dimension == 0 {
            warn!("product quantizer dimension 0, using 1");
            1
        } else {
            dimension
        };

        let mut m = num_subvectors.max(1);
        if dimension % m != 0 {
            let corrected = gcd(dimension, m);
            warn!(
                dimension,
                requested = m,
                corrected,
                "dimension not divisible by num_subvectors, using gcd"
            );
            m = corrected;
        }

        let clamped = code_size.clamp(1, MAX_CODE_SIZE);
        if clamped != code_size {
            warn!(requested = code_size, clamped, "code size out of range");
        }

        let subvector_dim = dimension / m;
        debug!(
            dimension,
            num_subvectors = m,
            subvector_dim,
            code_size = clamped,
            "product quantizer created"
        );

        Self {
            dimension,
            num_subvectors: m,
            subvector_dim,
            code_size: clamped,
            state: RwLock::new(QuantizerState {
                codebooks: vec![vec![0.0; clamped * subvector_dim]; m],
                codebook_len: clamped,
                trained: false,
            }),
        }
    }

    pub fn from_config(config: &QuantizerConfig) -> Self {
        Self::new(config.dimension, config.num_subvectors, config.code_size)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Effective segment count, after any `gcd` correction.
    pub fn num_subvectors(&self) -> usize {
        self.num_subvectors
    }

    pub fn subvector_dim(&self) -> usize {
        self.subvector_dim
    }

    pub fn code_size(&self) -> usize {
        self.code_size
    }

    pub fn is_trained(&self) -> bool {
        self.state.read().trained
    }

    /// `dimension × 4` bytes per raw vector over `num_subvectors` bytes per code.
    pub fn compression_ratio(&self) -> f64 {
        (self.dimension * std::mem::size_of::<f32>()) as f64 / self.num_subvectors as f64
    }

    /// Trains every segment codebook with `iterations` rounds of k-means, seeding from
    /// the thread-local RNG.
    pub fn train<V: AsRef<[f32]>>(&self, vectors: &[V], iterations: usize) -> Result<()> {
        self.train_with_rng(vectors, iterations, &mut rand::rng())
    }

    /// Trains with a caller-supplied RNG, for reproducible codebooks.
    ///
    /// Each segment is seeded from a random permutation of the training subvectors and
    /// then refined for exactly `iterations` rounds; there is no convergence check.
    /// Centroids that attract no subvector keep their previous position. Training on
    /// fewer than `code_size` vectors leaves that many centroids per codebook.
    pub fn train_with_rng<V, R>(&self, vectors: &[V], iterations: usize, rng: &mut R) -> Result<()>
    where
        V: AsRef<[f32]>,
        R: Rng + ?Sized,
    {
        if vectors.is_empty() {
            return Err(IndexError::InvalidParameter(
                "cannot train a product quantizer on zero vectors".into(),
            ));
        }
        for v in vectors {
            self.check_vector(v.as_ref())?;
        }

        let mut state = self.state.write();
        let k = self.code_size.min(vectors.len());

        for segment in 0..self.num_subvectors {
            let start = segment * self.subvector_dim;
            let end = start + self.subvector_dim;
            let subvectors: Vec<&[f32]> = vectors.iter().map(|v| &v.as_ref()[start..end]).collect();

            state.codebooks[segment] =
                lloyd(&subvectors, k, self.subvector_dim, iterations, &mut *rng);
            debug!(segment, centroids = k, iterations, "trained segment codebook");
        }

        state.codebook_len = k;
        state.trained = true;
        Ok(())
    }

    /// Quantizes `vector` to one code per segment.
    pub fn encode(&self, vector: &[f32]) -> Result<Vec<u8>> {
        self.check_vector(vector)?;
        let state = self.state.read();
        Ok(self.encode_locked(&state, vector))
    }

    /// Encodes many vectors under a single read lock.
    pub fn encode_batch<V: AsRef<[f32]>>(&self, vectors: &[V]) -> Result<Vec<Vec<u8>>> {
        for v in vectors {
            self.check_vector(v.as_ref())?;
        }
        let state = self.state.read();
        Ok(vectors
            .iter()
            .map(|v| self.encode_locked(&state, v.as_ref()))
            .collect())
    }

    /// Concatenates the centroids named by `codes`. Lossy.
    pub fn decode(&self, codes: &[u8]) -> Result<Vec<f32>> {
        let state = self.state.read();
        self.check_codes(&state, codes)?;

        let mut vector = Vec::with_capacity(self.dimension);
        for (segment, &code) in codes.iter().enumerate() {
            vector.extend_from_slice(self.centroid(&state, segment, code as usize));
        }
        Ok(vector)
    }

    /// Sum over segments of the squared distance between the raw query segment and the
    /// centroid named by `codes`.
    pub fn asymmetric_distance(&self, query: &[f32], codes: &[u8]) -> Result<f32> {
        self.check_vector(query)?;
        let state = self.state.read();
        self.check_codes(&state, codes)?;

        Ok(codes
            .iter()
            .enumerate()
            .map(|(segment, &code)| {
                let start = segment * self.subvector_dim;
                let sub = &query[start..start + self.subvector_dim];
                squared_l2(sub, self.centroid(&state, segment, code as usize))
            })
            .sum())
    }

    /// Builds the `num_subvectors × codebook_len` query distance table.
    pub fn precompute_distance_table(&self, query: &[f32]) -> Result<DistanceTable> {
        self.check_vector(query)?;
        let state = self.state.read();

        let mut values = Vec::with_capacity(self.num_subvectors * state.codebook_len);
        for segment in 0..self.num_subvectors {
            let start = segment * self.subvector_dim;
            let sub = &query[start..start + self.subvector_dim];
            for code in 0..state.codebook_len {
                values.push(squared_l2(sub, self.centroid(&state, segment, code)));
            }
        }

        Ok(DistanceTable {
            num_subvectors: self.num_subvectors,
            codebook_len: state.codebook_len,
            values,
        })
    }

    /// Validated table lookup. Equal to `asymmetric_distance` for the same query.
    pub fn distance_with_table(&self, table: &DistanceTable, codes: &[u8]) -> Result<f32> {
        if table.num_subvectors != self.num_subvectors {
            return Err(IndexError::DimensionMismatch {
                what: "distance table segments",
                expected: self.num_subvectors,
                actual: table.num_subvectors,
            });
        }
        table.check(codes)?;
        Ok(table.distance(codes))
    }

    /// Scores every code vector in `database` against `query` and returns the `k`
    /// closest as `(position, distance)`, nearest first.
    pub fn search<C: AsRef<[u8]>>(
        &self,
        query: &[f32],
        database: &[C],
        k: usize,
    ) -> Result<Vec<(usize, f32)>> {
        let table = self.precompute_distance_table(query)?;
        let mut scored = Vec::with_capacity(database.len());
        for (idx, codes) in database.iter().enumerate() {
            let codes = codes.as_ref();
            table.check(codes)?;
            scored.push((idx, table.distance(codes)));
        }
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);
        Ok(scored)
    }

    /// Copy of one segment's codebook, one centroid per entry.
    pub fn codebook(&self, segment: usize) -> Option<Vec<Vec<f32>>> {
        let state = self.state.read();
        let book = state.codebooks.get(segment)?;
        Some(
            book.chunks(self.subvector_dim)
                .take(state.codebook_len)
                .map(<[f32]>::to_vec)
                .collect(),
        )
    }

    fn encode_locked(&self, state: &QuantizerState, vector: &[f32]) -> Vec<u8> {
        (0..self.num_subvectors)
            .map(|segment| {
                let start = segment * self.subvector_dim;
                let sub = &vector[start..start + self.subvector_dim];
                let book = &state.codebooks[segment][..state.codebook_len * self.subvector_dim];
                nearest(sub, book, self.subvector_dim) as u8
            })
            .collect()
    }

    fn centroid<'a>(&self, state: &'a QuantizerState, segment: usize, code: usize) -> &'a [f32] {
        let start = code * self.subvector_dim;
        &state.codebooks[segment][start..start + self.subvector_dim]
    }

    fn check_vector(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                what: "vector length",
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    fn check_codes(&self, state: &QuantizerState, codes: &[u8]) -> Result<()> {
        if codes.len() != self.num_subvectors {
            return Err(IndexError::DimensionMismatch {
                what: "code length",
                expected: self.num_subvectors,
                actual: codes.len(),
            });
        }
        check_codes(codes, state.codebook_len)
    }
}

fn check_codes(codes: &[u8], codebook_len: usize) -> Result<()> {
    match codes.iter().position(|&c| c as usize >= codebook_len) {
        Some(segment) => Err(IndexError::CodeOutOfRange {
            segment,
            code: codes[segment],
            codebook_len,
        }),
        None => Ok(()),
    }
}

/// Lloyd's algorithm over `points`, returning `k` flattened centroids.
fn lloyd<R: Rng + ?Sized>(
    points: &[&[f32]],
    k: usize,
    dim: usize,
    iterations: usize,
    rng: &mut R,
) -> Vec<f32> {
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.shuffle(rng);

    let mut centroids = Vec::with_capacity(k * dim);
    for &idx in order.iter().take(k) {
        centroids.extend_from_slice(points[idx]);
    }

    let mut sums = vec![0.0f64; k * dim];
    let mut counts = vec![0usize; k];

    for _ in 0..iterations {
        sums.iter_mut().for_each(|s| *s = 0.0);
        counts.iter_mut().for_each(|c| *c = 0);

        for point in points {
            let c = nearest(point, &centroids, dim);
            counts[c] += 1;
            for (acc, &x) in sums[c * dim..(c + 1) * dim].iter_mut().zip(point.iter()) {
                *acc += f64::from(x);
            }
        }

        for c in 0..k {
            if counts[c] == 0 {
                continue;
            }
            let n = counts[c] as f64;
            for d in 0..dim {
                centroids[c * dim + d] = (sums[c * dim + d] / n) as f32;
            }
        }
    }

    centroids
}

/// Index of the centroid in the flattened `book` closest to `point`.
fn nearest(point: &[f32], book: &[f32], dim: usize) -> usize {
    let mut best = 0;
    let mut best_dist = f32::INFINITY;
    for (idx, centroid) in book.chunks_exact(dim).enumerate() {
        let dist = squared_l2(point, centroid);
        if dist < best_dist {
            best_dist = dist;
            best = idx;
        }
    }
    best
}

#[inline]
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(&x, &y)| (x - y) * (x - y)).sum()
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

impl Clone for ProductQuantizer {
    fn clone(&self) -> Self {
        Self {
            dimension: self.dimension,
            num_subvectors: self.num_subvectors,
            subvector_dim: self.subvector_dim,
            code_size: self.code_size,
            state: RwLock::new(self.state.read().clone()),
        }
    }
}

impl fmt::Debug for ProductQuantizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProductQuantizer")
            .field("dimension", &self.dimension)
            .field("num_subvectors", &self.num_subvectors)
            .field("code_size", &self.code_size)
            .field("trained", &self.is_trained())
            .finish()
    }
}

impl ApproxIndex for ProductQuantizer {
    fn kind(&self) -> StructureKind {
        StructureKind::ProductQuantizer
    }

    fn validate(&self) -> Result<()> {
        let state = self.state.read();
        if state.codebooks.len() != self.num_subvectors {
            return Err(IndexError::Validation(format!(
                "Found {} codebooks, expected {}",
                state.codebooks.len(),
                self.num_subvectors
            )));
        }
        if state.codebook_len == 0 || state.codebook_len > self.code_size {
            return Err(IndexError::Validation(format!(
                "Codebook length {} outside 1..={}",
                state.codebook_len, self.code_size
            )));
        }
        for book in &state.codebooks {
            if book.len() < state.codebook_len * self.subvector_dim {
                return Err(IndexError::Validation("Codebook shorter than its length".into()));
            }
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        !self.is_trained()
    }

    fn memory_usage(&self) -> usize {
        let state = self.state.read();
        state.codebooks.iter().map(Vec::len).sum::<usize>() * std::mem::size_of::<f32>()
    }
}
