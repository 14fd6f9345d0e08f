//! # approx-index
//!
//! Approximate data structures for frequency, membership, vector-distance and
//! set-similarity queries over large data:
//!
//! - [`CountMinSketch`]: point frequency estimates that never undercount.
//! - [`CuckooFilter`]: set membership with deletion and no false negatives.
//! - [`ProductQuantizer`]: byte-code compression of dense vectors with fast approximate
//!   distances.
//! - [`MinHash`] and [`MinHashLsh`]: Jaccard similarity estimation and sub-linear
//!   candidate retrieval.
//!
//! Every stateful structure guards its state with one reader-writer lock and exposes
//! `&self` methods, so a single instance can be shared across threads behind an `Arc`.

pub mod config;
pub mod count_min;
pub mod cuckoo;
pub mod enums;
pub mod error;
pub mod hash;
pub mod lsh;
pub mod minhash;
pub mod quantizer;
pub mod traits;

// Re-export core traits
pub use enums::StructureKind;
pub use error::IndexError;
pub use traits::ApproxIndex;

pub use count_min::CountMinSketch;
pub use cuckoo::{CuckooFilter, FilterStats};
pub use lsh::MinHashLsh;
pub use minhash::{tokenize, MinHash, MinHashSignature};
pub use quantizer::{DistanceTable, ProductQuantizer};
