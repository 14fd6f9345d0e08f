// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

use crate::enums::StructureKind;
use crate::error::IndexError;

/// Common surface of the stateful approximate structures.
///
/// Every implementation guards its state with a single reader-writer lock, so all
/// methods take `&self` and an instance can be shared across threads behind an `Arc`.
///
/// # Requirements
///
/// - `validate` must hold after every public mutating operation.
/// - `memory_usage` reports the bytes held by the payload (counters, buckets,
///   codebooks, band tables), not allocator overhead.
pub trait ApproxIndex: Send + Sync {
    /// Which structure this is.
    fn kind(&self) -> StructureKind;

    /// Checks the internal shape invariants of the structure.
    fn validate(&self) -> Result<(), IndexError>;

    /// Returns true if nothing has been inserted (or the structure is untrained).
    fn is_empty(&self) -> bool;

    /// Approximate payload size in bytes.
    fn memory_usage(&self) -> usize;
}
