// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

use thiserror::Error;

/// Error type for index operations.
///
/// Capacity exhaustion (a full cuckoo filter) is not an error: `CuckooFilter::add`
/// reports it as `false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("Dimension mismatch in {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Incompatible signature: expected {expected} hashes, got {actual}")]
    IncompatibleSignature { expected: usize, actual: usize },
    #[error("Signatures were built from different hash seed sets")]
    SeedMismatch,
    #[error("Code {code} in segment {segment} is out of range for a codebook of {codebook_len}")]
    CodeOutOfRange {
        segment: usize,
        code: u8,
        codebook_len: usize,
    },
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, IndexError>;
