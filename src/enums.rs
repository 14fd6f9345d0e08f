// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

use crate::error::IndexError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Enumeration of the supported approximate structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureKind {
    CountMinSketch,
    CuckooFilter,
    ProductQuantizer,
    MinHashLsh,
}

impl StructureKind {
    /// The query shape answered by this structure.
    pub fn query_shape(&self) -> &'static str {
        match self {
            StructureKind::CountMinSketch => "frequency",
            StructureKind::CuckooFilter => "membership",
            StructureKind::ProductQuantizer => "vector-distance",
            StructureKind::MinHashLsh => "set-similarity",
        }
    }
}

impl fmt::Display for StructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureKind::CountMinSketch => write!(f, "CountMinSketch"),
            StructureKind::CuckooFilter => write!(f, "CuckooFilter"),
            StructureKind::ProductQuantizer => write!(f, "ProductQuantizer"),
            StructureKind::MinHashLsh => write!(f, "MinHashLsh"),
        }
    }
}

impl FromStr for StructureKind {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace(['_', '-'], "").to_lowercase().as_str() {
            "countminsketch" | "cms" => Ok(StructureKind::CountMinSketch),
            "cuckoofilter" | "cuckoo" => Ok(StructureKind::CuckooFilter),
            "productquantizer" | "pq" => Ok(StructureKind::ProductQuantizer),
            "minhashlsh" | "lsh" => Ok(StructureKind::MinHashLsh),
            _ => Err(IndexError::InvalidParameter(format!(
                "Unknown structure kind: {}",
                s
            ))),
        }
    }
}
