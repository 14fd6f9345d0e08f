// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! Non-cryptographic hashes shared by the structures.
//!
//! All structures hash the raw key bytes, so two callers that agree on the byte
//! encoding of a key always agree on its positions.

const FNV32_OFFSET: u32 = 0x811c_9dc5;
const FNV32_PRIME: u32 = 0x0100_0193;
const FNV64_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV64_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a, 32-bit.
#[inline]
pub fn fnv32a(bytes: &[u8]) -> u32 {
    let mut hash = FNV32_OFFSET;
    for &b in bytes {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(FNV32_PRIME);
    }
    hash
}

/// FNV-1 (multiply, then xor), 64-bit.
#[inline]
pub fn fnv64(bytes: &[u8]) -> u64 {
    let mut hash = FNV64_OFFSET;
    for &b in bytes {
        hash = hash.wrapping_mul(FNV64_PRIME);
        hash ^= u64::from(b);
    }
    hash
}

/// FNV-1a (xor, then multiply), 64-bit.
#[inline]
pub fn fnv64a(bytes: &[u8]) -> u64 {
    fnv64a_extend(FNV64_OFFSET, bytes)
}

/// Continues an FNV-1a state over more bytes.
#[inline]
pub(crate) fn fnv64a_extend(mut hash: u64, bytes: &[u8]) -> u64 {
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(FNV64_PRIME);
    }
    hash
}

/// FNV-1a over the little-endian bytes of each value in turn.
pub(crate) fn fnv64a_words(values: &[u64]) -> u64 {
    values
        .iter()
        .fold(FNV64_OFFSET, |h, v| fnv64a_extend(h, &v.to_le_bytes()))
}

/// SplitMix64 finalizer. A bijection on `u64` with full avalanche.
#[inline]
pub(crate) fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv_reference_vectors() {
        assert_eq!(fnv32a(b""), 0x811c_9dc5);
        assert_eq!(fnv32a(b"a"), 0xe40c_292c);
        assert_eq!(fnv64a(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv64a(b"a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(fnv64(b"a"), 0xaf63_bd4c_8601_b7be);
    }

    #[test]
    fn test_words_match_concatenated_bytes() {
        let words = [1u64, 2, 3];
        let mut bytes = Vec::new();
        for w in words {
            bytes.extend_from_slice(&w.to_le_bytes());
        }
        assert_eq!(fnv64a_words(&words), fnv64a(&bytes));
    }

    #[test]
    fn test_mix64_is_not_identity() {
        assert_eq!(mix64(0), 0);
        assert_ne!(mix64(1), 1);
        assert_ne!(mix64(1), mix64(2));
    }
}
