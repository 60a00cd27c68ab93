//! FNV-1a hash utilities for partition routing.
//!
//! Provides a 32-bit FNV-1a hash that iterates over UTF-16 code units to match
//! the TypeScript `String.charCodeAt()` behavior, ensuring identical hashes
//! across Rust and TypeScript for cross-language partition routing.

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Computes a 32-bit FNV-1a hash over the UTF-16 code units of `s`.
///
/// Iterating by UTF-16 code unit (rather than by byte or `char`) matches the
/// behavior of `hashString()` on the TypeScript side, which walks
/// `s.charCodeAt(i)`.
#[must_use]
pub fn fnv1a_hash(s: &str) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for unit in s.encode_utf16() {
        hash ^= u32::from(unit);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Combines a sequence of hashes into a single hash, order-sensitive.
#[must_use]
pub fn combine_hashes(hashes: &[u32]) -> u32 {
    hashes
        .iter()
        .fold(FNV_OFFSET_BASIS, |acc, h| (acc ^ h).wrapping_mul(FNV_PRIME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_offset_basis() {
        assert_eq!(fnv1a_hash(""), FNV_OFFSET_BASIS);
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(fnv1a_hash("hello"), fnv1a_hash("hello"));
    }

    #[test]
    fn distinct_inputs_usually_differ() {
        assert_ne!(fnv1a_hash("hello"), fnv1a_hash("world"));
    }

    #[test]
    fn combine_hashes_is_order_sensitive() {
        let a = combine_hashes(&[1, 2, 3]);
        let b = combine_hashes(&[3, 2, 1]);
        assert_ne!(a, b);
    }
}
