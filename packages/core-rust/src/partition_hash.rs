//! Partition hashing for UVE keys.
//!
//! The keyspace of UVEs is hashed into a fixed, configured number of
//! partitions; ownership of those partitions is distributed across cluster
//! members by the (externally specified) cluster-membership service. This
//! module only provides the hash function shared by every member.

use crate::hash::fnv1a_hash;

/// Default partition count, used when no explicit count is configured.
pub const DEFAULT_PARTITION_COUNT: u32 = 271;

/// Maps a UVE key (`table:name`) to a partition ID in `[0, partition_count)`.
///
/// # Panics
///
/// Panics if `partition_count` is zero.
#[must_use]
pub fn hash_to_partition(key: &str, partition_count: u32) -> u32 {
    assert!(partition_count > 0, "partition_count must be nonzero");
    fnv1a_hash(key) % partition_count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic_across_calls() {
        assert_eq!(
            hash_to_partition("ObjectVRouter:vr1", 271),
            hash_to_partition("ObjectVRouter:vr1", 271)
        );
    }

    #[test]
    fn hash_is_in_range() {
        for key in ["", "a", "ObjectVRouter:vr1", "ObjectBgpRouter:bgp99"] {
            let p = hash_to_partition(key, 271);
            assert!(p < 271);
        }
    }

    #[test]
    fn different_partition_counts_can_disagree() {
        let p_small = hash_to_partition("ObjectVRouter:vr1", 4);
        assert!(p_small < 4);
    }

    #[test]
    #[should_panic(expected = "partition_count must be nonzero")]
    fn zero_partition_count_panics() {
        hash_to_partition("x", 0);
    }
}
