//! Cluster-membership collaborator contract (§6: `PartitionClient`).
//!
//! The concrete membership service (ZooKeeper-backed or otherwise) is an
//! external collaborator; this module defines the contract the Partition
//! Manager is built against, plus a deterministic fake used by tests.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

/// The full ordered list of partitions now owned by this instance,
/// delivered on every membership change.
pub type OwnedPartitions = BTreeSet<u32>;

/// A callback invoked with the new owned-partition set whenever cluster
/// membership changes the assignment.
#[async_trait]
pub trait PartitionOwnershipCallback: Send + Sync + 'static {
    async fn on_ownership_changed(&self, owned: OwnedPartitions);
}

/// Cluster-membership collaborator contract. Constructed with the
/// `(service-name, self-id, member-list, partition-count, callback,
/// quorum-endpoints)` tuple from §6 and delivers ownership callbacks as
/// the cluster's membership view changes.
#[async_trait]
pub trait PartitionClient: Send + Sync + 'static {
    /// Replaces the known member list, e.g. when discovery reports a
    /// membership change out of band.
    async fn update_cluster_list(&self, members: Vec<String>);
}

/// Deterministic fake used by tests and no-discovery deployments: callers
/// drive ownership changes directly via [`FakePartitionClient::deliver`]
/// instead of through a real quorum service.
pub struct FakePartitionClient {
    callback: Arc<dyn PartitionOwnershipCallback>,
}

impl FakePartitionClient {
    #[must_use]
    pub fn new(callback: Arc<dyn PartitionOwnershipCallback>) -> Self {
        Self { callback }
    }

    /// Simulates a membership callback delivering a new owned-partition set.
    pub async fn deliver(&self, owned: OwnedPartitions) {
        self.callback.on_ownership_changed(owned).await;
    }
}

#[async_trait]
impl PartitionClient for FakePartitionClient {
    async fn update_cluster_list(&self, _members: Vec<String>) {}
}
