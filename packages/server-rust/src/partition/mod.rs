//! Partition ownership: the notification-set queue (`uveq`/`uveqf`), the
//! ownership state machine, and the cluster-membership collaborator
//! contract.

pub mod client;
pub mod manager;
pub mod queue;

pub use client::{FakePartitionClient, OwnedPartitions, PartitionClient, PartitionOwnershipCallback};
pub use manager::{PartitionHandle, PartitionManager, PartitionState, PartitionWorkerSpawner};
pub use queue::PartitionQueue;
