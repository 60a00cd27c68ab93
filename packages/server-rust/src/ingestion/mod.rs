//! Partition Ingestion Worker (§4.D): consumes a partition's
//! change-notification stream, merges notifications into the partition
//! queue, tracks offsets, and reconciles producer-endpoint membership.

pub mod source;
pub mod spawner;
pub mod worker;

pub use source::{FakeIngestionSource, IngestionSource};
pub use spawner::{IngestionWorkerSpawner, PartitionIngestionSnapshot};
pub use worker::{IngestionBatch, IngestionCounters, PartitionIngestionWorker};
