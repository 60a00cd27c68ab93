//! Control-Plane Introspection (Component I, §6): five read-only (plus one
//! administrative-write) HTTP requests exposing the live state the
//! Partition Manager and State Compression Loop otherwise keep private.

pub mod handlers;
pub mod types;

pub use handlers::{
    partition_ownership_handler, partition_status_handler, uve_table_alarm_handler,
    uve_table_info_handler, uve_table_perf_handler,
};
