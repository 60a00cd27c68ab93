//! Wire types for the five introspection request/response pairs (§6/§9).
//! Field names intentionally mirror the original Sandesh structs'
//! lower-`snake_case` so operators familiar with that surface recognize
//! the shape immediately.

use alarmgen_core::AlarmInfo;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Deserialize)]
pub struct PartitionOwnershipRequest {
    pub partition: u32,
    pub ownership: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartitionOwnershipResponse {
    pub status: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UveTypeCount {
    #[serde(rename = "type")]
    pub struct_type: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartitionStatusEntry {
    pub partition: u32,
    pub enabled: bool,
    pub offset: u64,
    /// `{table}:{name}` -> per-struct-type counts, flattened from the
    /// collector/generator nesting the distilled spec's `ptab_info`
    /// retains only as table granularity at this layer.
    pub uve_key_types: std::collections::BTreeMap<String, Vec<UveTypeCount>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartitionStatusResponse {
    pub partitions: Vec<PartitionStatusEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UveStructInfo {
    #[serde(rename = "type")]
    pub struct_type: String,
    pub content: JsonValue,
}

#[derive(Debug, Clone, Serialize)]
pub struct UveObjectInfo {
    pub name: String,
    pub structs: Vec<UveStructInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UveTableInfoEntry {
    pub table: String,
    pub uves: Vec<UveObjectInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartitionUveTableInfo {
    pub partition: u32,
    pub tables: Vec<UveTableInfoEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UveTableInfoResponse {
    pub partitions: Vec<PartitionUveTableInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UveAlarms {
    pub name: String,
    pub alarms: Vec<AlarmInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UveTableAlarmEntry {
    pub table: String,
    pub uves: Vec<UveAlarms>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UveTableAlarmResponse {
    pub tables: Vec<UveTableAlarmEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UveTablePerfEntry {
    pub table: String,
    pub get_time: u64,
    pub pub_time: u64,
    pub call_time: u64,
    pub updates: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UveTablePerfResponse {
    pub tables: Vec<UveTablePerfEntry>,
}
