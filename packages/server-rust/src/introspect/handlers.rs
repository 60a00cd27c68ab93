//! The five introspection handlers (§6, §9). Every "all" variant iterates
//! the closed configured set (`0..partition_count`, or the configured
//! table list) rather than a live `DashMap`'s keys — the fix for the
//! donor's known latent bug where an unpopulated or just-torn-down entry
//! silently dropped out of an "all" response instead of being reported
//! as absent/disabled.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::Json;

use crate::network::AppState;

use super::types::{
    PartitionOwnershipRequest, PartitionOwnershipResponse, PartitionStatusEntry,
    PartitionStatusResponse, PartitionUveTableInfo, UveAlarms, UveObjectInfo, UveStructInfo,
    UveTableAlarmEntry, UveTableAlarmResponse, UveTableInfoEntry, UveTableInfoResponse,
    UveTablePerfEntry, UveTablePerfResponse, UveTypeCount,
};

/// `POST /introspect/partition-ownership`: administrative override of the
/// Partition Manager, bypassing cluster-membership callbacks entirely.
pub async fn partition_ownership_handler(
    State(state): State<AppState>,
    Json(req): Json<PartitionOwnershipRequest>,
) -> Json<PartitionOwnershipResponse> {
    let mut owned: std::collections::BTreeSet<u32> =
        state.partition_manager.owned_partitions().into_iter().collect();
    if req.ownership {
        owned.insert(req.partition);
    } else {
        owned.remove(&req.partition);
    }
    state.partition_manager.apply_ownership_change(owned).await;

    let now_owned = state.partition_manager.handle(req.partition).is_some() == req.ownership;
    Json(PartitionOwnershipResponse { status: now_owned })
}

/// `GET /introspect/partition-status/{partition}`. `partition = "all"`
/// iterates `0..partition_count`.
pub async fn partition_status_handler(
    State(state): State<AppState>,
    Path(partition): Path<String>,
) -> Json<PartitionStatusResponse> {
    let parts = resolve_partitions(&partition, state.config.partition_count);

    let entries = parts
        .into_iter()
        .map(|p| {
            let Some(handle) = state.partition_manager.handle(p) else {
                return PartitionStatusEntry {
                    partition: p,
                    enabled: false,
                    offset: 0,
                    uve_key_types: BTreeMap::new(),
                };
            };
            let snapshot = state.ingestion_spawner.snapshot(p);
            let offset = snapshot.as_ref().map_or(0, |s| s.offset());

            let mut uve_key_types = BTreeMap::new();
            if let Some(table_map) = state.compression.ptab_info().get(&p) {
                for entry in table_map.iter() {
                    let key_info = entry.value();
                    let counts: Vec<UveTypeCount> = key_info
                        .values()
                        .keys()
                        .map(|struct_type| UveTypeCount {
                            struct_type: struct_type.clone(),
                            count: 1,
                        })
                        .collect();
                    uve_key_types.insert(entry.key().to_string(), counts);
                }
            }

            PartitionStatusEntry {
                partition: p,
                enabled: handle.is_healthy(),
                offset,
                uve_key_types,
            }
        })
        .collect();

    Json(PartitionStatusResponse { partitions: entries })
}

/// `GET /introspect/uve-table-info/{partition}`.
pub async fn uve_table_info_handler(
    State(state): State<AppState>,
    Path(partition): Path<String>,
) -> Json<UveTableInfoResponse> {
    let parts = resolve_partitions(&partition, state.config.partition_count);

    let partitions = parts
        .into_iter()
        .map(|p| {
            let mut by_table: BTreeMap<String, Vec<UveObjectInfo>> = BTreeMap::new();
            if let Some(table_map) = state.compression.ptab_info().get(&p) {
                for entry in table_map.iter() {
                    let uve_key = entry.key();
                    let key_info = entry.value();
                    let structs = key_info
                        .values()
                        .iter()
                        .map(|(struct_type, content)| UveStructInfo {
                            struct_type: struct_type.clone(),
                            content: content.clone(),
                        })
                        .collect();
                    by_table.entry(uve_key.table.clone()).or_default().push(UveObjectInfo {
                        name: uve_key.name.clone(),
                        structs,
                    });
                }
            }
            PartitionUveTableInfo {
                partition: p,
                tables: by_table
                    .into_iter()
                    .map(|(table, uves)| UveTableInfoEntry { table, uves })
                    .collect(),
            }
        })
        .collect();

    Json(UveTableInfoResponse { partitions })
}

/// `GET /introspect/uve-table-alarm/{table}`. `table = "all"` iterates the
/// configured table list.
pub async fn uve_table_alarm_handler(
    State(state): State<AppState>,
    Path(table): Path<String>,
) -> Json<UveTableAlarmResponse> {
    let tables = resolve_tables(&table, &state.config.tables);

    let entries = tables
        .into_iter()
        .map(|table| {
            let uves = state
                .compression
                .tab_alarms()
                .get(&table)
                .map(|table_alarms| {
                    table_alarms
                        .iter()
                        .map(|entry| UveAlarms {
                            name: entry.key().name.clone(),
                            alarms: entry.value().values().cloned().collect(),
                        })
                        .collect()
                })
                .unwrap_or_default();
            UveTableAlarmEntry { table, uves }
        })
        .collect();

    Json(UveTableAlarmResponse { tables: entries })
}

/// `GET /introspect/uve-table-perf/{table}`. `table = "all"` iterates the
/// configured table list; a table with no recorded updates yet still gets
/// a zeroed entry rather than being silently absent (the donor's
/// `handle_UVETablePerfReq` skips a presence check and can panic here).
pub async fn uve_table_perf_handler(
    State(state): State<AppState>,
    Path(table): Path<String>,
) -> Json<UveTablePerfResponse> {
    let tables = resolve_tables(&table, &state.config.tables);

    let entries = tables
        .into_iter()
        .map(|table| {
            let Some(stats) = state.compression.tab_perf().get(&table) else {
                return UveTablePerfEntry { table, get_time: 0, pub_time: 0, call_time: 0, updates: 0 };
            };
            let Some(prev) = stats.previous() else {
                return UveTablePerfEntry { table, get_time: 0, pub_time: 0, call_time: 0, updates: 0 };
            };
            UveTablePerfEntry {
                table,
                get_time: prev.avg_get_time_us(),
                pub_time: prev.avg_pub_time_us(),
                call_time: prev.avg_call_time_us(),
                updates: prev.updates,
            }
        })
        .collect();

    Json(UveTablePerfResponse { tables: entries })
}

fn resolve_partitions(requested: &str, partition_count: u32) -> Vec<u32> {
    if requested == "all" {
        (0..partition_count).collect()
    } else {
        requested.parse().into_iter().collect()
    }
}

fn resolve_tables(requested: &str, configured: &[String]) -> Vec<String> {
    if requested == "all" {
        configured.to_vec()
    } else {
        vec![requested.to_string()]
    }
}
