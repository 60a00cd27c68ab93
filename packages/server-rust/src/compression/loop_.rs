//! `process-partition` and the per-iteration drive loop. Fills in the
//! donor's `BackgroundRunnable` scaffold with `Task = ()`: this activity
//! is purely tick-driven, there is nothing to submit.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use alarmgen_core::{AlarmInfo, KeyInfo, NotifHint, TableStats, UveKey, RESERVED_ALARM_STRUCT_TYPE};
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{info, warn};

use crate::alarm::AlarmPluginRegistry;
use crate::cache::UveCacheClient;
use crate::partition::PartitionManager;
use crate::publish::{AlarmgenPublisher, PublishMessage};
use crate::service::BackgroundRunnable;

/// Outcome of diffing and re-evaluating one UVE, consumed by the caller
/// to build the `agguve`/`alarm` publish batches.
struct UveResult {
    uve_key: UveKey,
    agguve: Option<PublishMessage>,
    agguve_extra: Vec<PublishMessage>,
    alarm: Option<PublishMessage>,
}

/// Owns `ptab_info`, `tab_alarms`, `tab_perf` exclusively; no other
/// component is permitted to write these (§5).
pub struct StateCompressionLoop {
    manager: Arc<PartitionManager>,
    cache: Arc<dyn UveCacheClient>,
    alarms: Arc<AlarmPluginRegistry>,
    publisher: Arc<dyn AlarmgenPublisher>,
    ptab_info: DashMap<u32, DashMap<UveKey, KeyInfo>>,
    tab_alarms: DashMap<String, DashMap<UveKey, BTreeMap<String, AlarmInfo>>>,
    tab_perf: DashMap<String, TableStats>,
    gen_id: String,
    http_port: u16,
    pacing_floor: Duration,
}

impl StateCompressionLoop {
    #[must_use]
    pub fn new(
        manager: Arc<PartitionManager>,
        cache: Arc<dyn UveCacheClient>,
        alarms: Arc<AlarmPluginRegistry>,
        publisher: Arc<dyn AlarmgenPublisher>,
        worker_id: &str,
        http_port: u16,
        pacing_floor: Duration,
    ) -> Self {
        Self {
            manager,
            cache,
            alarms,
            publisher,
            ptab_info: DashMap::new(),
            tab_alarms: DashMap::new(),
            tab_perf: DashMap::new(),
            gen_id: worker_id.to_string(),
            http_port,
            pacing_floor,
        }
    }

    /// Read-only access for introspection handlers.
    #[must_use]
    pub fn ptab_info(&self) -> &DashMap<u32, DashMap<UveKey, KeyInfo>> {
        &self.ptab_info
    }

    #[must_use]
    pub fn tab_alarms(&self) -> &DashMap<String, DashMap<UveKey, BTreeMap<String, AlarmInfo>>> {
        &self.tab_alarms
    }

    #[must_use]
    pub fn tab_perf(&self) -> &DashMap<String, TableStats> {
        &self.tab_perf
    }

    /// One full pass: drain teardown, snapshot-and-swap every owned
    /// partition's queue, process each concurrently, publish or requeue,
    /// and pace to the 500ms floor.
    pub async fn run_iteration(&self) {
        let started = Instant::now();

        self.drain_teardowns();

        let owned = self.manager.owned_partitions();
        let mut handles = Vec::new();
        for partition in owned {
            let Some(handle) = self.manager.handle(partition) else {
                continue;
            };
            if handle.queue.is_empty() {
                continue;
            }
            let pending = handle.queue.swap_out();
            if pending.is_empty() {
                continue;
            }
            handles.push((partition, handle, pending));
        }

        // One process-partition pass per owned partition. The spec permits
        // but does not require true concurrency across partitions (§5: "no
        // ordering is guaranteed across ... partitions"); each pass still
        // suspends on cache/publish I/O so other tokio tasks make progress
        // in between.
        for (partition, handle, pending) in handles {
            let coll = handle.acquired_at_us();
            let (agguve, alarm, success) = self.process_partition(partition, &pending, coll).await;
            if !success {
                warn!(partition, "partition processing reported failure, requeueing");
                handle.queue.requeue(pending);
                continue;
            }
            if agguve.is_empty() && alarm.is_empty() {
                continue;
            }
            if let Err(err) = self.publisher.publish(partition, agguve, alarm).await {
                warn!(partition, error = %err, "publish failed, requeueing pending set");
                handle.queue.requeue(pending);
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }

        let elapsed = started.elapsed();
        if elapsed < self.pacing_floor {
            tokio::time::sleep(self.pacing_floor - elapsed).await;
        }
    }

    /// Step 1: for every partition the manager has marked releasing, free
    /// its `ptab_info`, withdraw `tab_alarms` entries belonging to it
    /// (emitting `deleted=true` traces), then acknowledge the teardown.
    fn drain_teardowns(&self) {
        for (partition, _handle) in self.manager.partitions_pending_teardown() {
            let Some((_, uves)) = self.ptab_info.remove(&partition) else {
                self.manager.finish_teardown(partition);
                continue;
            };
            let released_keys: Vec<UveKey> = uves.iter().map(|entry| entry.key().clone()).collect();
            for uve_key in released_keys {
                if let Some(table_alarms) = self.tab_alarms.get(&uve_key.table) {
                    if table_alarms.remove(&uve_key).is_some() {
                        info!(partition, uve = %uve_key, "withdrawing alarms on partition release");
                    }
                }
            }
            self.manager.finish_teardown(partition);
        }
    }

    /// `process-partition(p, pending)`: see §4.F for the exact per-UVE
    /// algorithm. Returns `(agguve messages, alarm messages, success)`.
    async fn process_partition(
        &self,
        partition: u32,
        pending: &BTreeMap<String, NotifHint>,
        coll: i64,
    ) -> (Vec<PublishMessage>, Vec<PublishMessage>, bool) {
        let mut success = true;
        let mut agguve_out = Vec::new();
        let mut alarm_out = Vec::new();

        for (uve_key_str, hint) in pending {
            let Ok(uve_key) = uve_key_str.parse::<UveKey>() else {
                warn!(partition, uve = uve_key_str, "malformed UVE key in notification set, dropping");
                continue;
            };

            let filters = match hint {
                NotifHint::Null => None,
                NotifHint::Hints(set) => Some(set),
            };
            let get_started = Instant::now();
            let (failure, mut contents) = self.cache.get(&uve_key, filters).await;
            let get_time = get_started.elapsed();
            if failure {
                success = false;
            }
            contents.remove(RESERVED_ALARM_STRUCT_TYPE);

            let pub_started = Instant::now();
            let table_map = self.ptab_info.entry(partition).or_default();
            let mut key_info = table_map.entry(uve_key.clone()).or_default();

            if matches!(hint, NotifHint::Null) {
                key_info.full_update(contents);
            } else if let NotifHint::Hints(struct_types) = hint {
                for struct_type in struct_types {
                    let value = self.ptab_info_lookup_value(&contents, struct_type);
                    key_info.single_update(struct_type, value);
                }
            }

            let mut uve_deltas: BTreeMap<String, Option<serde_json::Value>> = BTreeMap::new();
            if !key_info.added().is_empty() || !key_info.removed().is_empty() || !key_info.changed().is_empty() {
                for removed_type in key_info.removed() {
                    uve_deltas.insert(removed_type.clone(), None);
                }
                for changed_type in key_info.added().union(key_info.changed()) {
                    if let Some(value) = key_info.values().get(changed_type) {
                        uve_deltas.insert(changed_type.clone(), Some(value.clone()));
                    }
                }
            }

            let mut call_time = Duration::ZERO;
            let result = if key_info.is_empty() {
                drop(key_info);
                let _ = table_map.remove(&uve_key);
                self.withdraw_alarms_for_uve(partition, &uve_key.table, &uve_key);
                UveResult {
                    uve_key: uve_key.clone(),
                    agguve: Some(PublishMessage::uve_update(uve_key.clone(), self.gen_id.clone(), coll, None, None)),
                    agguve_extra: Vec::new(),
                    alarm: Some(PublishMessage::uve_update(uve_key, self.gen_id.clone(), coll, Some(RESERVED_ALARM_STRUCT_TYPE.to_string()), None)),
                }
            } else {
                let values = key_info.values().clone();
                drop(key_info);
                let call_started = Instant::now();
                let alarm_message = self.evaluate_and_diff_alarms(partition, &uve_key, &values, coll);
                call_time = call_started.elapsed();

                let agguve_extra: Vec<PublishMessage> = uve_deltas
                    .into_iter()
                    .map(|(struct_type, value)| {
                        PublishMessage::uve_update(uve_key.clone(), self.gen_id.clone(), coll, Some(struct_type), value)
                    })
                    .collect();

                UveResult {
                    uve_key,
                    agguve: None,
                    agguve_extra,
                    alarm: alarm_message,
                }
            };
            let pub_time = pub_started.elapsed().saturating_sub(call_time);

            if let Some(msg) = result.agguve {
                agguve_out.push(msg);
            }
            agguve_out.extend(result.agguve_extra);
            if let Some(msg) = result.alarm {
                alarm_out.push(msg);
            }

            self.record_perf(&result.uve_key.table, get_time, pub_time, call_time);
        }

        (agguve_out, alarm_out, success)
    }

    fn ptab_info_lookup_value(
        &self,
        contents: &BTreeMap<String, serde_json::Value>,
        struct_type: &str,
    ) -> Option<serde_json::Value> {
        contents.get(struct_type).cloned()
    }

    fn withdraw_alarms_for_uve(&self, partition: u32, table: &str, uve_key: &UveKey) {
        if let Some(table_alarms) = self.tab_alarms.get(table) {
            if table_alarms.remove(uve_key).is_some() {
                info!(partition, uve = %uve_key, "whole-UVE delete, withdrawing alarms");
            }
        }
    }

    /// Runs every evaluator for `table`, diffs the result against
    /// `tab_alarms[table][uv]` under content-equality, stamps genuinely
    /// new/changed entries, and returns the alarm publish message if
    /// anything changed.
    fn evaluate_and_diff_alarms(
        &self,
        partition: u32,
        uve_key: &UveKey,
        values: &BTreeMap<String, serde_json::Value>,
        coll: i64,
    ) -> Option<PublishMessage> {
        let evaluated = self.alarms.evaluate_all(&uve_key.table, uve_key, values);
        let new_alarms: BTreeMap<String, AlarmInfo> = evaluated
            .into_iter()
            .filter(|(_, _, description)| !description.is_empty())
            .map(|(alarm_type, severity, description)| {
                (alarm_type.clone(), AlarmInfo::unstamped(alarm_type, severity, description))
            })
            .collect();

        let table_alarms = self.tab_alarms.entry(uve_key.table.clone()).or_default();
        let mut existing = table_alarms.entry(uve_key.clone()).or_default();

        let del_types: Vec<String> = existing
            .keys()
            .filter(|alarm_type| !new_alarms.contains_key(*alarm_type))
            .cloned()
            .collect();
        let to_install: Vec<AlarmInfo> = new_alarms
            .into_iter()
            .filter(|(alarm_type, info)| match existing.get(alarm_type) {
                Some(current) => !current.content_eq(info),
                None => true,
            })
            .map(|(_, info)| info)
            .collect();

        if del_types.is_empty() && to_install.is_empty() {
            return None;
        }

        let now_ms = now_millis();
        for info in to_install {
            let stamped = info.stamp(&self.gen_id, self.http_port, now_ms);
            let _ = existing.insert(stamped.alarm_type.clone(), stamped);
        }
        for alarm_type in &del_types {
            let _ = existing.remove(alarm_type);
        }

        if existing.is_empty() {
            drop(existing);
            let _ = table_alarms.remove(uve_key);
            info!(partition, uve = %uve_key, "all alarms cleared");
            Some(PublishMessage::uve_update(
                uve_key.clone(),
                self.gen_id.clone(),
                coll,
                Some(RESERVED_ALARM_STRUCT_TYPE.to_string()),
                None,
            ))
        } else {
            let active: Vec<AlarmInfo> = existing.values().cloned().collect();
            info!(partition, uve = %uve_key, count = active.len(), "alarm set updated");
            Some(PublishMessage::uve_update(
                uve_key.clone(),
                self.gen_id.clone(),
                coll,
                Some(RESERVED_ALARM_STRUCT_TYPE.to_string()),
                Some(serde_json::to_value(active).expect("alarm list is always serializable")),
            ))
        }
    }

    fn record_perf(&self, table: &str, get_time: Duration, pub_time: Duration, call_time: Duration) {
        let mut stats = self.tab_perf.entry(table.to_string()).or_default();
        stats.record(
            get_time.as_micros() as u64,
            pub_time.as_micros() as u64,
            call_time.as_micros() as u64,
        );
    }
}

#[async_trait]
impl BackgroundRunnable for StateCompressionLoop {
    type Task = ();

    async fn run(&mut self, (): ()) {}

    async fn on_tick(&mut self) {
        self.run_iteration().await;
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
