//! `AlarmEvaluator` trait and the table-keyed registry that resolves a
//! name to a list of evaluators, grounded on the donor's name-keyed
//! `DashMap` of trait objects (`ServiceRegistry`) generalized to a
//! one-to-many mapping: a table may have zero, one, or several rules.

use std::collections::BTreeMap;
use std::sync::Arc;

use alarmgen_core::{AlarmDescription, UveKey};
use dashmap::DashMap;
use serde_json::Value as JsonValue;
use tracing::warn;

/// One alarm rule. Given a UVE's key and its current sub-record map,
/// returns `Some((alarm-type, severity, description-list))` if the rule
/// fires, `None` otherwise. `description-list` may be empty.
pub trait AlarmEvaluator: Send + Sync {
    fn name(&self) -> &'static str;

    fn evaluate(
        &self,
        uve_key: &UveKey,
        values: &BTreeMap<String, JsonValue>,
    ) -> Option<(String, String, Vec<AlarmDescription>)>;
}

/// Registry of evaluators keyed by table name. A table with no registered
/// evaluators is simply never alarmed on; loading a single evaluator
/// failing never prevents others for the same table from running.
#[derive(Default)]
pub struct AlarmPluginRegistry {
    by_table: DashMap<String, Vec<Arc<dyn AlarmEvaluator>>>,
}

impl AlarmPluginRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `evaluator` for `table`. Logged and returns `false`
    /// (never panics or propagates) if a same-name evaluator is already
    /// registered for that table — a load failure per §4.E, §7 kind 2.
    pub fn register(&self, table: impl Into<String>, evaluator: Arc<dyn AlarmEvaluator>) -> bool {
        let table = table.into();
        let mut entry = self.by_table.entry(table.clone()).or_default();
        if entry.iter().any(|existing| existing.name() == evaluator.name()) {
            warn!(table = %table, evaluator = evaluator.name(), "duplicate alarm evaluator name, skipping");
            return false;
        }
        entry.push(evaluator);
        true
    }

    /// Runs every evaluator registered for `table` against one UVE's
    /// current contents, collecting non-empty results. An evaluator that
    /// is absent for this table simply contributes nothing.
    #[must_use]
    pub fn evaluate_all(
        &self,
        table: &str,
        uve_key: &UveKey,
        values: &BTreeMap<String, JsonValue>,
    ) -> Vec<(String, String, Vec<AlarmDescription>)> {
        let Some(evaluators) = self.by_table.get(table) else {
            return Vec::new();
        };
        evaluators
            .iter()
            .filter_map(|evaluator| evaluator.evaluate(uve_key, values))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct HighLoad;

    impl AlarmEvaluator for HighLoad {
        fn name(&self) -> &'static str {
            "high-load"
        }

        fn evaluate(
            &self,
            _uve_key: &UveKey,
            values: &BTreeMap<String, JsonValue>,
        ) -> Option<(String, String, Vec<AlarmDescription>)> {
            let load = values.get("CpuInfo")?.get("load")?.as_i64()?;
            if load > 1 {
                Some((
                    "HighLoad".to_string(),
                    "MAJOR".to_string(),
                    vec![AlarmDescription {
                        rule: "load>threshold".to_string(),
                        value: load.to_string(),
                    }],
                ))
            } else {
                None
            }
        }
    }

    #[test]
    fn unregistered_table_yields_no_alarms() {
        let registry = AlarmPluginRegistry::new();
        let key = UveKey::new("ObjectVRouter", "vr1");
        let result = registry.evaluate_all("ObjectVRouter", &key, &BTreeMap::new());
        assert!(result.is_empty());
    }

    #[test]
    fn registered_evaluator_fires_when_condition_met() {
        let registry = AlarmPluginRegistry::new();
        registry.register("ObjectVRouter", Arc::new(HighLoad));

        let key = UveKey::new("ObjectVRouter", "vr1");
        let values = BTreeMap::from([("CpuInfo".to_string(), json!({"load": 2}))]);
        let result = registry.evaluate_all("ObjectVRouter", &key, &values);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].0, "HighLoad");
    }

    #[test]
    fn evaluator_not_met_yields_nothing() {
        let registry = AlarmPluginRegistry::new();
        registry.register("ObjectVRouter", Arc::new(HighLoad));

        let key = UveKey::new("ObjectVRouter", "vr1");
        let values = BTreeMap::from([("CpuInfo".to_string(), json!({"load": 1}))]);
        assert!(registry.evaluate_all("ObjectVRouter", &key, &values).is_empty());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let registry = AlarmPluginRegistry::new();
        assert!(registry.register("ObjectVRouter", Arc::new(HighLoad)));
        assert!(!registry.register("ObjectVRouter", Arc::new(HighLoad)));
    }
}
