//! Snapshot Diff (`KeyInfo`): per-UVE sub-record map with added/removed/
//! changed/unchanged set computation on update.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value as JsonValue;

/// The current sub-record map for one UVE, plus the diff produced by the
/// most recent update.
///
/// `current` holds `struct-type -> value`. The four sets below are valid
/// only immediately after a call to [`KeyInfo::full_update`] or
/// [`KeyInfo::single_update`]; each call overwrites them from scratch.
#[derive(Debug, Clone, Default)]
pub struct KeyInfo {
    current: BTreeMap<String, JsonValue>,
    added: BTreeSet<String>,
    removed: BTreeSet<String>,
    changed: BTreeSet<String>,
    unchanged: BTreeSet<String>,
}

impl KeyInfo {
    /// Creates an empty `KeyInfo` with no sub-records and empty diff sets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The live struct-type -> value mapping.
    #[must_use]
    pub fn values(&self) -> &BTreeMap<String, JsonValue> {
        &self.current
    }

    #[must_use]
    pub fn added(&self) -> &BTreeSet<String> {
        &self.added
    }

    #[must_use]
    pub fn removed(&self) -> &BTreeSet<String> {
        &self.removed
    }

    #[must_use]
    pub fn changed(&self) -> &BTreeSet<String> {
        &self.changed
    }

    #[must_use]
    pub fn unchanged(&self) -> &BTreeSet<String> {
        &self.unchanged
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Replaces the entire mapping, computing added/removed/changed/unchanged
    /// by set arithmetic on keys plus value-inequality on the intersection.
    ///
    /// An empty `new_mapping` clears the UVE: `removed` becomes every key
    /// that was previously present.
    pub fn full_update(&mut self, new_mapping: BTreeMap<String, JsonValue>) {
        let mut added = BTreeSet::new();
        let mut removed = BTreeSet::new();
        let mut changed = BTreeSet::new();
        let mut unchanged = BTreeSet::new();

        for key in self.current.keys() {
            if !new_mapping.contains_key(key) {
                removed.insert(key.clone());
            }
        }
        for (key, new_val) in &new_mapping {
            match self.current.get(key) {
                None => {
                    added.insert(key.clone());
                }
                Some(old_val) => {
                    if old_val == new_val {
                        unchanged.insert(key.clone());
                    } else {
                        changed.insert(key.clone());
                    }
                }
            }
        }

        self.current = new_mapping;
        self.added = added;
        self.removed = removed;
        self.changed = changed;
        self.unchanged = unchanged;
    }

    /// Applies one `(struct-type, value)` update, or removes the struct-type
    /// if `value` is `None` (absent). The three other sets are left empty;
    /// only the one affected type appears in whichever set applies.
    pub fn single_update(&mut self, struct_type: &str, value: Option<JsonValue>) {
        self.added.clear();
        self.removed.clear();
        self.changed.clear();
        self.unchanged.clear();

        match value {
            None => {
                if self.current.remove(struct_type).is_some() {
                    self.removed.insert(struct_type.to_string());
                }
            }
            Some(new_val) => match self.current.get(struct_type) {
                None => {
                    self.current.insert(struct_type.to_string(), new_val);
                    self.added.insert(struct_type.to_string());
                }
                Some(old_val) if *old_val == new_val => {
                    self.unchanged.insert(struct_type.to_string());
                }
                Some(_) => {
                    self.current.insert(struct_type.to_string(), new_val);
                    self.changed.insert(struct_type.to_string());
                }
            },
        }
    }
}


#[cfg(test)]
mod proptests {
    use std::collections::BTreeMap;

    use proptest::prelude::*;
    use serde_json::Value as JsonValue;

    use super::KeyInfo;

    fn arb_mapping() -> impl Strategy<Value = BTreeMap<String, JsonValue>> {
        prop::collection::btree_map(
            "[A-D]",
            prop::num::i32::ANY.prop_map(|n| JsonValue::from(n)),
            0..4,
        )
    }

    proptest! {
        /// After any full update, `current == new_mapping`; the four diff
        /// sets partition `previous.keys() ∪ new_mapping.keys()` exactly.
        #[test]
        fn full_update_sets_partition_the_key_union(
            previous in arb_mapping(),
            next in arb_mapping(),
        ) {
            let mut ki = KeyInfo::new();
            ki.full_update(previous.clone());
            ki.full_update(next.clone());

            prop_assert_eq!(ki.values(), &next);

            let previous_keys: std::collections::BTreeSet<String> =
                previous.keys().cloned().collect();
            let next_keys: std::collections::BTreeSet<String> =
                next.keys().cloned().collect();
            let union: std::collections::BTreeSet<String> =
                previous_keys.union(&next_keys).cloned().collect();

            let mut accounted = ki.added().clone();
            accounted.extend(ki.removed().iter().cloned());
            accounted.extend(ki.changed().iter().cloned());
            accounted.extend(ki.unchanged().iter().cloned());
            prop_assert_eq!(accounted, union);

            prop_assert!(ki.added().is_disjoint(ki.removed()));
            prop_assert!(ki.added().is_disjoint(ki.changed()));
            prop_assert!(ki.added().is_disjoint(ki.unchanged()));
            prop_assert!(ki.removed().is_disjoint(ki.changed()));
            prop_assert!(ki.removed().is_disjoint(ki.unchanged()));
            prop_assert!(ki.changed().is_disjoint(ki.unchanged()));
        }

        /// `unchanged` is always `current.keys() \ (added ∪ removed ∪ changed)`.
        #[test]
        fn unchanged_is_current_minus_other_three(
            previous in arb_mapping(),
            next in arb_mapping(),
        ) {
            let mut ki = KeyInfo::new();
            ki.full_update(previous);
            ki.full_update(next);

            let current_keys: std::collections::BTreeSet<String> =
                ki.values().keys().cloned().collect();
            let mut other_three = ki.added().clone();
            other_three.extend(ki.removed().iter().cloned());
            other_three.extend(ki.changed().iter().cloned());
            let expected_unchanged: std::collections::BTreeSet<String> =
                current_keys.difference(&other_three).cloned().collect();
            prop_assert_eq!(ki.unchanged(), &expected_unchanged);
        }

        /// A single `absent` update for a present type reports it as
        /// `removed` and drops it from `current`.
        #[test]
        fn single_update_absent_removes_the_one_type(
            mapping in arb_mapping(),
        ) {
            prop_assume!(!mapping.is_empty());
            let target = mapping.keys().next().unwrap().clone();

            let mut ki = KeyInfo::new();
            ki.full_update(mapping);
            ki.single_update(&target, None);

            prop_assert_eq!(ki.removed(), &std::collections::BTreeSet::from([target.clone()]));
            prop_assert!(ki.values().get(&target).is_none());
            prop_assert!(ki.added().is_empty());
            prop_assert!(ki.changed().is_empty());
        }
    }
}
