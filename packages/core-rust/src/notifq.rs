//! Notification-set entries and the merge rule used by the Partition
//! Ingestion Worker (Component D) and the Partition Manager.

use std::collections::BTreeSet;

/// One UVE's entry in a partition's notification set.
///
/// `Null` means "re-read the whole UVE"; `Hints` enumerates the struct-types
/// hinted to have changed (values are always empty placeholders, so only the
/// key set matters).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifHint {
    Null,
    Hints(BTreeSet<String>),
}

impl NotifHint {
    #[must_use]
    pub fn hint(struct_type: impl Into<String>) -> Self {
        let mut set = BTreeSet::new();
        set.insert(struct_type.into());
        NotifHint::Hints(set)
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, NotifHint::Null)
    }
}

/// Merges an incoming notification `incoming` into an `existing` entry
/// (which may be absent), per the rules:
///
/// - Existing `Null` wins and remains `Null` (covers any incoming).
/// - Incoming `Null` overwrites any existing value to `Null`.
/// - Otherwise union the struct-type keys.
#[must_use]
pub fn merge_notif(existing: Option<NotifHint>, incoming: NotifHint) -> NotifHint {
    match (existing, incoming) {
        (Some(NotifHint::Null), _) => NotifHint::Null,
        (_, NotifHint::Null) => NotifHint::Null,
        (Some(NotifHint::Hints(mut existing_set)), NotifHint::Hints(incoming_set)) => {
            existing_set.extend(incoming_set);
            NotifHint::Hints(existing_set)
        }
        (None, NotifHint::Hints(incoming_set)) => NotifHint::Hints(incoming_set),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_existing_takes_incoming() {
        let merged = merge_notif(None, NotifHint::hint("CpuInfo"));
        assert_eq!(merged, NotifHint::hint("CpuInfo"));
    }

    #[test]
    fn existing_null_dominates_any_incoming() {
        let merged = merge_notif(Some(NotifHint::Null), NotifHint::hint("CpuInfo"));
        assert_eq!(merged, NotifHint::Null);
    }

    #[test]
    fn incoming_null_overwrites_existing_hints() {
        let merged = merge_notif(Some(NotifHint::hint("CpuInfo")), NotifHint::Null);
        assert_eq!(merged, NotifHint::Null);
    }

    #[test]
    fn hints_union_on_merge() {
        let merged = merge_notif(Some(NotifHint::hint("CpuInfo")), NotifHint::hint("MemInfo"));
        let NotifHint::Hints(set) = merged else {
            panic!("expected Hints");
        };
        assert_eq!(
            set,
            BTreeSet::from(["CpuInfo".to_string(), "MemInfo".to_string()])
        );
    }

    #[test]
    fn null_is_idempotent_under_repeated_merge() {
        let mut current: Option<NotifHint> = None;
        current = Some(merge_notif(current, NotifHint::Null));
        current = Some(merge_notif(current, NotifHint::hint("CpuInfo")));
        assert_eq!(current, Some(NotifHint::Null));
    }
}
