//! Per-partition notification set (`uveq`/`uveqf`): the mapping the
//! ingestion worker writes into and the state-compression loop drains.

use std::collections::BTreeMap;

use alarmgen_core::{merge_notif, NotifHint};
use parking_lot::Mutex;

/// One partition's notification set plus its teardown flag.
///
/// The entry map and the teardown flag share one lock so that a worker's
/// merge and the manager's teardown signal never interleave: once
/// `mark_for_teardown` returns, no further merge can land in this queue.
pub struct PartitionQueue {
    inner: Mutex<QueueInner>,
}

struct QueueInner {
    entries: BTreeMap<String, NotifHint>,
    teardown: bool,
}

impl PartitionQueue {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                entries: BTreeMap::new(),
                teardown: false,
            }),
        }
    }

    /// Merges one incoming notification for `uve_key`, per the dominance
    /// rules in [`alarmgen_core::merge_notif`]. A no-op once torn down.
    pub fn merge(&self, uve_key: String, incoming: NotifHint) {
        let mut guard = self.inner.lock();
        if guard.teardown {
            return;
        }
        let existing = guard.entries.remove(&uve_key);
        guard.entries.insert(uve_key, merge_notif(existing, incoming));
    }

    /// Atomically swaps out the current entry set, leaving an empty one in
    /// its place. This is the compression loop's swap point: notifications
    /// merged after this call land in the fresh empty set.
    #[must_use]
    pub fn swap_out(&self) -> BTreeMap<String, NotifHint> {
        let mut guard = self.inner.lock();
        std::mem::take(&mut guard.entries)
    }

    /// Re-merges a previously swapped-out batch back in, e.g. after a
    /// failed processing pass. Entries already present take the existing
    /// dominance rules; this is itself a merge, not an overwrite.
    pub fn requeue(&self, pending: BTreeMap<String, NotifHint>) {
        let mut guard = self.inner.lock();
        if guard.teardown {
            return;
        }
        for (uve_key, hint) in pending {
            let existing = guard.entries.remove(&uve_key);
            guard.entries.insert(uve_key, merge_notif(existing, hint));
        }
    }

    /// Marks this queue for teardown; further merges are dropped silently.
    /// Returns the final pending set so the caller can decide what, if
    /// anything, to do with in-flight notifications (the compression loop
    /// discards them — partition release withdraws state unconditionally).
    pub fn mark_for_teardown(&self) -> BTreeMap<String, NotifHint> {
        let mut guard = self.inner.lock();
        guard.teardown = true;
        std::mem::take(&mut guard.entries)
    }

    #[must_use]
    pub fn is_marked_for_teardown(&self) -> bool {
        self.inner.lock().teardown
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }
}

impl Default for PartitionQueue {
    fn default() -> Self {
        Self::new()
    }
}
