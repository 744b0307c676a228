//! Concurrent view of the latest record for every container.
//!
//! # Concurrency
//!
//! * The current state is an immutable [`Snapshot`] published through an
//!   [`ArcSwap`]. Readers take one atomic load and never wait on writers.
//! * Writers serialize on a short mutex, clone the map of record
//!   references (never the records themselves), apply their change, and
//!   publish the replacement with a bumped version.
//! * A snapshot handed to a reader is never mutated afterwards, so filter
//!   evaluation and result materialization run without any lock held.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use roster_common::types::{ContainerId, ContainerRecord, canonical_name};

/// Immutable, versioned set of container records.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    version: u64,
    records: HashMap<ContainerId, Arc<ContainerRecord>>,
}

impl Snapshot {
    /// Publication counter; strictly increases with every save or delete.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Number of records in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns whether the snapshot holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Looks up a record by exact identifier.
    #[must_use]
    pub fn get(&self, id: &ContainerId) -> Option<&Arc<ContainerRecord>> {
        self.records.get(id)
    }

    /// Iterates over all records in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ContainerRecord>> {
        self.records.values()
    }

    /// Resolves a user-supplied container reference.
    ///
    /// Tries an exact identifier, then an exact name (with or without the
    /// leading separator), then a unique identifier prefix. An ambiguous
    /// prefix resolves to nothing.
    #[must_use]
    pub fn resolve(&self, reference: &str) -> Option<&Arc<ContainerRecord>> {
        if reference.is_empty() {
            return None;
        }
        if let Some(rec) = self.records.get(&ContainerId::new(reference)) {
            return Some(rec);
        }
        let name = canonical_name(reference);
        if let Some(rec) = self.records.values().find(|r| r.name == name) {
            return Some(rec);
        }
        let mut matches = self
            .records
            .values()
            .filter(|r| r.id.as_str().starts_with(reference));
        let first = matches.next()?;
        if matches.next().is_some() {
            tracing::debug!(reference, "ambiguous container reference");
            return None;
        }
        Some(first)
    }
}

/// Latest record per container, readable without blocking writers.
#[derive(Debug, Default)]
pub struct ViewStore {
    current: ArcSwap<Snapshot>,
    writer: Mutex<()>,
}

impl ViewStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the record for its identifier.
    ///
    /// The record becomes visible to every snapshot taken after this call
    /// returns. Readers see either the previous record or this one whole.
    pub fn save(&self, record: ContainerRecord) {
        let _ = self.replace(record);
    }

    /// Like [`save`](Self::save), returning the record it replaced.
    pub fn replace(&self, record: ContainerRecord) -> Option<Arc<ContainerRecord>> {
        let id = record.id.clone();
        let record = Arc::new(record);
        let mut previous = None;
        let version = self.publish(|records| {
            previous = records.insert(id.clone(), record);
        });
        tracing::trace!(id = %id, version, "record saved");
        previous
    }

    /// Edits the current record for `id` in place, returning the record as
    /// it was before the edit.
    ///
    /// The lookup and the publish happen under the writer lock, so the edit
    /// never resurrects a deleted record nor overwrites a concurrent save.
    /// Nothing is published when `id` is unknown.
    pub fn update(
        &self,
        id: &ContainerId,
        edit: impl FnOnce(&mut ContainerRecord),
    ) -> Option<Arc<ContainerRecord>> {
        let _guard = self.writer.lock();
        let cur = self.current.load();
        let previous = Arc::clone(cur.records.get(id)?);
        let mut updated = (*previous).clone();
        edit(&mut updated);

        let mut records = cur.records.clone();
        let _ = records.insert(id.clone(), Arc::new(updated));
        let version = cur.version + 1;
        self.current.store(Arc::new(Snapshot { version, records }));
        tracing::trace!(id = %id, version, "record updated");
        Some(previous)
    }

    /// Removes the record for `id`. Deleting an unknown id is a no-op.
    pub fn delete(&self, id: &ContainerId) -> Option<Arc<ContainerRecord>> {
        let mut removed = None;
        let version = self.publish(|records| {
            removed = records.remove(id);
        });
        tracing::trace!(id = %id, version, found = removed.is_some(), "record deleted");
        removed
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Returns the current record for `id`.
    #[must_use]
    pub fn get(&self, id: &ContainerId) -> Option<Arc<ContainerRecord>> {
        self.current.load().get(id).cloned()
    }

    /// Number of records currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    /// Returns whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }

    /// Version of the currently published snapshot.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.current.load().version
    }

    fn publish(&self, apply: impl FnOnce(&mut HashMap<ContainerId, Arc<ContainerRecord>>)) -> u64 {
        let _guard = self.writer.lock();
        let cur = self.current.load();
        let mut records = cur.records.clone();
        apply(&mut records);
        let version = cur.version + 1;
        self.current.store(Arc::new(Snapshot { version, records }));
        version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, name: &str) -> ContainerRecord {
        ContainerRecord::new(ContainerId::new(id), name)
    }

    #[test]
    fn empty_store_has_empty_snapshot() {
        let store = ViewStore::new();
        let snap = store.snapshot();
        assert!(snap.is_empty());
        assert_eq!(snap.version(), 0);
    }

    #[test]
    fn save_replaces_existing_record() {
        let store = ViewStore::new();
        store.save(record("c1", "old"));
        store.save(record("c1", "new"));

        assert_eq!(store.len(), 1);
        let rec = store.get(&ContainerId::new("c1")).unwrap();
        assert_eq!(rec.name, "/new");
    }

    #[test]
    fn replace_returns_previous_record() {
        let store = ViewStore::new();
        assert!(store.replace(record("c1", "old")).is_none());
        let previous = store.replace(record("c1", "new")).unwrap();
        assert_eq!(previous.name, "/old");
    }

    #[test]
    fn update_edits_current_record() {
        let store = ViewStore::new();
        store.save(record("c1", "a"));
        let before = store.version();

        let previous = store
            .update(&ContainerId::new("c1"), |rec| rec.name = "/b".into())
            .unwrap();
        assert_eq!(previous.name, "/a");
        assert_eq!(store.get(&ContainerId::new("c1")).unwrap().name, "/b");
        assert_eq!(store.version(), before + 1);
    }

    #[test]
    fn update_of_deleted_record_publishes_nothing() {
        let store = ViewStore::new();
        store.save(record("c1", "a"));
        let _ = store.delete(&ContainerId::new("c1"));
        let before = store.version();

        assert!(store.update(&ContainerId::new("c1"), |_| {}).is_none());
        assert!(store.is_empty());
        assert_eq!(store.version(), before);
    }

    #[test]
    fn delete_unknown_id_is_noop() {
        let store = ViewStore::new();
        store.save(record("c1", "a"));
        assert!(store.delete(&ContainerId::new("missing")).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn snapshot_is_unaffected_by_later_writes() {
        let store = ViewStore::new();
        store.save(record("c1", "a"));
        let before = store.snapshot();

        store.save(record("c2", "b"));
        let _ = store.delete(&ContainerId::new("c1"));

        assert_eq!(before.len(), 1);
        assert!(before.get(&ContainerId::new("c1")).is_some());
        let after = store.snapshot();
        assert_eq!(after.len(), 1);
        assert!(after.get(&ContainerId::new("c2")).is_some());
    }

    #[test]
    fn every_write_bumps_version() {
        let store = ViewStore::new();
        store.save(record("c1", "a"));
        store.save(record("c1", "a"));
        let _ = store.delete(&ContainerId::new("c1"));
        assert_eq!(store.version(), 3);
    }

    #[test]
    fn resolve_prefers_id_then_name_then_prefix() {
        let store = ViewStore::new();
        store.save(record("abc123", "web"));
        store.save(record("abd456", "db"));
        let snap = store.snapshot();

        assert_eq!(snap.resolve("abc123").unwrap().name, "/web");
        assert_eq!(snap.resolve("db").unwrap().id.as_str(), "abd456");
        assert_eq!(snap.resolve("/db").unwrap().id.as_str(), "abd456");
        assert_eq!(snap.resolve("abc").unwrap().name, "/web");
        assert!(snap.resolve("ab").is_none());
        assert!(snap.resolve("zzz").is_none());
        assert!(snap.resolve("").is_none());
    }
}
