//! Global one-name-per-container registry.
//!
//! Names are stored in canonical `/`-prefixed form; callers may pass them
//! with or without the separator.

use std::collections::{BTreeSet, HashMap};

use parking_lot::Mutex;
use roster_common::error::{Result, RosterError};
use roster_common::types::{ContainerId, canonical_name, strip_separator};

#[derive(Debug, Default)]
struct Reservations {
    by_name: HashMap<String, ContainerId>,
    by_id: HashMap<ContainerId, BTreeSet<String>>,
}

/// Maps names to the container holding them.
#[derive(Debug, Default)]
pub struct NameRegistry {
    inner: Mutex<Reservations>,
}

impl NameRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves `name` for `id`.
    ///
    /// Reserving a name the same container already holds succeeds again.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::NameConflict`] if another container holds the
    /// name, or [`RosterError::InvalidName`] if the name is empty.
    pub fn reserve(&self, id: &ContainerId, name: &str) -> Result<()> {
        if strip_separator(name).is_empty() {
            return Err(RosterError::InvalidName { name: name.into() });
        }
        let name = canonical_name(name);

        let mut inner = self.inner.lock();
        if let Some(holder) = inner.by_name.get(&name) {
            if holder == id {
                return Ok(());
            }
            return Err(RosterError::NameConflict {
                name,
                holder: holder.clone(),
            });
        }
        let _ = inner.by_name.insert(name.clone(), id.clone());
        let _ = inner.by_id.entry(id.clone()).or_default().insert(name.clone());
        tracing::debug!(id = %id, name = %name, "name reserved");
        Ok(())
    }

    /// Releases `name` if, and only if, it is currently held by `id`.
    pub fn release(&self, id: &ContainerId, name: &str) {
        let name = canonical_name(name);

        let mut inner = self.inner.lock();
        if inner.by_name.get(&name) != Some(id) {
            return;
        }
        let _ = inner.by_name.remove(&name);
        let emptied = inner.by_id.get_mut(id).is_some_and(|names| {
            let _ = names.remove(&name);
            names.is_empty()
        });
        if emptied {
            let _ = inner.by_id.remove(id);
        }
        tracing::debug!(id = %id, name = %name, "name released");
    }

    /// Releases every name held by `id`, returning them.
    pub fn release_all(&self, id: &ContainerId) -> Vec<String> {
        let mut inner = self.inner.lock();
        let names = inner.by_id.remove(id).unwrap_or_default();
        for name in &names {
            let _ = inner.by_name.remove(name);
        }
        tracing::debug!(id = %id, count = names.len(), "names released");
        names.into_iter().collect()
    }

    /// Returns the container holding `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ContainerId> {
        self.inner.lock().by_name.get(&canonical_name(name)).cloned()
    }

    /// Returns the names held by `id`, sorted.
    #[must_use]
    pub fn names_of(&self, id: &ContainerId) -> Vec<String> {
        self.inner
            .lock()
            .by_id
            .get(id)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns every `(name, id)` reservation, sorted by name.
    #[must_use]
    pub fn all(&self) -> Vec<(String, ContainerId)> {
        let inner = self.inner.lock();
        let mut pairs: Vec<_> = inner
            .by_name
            .iter()
            .map(|(name, id)| (name.clone(), id.clone()))
            .collect();
        pairs.sort();
        pairs
    }

    /// Number of reserved names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().by_name.len()
    }

    /// Returns whether no name is reserved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_conflicts_with_other_holder() {
        let reg = NameRegistry::new();
        let a = ContainerId::new("a");
        let b = ContainerId::new("b");

        reg.reserve(&a, "web").unwrap();
        let err = reg.reserve(&b, "/web").unwrap_err();
        match err {
            RosterError::NameConflict { name, holder } => {
                assert_eq!(name, "/web");
                assert_eq!(holder, a);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reserve_is_idempotent_for_same_holder() {
        let reg = NameRegistry::new();
        let a = ContainerId::new("a");
        reg.reserve(&a, "web").unwrap();
        reg.reserve(&a, "web").unwrap();
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.names_of(&a), vec!["/web".to_string()]);
    }

    #[test]
    fn released_name_can_be_taken_by_another() {
        let reg = NameRegistry::new();
        let a = ContainerId::new("a");
        let b = ContainerId::new("b");
        reg.reserve(&a, "web").unwrap();
        reg.release(&a, "web");
        reg.reserve(&b, "web").unwrap();
        assert_eq!(reg.get("web"), Some(b));
    }

    #[test]
    fn release_by_non_holder_is_ignored() {
        let reg = NameRegistry::new();
        let a = ContainerId::new("a");
        let b = ContainerId::new("b");
        reg.reserve(&a, "web").unwrap();
        reg.release(&b, "web");
        assert_eq!(reg.get("/web"), Some(a));
    }

    #[test]
    fn release_all_frees_every_name() {
        let reg = NameRegistry::new();
        let a = ContainerId::new("a");
        reg.reserve(&a, "web").unwrap();
        reg.reserve(&a, "web-alias").unwrap();

        let released = reg.release_all(&a);
        assert_eq!(released, vec!["/web".to_string(), "/web-alias".to_string()]);
        assert!(reg.is_empty());
        assert!(reg.names_of(&a).is_empty());
    }

    #[test]
    fn empty_name_is_rejected() {
        let reg = NameRegistry::new();
        let a = ContainerId::new("a");
        assert!(matches!(
            reg.reserve(&a, "/"),
            Err(RosterError::InvalidName { .. })
        ));
        assert!(matches!(
            reg.reserve(&a, ""),
            Err(RosterError::InvalidName { .. })
        ));
    }

    #[test]
    fn all_lists_reservations_sorted() {
        let reg = NameRegistry::new();
        reg.reserve(&ContainerId::new("2"), "b").unwrap();
        reg.reserve(&ContainerId::new("1"), "a").unwrap();
        let all = reg.all();
        assert_eq!(all[0].0, "/a");
        assert_eq!(all[1].0, "/b");
    }
}
