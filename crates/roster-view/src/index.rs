//! Facade used by container lifecycle collaborators.
//!
//! The view store and the name registry are locked independently. Their
//! consistency rests on ordering alone:
//!
//! * create: reserve the name, then save the record;
//! * remove: delete the record, then release its names.
//!
//! A reader may therefore briefly observe a reservation whose record is not
//! yet visible, but never a visible record whose name is unreserved.

use std::sync::Arc;

use roster_common::config::RosterConfig;
use roster_common::error::{Result, RosterError};
use roster_common::types::{ContainerId, ContainerRecord, canonical_name};
use tokio_util::sync::CancellationToken;

use crate::list::{self, ContainerSummary, ListOptions};
use crate::names::NameRegistry;
use crate::store::{Snapshot, ViewStore};

/// Container view index: records, names, and listing.
#[derive(Debug)]
pub struct ContainerIndex {
    store: ViewStore,
    names: NameRegistry,
    cancel_check_interval: usize,
}

impl ContainerIndex {
    /// Creates an empty index with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&RosterConfig::default())
    }

    /// Creates an empty index using the listing settings of `config`.
    #[must_use]
    pub fn with_config(config: &RosterConfig) -> Self {
        Self {
            store: ViewStore::new(),
            names: NameRegistry::new(),
            cancel_check_interval: config.cancel_check_interval.max(1),
        }
    }

    /// Inserts or replaces a record without touching the registry.
    pub fn save(&self, record: ContainerRecord) {
        self.store.save(record);
    }

    /// Removes a record without touching the registry.
    pub fn delete(&self, id: &ContainerId) -> Option<Arc<ContainerRecord>> {
        self.store.delete(id)
    }

    /// Reserves `name` for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::NameConflict`] if another container holds it.
    pub fn reserve_name(&self, id: &ContainerId, name: &str) -> Result<()> {
        self.names.reserve(id, name)
    }

    /// Releases `name` if `id` holds it.
    pub fn release_name(&self, id: &ContainerId, name: &str) {
        self.names.release(id, name);
    }

    /// Reserves the record's name and then makes the record visible.
    ///
    /// Registering a live container again under another name moves its
    /// reservation: the old name is released once the new record is visible.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::NameConflict`] if another container holds the
    /// name; nothing is saved in that case.
    pub fn register(&self, mut record: ContainerRecord) -> Result<()> {
        record.normalize();
        let id = record.id.clone();
        let name = record.name.clone();
        self.names.reserve(&id, &name)?;
        let previous = self.store.replace(record);
        if let Some(previous) = previous.filter(|prev| prev.name != name) {
            self.names.release(&id, &previous.name);
        }
        tracing::debug!(id = %id, name = %name, "container registered");
        Ok(())
    }

    /// Removes the record and then releases every name it held.
    pub fn unregister(&self, id: &ContainerId) -> Option<Arc<ContainerRecord>> {
        let removed = self.store.delete(id);
        let released = self.names.release_all(id);
        tracing::debug!(id = %id, found = removed.is_some(), names = ?released, "container unregistered");
        removed
    }

    /// Renames a container: reserve the new name, publish the renamed
    /// record, then release the old name.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::NoSuchContainer`] for an unknown id and
    /// [`RosterError::NameConflict`] if the new name is taken.
    pub fn rename(&self, id: &ContainerId, new_name: &str) -> Result<()> {
        let no_such_container = || RosterError::NoSuchContainer {
            reference: id.to_string(),
        };
        let current = self.store.get(id).ok_or_else(no_such_container)?;
        let new_name = canonical_name(new_name);
        if current.name == new_name {
            return Ok(());
        }

        self.names.reserve(id, &new_name)?;
        let Some(previous) = self.store.update(id, |rec| rec.name.clone_from(&new_name)) else {
            // Removed since the lookup; the reservation must not outlive it.
            self.names.release(id, &new_name);
            return Err(no_such_container());
        };
        if previous.name != new_name {
            self.names.release(id, &previous.name);
        }
        tracing::debug!(id = %id, old_name = %previous.name, new_name = %new_name, "container renamed");
        Ok(())
    }

    /// Lists containers over one consistent snapshot.
    ///
    /// # Errors
    ///
    /// See [`list::list`].
    pub fn list(
        &self,
        cancel: &CancellationToken,
        options: &ListOptions,
    ) -> Result<Vec<ContainerSummary>> {
        let snapshot = self.store.snapshot();
        list::list(&snapshot, options, cancel, self.cancel_check_interval)
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.store.snapshot()
    }

    /// Returns the view store.
    #[must_use]
    pub const fn store(&self) -> &ViewStore {
        &self.store
    }

    /// Returns the name registry.
    #[must_use]
    pub const fn names(&self) -> &NameRegistry {
        &self.names
    }
}

impl Default for ContainerIndex {
    fn default() -> Self {
        Self::new()
    }
}
