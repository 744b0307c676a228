//! Collaborator state file.
//!
//! The lifecycle manager persists its container records as a JSON index;
//! the CLI loads that index into an in-memory [`ContainerIndex`] per run.

use std::path::Path;

use roster_common::config::RosterConfig;
use roster_common::error::{Result, RosterError};
use roster_common::types::ContainerRecord;
use roster_view::ContainerIndex;
use serde::{Deserialize, Serialize};

/// On-disk container state index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateFile {
    /// Every container known to the lifecycle manager.
    #[serde(default)]
    pub containers: Vec<ContainerRecord>,
}

/// Loads the state index from disk. A missing file is an empty index.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_state(path: &Path) -> Result<StateFile> {
    tracing::debug!(path = %path.display(), "loading state index");
    if !path.exists() {
        return Ok(StateFile::default());
    }
    let content = std::fs::read_to_string(path).map_err(|e| RosterError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut state: StateFile = serde_json::from_str(&content)?;
    for rec in &mut state.containers {
        rec.normalize();
    }
    Ok(state)
}

/// Persists the state index to disk atomically.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_state(path: &Path, state: &StateFile) -> Result<()> {
    tracing::debug!(path = %path.display(), "saving state index");
    let io_err = |e: std::io::Error| RosterError::Io {
        path: path.to_path_buf(),
        source: e,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let content = serde_json::to_string_pretty(state)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, content).map_err(io_err)?;
    std::fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}

/// Registers every record of `state` into a fresh index.
///
/// # Errors
///
/// Returns [`RosterError::NameConflict`] if two records share a name.
pub fn build_index(state: &StateFile, config: &RosterConfig) -> Result<ContainerIndex> {
    let index = ContainerIndex::with_config(config);
    for rec in &state.containers {
        index.register(rec.clone())?;
    }
    tracing::debug!(count = state.containers.len(), "index built");
    Ok(index)
}

/// Rebuilds a state file from the records currently in `index`.
pub fn snapshot_state(index: &ContainerIndex) -> StateFile {
    let snapshot = index.snapshot();
    let mut containers: Vec<ContainerRecord> =
        snapshot.iter().map(|rec| (**rec).clone()).collect();
    containers.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));
    StateFile { containers }
}
