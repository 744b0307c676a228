//! `roster rm` — Remove containers from the state index.

use clap::Args;
use roster_common::config::RosterConfig;
use roster_common::error::RosterError;
use roster_common::types::ContainerId;

/// Arguments for the `rm` command.
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Container IDs, ID prefixes, or names.
    #[arg(required = true)]
    pub containers: Vec<String>,
}

/// Executes the `rm` command.
///
/// # Errors
///
/// Returns an error if a container does not exist or the state file
/// cannot be written.
pub fn execute(args: &RmArgs, config: &RosterConfig) -> anyhow::Result<()> {
    for id in remove(args, config)? {
        println!("{id}");
    }
    Ok(())
}

/// Removes the referenced containers and persists the state file.
///
/// Every reference is resolved before anything is removed, so an unknown
/// container leaves the state file untouched. The removed ids are returned
/// only once the state file has been written.
///
/// # Errors
///
/// Returns an error if a container does not exist or the state file
/// cannot be written.
pub fn remove(args: &RmArgs, config: &RosterConfig) -> anyhow::Result<Vec<ContainerId>> {
    let index = super::load_index(config)?;
    let snapshot = index.snapshot();
    let ids = args
        .containers
        .iter()
        .map(|reference| {
            snapshot
                .resolve(reference)
                .map(|rec| rec.id.clone())
                .ok_or_else(|| RosterError::NoSuchContainer {
                    reference: reference.clone(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    for id in &ids {
        let _ = index.unregister(id);
    }
    crate::state::save_state(&config.state_file, &crate::state::snapshot_state(&index))?;
    Ok(ids)
}
