//! `roster rename` — Rename a container in the state index.

use clap::Args;
use roster_common::config::RosterConfig;
use roster_common::error::RosterError;

/// Arguments for the `rename` command.
#[derive(Args, Debug)]
pub struct RenameArgs {
    /// Container ID, ID prefix, or name.
    pub container: String,

    /// New container name.
    pub new_name: String,
}

/// Executes the `rename` command.
///
/// # Errors
///
/// Returns an error if the container does not exist, the new name is
/// taken, or the state file cannot be written.
pub fn execute(args: &RenameArgs, config: &RosterConfig) -> anyhow::Result<()> {
    let index = super::load_index(config)?;
    let id = index
        .snapshot()
        .resolve(&args.container)
        .map(|rec| rec.id.clone())
        .ok_or_else(|| RosterError::NoSuchContainer {
            reference: args.container.clone(),
        })?;

    index.rename(&id, &args.new_name)?;
    crate::state::save_state(&config.state_file, &crate::state::snapshot_state(&index))?;
    tracing::info!(id = %id, new_name = %args.new_name, "container renamed");
    Ok(())
}
