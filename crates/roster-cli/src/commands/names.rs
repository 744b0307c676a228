//! `roster names` — Show reserved container names.

use clap::Args;
use roster_common::config::RosterConfig;

/// Arguments for the `names` command.
#[derive(Args, Debug)]
pub struct NamesArgs {
    /// Don't truncate container IDs.
    #[arg(long)]
    pub no_trunc: bool,
}

/// Executes the `names` command.
///
/// # Errors
///
/// Returns an error if the state index cannot be loaded.
pub fn execute(args: &NamesArgs, config: &RosterConfig) -> anyhow::Result<()> {
    let index = super::load_index(config)?;
    for (name, id) in index.names().all() {
        let id = if args.no_trunc {
            id.as_str()
        } else {
            crate::output::short_id(id.as_str())
        };
        println!("{name} -> {id}");
    }
    Ok(())
}
