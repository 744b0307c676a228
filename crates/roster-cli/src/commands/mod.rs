//! CLI command definitions and dispatch.

pub mod names;
pub mod ps;
pub mod rename;
pub mod rm;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use roster_common::config::RosterConfig;
use roster_view::ContainerIndex;

/// roster — query the container view of a runtime's state index.
#[derive(Parser, Debug)]
#[command(name = "roster", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Path to the container state file.
    #[arg(long, global = true, env = "ROSTER_STATE_FILE")]
    pub state_file: Option<PathBuf>,

    /// Path to a JSON configuration file.
    #[arg(long, global = true, env = "ROSTER_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List containers.
    Ps(ps::PsArgs),
    /// Show reserved container names.
    Names(names::NamesArgs),
    /// Rename a container.
    Rename(rename::RenameArgs),
    /// Remove containers from the state index.
    Rm(rm::RmArgs),
}

/// Resolves the effective configuration from flags and the config file.
///
/// # Errors
///
/// Returns an error if the configuration file cannot be loaded.
pub fn resolve_config(cli: &Cli) -> anyhow::Result<RosterConfig> {
    let mut config = match &cli.config {
        Some(path) => RosterConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => RosterConfig::default(),
    };
    if let Some(state_file) = &cli.state_file {
        config.state_file.clone_from(state_file);
    }
    Ok(config)
}

/// Loads the state file named by `config` into a fresh index.
///
/// # Errors
///
/// Returns an error if the state file cannot be read or holds two
/// containers with the same name.
pub fn load_index(config: &RosterConfig) -> anyhow::Result<ContainerIndex> {
    let state = crate::state::load_state(&config.state_file)
        .with_context(|| format!("reading state file {}", config.state_file.display()))?;
    let index = crate::state::build_index(&state, config)?;
    Ok(index)
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(&cli)?;
    match cli.command {
        Command::Ps(args) => ps::execute(&args, &config),
        Command::Names(args) => names::execute(&args, &config),
        Command::Rename(args) => rename::execute(&args, &config),
        Command::Rm(args) => rm::execute(&args, &config),
    }
}
