//! `roster ps` — List containers.

use anyhow::Context as _;
use clap::Args;
use roster_common::config::RosterConfig;
use roster_view::{ContainerSummary, FilterArgs, ListOptions};
use tokio_util::sync::CancellationToken;

use crate::output::{TableOptions, render_table};

/// Arguments for the `ps` command.
#[derive(Args, Debug)]
pub struct PsArgs {
    /// Show all containers (default shows just running).
    #[arg(short, long)]
    pub all: bool,

    /// Show the n most recently created containers (includes all states).
    #[arg(short = 'n', long)]
    pub last: Option<usize>,

    /// Filter output based on conditions provided (`key=value`).
    #[arg(short, long)]
    pub filter: Vec<String>,

    /// Show only containers created since this id or name.
    #[arg(long)]
    pub since: Option<String>,

    /// Show only containers created before this id or name.
    #[arg(long)]
    pub before: Option<String>,

    /// Display total file sizes.
    #[arg(short, long)]
    pub size: bool,

    /// Only display container IDs.
    #[arg(short, long)]
    pub quiet: bool,

    /// Don't truncate output.
    #[arg(long)]
    pub no_trunc: bool,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

impl PsArgs {
    /// Converts the flags into list options.
    ///
    /// # Errors
    ///
    /// Returns an error if a filter is not in `key=value` form.
    pub fn list_options(&self, config: &RosterConfig) -> anyhow::Result<ListOptions> {
        let mut filters = FilterArgs::new();
        for arg in &self.filter {
            filters.add_kv(arg)?;
        }
        Ok(ListOptions {
            all: self.all,
            limit: self.last.unwrap_or(config.default_limit),
            filters,
            since: self.since.clone(),
            before: self.before.clone(),
            size: self.size,
        })
    }
}

/// Executes the `ps` command.
///
/// Loads the state index, lists it with the requested filters, and prints
/// a table or JSON. Ctrl-C cancels the listing.
///
/// # Errors
///
/// Returns an error if the state cannot be loaded, a filter is invalid,
/// or the listing is cancelled.
pub fn execute(args: &PsArgs, config: &RosterConfig) -> anyhow::Result<()> {
    let options = args.list_options(config)?;
    let index = super::load_index(config)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    ctrlc::set_handler(move || on_interrupt.cancel()).context("installing Ctrl-C handler")?;

    let containers = index.list(&cancel, &options)?;
    print!("{}", render(&containers, args)?);
    Ok(())
}

/// Renders the listing in the format selected by `args`.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render(containers: &[ContainerSummary], args: &PsArgs) -> anyhow::Result<String> {
    if args.json {
        let mut out = serde_json::to_string_pretty(containers)?;
        out.push('\n');
        return Ok(out);
    }
    Ok(render_table(
        containers,
        TableOptions {
            no_trunc: args.no_trunc,
            size: args.size,
            quiet: args.quiet,
        },
    ))
}
