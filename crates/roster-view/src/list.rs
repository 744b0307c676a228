//! Container listing: snapshot, filter, order, and limit.
//!
//! A listing works on exactly one [`Snapshot`], so the result never shows a
//! container twice or a record half-updated. Results are ordered newest
//! first (ties broken by id) so that truncation is deterministic within a
//! process, but callers must not rely on which containers survive a limit.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use roster_common::error::{Result, RosterError};
use roster_common::types::{ContainerRecord, ContainerState, MountPoint};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::filter::{FilterArgs, ListFilter};
use crate::store::Snapshot;

/// Options accepted by a container listing.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Include stopped containers.
    pub all: bool,
    /// Maximum number of results; 0 means unlimited.
    pub limit: usize,
    /// Filter predicates.
    pub filters: FilterArgs,
    /// Only containers created after this one.
    pub since: Option<String>,
    /// Only containers created before this one.
    pub before: Option<String>,
    /// Report filesystem sizes.
    pub size: bool,
}

/// One published or exposed port in a summary.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PortSummary {
    /// Port inside the container.
    pub private_port: u16,
    /// Host port, when published.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_port: Option<u16>,
    /// Host address, when published.
    #[serde(rename = "IP", skip_serializing_if = "String::is_empty")]
    pub ip: String,
    /// Transport protocol.
    #[serde(rename = "Type")]
    pub protocol: String,
}

/// Host-config-derived fields of a summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SummaryHostConfig {
    /// Network mode of the container.
    pub network_mode: String,
    /// Runtime annotations.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// Externally visible description of one container in a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerSummary {
    /// Container identifier.
    #[serde(rename = "Id")]
    pub id: String,
    /// Names, each beginning with the separator.
    pub names: Vec<String>,
    /// Image reference.
    pub image: String,
    /// Image identifier.
    #[serde(rename = "ImageID")]
    pub image_id: String,
    /// Command line.
    pub command: String,
    /// Creation time in seconds since the Unix epoch.
    pub created: i64,
    /// Lifecycle state.
    pub state: ContainerState,
    /// Human-readable status.
    pub status: String,
    /// Exposed and published ports.
    pub ports: Vec<PortSummary>,
    /// User-defined labels.
    pub labels: BTreeMap<String, String>,
    /// Bytes written by the container; only with `size`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_rw: Option<u64>,
    /// Root filesystem size; only with `size`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_root_fs: Option<u64>,
    /// Host-config-derived fields.
    pub host_config: SummaryHostConfig,
    /// Attached mounts.
    pub mounts: Vec<MountPoint>,
    /// Names of attached networks.
    pub network_names: Vec<String>,
}

impl ContainerSummary {
    /// Builds the summary of one record.
    #[must_use]
    pub fn from_record(rec: &ContainerRecord, size: bool) -> Self {
        Self {
            id: rec.id.to_string(),
            names: vec![rec.name.clone()],
            image: rec.image.clone(),
            image_id: rec.image_id.to_string(),
            command: rec.command.join(" "),
            created: rec.created.timestamp(),
            state: rec.state,
            status: status_text(rec),
            ports: port_summaries(rec),
            labels: rec.labels.clone(),
            size_rw: rec.size_rw.filter(|_| size),
            size_root_fs: rec.size_root_fs.filter(|_| size),
            host_config: SummaryHostConfig {
                network_mode: rec.host_config.network_mode.clone(),
                annotations: rec.host_config.annotations.clone(),
            },
            mounts: rec.mounts.clone(),
            network_names: rec.networks.keys().cloned().collect(),
        }
    }
}

/// Lists the containers in `snapshot` selected by `options`.
///
/// `cancel` is checked before evaluation starts and again every
/// `check_interval` records; a cancelled listing returns no results.
///
/// # Errors
///
/// Returns [`RosterError::InvalidFilter`] for an unknown filter key or bad
/// value, [`RosterError::NoSuchContainer`] for an unresolvable
/// `since`/`before`, and [`RosterError::Cancelled`] if `cancel` fires.
pub fn list(
    snapshot: &Snapshot,
    options: &ListOptions,
    cancel: &CancellationToken,
    check_interval: usize,
) -> Result<Vec<ContainerSummary>> {
    let mut args = options.filters.clone();
    if let Some(since) = &options.since {
        args.add("since", since.as_str());
    }
    if let Some(before) = &options.before {
        args.add("before", before.as_str());
    }
    let filter = ListFilter::compile(&args, snapshot)?;

    let all = options.all || filter.implies_all();
    let include_stopped = all || options.limit > 0 || filter.has_range();
    let check_interval = check_interval.max(1);

    if cancel.is_cancelled() {
        return Err(RosterError::Cancelled);
    }

    let mut candidates: Vec<&Arc<ContainerRecord>> = snapshot
        .iter()
        .filter(|rec| include_stopped || rec.running())
        .collect();
    candidates.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| a.id.cmp(&b.id)));

    let selected = select(candidates, &filter, options.limit, cancel, check_interval)?;

    tracing::debug!(
        version = snapshot.version(),
        total = snapshot.len(),
        returned = selected.len(),
        "containers listed"
    );
    Ok(selected
        .into_iter()
        .map(|rec| ContainerSummary::from_record(rec, options.size))
        .collect())
}

/// Evaluates `filter` over ordered candidates, stopping at `limit`.
///
/// `cancel` is polled on every `check_interval`-th candidate.
fn select<'a>(
    candidates: impl IntoIterator<Item = &'a Arc<ContainerRecord>>,
    filter: &ListFilter,
    limit: usize,
    cancel: &CancellationToken,
    check_interval: usize,
) -> Result<Vec<&'a Arc<ContainerRecord>>> {
    let mut selected = Vec::new();
    for (i, rec) in candidates.into_iter().enumerate() {
        if i % check_interval == 0 && cancel.is_cancelled() {
            tracing::debug!(evaluated = i, "listing cancelled");
            return Err(RosterError::Cancelled);
        }
        if !filter.matches(rec) {
            continue;
        }
        selected.push(rec);
        if limit > 0 && selected.len() == limit {
            break;
        }
    }
    Ok(selected)
}

fn status_text(rec: &ContainerRecord) -> String {
    let code = rec.exit_code.unwrap_or(0);
    match rec.state {
        ContainerState::Running => match rec.health {
            Some(health) => format!("Up ({health})"),
            None => "Up".to_owned(),
        },
        ContainerState::Paused => "Up (Paused)".to_owned(),
        ContainerState::Restarting => format!("Restarting ({code})"),
        ContainerState::Created => "Created".to_owned(),
        ContainerState::Removing => "Removal In Progress".to_owned(),
        ContainerState::Exited => format!("Exited ({code})"),
        ContainerState::Dead => "Dead".to_owned(),
    }
}

fn port_summaries(rec: &ContainerRecord) -> Vec<PortSummary> {
    let bindings = &rec.host_config.port_bindings;
    let ports: BTreeSet<_> = rec
        .exposed_ports
        .iter()
        .chain(bindings.keys())
        .copied()
        .collect();

    let mut out = Vec::new();
    for port in ports {
        let protocol = port.protocol.as_str().to_owned();
        match bindings.get(&port).filter(|b| !b.is_empty()) {
            Some(bound) => out.extend(bound.iter().map(|b| PortSummary {
                private_port: port.number,
                public_port: Some(b.host_port),
                ip: b.host_ip.clone(),
                protocol: protocol.clone(),
            })),
            None => out.push(PortSummary {
                private_port: port.number,
                public_port: None,
                ip: String::new(),
                protocol,
            }),
        }
    }
    out.sort();
    out
}
