//! Container record and the domain primitives it is built from.
//!
//! A [`ContainerRecord`] is a plain snapshot of one container's externally
//! visible state. Records carry no behaviour beyond derived accessors; they
//! are replaced wholesale whenever the owning lifecycle collaborator reports
//! a transition.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::NAME_SEPARATOR;
use crate::error::{Result, RosterError};

/// Unique identifier for a container instance.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a new container ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random 64-character hexadecimal container ID.
    #[must_use]
    pub fn generate() -> Self {
        let a = uuid::Uuid::new_v4().simple().to_string();
        let b = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{a}{b}"))
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a container image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(String);

impl ImageId {
    /// Creates a new image ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the hex digest without its `sha256:` prefix.
    #[must_use]
    pub fn digest_hex(&self) -> &str {
        self.0
            .strip_prefix(crate::constants::IMAGE_DIGEST_PREFIX)
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returns the canonical `/`-prefixed form of a container name.
#[must_use]
pub fn canonical_name(name: &str) -> String {
    if name.starts_with(NAME_SEPARATOR) {
        name.to_owned()
    } else {
        format!("{NAME_SEPARATOR}{name}")
    }
}

/// Strips a single leading separator from a container name.
#[must_use]
pub fn strip_separator(name: &str) -> &str {
    name.strip_prefix(NAME_SEPARATOR).unwrap_or(name)
}

/// Lifecycle state of a container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    /// Container has been created but never started.
    #[default]
    Created,
    /// Container is being restarted by its restart policy.
    Restarting,
    /// Container is actively running.
    Running,
    /// Container is being removed.
    Removing,
    /// Container processes are frozen.
    Paused,
    /// Container process has exited.
    Exited,
    /// Container could not be cleaned up and is unusable.
    Dead,
}

impl ContainerState {
    /// Every state, in the order they are reported to users.
    pub const ALL: [Self; 7] = [
        Self::Created,
        Self::Restarting,
        Self::Running,
        Self::Removing,
        Self::Paused,
        Self::Exited,
        Self::Dead,
    ];

    /// Returns the lowercase wire form of the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Restarting => "restarting",
            Self::Running => "running",
            Self::Removing => "removing",
            Self::Paused => "paused",
            Self::Exited => "exited",
            Self::Dead => "dead",
        }
    }

    /// Returns whether a process is alive in this state.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running | Self::Paused | Self::Restarting)
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContainerState {
    type Err = RosterError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| RosterError::invalid_filter_value("status", s))
    }
}

/// Result of the most recent healthcheck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Healthcheck configured but no verdict yet.
    Starting,
    /// Last healthcheck passed.
    Healthy,
    /// Healthcheck failed past its retry budget.
    Unhealthy,
}

impl HealthStatus {
    /// Returns the lowercase wire form of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Isolation technology used by the container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Isolation {
    /// Platform default.
    #[default]
    Default,
    /// Process isolation.
    Process,
    /// Hypervisor isolation.
    #[serde(rename = "hyperv")]
    HyperV,
}

impl Isolation {
    /// Returns the lowercase wire form of the isolation mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Process => "process",
            Self::HyperV => "hyperv",
        }
    }
}

impl FromStr for Isolation {
    type Err = RosterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "process" => Ok(Self::Process),
            "hyperv" => Ok(Self::HyperV),
            _ => Err(RosterError::invalid_filter_value("isolation", s)),
        }
    }
}

/// Transport protocol of a container port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Protocol {
    /// TCP, the default when no protocol is given.
    #[default]
    Tcp,
    /// UDP.
    Udp,
    /// SCTP.
    Sctp,
}

impl Protocol {
    /// Returns the lowercase wire form of the protocol.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            Self::Sctp => "sctp",
        }
    }
}

impl FromStr for Protocol {
    type Err = RosterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            "sctp" => Ok(Self::Sctp),
            _ => Err(RosterError::Config {
                message: format!("unknown protocol: {s}"),
            }),
        }
    }
}

/// A container-side port, rendered as `80/tcp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Port {
    /// Port number.
    pub number: u16,
    /// Transport protocol.
    pub protocol: Protocol,
}

impl Port {
    /// Creates a TCP port.
    #[must_use]
    pub const fn tcp(number: u16) -> Self {
        Self {
            number,
            protocol: Protocol::Tcp,
        }
    }

    /// Creates a UDP port.
    #[must_use]
    pub const fn udp(number: u16) -> Self {
        Self {
            number,
            protocol: Protocol::Udp,
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.number, self.protocol.as_str())
    }
}

impl FromStr for Port {
    type Err = RosterError;

    fn from_str(s: &str) -> Result<Self> {
        let (number, protocol) = match s.split_once('/') {
            Some((number, protocol)) => (number, protocol.parse()?),
            None => (s, Protocol::Tcp),
        };
        let number = number.trim().parse().map_err(|_| RosterError::Config {
            message: format!("invalid port: {s}"),
        })?;
        Ok(Self { number, protocol })
    }
}

impl TryFrom<String> for Port {
    type Error = RosterError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Port> for String {
    fn from(port: Port) -> Self {
        port.to_string()
    }
}

/// Host-side binding of a published container port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBinding {
    /// Host address the port is bound to; empty means all interfaces.
    #[serde(default)]
    pub host_ip: String,
    /// Host port number.
    pub host_port: u16,
}

/// Host-level configuration that affects how a container is reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Network mode (`bridge`, `host`, `none`, or a network name).
    #[serde(default)]
    pub network_mode: String,
    /// Isolation technology.
    #[serde(default)]
    pub isolation: Isolation,
    /// Arbitrary runtime annotations.
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    /// Published ports and their host bindings.
    #[serde(default)]
    pub port_bindings: BTreeMap<Port, Vec<PortBinding>>,
}

/// A volume or bind mount attached to the container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountPoint {
    /// Volume name; empty for bind mounts.
    #[serde(default)]
    pub name: String,
    /// Host path backing the mount.
    #[serde(default)]
    pub source: String,
    /// Path inside the container.
    pub destination: String,
}

/// Attachment of the container to one network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSettings {
    /// Identifier of the network.
    pub network_id: String,
    /// Address assigned on that network.
    #[serde(default)]
    pub ip_address: String,
}

/// Snapshot of one container's externally visible state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRecord {
    /// Unique identifier.
    pub id: ContainerId,
    /// Canonical name, always `/`-prefixed.
    pub name: String,
    /// Current lifecycle state.
    #[serde(default)]
    pub state: ContainerState,
    /// Image reference the container was created from.
    #[serde(default)]
    pub image: String,
    /// Resolved image identifier.
    #[serde(default)]
    pub image_id: ImageId,
    /// Entrypoint and arguments.
    #[serde(default)]
    pub command: Vec<String>,
    /// Creation timestamp.
    pub created: DateTime<Utc>,
    /// Exit code of the last run, if it has exited.
    #[serde(default)]
    pub exit_code: Option<i64>,
    /// User-defined labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Ports the image or configuration exposes.
    #[serde(default)]
    pub exposed_ports: BTreeSet<Port>,
    /// Host-level configuration.
    #[serde(default)]
    pub host_config: HostConfig,
    /// Attached volumes and bind mounts.
    #[serde(default)]
    pub mounts: Vec<MountPoint>,
    /// Attached networks keyed by network name.
    #[serde(default)]
    pub networks: BTreeMap<String, EndpointSettings>,
    /// Healthcheck status, if a healthcheck is configured.
    #[serde(default)]
    pub health: Option<HealthStatus>,
    /// Root of the container filesystem on the host.
    #[serde(default)]
    pub base_fs: PathBuf,
    /// Size of files written by the container, in bytes.
    #[serde(default)]
    pub size_rw: Option<u64>,
    /// Total size of the root filesystem, in bytes.
    #[serde(default)]
    pub size_root_fs: Option<u64>,
}

impl ContainerRecord {
    /// Creates a record in the `Created` state with a canonical name.
    #[must_use]
    pub fn new(id: ContainerId, name: &str) -> Self {
        Self {
            id,
            name: canonical_name(name),
            state: ContainerState::Created,
            image: String::new(),
            image_id: ImageId::default(),
            command: Vec::new(),
            created: Utc::now(),
            exit_code: None,
            labels: BTreeMap::new(),
            exposed_ports: BTreeSet::new(),
            host_config: HostConfig::default(),
            mounts: Vec::new(),
            networks: BTreeMap::new(),
            health: None,
            base_fs: PathBuf::new(),
            size_rw: None,
            size_root_fs: None,
        }
    }

    /// Returns whether a process is alive for this container.
    #[must_use]
    pub const fn running(&self) -> bool {
        self.state.is_running()
    }

    /// Returns the name with its leading separator removed.
    #[must_use]
    pub fn bare_name(&self) -> &str {
        strip_separator(&self.name)
    }

    /// Restores the canonical form of `name` after deserialization.
    pub fn normalize(&mut self) {
        if !self.name.starts_with(NAME_SEPARATOR) {
            self.name = canonical_name(&self.name);
        }
    }
}
