//! Core domain types

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::process::ProcessHandle;

/// How a server kind was detected or declared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerKind {
    /// Plain files served from a directory
    Static,
    /// Node project (package.json)
    Node,
    /// Python project
    Python,
    /// A process skyhook routes to but does not own
    External,
}

impl fmt::Display for ServerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerKind::Static => write!(f, "static"),
            ServerKind::Node => write!(f, "node"),
            ServerKind::Python => write!(f, "python"),
            ServerKind::External => write!(f, "external"),
        }
    }
}

/// Whether a hostname shares the managed tunnel or has one of its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TunnelMode {
    Managed,
    Dedicated,
}

impl fmt::Display for TunnelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TunnelMode::Managed => write!(f, "managed"),
            TunnelMode::Dedicated => write!(f, "dedicated"),
        }
    }
}

/// Lifecycle state of a tunnel controller process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TunnelStatus {
    Running,
    Stopped,
}

impl fmt::Display for TunnelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TunnelStatus::Running => write!(f, "running"),
            TunnelStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// One exposed hostname
///
/// `pid` is `None` for externally-owned processes; such records are never
/// sent a termination signal. Tunnel assignment is fixed at creation and
/// never changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRecord {
    pub subdomain: String,
    pub domain: String,
    pub hostname: String,
    /// Project directory, empty for external servers
    #[serde(default)]
    pub path: PathBuf,
    pub port: u16,
    pub pid: Option<ProcessHandle>,
    pub kind: ServerKind,
    pub mode: TunnelMode,
    /// Name of the tunnel this server belongs to
    pub tunnel: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// One tunnel controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TunnelRecord {
    /// Opaque identifier assigned by the control plane
    pub id: String,
    pub pid: Option<ProcessHandle>,
    pub status: TunnelStatus,
    /// Where the generated routing config lives
    pub config_path: PathBuf,
}

/// Public description of a server, emitted as command output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerDescriptor {
    pub key: String,
    pub hostname: String,
    pub url: String,
    pub port: u16,
    pub kind: ServerKind,
    pub mode: TunnelMode,
    pub tunnel: String,
}

impl ServerDescriptor {
    pub fn from_record(key: &str, record: &ServerRecord) -> Self {
        Self {
            key: key.to_string(),
            hostname: record.hostname.clone(),
            url: record.url.clone(),
            port: record.port,
            kind: record.kind,
            mode: record.mode,
            tunnel: record.tunnel.clone(),
        }
    }
}

/// Result payload of a successful `stop`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoppedDescriptor {
    pub key: String,
    pub hostname: String,
    pub mode: TunnelMode,
}
