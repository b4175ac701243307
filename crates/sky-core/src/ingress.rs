//! Tunnel routing config generation
//!
//! Derives the declarative ingress document the control plane consumes
//! from the current server snapshot. The ordering contract is load-bearing:
//! the control plane matches ingress rules top to bottom and requires a
//! hostname-less catch-all as the final entry, otherwise it rejects the
//! config outright.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SkyError;
use crate::state::State;
use crate::types::TunnelMode;

/// Terminal rule every config ends with
pub const CATCH_ALL_SERVICE: &str = "http_status:404";

/// One (hostname -> local service) mapping; the catch-all has no hostname
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    pub service: String,
}

impl IngressRule {
    pub fn server(hostname: &str, port: u16) -> Self {
        Self {
            hostname: Some(hostname.to_string()),
            service: format!("http://localhost:{}", port),
        }
    }

    pub fn catch_all() -> Self {
        Self {
            hostname: None,
            service: CATCH_ALL_SERVICE.to_string(),
        }
    }
}

/// Routing config artifact for one tunnel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelConfig {
    pub tunnel: String,
    #[serde(rename = "credentials-file")]
    pub credentials_file: PathBuf,
    pub ingress: Vec<IngressRule>,
}

/// Build the managed tunnel's config from the current snapshot
///
/// One rule per managed-mode server belonging to the managed tunnel, in
/// snapshot iteration order, then the catch-all.
pub fn managed_config(
    state: &State,
    tunnel_name: &str,
    tunnel_id: &str,
    credentials_file: PathBuf,
) -> TunnelConfig {
    let mut ingress: Vec<IngressRule> = state
        .servers
        .values()
        .filter(|s| s.mode == TunnelMode::Managed && s.tunnel == tunnel_name)
        .map(|s| IngressRule::server(&s.hostname, s.port))
        .collect();
    ingress.push(IngressRule::catch_all());

    TunnelConfig {
        tunnel: tunnel_id.to_string(),
        credentials_file,
        ingress,
    }
}

/// Build a dedicated tunnel's config: exactly one hostname rule plus the
/// catch-all
pub fn dedicated_config(
    tunnel_id: &str,
    credentials_file: PathBuf,
    hostname: &str,
    port: u16,
) -> TunnelConfig {
    TunnelConfig {
        tunnel: tunnel_id.to_string(),
        credentials_file,
        ingress: vec![IngressRule::server(hostname, port), IngressRule::catch_all()],
    }
}

/// Serialize a config to its on-disk YAML artifact
pub fn write_config(path: &Path, config: &TunnelConfig) -> Result<(), SkyError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_yaml::to_string(config)
        .map_err(|e| SkyError::TunnelProvision(format!("failed to serialize tunnel config: {}", e)))?;
    fs::write(path, content)?;
    Ok(())
}
