//! Tunnel control-plane interface
//!
//! The core never talks to the tunnel fabric directly; it drives an
//! external binary through [`ControlPlane`]. The production implementation
//! shells out to `cloudflared`. Every query is a synchronous
//! run-to-completion invocation with an exit code and captured output;
//! `run` is the one exception, spawning the long-lived routing process
//! detached with its output appended to a log sink.

use std::fs::OpenOptions;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::SkyError;
use crate::process::ProcessHandle;

/// A tunnel known to the control plane
#[derive(Debug, Clone, Deserialize)]
pub struct TunnelInfo {
    pub id: String,
    pub name: String,
}

/// Operations the core needs from the tunnel fabric
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Whether the control-plane binary is reachable at all
    async fn is_installed(&self) -> bool;

    /// List existing tunnels
    async fn list_tunnels(&self) -> Result<Vec<TunnelInfo>, SkyError>;

    /// Create a tunnel, returning its opaque identifier
    async fn create_tunnel(&self, name: &str) -> Result<String, SkyError>;

    /// Route a hostname to a tunnel in DNS
    async fn route_dns(&self, tunnel_name: &str, hostname: &str) -> Result<(), SkyError>;

    /// Apply a routing config and spawn the long-lived controller process
    fn run(
        &self,
        tunnel_id: &str,
        config_path: &Path,
        log_path: &Path,
    ) -> Result<ProcessHandle, SkyError>;
}

/// Control plane backed by the `cloudflared` binary
#[derive(Debug, Clone)]
pub struct CloudflaredCli {
    binary: String,
}

impl CloudflaredCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    async fn output(&self, args: &[&str]) -> Result<std::process::Output, SkyError> {
        tokio::process::Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                SkyError::TunnelProvision(format!("failed to run {}: {}", self.binary, e))
            })
    }
}

#[async_trait]
impl ControlPlane for CloudflaredCli {
    async fn is_installed(&self) -> bool {
        tokio::process::Command::new(&self.binary)
            .arg("--version")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    async fn list_tunnels(&self) -> Result<Vec<TunnelInfo>, SkyError> {
        let output = self.output(&["tunnel", "list", "--output", "json"]).await?;
        if !output.status.success() {
            return Err(SkyError::TunnelProvision(format!(
                "tunnel list failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        serde_json::from_slice(&output.stdout)
            .map_err(|e| SkyError::TunnelProvision(format!("unparsable tunnel list: {}", e)))
    }

    async fn create_tunnel(&self, name: &str) -> Result<String, SkyError> {
        let output = self
            .output(&["tunnel", "create", "--output", "json", name])
            .await?;
        if !output.status.success() {
            return Err(SkyError::TunnelProvision(format!(
                "tunnel create '{}' failed: {}",
                name,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        #[derive(Deserialize)]
        struct Created {
            id: String,
        }
        let created: Created = serde_json::from_slice(&output.stdout)
            .map_err(|e| SkyError::TunnelProvision(format!("unparsable create output: {}", e)))?;
        Ok(created.id)
    }

    async fn route_dns(&self, tunnel_name: &str, hostname: &str) -> Result<(), SkyError> {
        let output = self
            .output(&["tunnel", "route", "dns", tunnel_name, hostname])
            .await?;
        if !output.status.success() {
            return Err(SkyError::TunnelProvision(format!(
                "dns route for {} failed: {}",
                hostname,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }

    fn run(
        &self,
        tunnel_id: &str,
        config_path: &Path,
        log_path: &Path,
    ) -> Result<ProcessHandle, SkyError> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let log = OpenOptions::new().create(true).append(true).open(log_path)?;
        let log_err = log.try_clone()?;

        let child = std::process::Command::new(&self.binary)
            .arg("tunnel")
            .arg("--config")
            .arg(config_path)
            .arg("run")
            .arg(tunnel_id)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .spawn()
            .map_err(|e| {
                SkyError::TunnelProvision(format!("failed to spawn tunnel process: {}", e))
            })?;

        Ok(ProcessHandle::new(child.id()))
    }
}
