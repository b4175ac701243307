//! Tunnel lifecycle: ensure, regenerate-and-restart, create, tear down
//!
//! There is intentionally no incremental or hot-reload path. Whenever the
//! managed server set changes, the routing config is regenerated from the
//! snapshot and the controller process is restarted, so the live routing
//! table always matches the live server set.

use crate::config::Config;
use crate::control::ControlPlane;
use crate::error::SkyError;
use crate::ingress;
use crate::state::State;
use crate::types::{TunnelRecord, TunnelStatus};

/// Drives tunnel provisioning against a [`ControlPlane`]
pub struct TunnelController<'a, C: ControlPlane> {
    config: &'a Config,
    control: &'a C,
}

impl<'a, C: ControlPlane> TunnelController<'a, C> {
    pub fn new(config: &'a Config, control: &'a C) -> Self {
        Self { config, control }
    }

    /// Make sure the managed tunnel exists, returning its identifier
    ///
    /// Creation failure is fatal with no retry: tunnel creation is rarely
    /// transient and a blind retry could create duplicate tunnels.
    pub async fn ensure_managed(&self) -> Result<String, SkyError> {
        let name = &self.config.managed_tunnel_name;
        let tunnels = self.control.list_tunnels().await?;
        if let Some(existing) = tunnels.iter().find(|t| &t.name == name) {
            return Ok(existing.id.clone());
        }
        tracing::info!("creating managed tunnel '{}'", name);
        self.control.create_tunnel(name).await
    }

    /// Regenerate the managed tunnel's config and restart its controller
    ///
    /// Called on every managed-mode start and stop. The previous controller
    /// is signaled best-effort; it may already have exited.
    pub async fn restart_managed(
        &self,
        state: &mut State,
        tunnel_id: &str,
    ) -> Result<(), SkyError> {
        let name = self.config.managed_tunnel_name.clone();
        let config_path = self.config.tunnel_config_path(&name);

        let doc = ingress::managed_config(
            state,
            &name,
            tunnel_id,
            self.config.credentials_file(tunnel_id),
        );
        ingress::write_config(&config_path, &doc)?;

        if let Some(previous) = state.tunnels.get(&name).and_then(|t| t.pid) {
            if let Err(e) = previous.terminate() {
                tracing::warn!("could not signal previous tunnel process {}: {}", previous, e);
            }
        }

        let handle = self
            .control
            .run(tunnel_id, &config_path, &self.config.log_path(&name))?;
        tracing::debug!("managed tunnel restarted (pid {})", handle);

        state.tunnels.insert(
            name,
            TunnelRecord {
                id: tunnel_id.to_string(),
                pid: Some(handle),
                status: TunnelStatus::Running,
                config_path,
            },
        );
        Ok(())
    }

    /// Create a dedicated tunnel for a single hostname and start it
    ///
    /// Fails fatally if creation fails; the caller owns the rollback of any
    /// server process it already spawned.
    pub async fn create_dedicated(
        &self,
        tunnel_name: &str,
        hostname: &str,
        port: u16,
    ) -> Result<TunnelRecord, SkyError> {
        let tunnel_id = self.control.create_tunnel(tunnel_name).await?;
        let config_path = self.config.tunnel_config_path(tunnel_name);

        let doc = ingress::dedicated_config(
            &tunnel_id,
            self.config.credentials_file(&tunnel_id),
            hostname,
            port,
        );
        ingress::write_config(&config_path, &doc)?;

        let handle = self
            .control
            .run(&tunnel_id, &config_path, &self.config.log_path(tunnel_name))?;

        Ok(TunnelRecord {
            id: tunnel_id,
            pid: Some(handle),
            status: TunnelStatus::Running,
            config_path,
        })
    }

    /// Route a hostname to a tunnel in DNS
    ///
    /// Failure is a warning, not an error: the route is commonly already
    /// present from an earlier run.
    pub async fn route_dns(&self, tunnel_name: &str, hostname: &str) {
        if let Err(e) = self.control.route_dns(tunnel_name, hostname).await {
            tracing::warn!("dns routing for {} failed: {}", hostname, e);
        }
    }

    /// Signal a tunnel's controller process, best-effort
    pub fn teardown(&self, record: &TunnelRecord) {
        if let Some(pid) = record.pid {
            if let Err(e) = pid.terminate() {
                tracing::warn!("could not signal tunnel process {}: {}", pid, e);
            }
        }
    }
}
