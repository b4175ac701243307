//! Orchestrator: sequences launch, tunnel selection, DNS, and state commit
//!
//! Per hostname key the only persisted states are absent and active; the
//! in-between (starting, stopping) exists only inside a single command
//! invocation. Within one invocation the ordering is fixed:
//! resolve, provision, commit in memory, regenerate and restart the
//! tunnel, persist. Persistence comes last so a crash mid-sequence never
//! leaves a routing config referencing a server absent from persisted
//! state; the worst case is a running process not yet recorded, which a
//! manual `stop` recovers.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use chrono::Utc;
use serde::Serialize;

use crate::config::Config;
use crate::control::ControlPlane;
use crate::error::SkyError;
use crate::hostname;
use crate::launch::{LaunchPlan, LaunchPlanner};
use crate::ports;
use crate::process::ProcessHandle;
use crate::state::{State, StateStore};
use crate::tunnel::TunnelController;
use crate::types::{
    ServerDescriptor, ServerKind, ServerRecord, StoppedDescriptor, TunnelMode, TunnelStatus,
};

/// Parameters of a `start` operation
#[derive(Debug, Clone)]
pub struct StartRequest {
    /// Raw name as the user typed it
    pub name: String,
    /// Project directory; defaults to the current directory
    pub directory: Option<PathBuf>,
    /// Isolate this hostname on its own tunnel
    pub dedicated: bool,
    /// Route to an already-running process on this port instead of
    /// spawning anything
    pub external_port: Option<u16>,
}

/// Snapshot view returned by `status`
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub tunnels: Vec<TunnelStatusEntry>,
    pub servers: Vec<ServerStatusEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TunnelStatusEntry {
    pub name: String,
    pub id: String,
    pub status: TunnelStatus,
    pub pid: Option<ProcessHandle>,
    pub alive: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerStatusEntry {
    #[serde(flatten)]
    pub descriptor: ServerDescriptor,
    pub pid: Option<ProcessHandle>,
    /// None for external servers, which skyhook does not own
    pub alive: Option<bool>,
}

/// The hostname-routing state machine
pub struct Orchestrator<'a, C: ControlPlane, L: LaunchPlanner> {
    config: &'a Config,
    control: &'a C,
    launcher: &'a L,
    store: StateStore,
}

impl<'a, C: ControlPlane, L: LaunchPlanner> Orchestrator<'a, C, L> {
    pub fn new(config: &'a Config, control: &'a C, launcher: &'a L) -> Self {
        let store = StateStore::new(config.state_path());
        Self {
            config,
            control,
            launcher,
            store,
        }
    }

    /// Publish a hostname, spawning a local server unless an external port
    /// is given
    pub async fn start(&self, req: StartRequest) -> Result<ServerDescriptor, SkyError> {
        let _lock = self.store.lock()?;
        let parsed = hostname::parse(&req.name, &self.config.default_domain)?;
        let mut state = self.store.load()?;

        if state.servers.contains_key(&parsed.key) {
            return Err(SkyError::AlreadyInUse(parsed.key));
        }
        if state.servers.values().any(|s| s.hostname == parsed.hostname) {
            return Err(SkyError::AlreadyInUse(parsed.hostname));
        }
        if !self.control.is_installed().await {
            return Err(SkyError::DependencyMissing(
                self.config.cloudflared_binary.clone(),
            ));
        }

        // Resolve port and, unless the process is externally owned, spawn it
        let (port, kind, pid, path) = match req.external_port {
            Some(port) => {
                if state.claimed_ports().contains(&port) {
                    return Err(SkyError::AlreadyInUse(format!("port {}", port)));
                }
                (port, ServerKind::External, None, PathBuf::new())
            }
            None => {
                let port = ports::next_free_port(&state.claimed_ports(), self.config.base_port)
                    .ok_or(SkyError::PortRangeExhausted(self.config.base_port))?;
                let directory = req.directory.clone().unwrap_or_else(|| PathBuf::from("."));
                let plan = self.launcher.detect(&directory, port)?;
                let handle =
                    self.spawn_server(&plan, &directory, &self.config.log_path(&parsed.key))?;
                tracing::info!(
                    "spawned {} server (pid {}) for {} on port {}",
                    plan.kind,
                    handle,
                    parsed.hostname,
                    port
                );
                (port, plan.kind, Some(handle), directory)
            }
        };

        let mode = if req.dedicated {
            TunnelMode::Dedicated
        } else {
            TunnelMode::Managed
        };
        let tunnel_name = match mode {
            TunnelMode::Dedicated => format!("{}-tunnel", parsed.key),
            TunnelMode::Managed => self.config.managed_tunnel_name.clone(),
        };

        let record = ServerRecord {
            subdomain: parsed.subdomain.clone(),
            domain: parsed.domain.clone(),
            hostname: parsed.hostname.clone(),
            path,
            port,
            pid,
            kind,
            mode,
            tunnel: tunnel_name.clone(),
            url: format!("https://{}", parsed.hostname),
            created_at: Utc::now(),
        };

        let controller = TunnelController::new(self.config, self.control);

        match mode {
            TunnelMode::Dedicated => {
                // Provisioning failure rolls back the just-spawned server:
                // an orphaned process with no route is worse than a failed
                // command.
                let tunnel = match controller
                    .create_dedicated(&tunnel_name, &parsed.hostname, port)
                    .await
                {
                    Ok(tunnel) => tunnel,
                    Err(e) => {
                        rollback_spawned(pid);
                        return Err(e);
                    }
                };
                state.tunnels.insert(tunnel_name.clone(), tunnel);
                state.insert_server(parsed.key.clone(), record.clone())?;
                controller.route_dns(&tunnel_name, &parsed.hostname).await;
            }
            TunnelMode::Managed => {
                let tunnel_id = match controller.ensure_managed().await {
                    Ok(id) => id,
                    Err(e) => {
                        rollback_spawned(pid);
                        return Err(e);
                    }
                };
                // Commit in memory first so the regenerated config includes
                // the new hostname
                state.insert_server(parsed.key.clone(), record.clone())?;
                if let Err(e) = controller.restart_managed(&mut state, &tunnel_id).await {
                    rollback_spawned(pid);
                    return Err(e);
                }
                controller.route_dns(&tunnel_name, &parsed.hostname).await;
            }
        }

        self.store.save(&state)?;
        Ok(ServerDescriptor::from_record(&parsed.key, &record))
    }

    /// Unpublish a hostname and reconcile its tunnel
    pub async fn stop(&self, name: &str) -> Result<StoppedDescriptor, SkyError> {
        let _lock = self.store.lock()?;
        let parsed = hostname::parse(name, &self.config.default_domain)?;
        let mut state = self.store.load()?;

        let key = state
            .resolve_key(name, &parsed)
            .ok_or_else(|| SkyError::NotFound(name.to_string()))?;
        let record = state
            .servers
            .remove(&key)
            .ok_or_else(|| SkyError::NotFound(name.to_string()))?;

        match record.pid {
            Some(handle) => {
                if let Err(e) = handle.terminate() {
                    tracing::warn!("could not signal server process {}: {}", handle, e);
                }
            }
            // External servers are never signaled
            None => tracing::debug!("{} is externally owned, nothing to signal", key),
        }

        let controller = TunnelController::new(self.config, self.control);
        match record.mode {
            TunnelMode::Dedicated => {
                if let Some(tunnel) = state.tunnels.remove(&record.tunnel) {
                    controller.teardown(&tunnel);
                }
            }
            TunnelMode::Managed => {
                // Regenerate so the removed hostname's route disappears
                let managed = &self.config.managed_tunnel_name;
                if let Some(id) = state.tunnels.get(managed).map(|t| t.id.clone()) {
                    controller.restart_managed(&mut state, &id).await?;
                }
            }
        }

        self.store.save(&state)?;
        Ok(StoppedDescriptor {
            key,
            hostname: record.hostname,
            mode: record.mode,
        })
    }

    /// Descriptors for every active server
    pub fn list(&self) -> Result<Vec<ServerDescriptor>, SkyError> {
        let state = self.store.load()?;
        Ok(state
            .servers
            .iter()
            .map(|(key, record)| ServerDescriptor::from_record(key, record))
            .collect())
    }

    /// Tunnels and servers with process liveness, read-only
    pub fn status(&self) -> Result<StatusReport, SkyError> {
        let state = self.store.load()?;

        let tunnels = state
            .tunnels
            .iter()
            .map(|(name, record)| {
                let alive = record.pid.map(|p| p.is_alive()).unwrap_or(false);
                TunnelStatusEntry {
                    name: name.clone(),
                    id: record.id.clone(),
                    // A controller that exited reports as stopped even though
                    // the stored record still says running
                    status: if alive {
                        record.status
                    } else {
                        TunnelStatus::Stopped
                    },
                    pid: record.pid,
                    alive,
                }
            })
            .collect();

        let servers = state
            .servers
            .iter()
            .map(|(key, record)| ServerStatusEntry {
                descriptor: ServerDescriptor::from_record(key, record),
                pid: record.pid,
                alive: record.pid.map(|p| p.is_alive()),
            })
            .collect();

        Ok(StatusReport { tunnels, servers })
    }

    /// Resolve a name to its log sink path
    pub fn log_sink(&self, name: &str) -> Result<(String, PathBuf), SkyError> {
        let parsed = hostname::parse(name, &self.config.default_domain)?;
        let state = self.store.load()?;
        let key = state
            .resolve_key(name, &parsed)
            .ok_or_else(|| SkyError::NotFound(name.to_string()))?;
        let path = self.config.log_path(&key);
        Ok((key, path))
    }

    fn spawn_server(
        &self,
        plan: &LaunchPlan,
        directory: &Path,
        log_path: &Path,
    ) -> Result<ProcessHandle, SkyError> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let log = OpenOptions::new().create(true).append(true).open(log_path)?;
        let log_err = log.try_clone()?;

        let child = std::process::Command::new(&plan.program)
            .args(&plan.args)
            .envs(plan.env.iter().cloned())
            .current_dir(directory)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .spawn()?;

        Ok(ProcessHandle::new(child.id()))
    }
}

fn rollback_spawned(pid: Option<ProcessHandle>) {
    if let Some(handle) = pid {
        tracing::warn!("rolling back: terminating server process {}", handle);
        if let Err(e) = handle.terminate() {
            tracing::warn!("rollback signal to {} failed: {}", handle, e);
        }
    }
}
