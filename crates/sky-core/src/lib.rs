//! sky-core: the hostname-routing state machine behind skyhook
//!
//! Publishes locally running processes to public hostnames by provisioning
//! routing rules in an external tunnel fabric (cloudflared) and tracking
//! which local process currently owns each hostname. The CLI front end
//! lives in the `skyhook` crate; this crate owns parsing, port
//! allocation, durable state, ingress config generation, tunnel
//! lifecycle, and the start/stop orchestration.

pub mod config;
pub mod control;
pub mod error;
pub mod hostname;
pub mod ingress;
pub mod launch;
pub mod orchestrator;
pub mod ports;
pub mod process;
pub mod state;
pub mod tunnel;
pub mod types;

pub use config::Config;
pub use control::{CloudflaredCli, ControlPlane};
pub use error::SkyError;
pub use launch::{LaunchPlanner, ProjectDetector};
pub use orchestrator::{Orchestrator, StartRequest, StatusReport};
pub use types::{ServerDescriptor, StoppedDescriptor};
