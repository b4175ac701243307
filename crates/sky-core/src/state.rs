//! Durable state: the single source of truth for servers and tunnels
//!
//! State is persisted as one whole-file JSON snapshot. Commands read a
//! snapshot at invocation start, mutate a working copy, and overwrite the
//! file at the end; there are no partial or merge writes. The
//! single-writer assumption is made explicit with an advisory lock on a
//! sidecar file held for the duration of a mutating command.

use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::error::SkyError;
use crate::hostname::ParsedHost;
use crate::types::{ServerRecord, TunnelRecord};

/// In-memory snapshot of everything skyhook manages
///
/// `BTreeMap` keeps iteration order deterministic, which the ingress
/// builder and the persisted representation both rely on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    #[serde(default)]
    pub tunnels: BTreeMap<String, TunnelRecord>,
    #[serde(default)]
    pub servers: BTreeMap<String, ServerRecord>,
}

impl State {
    /// Ports claimed by any server record
    pub fn claimed_ports(&self) -> HashSet<u16> {
        self.servers.values().map(|s| s.port).collect()
    }

    /// Insert a server, enforcing key, hostname, and port uniqueness
    pub fn insert_server(&mut self, key: String, record: ServerRecord) -> Result<(), SkyError> {
        if self.servers.contains_key(&key) {
            return Err(SkyError::AlreadyInUse(key));
        }
        if let Some((existing, _)) = self
            .servers
            .iter()
            .find(|(_, s)| s.hostname == record.hostname)
        {
            return Err(SkyError::AlreadyInUse(existing.clone()));
        }
        if self.servers.values().any(|s| s.port == record.port) {
            return Err(SkyError::AlreadyInUse(format!("port {}", record.port)));
        }
        self.servers.insert(key, record);
        Ok(())
    }

    /// Resolve the state key for a stop/logs target
    ///
    /// Three-tier lookup, first match wins: the parsed state key, then an
    /// exact hostname match, then subdomain or key equality against the
    /// raw input.
    pub fn resolve_key(&self, raw: &str, parsed: &ParsedHost) -> Option<String> {
        if self.servers.contains_key(&parsed.key) {
            return Some(parsed.key.clone());
        }
        if let Some((key, _)) = self
            .servers
            .iter()
            .find(|(_, s)| s.hostname == parsed.hostname || s.hostname == raw)
        {
            return Some(key.clone());
        }
        self.servers
            .iter()
            .find(|(key, s)| s.subdomain == raw || key.as_str() == raw)
            .map(|(key, _)| key.clone())
    }
}

/// Whole-file persistence for [`State`]
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

/// Advisory exclusive lock on the state file, released on drop
pub struct StateLock {
    file: File,
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Err(e) = fs2::FileExt::unlock(&self.file) {
            tracing::warn!("failed to release state lock: {}", e);
        }
    }
}

impl StateStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Take the advisory lock guarding load-mutate-save
    ///
    /// Blocks until any concurrent invocation releases it.
    pub fn lock(&self) -> Result<StateLock, SkyError> {
        let lock_path = self.path.with_extension("lock");
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&lock_path)?;
        file.lock_exclusive()?;
        Ok(StateLock { file })
    }

    /// Load the current snapshot, or an empty one if nothing is persisted
    ///
    /// Unparsable content is fatal: silently discarding unreadable state
    /// could orphan real child processes.
    pub fn load(&self) -> Result<State, SkyError> {
        if !self.path.exists() {
            return Ok(State::default());
        }
        let content = fs::read_to_string(&self.path)?;
        serde_json::from_str(&content).map_err(|e| SkyError::CorruptState {
            path: self.path.clone(),
            detail: e.to_string(),
        })
    }

    /// Overwrite the persisted snapshot
    pub fn save(&self, state: &State) -> Result<(), SkyError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| SkyError::Persistence {
                path: self.path.clone(),
                source: e,
            })?;
        }
        let content = serde_json::to_string_pretty(state).map_err(|e| SkyError::Persistence {
            path: self.path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;
        fs::write(&self.path, content).map_err(|e| SkyError::Persistence {
            path: self.path.clone(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hostname;
    use crate::types::{ServerKind, TunnelMode};
    use chrono::Utc;
    use tempfile::TempDir;

    fn record(hostname: &str, port: u16) -> ServerRecord {
        let (subdomain, domain) = hostname.split_once('.').unwrap();
        ServerRecord {
            subdomain: subdomain.to_string(),
            domain: domain.to_string(),
            hostname: hostname.to_string(),
            path: PathBuf::new(),
            port,
            pid: None,
            kind: ServerKind::Static,
            mode: TunnelMode::Managed,
            tunnel: "skyhook".to_string(),
            url: format!("https://{}", hostname),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn load_missing_file_is_empty_state() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        assert_eq!(store.load().unwrap(), State::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));

        let mut state = State::default();
        state
            .insert_server("demo".to_string(), record("demo.example.com", 4000))
            .unwrap();
        store.save(&state).unwrap();

        assert_eq!(store.load().unwrap(), state);
    }

    #[test]
    fn save_of_loaded_state_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let store = StateStore::new(path.clone());

        let mut state = State::default();
        state
            .insert_server("demo".to_string(), record("demo.example.com", 4000))
            .unwrap();
        store.save(&state).unwrap();
        let first = fs::read(&path).unwrap();

        store.save(&store.load().unwrap()).unwrap();
        assert_eq!(fs::read(&path).unwrap(), first);
    }

    #[test]
    fn corrupt_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();

        let store = StateStore::new(path);
        assert!(matches!(store.load(), Err(SkyError::CorruptState { .. })));
    }

    #[test]
    fn duplicate_key_rejected() {
        let mut state = State::default();
        state
            .insert_server("demo".to_string(), record("demo.example.com", 4000))
            .unwrap();
        let err = state.insert_server("demo".to_string(), record("other.example.com", 4001));
        assert!(matches!(err, Err(SkyError::AlreadyInUse(_))));
    }

    #[test]
    fn duplicate_hostname_and_port_rejected() {
        let mut state = State::default();
        state
            .insert_server("demo".to_string(), record("demo.example.com", 4000))
            .unwrap();

        assert!(matches!(
            state.insert_server("demo2".to_string(), record("demo.example.com", 4001)),
            Err(SkyError::AlreadyInUse(_))
        ));
        assert!(matches!(
            state.insert_server("demo3".to_string(), record("demo3.example.com", 4000)),
            Err(SkyError::AlreadyInUse(_))
        ));
    }

    #[test]
    fn resolve_key_three_tiers() {
        let mut state = State::default();
        state
            .insert_server("demo".to_string(), record("demo.example.com", 4000))
            .unwrap();
        state
            .insert_server(
                "api-staging-example-io".to_string(),
                ServerRecord {
                    subdomain: "api.staging".to_string(),
                    domain: "example.io".to_string(),
                    hostname: "api.staging.example.io".to_string(),
                    ..record("x.example.com", 4001)
                },
            )
            .unwrap();

        // Tier 1: parsed key
        let parsed = hostname::parse("demo", "example.com").unwrap();
        assert_eq!(state.resolve_key("demo", &parsed), Some("demo".to_string()));

        // Tier 2: the full hostname parses to key "demo-example-com", which is
        // not a stored key, but the exact hostname still matches
        let parsed = hostname::parse("demo.example.com", "example.com").unwrap();
        assert_eq!(
            state.resolve_key("demo.example.com", &parsed),
            Some("demo".to_string())
        );

        // Tier 3: subdomain equality against raw input
        let parsed = hostname::parse("api.staging", "example.com").unwrap();
        assert_eq!(
            state.resolve_key("api.staging", &parsed),
            Some("api-staging-example-io".to_string())
        );

        // No match
        let parsed = hostname::parse("nothere", "example.com").unwrap();
        assert_eq!(state.resolve_key("nothere", &parsed), None);
    }

    #[test]
    fn lock_can_be_taken_and_released() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        {
            let _lock = store.lock().unwrap();
        }
        // Released on drop, so a second take succeeds
        let _lock = store.lock().unwrap();
    }
}
