//! Core error types for skyhook

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the skyhook core
#[derive(Error, Debug)]
pub enum SkyError {
    /// Malformed hostname input
    #[error("invalid hostname: {0}")]
    InvalidHostname(String),

    /// A server record already exists under this key
    #[error("'{0}' is already in use; stop it first or pick another name")]
    AlreadyInUse(String),

    /// Required external binary is not reachable
    #[error("required binary '{0}' was not found; install it and make sure it is on PATH")]
    DependencyMissing(String),

    /// Persisted state cannot be parsed. Fatal: discarding unreadable state
    /// risks orphaning real child processes, so the user must intervene.
    #[error(
        "state file {path} is corrupt ({detail}); \
         inspect running processes, then delete the file to start fresh"
    )]
    CorruptState { path: PathBuf, detail: String },

    /// Writing the state file failed
    #[error("failed to persist state to {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The control plane refused to create or run a tunnel
    #[error("tunnel provisioning failed: {0}")]
    TunnelProvision(String),

    /// No server record matches the given name
    #[error("no server found for '{0}'")]
    NotFound(String),

    /// No free port at or above the configured base port
    #[error("no free port available at or above {0}")]
    PortRangeExhausted(u16),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid configuration
    #[error("invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
