//! Configuration for skyhook
//!
//! Settings are resolved once at startup into an explicit [`Config`] that
//! is threaded into the orchestrator as a parameter. Precedence is config
//! file first, then environment overrides.

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment override for the default domain
pub const ENV_DOMAIN: &str = "SKYHOOK_DOMAIN";
/// Environment override for the managed tunnel name
pub const ENV_TUNNEL_NAME: &str = "SKYHOOK_TUNNEL_NAME";
/// Environment override for the base port
pub const ENV_BASE_PORT: &str = "SKYHOOK_BASE_PORT";

/// Resolved configuration, threaded into the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Domain appended to short names ("demo" -> "demo.<default_domain>")
    pub default_domain: String,

    /// Name of the single shared tunnel serving managed-mode servers
    pub managed_tunnel_name: String,

    /// Lowest local port the allocator hands out
    pub base_port: u16,

    /// Directory holding state, generated tunnel configs, and log sinks
    pub data_dir: PathBuf,

    /// Directory where the control plane drops tunnel credentials
    pub credentials_dir: PathBuf,

    /// Name or path of the tunnel control-plane binary
    pub cloudflared_binary: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_domain: "example.com".to_string(),
            managed_tunnel_name: "skyhook".to_string(),
            base_port: 4000,
            data_dir: default_data_dir(),
            credentials_dir: default_credentials_dir(),
            cloudflared_binary: "cloudflared".to_string(),
        }
    }
}

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skyhook")
}

/// Get the default configuration file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skyhook")
}

fn default_credentials_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cloudflared")
}

impl Config {
    /// Load configuration from the default path with env overrides applied
    ///
    /// A missing config file is not an error; defaults are used.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&default_config_path())
    }

    /// Load configuration from a specific file with env overrides applied
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::Invalid(format!("failed to read config: {}", e)))?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(domain) = env::var(ENV_DOMAIN) {
            self.default_domain = domain;
        }
        if let Ok(name) = env::var(ENV_TUNNEL_NAME) {
            self.managed_tunnel_name = name;
        }
        if let Ok(port) = env::var(ENV_BASE_PORT) {
            self.base_port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("{} must be a port number", ENV_BASE_PORT)))?;
        }
        Ok(())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::Invalid(format!("failed to create config dir: {}", e)))?;
        }
        std::fs::write(path, content)
            .map_err(|e| ConfigError::Invalid(format!("failed to write config: {}", e)))?;
        Ok(())
    }

    /// Path of the persisted state snapshot
    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join("state.json")
    }

    /// Path of the generated routing config for a tunnel
    pub fn tunnel_config_path(&self, tunnel_name: &str) -> PathBuf {
        self.data_dir.join("tunnels").join(format!("{}.yml", tunnel_name))
    }

    /// Per-key log sink for a server's output
    pub fn log_path(&self, key: &str) -> PathBuf {
        self.data_dir.join("logs").join(format!("{}.log", key))
    }

    /// Credentials file the control plane wrote for a tunnel id
    pub fn credentials_file(&self, tunnel_id: &str) -> PathBuf {
        self.credentials_dir.join(format!("{}.json", tunnel_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn scratch() -> Config {
        Config {
            data_dir: PathBuf::from("/tmp/skyhook-test"),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_are_usable() {
        let config = Config::default();
        assert_eq!(config.base_port, 4000);
        assert_eq!(config.cloudflared_binary, "cloudflared");
        assert!(!config.managed_tunnel_name.is_empty());
    }

    #[test]
    fn derived_paths_live_under_data_dir() {
        let config = scratch();
        assert_eq!(config.state_path(), PathBuf::from("/tmp/skyhook-test/state.json"));
        assert_eq!(
            config.tunnel_config_path("skyhook"),
            PathBuf::from("/tmp/skyhook-test/tunnels/skyhook.yml")
        );
        assert_eq!(config.log_path("demo"), PathBuf::from("/tmp/skyhook-test/logs/demo.log"));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.base_port, Config::default().base_port);
    }

    #[test]
    fn file_values_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = scratch();
        config.default_domain = "mysite.dev".to_string();
        config.base_port = 5000;
        config.save(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.default_domain, "mysite.dev");
        assert_eq!(loaded.base_port, 5000);
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_domain = [not toml").unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse(_))));
    }
}
