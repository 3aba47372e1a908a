//! Configuration management for Warden.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::supervisor::LaunchSpec;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "warden.toml";

/// Top-level Warden configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    /// HTTP server bind settings.
    pub server: ServerConfig,
    /// External program launched for each supervised process.
    pub launch: LaunchConfig,
    /// Snapshot persistence settings.
    pub persistence: PersistenceConfig,
    /// Termination handling.
    pub supervision: SupervisionConfig,
    /// Heartbeat job settings.
    pub heartbeat: HeartbeatConfig,
}

/// HTTP server bind settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: 9090,
        }
    }
}

/// Launch template for supervised processes. The process identifier is
/// appended as the final argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    /// Program to execute.
    pub program: String,
    /// Fixed leading arguments.
    pub args: Vec<String>,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            program: String::from("./worker"),
            args: Vec::new(),
        }
    }
}

/// Snapshot persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Path of the JSON snapshot file.
    pub snapshot_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("process_logs.json"),
        }
    }
}

/// Termination handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisionConfig {
    /// How long a kill waits for OS-level termination before reporting the
    /// termination as pending.
    pub kill_timeout_secs: u64,
}

impl Default for SupervisionConfig {
    fn default() -> Self {
        Self {
            kill_timeout_secs: 10,
        }
    }
}

/// Heartbeat job settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Seconds between heartbeat messages.
    pub interval_secs: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self { interval_secs: 1 }
    }
}

impl WardenConfig {
    /// Load `warden.toml` from the working directory, falling back to
    /// defaults when the file does not exist.
    pub fn load() -> Result<Self> {
        let path = PathBuf::from(DEFAULT_CONFIG_PATH);
        if path.exists() {
            Self::load_from_path(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Save configuration to a specific path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// Launch template as the supervisor core type.
    pub fn launch_spec(&self) -> LaunchSpec {
        LaunchSpec {
            program: self.launch.program.clone(),
            args: self.launch.args.clone(),
        }
    }

    /// Kill deadline as a `Duration`.
    pub fn kill_timeout(&self) -> Duration {
        Duration::from_secs(self.supervision.kill_timeout_secs)
    }

    /// Heartbeat interval as a `Duration`. A zero interval would make the
    /// ticker spin, so at least one second is enforced.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat.interval_secs.max(1))
    }
}
