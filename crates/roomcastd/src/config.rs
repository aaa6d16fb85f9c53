//! Server configuration.
//!
//! Settings are layered, later layers winning:
//! 1. Built-in defaults
//! 2. A TOML file (`--config`, or `roomcast/roomcastd.toml` in the user config dir)
//! 3. Environment (`ROOMCAST_BIND`)
//! 4. Command-line flags
//!
//! ```toml
//! bind = "0.0.0.0:12345"
//! max_in_flight = 512
//! client_ttl_secs = 3600
//! cleanup_interval_secs = 60
//! rooms = ["general", "random"]
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use roomcast_core::RoomName;

use crate::registry::RegistrySettings;
use crate::server::{DEFAULT_BIND_ADDR, DEFAULT_MAX_IN_FLIGHT};

/// Environment variable overriding the bind address
pub const BIND_ENV_VAR: &str = "ROOMCAST_BIND";

const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 60;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {error}")]
    Read { path: PathBuf, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid bind address '{value}': {error}")]
    InvalidBind { value: String, error: String },

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Complete server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// UDP address to bind
    pub bind: SocketAddr,

    /// Maximum datagrams handled concurrently
    pub max_in_flight: usize,

    /// Forget clients silent for this many seconds; 0 disables expiry
    pub client_ttl_secs: u64,

    /// Seconds between stale-client sweeps
    pub cleanup_interval_secs: u64,

    /// Rooms created at startup
    pub rooms: Vec<String>,

    /// Whether to run the admin console on stdin
    pub console: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND_ADDR,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            client_ttl_secs: 0,
            cleanup_interval_secs: DEFAULT_CLEANUP_INTERVAL_SECS,
            rooms: Vec::new(),
            console: true,
        }
    }
}

/// Command-line overrides; `None` leaves the loaded value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub bind: Option<SocketAddr>,
    pub max_in_flight: Option<usize>,
    pub client_ttl_secs: Option<u64>,
    pub rooms: Vec<String>,
    pub no_console: bool,
}

impl ServerConfig {
    /// Parses a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reads and parses a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Loads `explicit` if given, else the default file if it exists, else defaults.
    ///
    /// An explicit path that can't be read is an error; a missing default
    /// file is not.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// `<config dir>/roomcast/roomcastd.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("roomcast").join("roomcastd.toml"))
    }

    /// Applies environment overrides through `lookup` (normally `std::env::var`).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(BIND_ENV_VAR) {
            self.bind = value.parse().map_err(|e: std::net::AddrParseError| {
                ConfigError::InvalidBind {
                    value,
                    error: e.to_string(),
                }
            })?;
        }
        Ok(())
    }

    /// Applies command-line overrides. Rooms from the command line are
    /// added to those from the file.
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bind) = overrides.bind {
            self.bind = bind;
        }
        if let Some(max) = overrides.max_in_flight {
            self.max_in_flight = max;
        }
        if let Some(ttl) = overrides.client_ttl_secs {
            self.client_ttl_secs = ttl;
        }
        for room in overrides.rooms {
            if !self.rooms.contains(&room) {
                self.rooms.push(room);
            }
        }
        if overrides.no_console {
            self.console = false;
        }
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_in_flight == 0 {
            return Err(ConfigError::Invalid {
                field: "max_in_flight",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.cleanup_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "cleanup_interval_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if let Some(room) = self.rooms.iter().find(|r| r.split_whitespace().count() != 1) {
            return Err(ConfigError::Invalid {
                field: "rooms",
                reason: format!("'{room}' must be a single non-empty word"),
            });
        }
        Ok(())
    }

    /// Registry settings derived from this configuration.
    pub fn registry_settings(&self) -> RegistrySettings {
        RegistrySettings {
            client_ttl: (self.client_ttl_secs > 0).then(|| Duration::from_secs(self.client_ttl_secs)),
            cleanup_interval: Duration::from_secs(self.cleanup_interval_secs),
        }
    }

    /// Rooms to create at startup.
    pub fn initial_rooms(&self) -> Vec<RoomName> {
        self.rooms.iter().map(|r| RoomName::new(r.as_str())).collect()
    }
}
