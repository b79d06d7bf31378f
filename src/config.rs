//! Application-level configuration loading for queue sizes, timeouts, and
//! relay settings.

use std::time::Duration;
use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TYPERACE_BACK_CONFIG_PATH";

const DEFAULT_SESSION_QUEUE_CAPACITY: usize = 256;
const DEFAULT_HUB_COMMAND_CAPACITY: usize = 1024;
const DEFAULT_BUS_CHANNEL_CAPACITY: usize = 1024;
const DEFAULT_RELAY_TOPIC: &str = "global_broadcast";
const DEFAULT_HISTORY_TTL_SECONDS: u64 = 300;
const DEFAULT_STORAGE_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 5_000;
const DEFAULT_HISTORY_PAGE_LIMIT: usize = 50;
const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Capacity of each session's bounded outbound queue; a session whose
    /// queue overflows during a broadcast is disconnected.
    pub session_queue_capacity: usize,
    /// Capacity of the session hub's command inbox.
    pub hub_command_capacity: usize,
    /// Capacity of each per-topic channel of the in-process bus.
    pub bus_channel_capacity: usize,
    /// Bus topic carrying the shared broadcast domain.
    pub relay_topic: String,
    /// Seconds a cached per-user match history stays valid.
    pub history_ttl_seconds: u64,
    /// Upper bound in milliseconds for storage and cache calls made from
    /// event handlers.
    pub storage_timeout_ms: u64,
    /// Milliseconds granted to in-flight work between the shutdown signal and
    /// forced teardown.
    pub shutdown_grace_ms: u64,
    /// Maximum number of match records returned per history request.
    pub history_page_limit: usize,
    /// Default number of entries returned by the leaderboard endpoint.
    pub leaderboard_limit: usize,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the
    /// built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration from file");
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Validity window for cached match histories.
    pub fn history_ttl(&self) -> Duration {
        Duration::from_secs(self.history_ttl_seconds)
    }

    /// Deadline applied to storage and cache calls made from event handlers.
    pub fn storage_timeout(&self) -> Duration {
        Duration::from_millis(self.storage_timeout_ms)
    }

    /// Window between the shutdown signal and forced connection teardown.
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
///
/// Every field is optional; omitted fields keep their defaults.
struct RawConfig {
    session_queue_capacity: usize,
    hub_command_capacity: usize,
    bus_channel_capacity: usize,
    relay_topic: String,
    history_ttl_seconds: u64,
    storage_timeout_ms: u64,
    shutdown_grace_ms: u64,
    history_page_limit: usize,
    leaderboard_limit: usize,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            session_queue_capacity: DEFAULT_SESSION_QUEUE_CAPACITY,
            hub_command_capacity: DEFAULT_HUB_COMMAND_CAPACITY,
            bus_channel_capacity: DEFAULT_BUS_CHANNEL_CAPACITY,
            relay_topic: DEFAULT_RELAY_TOPIC.to_owned(),
            history_ttl_seconds: DEFAULT_HISTORY_TTL_SECONDS,
            storage_timeout_ms: DEFAULT_STORAGE_TIMEOUT_MS,
            shutdown_grace_ms: DEFAULT_SHUTDOWN_GRACE_MS,
            history_page_limit: DEFAULT_HISTORY_PAGE_LIMIT,
            leaderboard_limit: DEFAULT_LEADERBOARD_LIMIT,
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            session_queue_capacity: value.session_queue_capacity,
            hub_command_capacity: value.hub_command_capacity,
            bus_channel_capacity: value.bus_channel_capacity,
            relay_topic: value.relay_topic,
            history_ttl_seconds: value.history_ttl_seconds,
            storage_timeout_ms: value.storage_timeout_ms,
            shutdown_grace_ms: value.shutdown_grace_ms,
            history_page_limit: value.history_page_limit,
            leaderboard_limit: value.leaderboard_limit,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
