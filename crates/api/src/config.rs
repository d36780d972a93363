use std::fmt::Display;
use std::str::FromStr;

use orch_core::agent::{
    HEARTBEAT_CHECK_INTERVAL_SECS, HEARTBEAT_TIMEOUT_SECS, MAX_HEARTBEAT_TIMEOUT_SECS,
};

/// A configuration variable that is present but unusable.
#[derive(Debug, thiserror::Error)]
#[error("{var} has invalid value '{value}': {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for background tasks, in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Admin bearer token. When `None` the admin gate is open.
    pub admin_token: Option<String>,
    /// Directory holding `agents.json`, `jobs.json` and `envs/`.
    pub storage_dir: String,
    /// Seconds without a heartbeat before an agent is flipped offline.
    pub heartbeat_timeout_secs: u64,
    /// Seconds between stale-agent sweeps.
    pub heartbeat_check_interval_secs: u64,
    /// Emit logs as JSON lines instead of human-readable text.
    pub json_logs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            cors_origins: vec!["http://localhost:5173".into()],
            request_timeout_secs: 30,
            shutdown_timeout_secs: 30,
            admin_token: None,
            storage_dir: "/var/lib/orchestrator".into(),
            heartbeat_timeout_secs: HEARTBEAT_TIMEOUT_SECS,
            heartbeat_check_interval_secs: HEARTBEAT_CHECK_INTERVAL_SECS,
            json_logs: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                 |
    /// |--------------------------------|-------------------------|
    /// | `HOST`                         | `0.0.0.0`               |
    /// | `PORT`                         | `8000`                  |
    /// | `CORS_ORIGINS`                 | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`         | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`        | `30`                    |
    /// | `ADMIN_API_TOKEN`              | unset (gate open)       |
    /// | `ORCH_STORAGE_DIR`             | `/var/lib/orchestrator` |
    /// | `AGENT_HEARTBEAT_TIMEOUT_SECS` | `120`                   |
    /// | `AGENT_CHECK_INTERVAL_SECS`    | `30`                    |
    /// | `LOG_FORMAT`                   | `text` (or `json`)      |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let cors_origins = match lookup("CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => defaults.cors_origins,
        };

        let admin_token = lookup("ADMIN_API_TOKEN").filter(|t| !t.trim().is_empty());

        let heartbeat_check_interval_secs: u64 = parse_var(
            &lookup,
            "AGENT_CHECK_INTERVAL_SECS",
            defaults.heartbeat_check_interval_secs,
        )?;
        if heartbeat_check_interval_secs == 0 {
            return Err(ConfigError {
                var: "AGENT_CHECK_INTERVAL_SECS",
                value: "0".into(),
                reason: "must be greater than zero".into(),
            });
        }

        let heartbeat_timeout_secs: u64 = parse_var(
            &lookup,
            "AGENT_HEARTBEAT_TIMEOUT_SECS",
            defaults.heartbeat_timeout_secs,
        )?;
        if heartbeat_timeout_secs > MAX_HEARTBEAT_TIMEOUT_SECS {
            return Err(ConfigError {
                var: "AGENT_HEARTBEAT_TIMEOUT_SECS",
                value: heartbeat_timeout_secs.to_string(),
                reason: format!("must be at most {MAX_HEARTBEAT_TIMEOUT_SECS}"),
            });
        }

        let json_logs = match lookup("LOG_FORMAT").as_deref() {
            None | Some("text") => false,
            Some("json") => true,
            Some(other) => {
                return Err(ConfigError {
                    var: "LOG_FORMAT",
                    value: other.to_string(),
                    reason: "expected 'text' or 'json'".into(),
                })
            }
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT", defaults.port)?,
            cors_origins,
            request_timeout_secs: parse_var(
                &lookup,
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            )?,
            shutdown_timeout_secs: parse_var(
                &lookup,
                "SHUTDOWN_TIMEOUT_SECS",
                defaults.shutdown_timeout_secs,
            )?,
            admin_token,
            storage_dir: lookup("ORCH_STORAGE_DIR").unwrap_or(defaults.storage_dir),
            heartbeat_timeout_secs,
            heartbeat_check_interval_secs,
            json_logs,
        })
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}
