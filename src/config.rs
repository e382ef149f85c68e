use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Donation platform backend
///
/// Only flags given on the command line are layered over the file and
/// environment, so an omitted flag never masks a TOML or env value.
#[derive(Parser, Serialize, Debug)]
#[command(name = "donation-server", version, about = "Donation platform backend")]
pub struct Cli {
    /// Port to listen on
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Bind address
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<String>,

    /// Path to TOML config file
    #[arg(long, default_value = "./donation.toml")]
    #[serde(skip)]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub generate_config: bool,

    /// Data directory for the SQLite database
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,

    /// Browser origin allowed to call the REST API
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cors_origin: Option<String>,

    /// Maximum request body size in megabytes
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_body_mb: Option<usize>,
}

/// Effective server configuration after all layers are merged.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub bind_address: String,
    pub json_logs: bool,
    #[serde(default)]
    pub generate_config: bool,
    pub data_dir: String,
    pub cors_origin: String,
    pub max_body_mb: usize,
    /// WebSocket keepalive settings ([realtime] section in TOML)
    #[serde(default)]
    pub realtime: RealtimeConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Figment(#[from] figment::Error),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Keepalive settings for real-time connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Seconds between server pings (default: 30)
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,

    /// Seconds to wait for a pong before dropping the connection (default: 10)
    #[serde(default = "default_pong_timeout")]
    pub pong_timeout_secs: u64,
}

impl RealtimeConfig {
    /// Ping period, never shorter than one second.
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs.max(1))
    }

    /// Pong deadline, never shorter than one second.
    pub fn pong_timeout(&self) -> Duration {
        Duration::from_secs(self.pong_timeout_secs.max(1))
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: default_ping_interval(),
            pong_timeout_secs: default_pong_timeout(),
        }
    }
}

fn default_ping_interval() -> u64 {
    30
}

fn default_pong_timeout() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            bind_address: "0.0.0.0".to_string(),
            json_logs: false,
            generate_config: false,
            data_dir: "./data".to_string(),
            cors_origin: "http://localhost:5173".to_string(),
            max_body_mb: 50,
            realtime: RealtimeConfig::default(),
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (DONATION_*) < CLI args
    pub fn load() -> Result<Self, ConfigError> {
        let config: Config = Self::figment(Cli::parse()).extract()?;
        config.validate()?;
        Ok(config)
    }

    fn figment(cli: Cli) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&cli.config))
            .merge(Env::prefixed("DONATION_").split("__"))
            .merge(Serialized::defaults(cli))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.realtime.ping_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "realtime.ping_interval_secs must be at least 1",
            ));
        }
        if self.realtime.pong_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "realtime.pong_timeout_secs must be at least 1",
            ));
        }
        if self.max_body_mb == 0 {
            return Err(ConfigError::Invalid("max_body_mb must be at least 1"));
        }
        Ok(())
    }

    /// Request body limit in bytes.
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_mb.saturating_mul(1024 * 1024)
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# Donation Server Configuration
# Place this file at ./donation.toml or specify with --config <path>
# All settings can be overridden via environment variables (DONATION_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 5000)
# port = 5000

# Bind address (default: 0.0.0.0, all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Data directory for the SQLite database
# data_dir = "./data"

# Browser origin allowed to call the REST API
# cors_origin = "http://localhost:5173"

# Maximum request body size in megabytes (default: 50)
# max_body_mb = 50

# ---- Real-time connections ----
# [realtime]

# Seconds between server pings, at least 1 (default: 30)
# ping_interval_secs = 30

# Seconds to wait for a pong before the connection is dropped, at least 1 (default: 10)
# pong_timeout_secs = 10
"#
    .to_string()
}
