//! Configuration system for the emberlink CLI.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// emberlink configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Link configuration
    pub link: LinkConfig,
    /// Session timing configuration
    pub session: SessionTimingConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Link configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Serial port path, e.g. /dev/ttyUSB0 or COM3
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    /// Serial baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Session timing configuration, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTimingConfig {
    /// Handshake ACK deadline
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
    /// Per-packet ACK deadline
    #[serde(default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,
    /// Per-packet receive deadline during downloads
    #[serde(default = "default_receive_timeout_ms")]
    pub receive_timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values

fn default_baud_rate() -> u32 {
    emberlink_link::serial::BAUD_RATE
}

fn default_handshake_timeout_ms() -> u64 {
    5000
}

fn default_ack_timeout_ms() -> u64 {
    2000
}

fn default_receive_timeout_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for SessionTimingConfig {
    fn default() -> Self {
        Self {
            handshake_timeout_ms: default_handshake_timeout_ms(),
            ack_timeout_ms: default_ack_timeout_ms(),
            receive_timeout_ms: default_receive_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, contents)?;
        Ok(())
    }

    /// Get default config path
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("emberlink/config.toml")
    }

    /// Load config from default path, or create default if it doesn't exist
    ///
    /// # Errors
    ///
    /// Returns an error if reading or creating the config fails.
    pub fn load_or_default() -> anyhow::Result<Self> {
        let path = Self::default_path();

        if path.exists() {
            Self::load(&path)
        } else {
            let config = Self::default();
            config.save(&path)?;
            Ok(config)
        }
    }

    /// Session timeouts as the transport layer expects them
    #[must_use]
    pub fn session_config(&self) -> emberlink_link::SessionConfig {
        use std::time::Duration;
        emberlink_link::SessionConfig {
            handshake_timeout: Duration::from_millis(self.session.handshake_timeout_ms),
            ack_timeout: Duration::from_millis(self.session.ack_timeout_ms),
            receive_timeout: Duration::from_millis(self.session.receive_timeout_ms),
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.link.baud_rate == 0 {
            anyhow::bail!("Baud rate must be nonzero");
        }

        if self.session.handshake_timeout_ms == 0
            || self.session.ack_timeout_ms == 0
            || self.session.receive_timeout_ms == 0
        {
            anyhow::bail!("Session timeouts must be nonzero");
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!(
                "Invalid log level: {}. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            );
        }

        Ok(())
    }
}
