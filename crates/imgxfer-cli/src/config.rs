//! Configuration system for the IMGXFER CLI.

use imgxfer_files::{DEFAULT_ALIGNMENT, DEFAULT_CHUNK_SIZE, ReceiveOptions, SECTOR_SIZE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Largest accepted transfer chunk
const MAX_CHUNK_SIZE: usize = 64 * 1024 * 1024;

/// IMGXFER configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Transfer configuration
    #[serde(default)]
    pub transfer: TransferConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Transfer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Transfer buffer size in bytes
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Transfer buffer alignment in bytes
    #[serde(default = "default_alignment")]
    pub alignment: usize,
    /// Fall back to buffered I/O when direct I/O is not supported
    #[serde(default = "default_true")]
    pub buffered_fallback: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_alignment() -> usize {
    DEFAULT_ALIGNMENT
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            alignment: default_alignment(),
            buffered_fallback: true,
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

    /// Get default config path
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/etc"))
            .join("imgxfer/config.toml")
    }

    /// Load config from `path`, or from the default path if none is given
    ///
    /// A missing default config file yields the default configuration; a
    /// missing explicit path is an error.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or parsing the config fails.
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Receive options for the transfer engine
    #[must_use]
    pub fn receive_options(&self) -> ReceiveOptions {
        ReceiveOptions {
            chunk_size: self.transfer.chunk_size,
            alignment: self.transfer.alignment,
            buffered_fallback: self.transfer.buffered_fallback,
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid.
    pub fn validate(&self) -> anyhow::Result<()> {
        let chunk_size = self.transfer.chunk_size;
        if chunk_size == 0 || chunk_size % SECTOR_SIZE != 0 || chunk_size > MAX_CHUNK_SIZE {
            anyhow::bail!(
                "Chunk size must be a multiple of {} between {} and {} bytes: {}",
                SECTOR_SIZE,
                SECTOR_SIZE,
                MAX_CHUNK_SIZE,
                chunk_size
            );
        }

        let alignment = self.transfer.alignment;
        if alignment == 0 || alignment % SECTOR_SIZE != 0 {
            anyhow::bail!(
                "Alignment must be a positive multiple of {}: {}",
                SECTOR_SIZE,
                alignment
            );
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
