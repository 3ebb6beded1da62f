//! Terminal configuration
//!
//! A JSON document with the sector keys, block layout, timings and scale
//! mode. Every field has a default, so an empty object (or no file at all)
//! is a valid configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::ScaleMode;
use crate::tag::simulated::{BLOCKS_PER_SECTOR, TOTAL_BLOCKS};
use crate::tag::{AuthKeys, BALANCE_BLOCK, PASSWORD_BLOCK};

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "RFID_ATM_CONFIG";

/// Environment variable overriding the card storage directory
pub const STORAGE_DIR_ENV: &str = "RFID_ATM_STORAGE_DIR";

/// Card file name inside the storage directory
pub const DEFAULT_CARD_FILE: &str = "card.json";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Terminal settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtmConfig {
    pub keys: AuthKeys,
    pub balance_block: u8,
    pub password_block: u8,
    /// How long a prompt waits for a line
    pub input_timeout_ms: u64,
    /// Pause between two polls of an empty field
    pub poll_interval_ms: u64,
    pub scale_mode: ScaleMode,
}

impl Default for AtmConfig {
    fn default() -> Self {
        Self {
            keys: AuthKeys::default(),
            balance_block: BALANCE_BLOCK,
            password_block: PASSWORD_BLOCK,
            input_timeout_ms: 1500,
            poll_interval_ms: 50,
            scale_mode: ScaleMode::default(),
        }
    }
}

impl AtmConfig {
    /// Load the configuration
    ///
    /// `path` wins over `RFID_ATM_CONFIG`. With neither, or when the file
    /// does not exist, the defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match std::env::var_os(CONFIG_ENV) {
                Some(path) => PathBuf::from(path),
                None => {
                    debug!("No configuration file, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        if !path.exists() {
            info!("Configuration {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let json = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_json(&json)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the block layout
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, block) in [
            ("balance_block", self.balance_block),
            ("password_block", self.password_block),
        ] {
            if block as usize >= TOTAL_BLOCKS {
                return Err(ConfigError::Invalid(format!(
                    "{} {} is beyond the last block",
                    name, block
                )));
            }
            if block == 0 {
                return Err(ConfigError::Invalid(format!(
                    "{} cannot be the manufacturer block",
                    name
                )));
            }
            if block % BLOCKS_PER_SECTOR == BLOCKS_PER_SECTOR - 1 {
                return Err(ConfigError::Invalid(format!(
                    "{} {} is a sector trailer",
                    name, block
                )));
            }
        }
        if self.balance_block == self.password_block {
            return Err(ConfigError::Invalid(
                "balance and password share a block".to_string(),
            ));
        }
        Ok(())
    }

    pub fn input_timeout(&self) -> Duration {
        Duration::from_millis(self.input_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Directory holding card files
pub fn default_storage_dir() -> PathBuf {
    if let Some(path) = std::env::var_os(STORAGE_DIR_ENV) {
        return PathBuf::from(path);
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".rfid-atm");
    }
    PathBuf::from("/var/lib/rfid-atm")
}

/// Card file used when none is given
pub fn default_card_path() -> PathBuf {
    default_storage_dir().join(DEFAULT_CARD_FILE)
}
