//! Configuration for a [`RecordDevice`](crate::device::RecordDevice).
//!
//! The ring's capacity is a compile-time constant of the store type; the
//! settings here cover everything chosen at run time. A config can be built in
//! code or loaded from a JSON file, where any omitted field takes its default:
//!
//! ```json
//! { "terminator": 10, "lock_poll_interval": { "secs": 0, "nanos": 10000000 } }
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::assemble::DEFAULT_TERMINATOR;
use crate::error::{ConfigError, Result};
use crate::lock::DEFAULT_POLL_INTERVAL;

/// Run-time settings for a record device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Byte that ends a record.
    pub terminator: u8,

    /// How often a blocked store lock re-checks for cancellation.
    pub lock_poll_interval: Duration,
}

impl DeviceConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the poll interval is zero.
    pub fn validate(&self) -> Result<()> {
        if self.lock_poll_interval.is_zero() {
            return Err(ConfigError::Invalid {
                reason: "lock_poll_interval cannot be zero".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Loads and validates a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Read`] if the file cannot be read
    /// - [`ConfigError::Parse`] if the file is not a valid config
    /// - [`ConfigError::Invalid`] if validation fails
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            terminator: DEFAULT_TERMINATOR,
            lock_poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}
