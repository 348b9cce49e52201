//! # Store Configuration
//!
//! Settings applied when a layout is turned into a store. Loaded once at
//! startup, usually from a TOML table:
//!
//! ```toml
//! initial_capacity = 1024
//! ```

use serde::Deserialize;

use crate::error::{StoreError, StoreResult};

/// Configuration for a new store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Records the buffer can hold before the first reallocation.
    pub initial_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 1,
        }
    }
}

impl StoreConfig {
    /// Creates a configuration with the given initial capacity.
    #[must_use]
    pub const fn with_initial_capacity(initial_capacity: usize) -> Self {
        Self { initial_capacity }
    }

    /// Parses and validates a configuration from TOML.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidConfig`] on malformed TOML, unknown keys, or a
    /// zero initial capacity.
    pub fn from_toml_str(source: &str) -> StoreResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| StoreError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration for values no store can honour.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidConfig`] if `initial_capacity` is zero.
    pub fn validate(&self) -> StoreResult<()> {
        if self.initial_capacity == 0 {
            return Err(StoreError::InvalidConfig(
                "initial_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
