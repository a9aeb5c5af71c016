//! Credential and settings resolution.
//!
//! Values are looked up by name through a [`ConfigSource`]. The process
//! environment is the normal source ([`EnvConfig`]); [`MapConfig`] backs
//! tests and callers that already hold resolved values.
//!
//! ```ignore
//! use agendarelay_core::config::{Config, EnvConfig};
//!
//! let config = Config::new(&EnvConfig);
//! let calendar_id = config.string("CALENDAR_ID")?;
//! let days = config.integer_or("LOOKAHEAD_DAYS", 7)?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors raised while resolving configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required value is not set.
    #[error("missing configuration value: {key}")]
    Missing { key: String },

    /// A value is set but cannot be interpreted.
    #[error("invalid configuration value {key}: {message}")]
    Invalid { key: String, message: String },
}

impl ConfigError {
    /// Creates a missing value error.
    pub fn missing(key: impl Into<String>) -> Self {
        Self::Missing { key: key.into() }
    }

    /// Creates an invalid value error.
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Returns the name of the offending value.
    pub fn key(&self) -> &str {
        match self {
            Self::Missing { key } | Self::Invalid { key, .. } => key,
        }
    }
}

/// A named lookup of raw string values.
pub trait ConfigSource: Send + Sync {
    /// Returns the raw value for `key`, if set.
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads values from the process environment.
///
/// Empty variables count as unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfig;

impl ConfigSource for EnvConfig {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

/// In-memory configuration.
#[derive(Debug, Clone, Default)]
pub struct MapConfig {
    values: HashMap<String, String>,
}

impl MapConfig {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set a value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl<K, V> FromIterator<(K, V)> for MapConfig
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl ConfigSource for MapConfig {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Typed accessors over a [`ConfigSource`].
#[derive(Clone, Copy)]
pub struct Config<'a> {
    source: &'a dyn ConfigSource,
}

impl fmt::Debug for Config<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config").finish_non_exhaustive()
    }
}

impl<'a> Config<'a> {
    /// Wraps a source.
    pub fn new(source: &'a dyn ConfigSource) -> Self {
        Self { source }
    }

    /// Resolves a required string value.
    pub fn string(&self, key: &str) -> Result<String, ConfigError> {
        self.source.get(key).ok_or_else(|| ConfigError::missing(key))
    }

    /// Resolves an optional string value.
    pub fn optional_string(&self, key: &str) -> Option<String> {
        self.source.get(key)
    }

    /// Resolves an integer value, falling back to `default` when unset.
    pub fn integer_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.source.get(key) {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::invalid(key, e.to_string())),
        }
    }
}
