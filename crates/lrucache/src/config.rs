//! Cache capacity and configuration
//!
//! Capacity is validated once, here. Everything downstream takes a
//! [`Capacity`] and never has to re-check for zero.

use std::fmt;
use std::num::NonZeroUsize;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Maximum number of entries a cache may hold (always at least 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Capacity(NonZeroUsize);

impl Capacity {
    /// Validate a capacity
    ///
    /// # Errors
    /// * `Error::InvalidCapacity` if `capacity` is 0
    pub fn new(capacity: usize) -> Result<Self> {
        NonZeroUsize::new(capacity)
            .map(Capacity)
            .ok_or(Error::InvalidCapacity(0))
    }

    /// Get the capacity as a plain count
    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl TryFrom<i64> for Capacity {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        usize::try_from(value)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(Capacity)
            .ok_or(Error::InvalidCapacity(value))
    }
}

impl From<NonZeroUsize> for Capacity {
    fn from(value: NonZeroUsize) -> Self {
        Capacity(value)
    }
}

impl From<Capacity> for usize {
    fn from(value: Capacity) -> Self {
        value.get()
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cache configuration
///
/// JSON form:
/// ```text
/// { "capacity": 1024 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries
    pub capacity: Capacity,
}

/// Wire shape of [`CacheConfig`] before validation
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    capacity: i64,
}

impl CacheConfig {
    /// Create a config with the given capacity
    pub fn new(capacity: usize) -> Result<Self> {
        Ok(Self {
            capacity: Capacity::new(capacity)?,
        })
    }

    /// Parse and validate a JSON config
    ///
    /// # Errors
    /// * `Error::Config` if the text is not a valid config object
    /// * `Error::InvalidCapacity` if `capacity` is zero or negative
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(text)?;
        Ok(Self {
            capacity: Capacity::try_from(raw.capacity)?,
        })
    }
}
