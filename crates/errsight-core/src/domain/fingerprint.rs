//! Error identity and time bucketing
//!
//! A [`Fingerprint`] identifies a code path: the same exception type raised
//! from the same file and line always maps to the same fingerprint. A
//! [`DedupeWindow`] groups occurrences into fixed-size, UTC-aligned buckets.
//! Together they form the identity of an `ErrorReport`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::errors::DomainError;

/// SHA-256 hex digest of `(exception_type, file, line)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Length of the hex digest
    pub const LENGTH: usize = 64;

    /// Computes the fingerprint of an error location
    pub fn compute(exception_type: &str, file: &str, line: u32) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(format!("{}:{}:{}", exception_type, file, line).as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Rebuilds a fingerprint read back from storage
    pub fn from_stored(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Returns the hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Integer bucket `floor(unix_seconds / (minutes * 60))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DedupeWindow(i64);

impl DedupeWindow {
    /// Computes the bucket for a timestamp
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidWindow` when `minutes` is zero.
    pub fn compute(timestamp: DateTime<Utc>, minutes: u32) -> Result<Self, DomainError> {
        Self::from_unix(timestamp.timestamp(), minutes)
    }

    /// Computes the bucket for a unix timestamp in seconds
    pub fn from_unix(seconds: i64, minutes: u32) -> Result<Self, DomainError> {
        if minutes == 0 {
            return Err(DomainError::InvalidWindow(minutes));
        }
        let size = i64::from(minutes) * 60;
        Ok(Self(seconds.div_euclid(size)))
    }

    /// Rebuilds a window read back from storage
    pub fn from_stored(value: i64) -> Self {
        Self(value)
    }

    /// Returns the bucket number
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for DedupeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
