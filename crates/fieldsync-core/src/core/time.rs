// crates/fieldsync-core/src/core/time.rs
// ============================================================================
// Module: Field Sync Time Model
// Description: Canonical timestamp representation for records and lockouts.
// Purpose: Keep wall-clock values explicit and injectable across the core.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Field Sync stores every instant as unix epoch milliseconds. The runtime
//! never reads the system clock directly; it asks a [`crate::Clock`] so that
//! lockout windows can be exercised deterministically. On the wire a
//! timestamp is an RFC 3339 string; integer milliseconds are also accepted on
//! input for clients that capture time offline as epoch values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Nanoseconds per millisecond.
const NANOS_PER_MILLI: i128 = 1_000_000;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when parsing timestamps from client input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    /// Value is neither RFC 3339 nor epoch milliseconds.
    #[error("invalid timestamp: {0}")]
    Invalid(String),
    /// Value is outside the representable range.
    #[error("timestamp out of range")]
    OutOfRange,
}

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Canonical timestamp in unix epoch milliseconds.
///
/// # Invariants
/// - Values are supplied by a [`crate::Clock`] or parsed from client input.
/// - Ordering follows the underlying millisecond value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns a timestamp shifted forward by `millis`, saturating at the bounds.
    #[must_use]
    pub const fn saturating_add_millis(self, millis: i64) -> Self {
        Self(self.0.saturating_add(millis))
    }

    /// Returns the milliseconds elapsed from `earlier` to `self` (negative if earlier is later).
    #[must_use]
    pub const fn millis_since(self, earlier: Self) -> i64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Parses an RFC 3339 string or a decimal epoch-millisecond string.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError`] when the value cannot be interpreted.
    pub fn parse(value: &str) -> Result<Self, TimestampError> {
        let trimmed = value.trim();
        if let Ok(millis) = trimmed.parse::<i64>() {
            return Ok(Self(millis));
        }
        let parsed = OffsetDateTime::parse(trimmed, &Rfc3339)
            .map_err(|_| TimestampError::Invalid(trimmed.to_string()))?;
        let millis = parsed.unix_timestamp_nanos() / NANOS_PER_MILLI;
        i64::try_from(millis).map(Self).map_err(|_| TimestampError::OutOfRange)
    }

    /// Formats the timestamp as RFC 3339 (UTC), falling back to epoch millis.
    #[must_use]
    pub fn to_rfc3339(self) -> String {
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(self.0) * NANOS_PER_MILLI)
            .ok()
            .and_then(|value| value.format(&Rfc3339).ok())
            .unwrap_or_else(|| self.0.to_string())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

/// Accepted wire forms for a timestamp.
#[derive(Deserialize)]
#[serde(untagged)]
enum TimestampRepr {
    /// Unix epoch milliseconds.
    Millis(i64),
    /// RFC 3339 or decimal millisecond text.
    Text(String),
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match TimestampRepr::deserialize(deserializer)? {
            TimestampRepr::Millis(millis) => Ok(Self(millis)),
            TimestampRepr::Text(text) => Self::parse(&text).map_err(serde::de::Error::custom),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
