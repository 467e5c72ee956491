// crates/fieldsync-core/src/core/sync.rs
// ============================================================================
// Module: Field Sync Batch Types
// Description: Batch sync items and per-item outcome reports.
// Purpose: Carry offline uploads in and itemized accept/reject results out.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A batch is a list of raw JSON values. Each value is decoded on its own so
//! that a single malformed item becomes a per-item rejection instead of
//! failing the whole upload. Required-field presence and the local id are
//! read from the raw object before typed decoding, so a malformed optional
//! field never hides a missing field or a duplicate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::identifiers::LocalId;
use crate::core::identifiers::OccurrenceId;
use crate::core::occurrence::OccurrenceInput;
use crate::core::occurrence::REQUIRED_FIELDS;

// ============================================================================
// SECTION: Batch Items
// ============================================================================

/// One item of an offline batch upload.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncItem {
    /// Item decoded into an occurrence payload.
    Parsed(OccurrenceInput),
    /// Item could not be decoded into an occurrence payload.
    Malformed {
        /// Local id found in the raw payload, if any.
        local_id: Option<LocalId>,
        /// Required fields absent or blank in the raw payload.
        missing: Vec<&'static str>,
    },
}

impl SyncItem {
    /// Decodes a raw batch entry.
    ///
    /// Non-object entries decode as malformed with no local id and no
    /// missing fields.
    #[must_use]
    pub fn from_json(value: Value) -> Self {
        let local_id = value.get("local_id").and_then(Value::as_str).and_then(LocalId::parse);
        let missing = value.as_object().map(missing_in_raw).unwrap_or_default();
        match serde_json::from_value::<OccurrenceInput>(value) {
            Ok(input) => Self::Parsed(input),
            Err(_) => Self::Malformed {
                local_id,
                missing,
            },
        }
    }

    /// Returns the item's local id, if any.
    #[must_use]
    pub fn local_id(&self) -> Option<LocalId> {
        match self {
            Self::Parsed(input) => input.local_id(),
            Self::Malformed {
                local_id, ..
            } => local_id.clone(),
        }
    }

    /// Lists required fields that are missing or blank.
    #[must_use]
    pub fn missing_required(&self) -> Vec<&'static str> {
        match self {
            Self::Parsed(input) => input.missing_required(),
            Self::Malformed {
                missing, ..
            } => missing.clone(),
        }
    }
}

/// Lists required fields absent, null, or blank in a raw payload object.
///
/// Present values of the wrong type count as present; they fail later as
/// invalid values.
fn missing_in_raw(object: &Map<String, Value>) -> Vec<&'static str> {
    REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| match object.get(*field) {
            None | Some(Value::Null) => true,
            Some(Value::String(text)) => text.trim().is_empty(),
            Some(_) => false,
        })
        .collect()
}

impl From<OccurrenceInput> for SyncItem {
    fn from(input: OccurrenceInput) -> Self {
        Self::Parsed(input)
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Reason a batch item was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionReason {
    /// A required field was missing or blank.
    MissingRequiredFields,
    /// The local id was already stored.
    AlreadySynchronized,
    /// The item was malformed or carried invalid values.
    InvalidFieldValues,
}

impl RejectionReason {
    /// Returns the stable client-facing message.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingRequiredFields => "missing required fields",
            Self::AlreadySynchronized => "already synchronized",
            Self::InvalidFieldValues => "invalid field values",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RejectionReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RejectionReason {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        match label.as_str() {
            "missing required fields" => Ok(Self::MissingRequiredFields),
            "already synchronized" => Ok(Self::AlreadySynchronized),
            "invalid field values" => Ok(Self::InvalidFieldValues),
            other => Err(serde::de::Error::custom(format!("unknown rejection reason: {other}"))),
        }
    }
}

/// Accepted batch item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedItem {
    /// Client correlation key, when supplied.
    pub local_id: Option<LocalId>,
    /// Store-assigned identifier of the new record.
    pub assigned_id: OccurrenceId,
}

/// Rejected batch item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedItem {
    /// Client correlation key, when supplied.
    pub local_id: Option<LocalId>,
    /// Rejection reason.
    pub reason: RejectionReason,
}

/// Itemized result of a batch upload, in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Accepted items.
    pub accepted: Vec<AcceptedItem>,
    /// Rejected items.
    pub rejected: Vec<RejectedItem>,
}

impl SyncReport {
    /// Returns the number of items processed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.accepted.len() + self.rejected.len()
    }

    /// Counts rejections with the given reason.
    #[must_use]
    pub fn rejected_with(&self, reason: RejectionReason) -> usize {
        self.rejected.iter().filter(|item| item.reason == reason).count()
    }
}
