// crates/fieldsync-core/src/core/occurrence.rs
// ============================================================================
// Module: Field Sync Occurrences
// Description: Occurrence records, client input, and validated drafts.
// Purpose: Turn untrusted client payloads into well-formed incident records.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Clients submit [`OccurrenceInput`] values, either one at a time or in
//! offline batches. Validation produces an [`OccurrenceDraft`], which the
//! lifecycle turns into a stored [`Occurrence`]. Edits to pending records
//! arrive as an [`OccurrencePatch`].
//!
//! Validation reports missing required fields before malformed values so
//! that batch rejections carry the most actionable reason.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::AccountId;
use crate::core::identifiers::LocalId;
use crate::core::identifiers::OccurrenceId;
use crate::core::patch::Patch;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum photos attached to a single occurrence.
pub const MAX_PHOTOS: usize = 10;

/// Wire names of the required occurrence fields, in reporting order.
pub const REQUIRED_FIELDS: [&str; 5] = ["type", "occurred_at", "unit", "team", "description"];

// ============================================================================
// SECTION: Status and Location
// ============================================================================

/// Synchronization state of an occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Reopened for edits; content may change.
    Pending,
    /// Accepted by the central store; content is frozen.
    Synchronized,
}

impl SyncStatus {
    /// Returns the stable label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Synchronized => "synchronized",
        }
    }
}

/// Geographic fix captured with an occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Reported accuracy in meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    /// When the fix was taken.
    pub captured_at: Timestamp,
}

// ============================================================================
// SECTION: Stored Record
// ============================================================================

/// Stored occurrence record.
///
/// # Invariants
/// - `id`, `local_id`, and `created_by` never change after insertion.
/// - Required text fields are non-empty.
/// - Content only changes while `sync_status` is [`SyncStatus::Pending`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    /// Store-assigned identifier.
    pub id: OccurrenceId,
    /// Client correlation key used for deduplication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<LocalId>,
    /// Incident type.
    #[serde(rename = "type")]
    pub kind: String,
    /// When the incident happened.
    pub occurred_at: Timestamp,
    /// Responding vehicle or unit.
    pub unit: String,
    /// Responding team.
    pub team: String,
    /// Free-text description.
    pub description: String,
    /// Base64-encoded photos, in capture order.
    #[serde(default)]
    pub photos: Vec<String>,
    /// Optional geographic fix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Optional notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Victim signature blob.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub victim_signature: Option<String>,
    /// Witness signature blob.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness_signature: Option<String>,
    /// Responder signature blob.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responder_signature: Option<String>,
    /// Synchronization state.
    pub sync_status: SyncStatus,
    /// Owning account.
    pub created_by: AccountId,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// Last modification timestamp.
    pub updated_at: Timestamp,
}

impl Occurrence {
    /// Builds a synchronized record from a validated draft.
    #[must_use]
    pub fn from_draft(
        id: OccurrenceId,
        draft: OccurrenceDraft,
        owner: AccountId,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            local_id: draft.local_id,
            kind: draft.kind,
            occurred_at: draft.occurred_at,
            unit: draft.unit,
            team: draft.team,
            description: draft.description,
            photos: draft.photos,
            location: draft.location,
            notes: draft.notes,
            victim_signature: draft.victim_signature,
            witness_signature: draft.witness_signature,
            responder_signature: draft.responder_signature,
            sync_status: SyncStatus::Synchronized,
            created_by: owner,
            created_at: now,
            updated_at: now,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while validating occurrence input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// One or more required fields were missing or blank.
    #[error("missing required fields: {}", .0.join(", "))]
    MissingRequired(Vec<&'static str>),
    /// A field carried a value outside its domain.
    #[error("invalid field value: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Client Input
// ============================================================================

/// Client-supplied instant: RFC 3339 text or epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TimeInput {
    /// Epoch milliseconds.
    Millis(i64),
    /// RFC 3339 or decimal millisecond text.
    Text(String),
}

impl TimeInput {
    /// Returns true when the value is blank text.
    fn is_blank(&self) -> bool {
        matches!(self, Self::Text(text) if text.trim().is_empty())
    }

    /// Resolves the value into a timestamp.
    fn resolve(&self, field: &str) -> Result<Timestamp, InputError> {
        match self {
            Self::Millis(millis) => Ok(Timestamp::from_unix_millis(*millis)),
            Self::Text(text) => Timestamp::parse(text)
                .map_err(|_| InputError::Invalid(format!("{field} is not a valid timestamp"))),
        }
    }
}

/// Client-supplied location.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LocationInput {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Reported accuracy in meters.
    #[serde(default)]
    pub accuracy: Option<f64>,
    /// When the fix was taken; defaults to the evaluation time.
    #[serde(default)]
    pub captured_at: Option<TimeInput>,
}

impl LocationInput {
    /// Validates coordinates and resolves the capture time.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::Invalid`] for out-of-range or non-finite values.
    pub fn resolve(&self, now: Timestamp) -> Result<Location, InputError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(InputError::Invalid("location.latitude out of range".to_string()));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(InputError::Invalid("location.longitude out of range".to_string()));
        }
        if let Some(accuracy) = self.accuracy
            && (!accuracy.is_finite() || accuracy < 0.0)
        {
            return Err(InputError::Invalid("location.accuracy must be non-negative".to_string()));
        }
        let captured_at = match &self.captured_at {
            Some(value) if !value.is_blank() => value.resolve("location.captured_at")?,
            _ => now,
        };
        Ok(Location {
            latitude: self.latitude,
            longitude: self.longitude,
            accuracy: self.accuracy,
            captured_at,
        })
    }
}

/// Untrusted occurrence payload from a client.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OccurrenceInput {
    /// Client correlation key.
    #[serde(default)]
    pub local_id: Option<String>,
    /// Incident type.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// When the incident happened.
    #[serde(default)]
    pub occurred_at: Option<TimeInput>,
    /// Responding vehicle or unit.
    #[serde(default)]
    pub unit: Option<String>,
    /// Responding team.
    #[serde(default)]
    pub team: Option<String>,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Base64-encoded photos.
    #[serde(default)]
    pub photos: Option<Vec<String>>,
    /// Optional geographic fix.
    #[serde(default)]
    pub location: Option<LocationInput>,
    /// Optional notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Victim signature blob.
    #[serde(default)]
    pub victim_signature: Option<String>,
    /// Witness signature blob.
    #[serde(default)]
    pub witness_signature: Option<String>,
    /// Responder signature blob.
    #[serde(default)]
    pub responder_signature: Option<String>,
}

/// Validated occurrence content ready for persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct OccurrenceDraft {
    /// Client correlation key.
    pub local_id: Option<LocalId>,
    /// Incident type.
    pub kind: String,
    /// When the incident happened.
    pub occurred_at: Timestamp,
    /// Responding vehicle or unit.
    pub unit: String,
    /// Responding team.
    pub team: String,
    /// Free-text description.
    pub description: String,
    /// Base64-encoded photos.
    pub photos: Vec<String>,
    /// Optional geographic fix.
    pub location: Option<Location>,
    /// Optional notes.
    pub notes: Option<String>,
    /// Victim signature blob.
    pub victim_signature: Option<String>,
    /// Witness signature blob.
    pub witness_signature: Option<String>,
    /// Responder signature blob.
    pub responder_signature: Option<String>,
}

impl OccurrenceInput {
    /// Returns the parsed local identifier, treating blank values as absent.
    #[must_use]
    pub fn local_id(&self) -> Option<LocalId> {
        self.local_id.as_deref().and_then(LocalId::parse)
    }

    /// Lists required fields that are missing or blank.
    #[must_use]
    pub fn missing_required(&self) -> Vec<&'static str> {
        let blank = [
            is_blank(self.kind.as_deref()),
            self.occurred_at.as_ref().is_none_or(TimeInput::is_blank),
            is_blank(self.unit.as_deref()),
            is_blank(self.team.as_deref()),
            is_blank(self.description.as_deref()),
        ];
        REQUIRED_FIELDS
            .iter()
            .zip(blank)
            .filter_map(|(field, blank)| blank.then_some(*field))
            .collect()
    }

    /// Validates the payload into a draft.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::MissingRequired`] before any value check, then
    /// [`InputError::Invalid`] for malformed values.
    pub fn validate(self, now: Timestamp) -> Result<OccurrenceDraft, InputError> {
        let missing = self.missing_required();
        if !missing.is_empty() {
            return Err(InputError::MissingRequired(missing));
        }
        let local_id = self.local_id();
        let occurred_at = match &self.occurred_at {
            Some(value) => value.resolve("occurred_at")?,
            None => return Err(InputError::MissingRequired(vec!["occurred_at"])),
        };
        let photos = self.photos.unwrap_or_default();
        check_photos(&photos)?;
        let location = self.location.as_ref().map(|input| input.resolve(now)).transpose()?;
        Ok(OccurrenceDraft {
            local_id,
            kind: required_text(self.kind),
            occurred_at,
            unit: required_text(self.unit),
            team: required_text(self.team),
            description: required_text(self.description),
            photos,
            location,
            notes: optional_text(self.notes),
            victim_signature: optional_text(self.victim_signature),
            witness_signature: optional_text(self.witness_signature),
            responder_signature: optional_text(self.responder_signature),
        })
    }
}

// ============================================================================
// SECTION: Patch
// ============================================================================

/// Partial edit for a pending occurrence.
///
/// Identity, ownership, and status fields are not editable and are ignored
/// when present in the payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OccurrencePatch {
    /// Incident type.
    #[serde(default, rename = "type")]
    pub kind: Patch<String>,
    /// When the incident happened.
    #[serde(default)]
    pub occurred_at: Patch<TimeInput>,
    /// Responding vehicle or unit.
    #[serde(default)]
    pub unit: Patch<String>,
    /// Responding team.
    #[serde(default)]
    pub team: Patch<String>,
    /// Free-text description.
    #[serde(default)]
    pub description: Patch<String>,
    /// Replacement photo sequence; replaces the whole sequence.
    #[serde(default)]
    pub photos: Patch<Vec<String>>,
    /// Replacement location; replaced wholesale.
    #[serde(default)]
    pub location: Patch<LocationInput>,
    /// Notes.
    #[serde(default)]
    pub notes: Patch<String>,
    /// Victim signature blob.
    #[serde(default)]
    pub victim_signature: Patch<String>,
    /// Witness signature blob.
    #[serde(default)]
    pub witness_signature: Patch<String>,
    /// Responder signature blob.
    #[serde(default)]
    pub responder_signature: Patch<String>,
}

impl OccurrencePatch {
    /// Applies the patch to `record`, leaving it untouched on error.
    ///
    /// # Errors
    ///
    /// Returns [`InputError`] when a required field would become empty or a
    /// supplied value is malformed.
    pub fn apply_to(self, record: &mut Occurrence, now: Timestamp) -> Result<(), InputError> {
        let mut next = record.clone();
        let mut missing = Vec::new();
        patch_required(self.kind, "type", &mut next.kind, &mut missing);
        patch_required(self.unit, "unit", &mut next.unit, &mut missing);
        patch_required(self.team, "team", &mut next.team, &mut missing);
        patch_required(self.description, "description", &mut next.description, &mut missing);
        match self.occurred_at {
            Patch::Absent => {}
            Patch::Set(value) if !value.is_blank() => {
                next.occurred_at = value.resolve("occurred_at")?;
            }
            Patch::Clear | Patch::Set(_) => missing.push("occurred_at"),
        }
        if !missing.is_empty() {
            return Err(InputError::MissingRequired(missing));
        }
        match self.photos {
            Patch::Absent => {}
            Patch::Clear => next.photos.clear(),
            Patch::Set(photos) => {
                check_photos(&photos)?;
                next.photos = photos;
            }
        }
        match self.location {
            Patch::Absent => {}
            Patch::Clear => next.location = None,
            Patch::Set(input) => next.location = Some(input.resolve(now)?),
        }
        patch_optional(self.notes, &mut next.notes);
        patch_optional(self.victim_signature, &mut next.victim_signature);
        patch_optional(self.witness_signature, &mut next.witness_signature);
        patch_optional(self.responder_signature, &mut next.responder_signature);
        next.updated_at = now;
        *record = next;
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns true when the value is absent or whitespace-only.
fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|text| text.trim().is_empty())
}

/// Returns a required text value trimmed of surrounding whitespace.
fn required_text(value: Option<String>) -> String {
    value.map(|text| text.trim().to_string()).unwrap_or_default()
}

/// Normalizes blank optional text to `None`.
fn optional_text(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

/// Enforces the photo count limit.
fn check_photos(photos: &[String]) -> Result<(), InputError> {
    if photos.len() > MAX_PHOTOS {
        return Err(InputError::Invalid(format!("at most {MAX_PHOTOS} photos are allowed")));
    }
    Ok(())
}

/// Applies a patch to a required text field, recording blank results.
fn patch_required(
    patch: Patch<String>,
    field: &'static str,
    target: &mut String,
    missing: &mut Vec<&'static str>,
) {
    match patch {
        Patch::Absent => {}
        Patch::Set(value) if !value.trim().is_empty() => *target = value.trim().to_string(),
        Patch::Clear | Patch::Set(_) => missing.push(field),
    }
}

/// Applies a patch to optional text, normalizing blank values to `None`.
fn patch_optional(patch: Patch<String>, target: &mut Option<String>) {
    match patch {
        Patch::Set(value) if value.trim().is_empty() => *target = None,
        other => other.apply_optional(target),
    }
}
