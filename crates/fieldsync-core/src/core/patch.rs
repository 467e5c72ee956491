// crates/fieldsync-core/src/core/patch.rs
// ============================================================================
// Module: Field Sync Partial Updates
// Description: Tri-state field updates for partial record edits.
// Purpose: Distinguish "keep", "clear", and "replace" in request payloads.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A JSON object field can be missing, `null`, or carry a value. [`Patch`]
//! maps those to [`Patch::Absent`], [`Patch::Clear`], and [`Patch::Set`].
//! Fields must be annotated with `#[serde(default)]` so that a missing key
//! deserializes to `Absent`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Deserializer;

// ============================================================================
// SECTION: Patch
// ============================================================================

/// Tri-state partial update for a single field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Patch<T> {
    /// Field not supplied; keep the current value.
    #[default]
    Absent,
    /// Field supplied as `null`; clear the current value.
    Clear,
    /// Field supplied with a replacement value.
    Set(T),
}

impl<T> Patch<T> {
    /// Applies the patch to an optional field.
    pub fn apply_optional(self, target: &mut Option<T>) {
        match self {
            Self::Absent => {}
            Self::Clear => *target = None,
            Self::Set(value) => *target = Some(value),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<T>::deserialize(deserializer)?.map_or(Self::Clear, Self::Set))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
