// crates/fieldsync-core/src/core/mod.rs
// ============================================================================
// Module: Field Sync Core Types
// Description: Canonical account, occurrence, and sync record structures.
// Purpose: Provide stable, serializable types shared by every Field Sync surface.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Core types define accounts, subjects, occurrences, client inputs, patches,
//! and sync reports. These types are the canonical source of truth for any
//! derived surface (HTTP, CLI, or storage rows).

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod account;
pub mod hashing;
pub mod identifiers;
pub mod occurrence;
pub mod patch;
pub mod sync;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use account::Account;
pub use account::PasswordDigest;
pub use account::Profile;
pub use account::ProfilePatch;
pub use account::ProfileView;
pub use account::Role;
pub use account::RoleParseError;
pub use account::Subject;
pub use account::is_locked;
pub use account::lock_remaining_seconds;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use identifiers::AccountId;
pub use identifiers::LocalId;
pub use identifiers::OccurrenceId;
pub use occurrence::InputError;
pub use occurrence::Location;
pub use occurrence::LocationInput;
pub use occurrence::MAX_PHOTOS;
pub use occurrence::Occurrence;
pub use occurrence::OccurrenceDraft;
pub use occurrence::OccurrenceInput;
pub use occurrence::OccurrencePatch;
pub use occurrence::REQUIRED_FIELDS;
pub use occurrence::SyncStatus;
pub use occurrence::TimeInput;
pub use patch::Patch;
pub use sync::AcceptedItem;
pub use sync::RejectedItem;
pub use sync::RejectionReason;
pub use sync::SyncItem;
pub use sync::SyncReport;
pub use time::Timestamp;
pub use time::TimestampError;
