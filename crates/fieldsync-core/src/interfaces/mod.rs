// crates/fieldsync-core/src/interfaces/mod.rs
// ============================================================================
// Module: Field Sync Interfaces
// Description: Backend-agnostic interfaces for storage, hashing, and time.
// Purpose: Define the contract surfaces used by the Field Sync runtime.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how Field Sync integrates with external systems without
//! embedding backend-specific details. Stores must enforce email and local id
//! uniqueness themselves and fail closed with [`StoreError::Conflict`].
//!
//! Security posture: implementations receive untrusted client content inside
//! records; they must persist it verbatim and never interpret it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::account::Account;
use crate::core::account::PasswordDigest;
use crate::core::identifiers::AccountId;
use crate::core::identifiers::LocalId;
use crate::core::identifiers::OccurrenceId;
use crate::core::occurrence::Occurrence;
use crate::core::occurrence::SyncStatus;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Store Errors
// ============================================================================

/// Record store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - [`StoreError::Conflict`] is only raised for uniqueness violations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("store io error: {0}")]
    Io(String),
    /// Store data is corrupted.
    #[error("store corruption: {0}")]
    Corrupt(String),
    /// Store data uses an incompatible schema version.
    #[error("store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store data is invalid.
    #[error("store invalid data: {0}")]
    Invalid(String),
    /// Store backend reported an error.
    #[error("store error: {0}")]
    Store(String),
    /// A unique key (email or local id) is already taken.
    #[error("store conflict: {0}")]
    Conflict(String),
    /// Record targeted by an update does not exist.
    #[error("store record missing: {0}")]
    Missing(String),
}

// ============================================================================
// SECTION: Account Store
// ============================================================================

/// Durable account storage.
pub trait AccountStore {
    /// Inserts a new account.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the id or email is already taken.
    fn insert_account(&self, account: &Account) -> Result<(), StoreError>;

    /// Loads an account by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn account_by_id(&self, id: &AccountId) -> Result<Option<Account>, StoreError>;

    /// Loads an account by login email.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// Replaces an existing account row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Missing`] when the account does not exist.
    fn update_account(&self, account: &Account) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Occurrence Store
// ============================================================================

/// Filter for occurrence listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OccurrenceQuery {
    /// Restrict to records owned by this account.
    pub owner: Option<AccountId>,
    /// Restrict to records in this status.
    pub status: Option<SyncStatus>,
}

impl OccurrenceQuery {
    /// Returns true when `record` satisfies the filter.
    #[must_use]
    pub fn matches(&self, record: &Occurrence) -> bool {
        self.owner.as_ref().is_none_or(|owner| owner == &record.created_by)
            && self.status.is_none_or(|status| status == record.sync_status)
    }
}

/// Durable occurrence storage.
pub trait OccurrenceStore {
    /// Inserts a new occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the id or local id is already taken.
    fn insert_occurrence(&self, occurrence: &Occurrence) -> Result<(), StoreError>;

    /// Loads an occurrence by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn occurrence(&self, id: &OccurrenceId) -> Result<Option<Occurrence>, StoreError>;

    /// Loads an occurrence by client local id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn occurrence_by_local_id(&self, local_id: &LocalId)
    -> Result<Option<Occurrence>, StoreError>;

    /// Replaces an existing occurrence row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Missing`] when the occurrence does not exist.
    fn update_occurrence(&self, occurrence: &Occurrence) -> Result<(), StoreError>;

    /// Deletes an occurrence, returning whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when deletion fails.
    fn delete_occurrence(&self, id: &OccurrenceId) -> Result<bool, StoreError>;

    /// Lists matching occurrences, newest first.
    ///
    /// Records with equal `created_at` are ordered by insertion, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn query_occurrences(&self, query: &OccurrenceQuery) -> Result<Vec<Occurrence>, StoreError>;
}

// ============================================================================
// SECTION: Password Hashing
// ============================================================================

/// Password hashing errors.
#[derive(Debug, Error)]
pub enum HasherError {
    /// Hashing backend failed.
    #[error("password hashing failed: {0}")]
    Hash(String),
    /// Stored digest could not be parsed.
    #[error("stored password digest is malformed")]
    MalformedDigest,
}

/// Adaptive one-way password hashing.
pub trait PasswordHasher {
    /// Hashes a plaintext password.
    ///
    /// # Errors
    ///
    /// Returns [`HasherError`] when hashing fails.
    fn hash(&self, password: &str) -> Result<PasswordDigest, HasherError>;

    /// Verifies a plaintext password against a stored digest.
    ///
    /// # Errors
    ///
    /// Returns [`HasherError`] when the digest cannot be evaluated.
    fn verify(&self, password: &str, digest: &PasswordDigest) -> Result<bool, HasherError>;
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Wall-clock source for lockout windows and record timestamps.
pub trait Clock {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}
