// crates/fieldsync-core/src/core/account.rs
// ============================================================================
// Module: Field Sync Accounts
// Description: Account records, roles, profiles, and lockout predicates.
// Purpose: Model authenticated principals and their lock bookkeeping.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! An [`Account`] is a plain value. Lock checks are free functions over the
//! value and an explicit `now`, so the credential guard can evaluate them
//! against an injected clock.
//!
//! Security posture: [`PasswordDigest`] never renders its contents in debug
//! output and [`ProfileView`] is the only account projection returned to
//! callers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::AccountId;
use crate::core::patch::Patch;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Roles
// ============================================================================

/// Closed set of account roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Field operator; sees and mutates only owned records.
    Operator,
    /// Supervisor with visibility over every record.
    Supervisor,
    /// Administrator with visibility over every record and account creation rights.
    Admin,
}

impl Role {
    /// Returns the stable label for the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Operator => "operator",
            Self::Supervisor => "supervisor",
            Self::Admin => "admin",
        }
    }

    /// Returns true when the role sees every record regardless of owner.
    #[must_use]
    pub const fn is_privileged(self) -> bool {
        matches!(self, Self::Supervisor | Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role: {0}")]
pub struct RoleParseError(pub String);

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "operator" => Ok(Self::Operator),
            "supervisor" => Ok(Self::Supervisor),
            "admin" => Ok(Self::Admin),
            other => Err(RoleParseError(other.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Subject
// ============================================================================

/// Authenticated caller identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Account identifier.
    pub id: AccountId,
    /// Account role at authentication time.
    pub role: Role,
}

impl Subject {
    /// Creates a subject.
    #[must_use]
    pub const fn new(id: AccountId, role: Role) -> Self {
        Self { id, role }
    }
}

// ============================================================================
// SECTION: Account
// ============================================================================

/// Descriptive profile fields attached to an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Given name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Family name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Display username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Contact phone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Opaque password hash string produced by a [`crate::PasswordHasher`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    /// Wraps an encoded hash string.
    #[must_use]
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// Returns the encoded hash string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordDigest(<redacted>)")
    }
}

/// Stored account record.
///
/// # Invariants
/// - `id` and `email` are immutable after registration.
/// - `failed_attempts` is reset on successful authentication and on lock expiry.
/// - `locked_until` is only set by the credential guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Store-assigned identifier.
    pub id: AccountId,
    /// Unique login email.
    pub email: String,
    /// Password hash.
    pub password_digest: PasswordDigest,
    /// Account role.
    pub role: Role,
    /// Profile fields.
    #[serde(default)]
    pub profile: Profile,
    /// Consecutive failed authentication attempts.
    pub failed_attempts: u32,
    /// Lock expiry, when locked.
    pub locked_until: Option<Timestamp>,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// Last modification timestamp.
    pub updated_at: Timestamp,
}

impl Account {
    /// Returns the subject for this account.
    #[must_use]
    pub fn subject(&self) -> Subject {
        Subject::new(self.id.clone(), self.role)
    }

    /// Returns the caller-facing projection of this account.
    #[must_use]
    pub fn view(&self) -> ProfileView {
        ProfileView {
            id: self.id.clone(),
            email: self.email.clone(),
            role: self.role,
            profile: self.profile.clone(),
        }
    }
}

/// Caller-facing account projection; excludes credentials and lock state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileView {
    /// Account identifier.
    pub id: AccountId,
    /// Login email.
    pub email: String,
    /// Account role.
    pub role: Role,
    /// Profile fields.
    #[serde(flatten)]
    pub profile: Profile,
}

/// Partial update for an account profile.
///
/// Absent fields keep their value; `null` clears optional profile fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfilePatch {
    /// Given name.
    #[serde(default)]
    pub first_name: Patch<String>,
    /// Family name.
    #[serde(default)]
    pub last_name: Patch<String>,
    /// Display username.
    #[serde(default)]
    pub username: Patch<String>,
    /// Contact phone.
    #[serde(default)]
    pub phone: Patch<String>,
    /// New plaintext password; blank values are ignored.
    #[serde(default)]
    pub password: Option<String>,
}

impl ProfilePatch {
    /// Applies the profile field changes to `profile`.
    pub fn apply_to(&self, profile: &mut Profile) {
        self.first_name.clone().apply_optional(&mut profile.first_name);
        self.last_name.clone().apply_optional(&mut profile.last_name);
        self.username.clone().apply_optional(&mut profile.username);
        self.phone.clone().apply_optional(&mut profile.phone);
    }

    /// Returns the new plaintext password when one was supplied and is not blank.
    #[must_use]
    pub fn new_password(&self) -> Option<&str> {
        self.password.as_deref().filter(|value| !value.trim().is_empty())
    }
}

// ============================================================================
// SECTION: Lock Predicates
// ============================================================================

/// Returns true when the account holds a lock that has not yet expired.
#[must_use]
pub fn is_locked(account: &Account, now: Timestamp) -> bool {
    account.locked_until.is_some_and(|until| until > now)
}

/// Returns whole seconds remaining on an active lock, rounded up.
///
/// Returns `None` when the account is not locked at `now`.
#[must_use]
pub fn lock_remaining_seconds(account: &Account, now: Timestamp) -> Option<u64> {
    let until = account.locked_until.filter(|until| *until > now)?;
    let millis = u64::try_from(until.millis_since(now)).ok()?;
    Some(millis.div_ceil(1_000))
}
