// crates/fieldsync-core/src/runtime/credentials.rs
// ============================================================================
// Module: Field Sync Credential Guard
// Description: Authentication with failed-attempt counting and lockout.
// Purpose: Resist password guessing while keeping account bookkeeping durable.
// Dependencies: crate::{core, interfaces}, serde
// ============================================================================

//! ## Overview
//! The credential guard owns the account lockout state machine:
//!
//! - an expired lock is cleared and the counter restarts before evaluation,
//! - each mismatch increments the counter and the fifth locks the account
//!   for fifteen minutes,
//! - a match resets the counter and clears any lock.
//!
//! Every branch persists the account before returning. Registration and
//! profile updates also live here because they are the only other paths that
//! write account rows; they hash passwords explicitly and never touch lock
//! bookkeeping.
//!
//! Security posture: plaintext passwords are only passed to the
//! [`PasswordHasher`] and never stored, logged, or echoed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;

use crate::core::account::Account;
use crate::core::account::Profile;
use crate::core::account::ProfilePatch;
use crate::core::account::ProfileView;
use crate::core::account::Role;
use crate::core::account::Subject;
use crate::core::account::lock_remaining_seconds;
use crate::core::identifiers::AccountId;
use crate::core::time::Timestamp;
use crate::interfaces::AccountStore;
use crate::interfaces::PasswordHasher;
use crate::interfaces::StoreError;
use crate::runtime::clock::SharedClock;
use crate::runtime::error::CoreError;
use crate::runtime::store::SharedAccountStore;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Consecutive failures that trigger a lock.
pub const LOCKOUT_THRESHOLD: u32 = 5;

/// Lock duration in milliseconds (15 minutes).
pub const LOCKOUT_WINDOW_MILLIS: i64 = 15 * 60 * 1_000;

/// Shared password hasher handle.
pub type SharedPasswordHasher = Arc<dyn PasswordHasher + Send + Sync>;

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Account registration request.
#[derive(Clone, Default, Deserialize)]
pub struct RegisterRequest {
    /// Login email.
    #[serde(default)]
    pub email: String,
    /// Plaintext password.
    #[serde(default)]
    pub password: String,
    /// Requested role; defaults to operator.
    #[serde(default)]
    pub role: Option<Role>,
    /// Profile fields.
    #[serde(flatten)]
    pub profile: Profile,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .field("profile", &self.profile)
            .finish()
    }
}

// ============================================================================
// SECTION: Credential Guard
// ============================================================================

/// Authentication, registration, and profile management over an account store.
#[derive(Clone)]
pub struct CredentialGuard {
    /// Account storage.
    accounts: SharedAccountStore,
    /// Password hashing backend.
    hasher: SharedPasswordHasher,
    /// Wall clock.
    clock: SharedClock,
    /// Whether anonymous callers may register operator accounts.
    allow_self_registration: bool,
}

impl CredentialGuard {
    /// Creates a guard with self-registration disabled.
    #[must_use]
    pub fn new(accounts: SharedAccountStore, hasher: SharedPasswordHasher, clock: SharedClock) -> Self {
        Self {
            accounts,
            hasher,
            clock,
            allow_self_registration: false,
        }
    }

    /// Enables or disables anonymous operator self-registration.
    #[must_use]
    pub const fn with_self_registration(mut self, allow: bool) -> Self {
        self.allow_self_registration = allow;
        self
    }

    /// Authenticates `email` and `password`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] for unknown emails,
    /// [`CoreError::Locked`] while a lock is active (including the attempt
    /// that triggers it), [`CoreError::InvalidCredentials`] for other
    /// mismatches, and [`CoreError::Internal`] on store or hasher failure.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<Subject, CoreError> {
        let Some(mut account) = self.accounts.account_by_email(email.trim())? else {
            return Err(CoreError::NotFound);
        };
        let now = self.clock.now();
        if let Some(remaining_seconds) = lock_remaining_seconds(&account, now) {
            return Err(CoreError::Locked {
                remaining_seconds,
            });
        }
        if account.locked_until.is_some() {
            account.failed_attempts = 0;
            account.locked_until = None;
        }

        let matched = self.hasher.verify(password, &account.password_digest)?;
        account.updated_at = now;
        if matched {
            account.failed_attempts = 0;
            account.locked_until = None;
            self.accounts.update_account(&account)?;
            return Ok(account.subject());
        }

        account.failed_attempts = account.failed_attempts.saturating_add(1);
        if account.failed_attempts >= LOCKOUT_THRESHOLD {
            let until = now.saturating_add_millis(LOCKOUT_WINDOW_MILLIS);
            account.locked_until = Some(until);
            self.accounts.update_account(&account)?;
            let remaining_seconds = lock_remaining_seconds(&account, now).unwrap_or_default();
            return Err(CoreError::Locked {
                remaining_seconds,
            });
        }
        self.accounts.update_account(&account)?;
        Err(CoreError::InvalidCredentials)
    }

    /// Registers a new account.
    ///
    /// Anonymous callers may only create operators, and only when
    /// self-registration is enabled. Admins may create any role.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for blank email or password,
    /// [`CoreError::Forbidden`] when the actor may not create the role, and
    /// [`CoreError::Conflict`] when the email is taken.
    pub fn register(
        &self,
        actor: Option<&Subject>,
        request: RegisterRequest,
    ) -> Result<Account, CoreError> {
        let email = request.email.trim().to_string();
        if email.is_empty() {
            return Err(CoreError::Validation("email is required".to_string()));
        }
        if request.password.trim().is_empty() {
            return Err(CoreError::Validation("password is required".to_string()));
        }
        let role = request.role.unwrap_or(Role::Operator);
        let permitted = match actor {
            Some(subject) => subject.role == Role::Admin,
            None => self.allow_self_registration && role == Role::Operator,
        };
        if !permitted {
            return Err(CoreError::Forbidden);
        }
        if self.accounts.account_by_email(&email)?.is_some() {
            return Err(CoreError::Conflict("email already registered".to_string()));
        }

        let now = self.clock.now();
        let account = Account {
            id: AccountId::generate(),
            email,
            password_digest: self.hasher.hash(&request.password)?,
            role,
            profile: request.profile,
            failed_attempts: 0,
            locked_until: None,
            created_at: now,
            updated_at: now,
        };
        self.accounts.insert_account(&account).map_err(map_insert_error)?;
        Ok(account)
    }

    /// Returns the caller's profile view.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] when the account no longer exists.
    pub fn profile(&self, subject: &Subject) -> Result<ProfileView, CoreError> {
        self.accounts.account_by_id(&subject.id)?.map(|account| account.view()).ok_or(CoreError::NotFound)
    }

    /// Applies a partial profile update for the caller.
    ///
    /// A non-blank password is hashed and replaces the stored digest; lock
    /// bookkeeping is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] when the account no longer exists.
    pub fn update_profile(
        &self,
        subject: &Subject,
        patch: &ProfilePatch,
    ) -> Result<ProfileView, CoreError> {
        let Some(mut account) = self.accounts.account_by_id(&subject.id)? else {
            return Err(CoreError::NotFound);
        };
        patch.apply_to(&mut account.profile);
        if let Some(password) = patch.new_password() {
            account.password_digest = self.hasher.hash(password)?;
        }
        account.updated_at = self.clock.now();
        self.accounts.update_account(&account)?;
        Ok(account.view())
    }

    /// Returns the current time from the guard's clock.
    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }
}

/// Maps a store insert failure, surfacing uniqueness conflicts.
fn map_insert_error(err: StoreError) -> CoreError {
    match err {
        StoreError::Conflict(_) => CoreError::Conflict("email already registered".to_string()),
        other => CoreError::from(other),
    }
}
