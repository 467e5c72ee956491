// crates/fieldsync-core/src/runtime/policy.rs
// ============================================================================
// Module: Field Sync Access Policy
// Description: Role and ownership checks for occurrence operations.
// Purpose: Be the single authority on who may touch which record.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Supervisors and administrators may perform every operation on every
//! record. Operators may only act on records they own, and listings are
//! scoped to their own records. No other module compares owners to subjects.
//! Role-gated operations that do not touch a record go through
//! [`AccessPolicy::require_role`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::account::Role;
use crate::core::account::Subject;
use crate::core::identifiers::AccountId;
use crate::runtime::error::CoreError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Operations subject to access checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Create a record owned by the caller.
    Create,
    /// Read a single record.
    Read,
    /// Mutate a record (edit or reopen).
    Update,
    /// Delete a record.
    Delete,
    /// List records.
    List,
}

/// Visibility scope for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListScope {
    /// Every record.
    All,
    /// Only records owned by the given account.
    OwnedBy(AccountId),
}

impl ListScope {
    /// Returns the owner filter implied by the scope.
    #[must_use]
    pub fn owner(&self) -> Option<AccountId> {
        match self {
            Self::All => None,
            Self::OwnedBy(owner) => Some(owner.clone()),
        }
    }
}

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Role-scoped access policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessPolicy;

impl AccessPolicy {
    /// Returns true when `subject` may perform `operation` on a record owned by `owner`.
    #[must_use]
    pub fn can_access(subject: &Subject, owner: &AccountId, operation: Operation) -> bool {
        match operation {
            Operation::Create => &subject.id == owner,
            Operation::Read | Operation::Update | Operation::Delete | Operation::List => {
                subject.role.is_privileged() || &subject.id == owner
            }
        }
    }

    /// Returns the listing scope for `subject`.
    #[must_use]
    pub fn list_scope(subject: &Subject) -> ListScope {
        if subject.role.is_privileged() {
            ListScope::All
        } else {
            ListScope::OwnedBy(subject.id.clone())
        }
    }

    /// Fails with [`CoreError::Forbidden`] unless the operation is permitted.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Forbidden`] when [`AccessPolicy::can_access`] denies.
    pub fn authorize(
        subject: &Subject,
        owner: &AccountId,
        operation: Operation,
    ) -> Result<(), CoreError> {
        if Self::can_access(subject, owner, operation) { Ok(()) } else { Err(CoreError::Forbidden) }
    }

    /// Fails with [`CoreError::Forbidden`] unless the subject holds one of `allowed`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Forbidden`] when the subject's role is not listed.
    pub fn require_role(subject: &Subject, allowed: &[Role]) -> Result<(), CoreError> {
        if allowed.contains(&subject.role) { Ok(()) } else { Err(CoreError::Forbidden) }
    }
}
