// crates/fieldsync-core/src/runtime/error.rs
// ============================================================================
// Module: Field Sync Runtime Errors
// Description: Caller-facing error kinds for every runtime operation.
// Purpose: Give transports a single closed set of outcomes to map.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`CoreError`] is the only error type runtime operations return. Store
//! failures other than uniqueness conflicts collapse into
//! [`CoreError::Internal`]; the backend detail is kept for audit logging but
//! never rendered in the caller-facing message.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::occurrence::InputError;
use crate::interfaces::HasherError;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Core Error
// ============================================================================

/// Runtime operation errors.
///
/// # Invariants
/// - Variants and [`CoreError::kind`] labels are stable.
/// - Display messages never embed credentials, payloads, or store detail.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Target record or account does not exist.
    #[error("not found")]
    NotFound,
    /// Caller lacks permission for the operation.
    #[error("forbidden")]
    Forbidden,
    /// Caller is not authenticated.
    #[error("unauthenticated")]
    Unauthenticated,
    /// Input failed validation.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Operation is not allowed in the record's current state.
    #[error("invalid state: {0}")]
    State(String),
    /// Account is locked.
    #[error("account locked; try again in {remaining_seconds} seconds")]
    Locked {
        /// Whole seconds until the lock expires.
        remaining_seconds: u64,
    },
    /// Password did not match.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// Unique key already taken.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Backend failure; detail is for audit logs only.
    #[error("internal error")]
    Internal(String),
}

impl CoreError {
    /// Returns the stable label for the error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::Unauthenticated => "unauthenticated",
            Self::Validation(_) => "validation",
            Self::State(_) => "state",
            Self::Locked {
                ..
            } => "locked",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal",
        }
    }

    /// Returns the internal detail for audit logging, if any.
    #[must_use]
    pub fn internal_detail(&self) -> Option<&str> {
        match self {
            Self::Internal(detail) => Some(detail),
            _ => None,
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<HasherError> for CoreError {
    fn from(err: HasherError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<InputError> for CoreError {
    fn from(err: InputError) -> Self {
        Self::Validation(err.to_string())
    }
}
