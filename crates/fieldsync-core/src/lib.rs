// crates/fieldsync-core/src/lib.rs
// ============================================================================
// Module: Field Sync Core Library
// Description: Public API surface for the Field Sync core.
// Purpose: Expose domain types, store interfaces, and runtime components.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Field Sync core owns the offline-first occurrence lifecycle, the batch sync
//! reconciler, the role-scoped access policy, and the account lockout state
//! machine. It is storage-agnostic and integrates through explicit interfaces
//! ([`AccountStore`], [`OccurrenceStore`], [`PasswordHasher`], [`Clock`]) rather
//! than embedding a transport or database.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::AccountStore;
pub use interfaces::Clock;
pub use interfaces::HasherError;
pub use interfaces::OccurrenceQuery;
pub use interfaces::OccurrenceStore;
pub use interfaces::PasswordHasher;
pub use interfaces::StoreError;
pub use runtime::AccessPolicy;
pub use runtime::CoreError;
pub use runtime::CredentialGuard;
pub use runtime::InMemoryAccountStore;
pub use runtime::InMemoryOccurrenceStore;
pub use runtime::ListScope;
pub use runtime::LOCKOUT_THRESHOLD;
pub use runtime::LOCKOUT_WINDOW_MILLIS;
pub use runtime::ManualClock;
pub use runtime::OccurrenceLifecycle;
pub use runtime::Operation;
pub use runtime::RegisterRequest;
pub use runtime::SharedAccountStore;
pub use runtime::SharedClock;
pub use runtime::SharedOccurrenceStore;
pub use runtime::SharedPasswordHasher;
pub use runtime::SyncReconciler;
pub use runtime::SystemClock;
