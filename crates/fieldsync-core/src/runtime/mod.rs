// crates/fieldsync-core/src/runtime/mod.rs
// ============================================================================
// Module: Field Sync Runtime
// Description: Credential guard, access policy, lifecycle, and reconciler.
// Purpose: Execute Field Sync operations against injected stores and clocks.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement every caller-facing operation. Transports (HTTP,
//! CLI) must call into these components rather than re-implementing checks,
//! so ownership and lockout rules have exactly one home.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod clock;
pub mod credentials;
pub mod error;
pub mod lifecycle;
pub mod policy;
pub mod reconciler;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use clock::ManualClock;
pub use clock::SharedClock;
pub use clock::SystemClock;
pub use credentials::CredentialGuard;
pub use credentials::LOCKOUT_THRESHOLD;
pub use credentials::LOCKOUT_WINDOW_MILLIS;
pub use credentials::RegisterRequest;
pub use credentials::SharedPasswordHasher;
pub use error::CoreError;
pub use lifecycle::OccurrenceLifecycle;
pub use policy::AccessPolicy;
pub use policy::ListScope;
pub use policy::Operation;
pub use reconciler::SyncReconciler;
pub use store::InMemoryAccountStore;
pub use store::InMemoryOccurrenceStore;
pub use store::SharedAccountStore;
pub use store::SharedOccurrenceStore;
