// crates/fieldsync-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Shared harness, hasher, and payload builders for core tests.
// Purpose: Provide deterministic runtime wiring over in-memory stores.
// Dependencies: fieldsync-core, serde_json
// ============================================================================

//! ## Overview
//! The harness wires the credential guard, lifecycle, and reconciler over
//! in-memory stores and a [`ManualClock`] so lockout windows and ordering can
//! be asserted without sleeping.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test fixtures use expect for setup failures."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use fieldsync_core::Account;
use fieldsync_core::CredentialGuard;
use fieldsync_core::HasherError;
use fieldsync_core::InMemoryAccountStore;
use fieldsync_core::InMemoryOccurrenceStore;
use fieldsync_core::ManualClock;
use fieldsync_core::OccurrenceInput;
use fieldsync_core::OccurrenceLifecycle;
use fieldsync_core::PasswordDigest;
use fieldsync_core::PasswordHasher;
use fieldsync_core::RegisterRequest;
use fieldsync_core::Role;
use fieldsync_core::SharedAccountStore;
use fieldsync_core::SharedOccurrenceStore;
use fieldsync_core::Subject;
use fieldsync_core::SyncItem;
use fieldsync_core::SyncReconciler;
use fieldsync_core::Timestamp;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Hasher
// ============================================================================

/// Reversible hasher for tests; never use outside tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, password: &str) -> Result<PasswordDigest, HasherError> {
        Ok(PasswordDigest::new(format!("plain:{password}")))
    }

    fn verify(&self, password: &str, digest: &PasswordDigest) -> Result<bool, HasherError> {
        let Some(stored) = digest.as_str().strip_prefix("plain:") else {
            return Err(HasherError::MalformedDigest);
        };
        Ok(stored == password)
    }
}

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Start time used by every harness (2024-03-01T12:00:00Z).
pub const START_MILLIS: i64 = 1_709_294_400_000;

/// Runtime components wired over in-memory stores.
pub struct Harness {
    pub clock: ManualClock,
    pub accounts: InMemoryAccountStore,
    pub occurrences: InMemoryOccurrenceStore,
    pub guard: CredentialGuard,
    pub lifecycle: OccurrenceLifecycle,
    pub reconciler: SyncReconciler,
}

impl Harness {
    pub fn new() -> Self {
        let clock = ManualClock::new(Timestamp::from_unix_millis(START_MILLIS));
        let accounts = InMemoryAccountStore::new();
        let occurrences = InMemoryOccurrenceStore::new();
        let guard = CredentialGuard::new(
            SharedAccountStore::from_store(accounts.clone()),
            Arc::new(PlainHasher),
            Arc::new(clock.clone()),
        )
        .with_self_registration(true);
        let lifecycle = OccurrenceLifecycle::new(
            SharedOccurrenceStore::from_store(occurrences.clone()),
            Arc::new(clock.clone()),
        );
        let reconciler = SyncReconciler::new(lifecycle.clone());
        Self {
            clock,
            accounts,
            occurrences,
            guard,
            lifecycle,
            reconciler,
        }
    }

    /// Registers an account directly through an admin actor.
    pub fn account(&self, email: &str, password: &str, role: Role) -> Account {
        let admin = Subject::new("bootstrap-admin".into(), Role::Admin);
        self.guard
            .register(
                Some(&admin),
                RegisterRequest {
                    email: email.to_string(),
                    password: password.to_string(),
                    role: Some(role),
                    ..RegisterRequest::default()
                },
            )
            .expect("register account")
    }

    /// Registers an account and returns its subject.
    pub fn subject(&self, email: &str, role: Role) -> Subject {
        self.account(email, "secret", role).subject()
    }

    pub fn stored_count(&self) -> usize {
        self.occurrences.record_count().expect("record count")
    }
}

// ============================================================================
// SECTION: Payloads
// ============================================================================

/// Returns a complete occurrence payload as JSON.
pub fn payload(local_id: Option<&str>) -> Value {
    let mut value = json!({
        "type": "fire",
        "occurred_at": "2024-03-01T10:30:00Z",
        "unit": "ABT-12",
        "team": "alpha",
        "description": "vehicle fire on the highway shoulder",
        "photos": ["aGVsbG8="],
        "location": { "latitude": -8.05, "longitude": -34.9, "accuracy": 5.0 }
    });
    if let Some(local_id) = local_id {
        value["local_id"] = Value::String(local_id.to_string());
    }
    value
}

/// Returns a complete occurrence input.
pub fn input(local_id: Option<&str>) -> OccurrenceInput {
    serde_json::from_value(payload(local_id)).expect("valid payload")
}

/// Returns a batch item.
pub fn item(local_id: Option<&str>) -> SyncItem {
    SyncItem::from_json(payload(local_id))
}
