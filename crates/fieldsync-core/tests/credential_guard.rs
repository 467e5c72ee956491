// crates/fieldsync-core/tests/credential_guard.rs
// ============================================================================
// Module: Credential Guard Tests
// Description: Lockout state machine, registration, and profile updates.
// Purpose: Ensure lock bookkeeping is exact and always persisted.
// Dependencies: fieldsync-core
// ============================================================================
//! ## Overview
//! Drives the credential guard through failure, lock, expiry, and success
//! transitions with a manual clock.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use common::Harness;
use fieldsync_core::AccountStore;
use fieldsync_core::CoreError;
use fieldsync_core::LOCKOUT_THRESHOLD;
use fieldsync_core::LOCKOUT_WINDOW_MILLIS;
use fieldsync_core::Patch;
use fieldsync_core::ProfilePatch;
use fieldsync_core::RegisterRequest;
use fieldsync_core::Role;
use fieldsync_core::Subject;
use fieldsync_core::is_locked;

fn fail_times(harness: &Harness, email: &str, times: u32) -> Vec<CoreError> {
    (0..times)
        .map(|_| harness.guard.authenticate(email, "wrong").expect_err("mismatch fails"))
        .collect()
}

#[test]
fn unknown_email_is_not_found() {
    let harness = Harness::new();
    let err = harness.guard.authenticate("ghost@example.com", "x").unwrap_err();
    assert!(matches!(err, CoreError::NotFound));
}

#[test]
fn fifth_failure_locks_for_fifteen_minutes() {
    let harness = Harness::new();
    let account = harness.account("op@example.com", "secret", Role::Operator);

    let errors = fail_times(&harness, "op@example.com", LOCKOUT_THRESHOLD);
    for err in &errors[..4] {
        assert!(matches!(err, CoreError::InvalidCredentials));
    }
    assert!(matches!(
        errors[4],
        CoreError::Locked {
            remaining_seconds: 900
        }
    ));

    let stored = harness.accounts.account_by_id(&account.id).unwrap().unwrap();
    assert_eq!(stored.failed_attempts, 5);
    assert_eq!(
        stored.locked_until.unwrap().as_unix_millis(),
        harness.guard.now().as_unix_millis() + LOCKOUT_WINDOW_MILLIS
    );
    assert!(is_locked(&stored, harness.guard.now()));
}

#[test]
fn locked_account_reports_decreasing_remaining_time() {
    let harness = Harness::new();
    harness.account("op@example.com", "secret", Role::Operator);
    fail_times(&harness, "op@example.com", 5);

    harness.clock.advance_secs(60);
    let first = harness.guard.authenticate("op@example.com", "wrong").unwrap_err();
    harness.clock.advance_millis(1_500);
    let second = harness.guard.authenticate("op@example.com", "wrong").unwrap_err();

    let CoreError::Locked {
        remaining_seconds: first,
    } = first
    else {
        panic!("expected lock, got {first:?}");
    };
    let CoreError::Locked {
        remaining_seconds: second,
    } = second
    else {
        panic!("expected lock, got {second:?}");
    };
    assert_eq!(first, 840);
    assert_eq!(second, 839);
}

#[test]
fn correct_password_during_lock_is_still_locked() {
    let harness = Harness::new();
    harness.account("op@example.com", "secret", Role::Operator);
    fail_times(&harness, "op@example.com", 5);

    let err = harness.guard.authenticate("op@example.com", "secret").unwrap_err();
    assert!(matches!(err, CoreError::Locked { .. }));
}

#[test]
fn expired_lock_restarts_counter_before_evaluation() {
    let harness = Harness::new();
    let account = harness.account("op@example.com", "secret", Role::Operator);
    fail_times(&harness, "op@example.com", 5);

    harness.clock.advance_millis(LOCKOUT_WINDOW_MILLIS);
    let err = harness.guard.authenticate("op@example.com", "wrong").unwrap_err();
    assert!(matches!(err, CoreError::InvalidCredentials));

    let stored = harness.accounts.account_by_id(&account.id).unwrap().unwrap();
    assert_eq!(stored.failed_attempts, 1);
    assert_eq!(stored.locked_until, None);
}

#[test]
fn success_after_expiry_clears_lock() {
    let harness = Harness::new();
    let account = harness.account("op@example.com", "secret", Role::Operator);
    fail_times(&harness, "op@example.com", 5);
    harness.clock.advance_secs(15 * 60 + 1);

    let subject = harness.guard.authenticate("op@example.com", "secret").unwrap();
    assert_eq!(subject, Subject::new(account.id.clone(), Role::Operator));
    let stored = harness.accounts.account_by_id(&account.id).unwrap().unwrap();
    assert_eq!(stored.failed_attempts, 0);
    assert_eq!(stored.locked_until, None);
}

#[test]
fn success_resets_partial_failure_count() {
    let harness = Harness::new();
    let account = harness.account("op@example.com", "secret", Role::Operator);
    fail_times(&harness, "op@example.com", 3);
    harness.guard.authenticate("op@example.com", "secret").unwrap();

    let stored = harness.accounts.account_by_id(&account.id).unwrap().unwrap();
    assert_eq!(stored.failed_attempts, 0);

    let errors = fail_times(&harness, "op@example.com", 4);
    assert!(errors.iter().all(|err| matches!(err, CoreError::InvalidCredentials)));
}

#[test]
fn anonymous_registration_only_creates_operators() {
    let harness = Harness::new();
    let created = harness
        .guard
        .register(
            None,
            RegisterRequest {
                email: "new@example.com".to_string(),
                password: "pw".to_string(),
                ..RegisterRequest::default()
            },
        )
        .unwrap();
    assert_eq!(created.role, Role::Operator);
    assert_ne!(created.password_digest.as_str(), "pw");

    let err = harness
        .guard
        .register(
            None,
            RegisterRequest {
                email: "boss@example.com".to_string(),
                password: "pw".to_string(),
                role: Some(Role::Admin),
                ..RegisterRequest::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, CoreError::Forbidden));
}

#[test]
fn duplicate_email_and_blank_fields_are_rejected() {
    let harness = Harness::new();
    harness.account("dup@example.com", "secret", Role::Operator);
    let admin = harness.subject("admin@example.com", Role::Admin);

    let err = harness
        .guard
        .register(
            Some(&admin),
            RegisterRequest {
                email: "dup@example.com".to_string(),
                password: "pw".to_string(),
                ..RegisterRequest::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));

    let err = harness
        .guard
        .register(
            Some(&admin),
            RegisterRequest {
                email: "  ".to_string(),
                password: "pw".to_string(),
                ..RegisterRequest::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
}

#[test]
fn operators_cannot_register_accounts() {
    let harness = Harness::new();
    let operator = harness.subject("op@example.com", Role::Operator);
    let err = harness
        .guard
        .register(
            Some(&operator),
            RegisterRequest {
                email: "other@example.com".to_string(),
                password: "pw".to_string(),
                ..RegisterRequest::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, CoreError::Forbidden));
}

#[test]
fn profile_update_hashes_new_password_and_keeps_lock_state() {
    let harness = Harness::new();
    let account = harness.account("op@example.com", "secret", Role::Operator);
    fail_times(&harness, "op@example.com", 2);

    let view = harness
        .guard
        .update_profile(
            &account.subject(),
            &ProfilePatch {
                first_name: Patch::Set("Ana".to_string()),
                phone: Patch::Set("+55 81 99999-0000".to_string()),
                password: Some("fresh".to_string()),
                ..ProfilePatch::default()
            },
        )
        .unwrap();
    assert_eq!(view.profile.first_name.as_deref(), Some("Ana"));

    let stored = harness.accounts.account_by_id(&account.id).unwrap().unwrap();
    assert_eq!(stored.failed_attempts, 2);
    assert_eq!(stored.password_digest.as_str(), "plain:fresh");
    assert!(harness.guard.authenticate("op@example.com", "fresh").is_ok());
}

#[test]
fn blank_password_in_profile_update_is_ignored() {
    let harness = Harness::new();
    let account = harness.account("op@example.com", "secret", Role::Operator);
    harness
        .guard
        .update_profile(
            &account.subject(),
            &ProfilePatch {
                password: Some("   ".to_string()),
                ..ProfilePatch::default()
            },
        )
        .unwrap();
    assert!(harness.guard.authenticate("op@example.com", "secret").is_ok());
}

#[test]
fn profile_view_excludes_credentials() {
    let harness = Harness::new();
    let account = harness.account("op@example.com", "secret", Role::Supervisor);
    let view = harness.guard.profile(&account.subject()).unwrap();
    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["email"], "op@example.com");
    assert_eq!(json["role"], "supervisor");
    assert!(json.get("password_digest").is_none());
    assert!(json.get("failed_attempts").is_none());
}
