// crates/fieldsync-core/tests/proptest_lockout.rs
// ============================================================================
// Module: Lockout Property Tests
// Description: Property-based checks for lockout arithmetic and transitions.
// Purpose: Ensure lock bookkeeping holds for arbitrary attempt sequences.
// Dependencies: fieldsync-core, proptest
// ============================================================================
//! ## Overview
//! Generates attempt sequences with random delays and compares the guard
//! against a small reference model of the lockout rules.

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
use fieldsync_core::Account;
use fieldsync_core::AccountId;
use fieldsync_core::CoreError;
use fieldsync_core::LOCKOUT_THRESHOLD;
use fieldsync_core::LOCKOUT_WINDOW_MILLIS;
use fieldsync_core::PasswordDigest;
use fieldsync_core::Profile;
use fieldsync_core::Role;
use fieldsync_core::Timestamp;
use fieldsync_core::is_locked;
use fieldsync_core::lock_remaining_seconds;
use proptest::prelude::*;

fn account_locked_until(until: Option<i64>) -> Account {
    Account {
        id: AccountId::new("acct"),
        email: "a@example.com".to_string(),
        password_digest: PasswordDigest::new("plain:x"),
        role: Role::Operator,
        profile: Profile::default(),
        failed_attempts: 0,
        locked_until: until.map(Timestamp::from_unix_millis),
        created_at: Timestamp::from_unix_millis(0),
        updated_at: Timestamp::from_unix_millis(0),
    }
}

/// Reference model outcome for one attempt.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Ok,
    Invalid,
    Locked(u64),
}

proptest! {
    #[test]
    fn remaining_seconds_round_up(now in 0_i64..1_000_000, delta in 1_i64..2_000_000) {
        let account = account_locked_until(Some(now + delta));
        let remaining = lock_remaining_seconds(&account, Timestamp::from_unix_millis(now)).unwrap();
        let delta = u64::try_from(delta).unwrap();
        prop_assert!(remaining * 1_000 >= delta);
        prop_assert!(remaining * 1_000 < delta + 1_000);
        prop_assert!(is_locked(&account, Timestamp::from_unix_millis(now)));
    }

    #[test]
    fn expired_locks_are_not_locked(now in 0_i64..1_000_000, past in 0_i64..1_000_000) {
        let account = account_locked_until(Some(now - past));
        prop_assert!(!is_locked(&account, Timestamp::from_unix_millis(now)));
        prop_assert_eq!(lock_remaining_seconds(&account, Timestamp::from_unix_millis(now)), None);
    }

    #[test]
    fn guard_matches_reference_model(
        attempts in prop::collection::vec((any::<bool>(), 0_i64..400_000), 1..40)
    ) {
        let harness = Harness::new();
        harness.account("op@example.com", "secret", Role::Operator);

        let mut failures: u32 = 0;
        let mut locked_until: Option<i64> = None;
        for (correct, delay) in attempts {
            harness.clock.advance_millis(delay);
            let now = harness.guard.now().as_unix_millis();
            let password = if correct { "secret" } else { "wrong" };

            let expected = match locked_until {
                Some(until) if until > now => {
                    let remaining = u64::try_from(until - now).unwrap().div_ceil(1_000);
                    Outcome::Locked(remaining)
                }
                _ => {
                    if locked_until.take().is_some() {
                        failures = 0;
                    }
                    if correct {
                        failures = 0;
                        Outcome::Ok
                    } else {
                        failures += 1;
                        if failures >= LOCKOUT_THRESHOLD {
                            locked_until = Some(now + LOCKOUT_WINDOW_MILLIS);
                            Outcome::Locked(900)
                        } else {
                            Outcome::Invalid
                        }
                    }
                }
            };

            let actual = match harness.guard.authenticate("op@example.com", password) {
                Ok(_) => Outcome::Ok,
                Err(CoreError::InvalidCredentials) => Outcome::Invalid,
                Err(CoreError::Locked { remaining_seconds }) => Outcome::Locked(remaining_seconds),
                Err(other) => panic!("unexpected error: {other:?}"),
            };
            prop_assert_eq!(actual, expected);
        }
    }
}
