// crates/fieldsync-core/tests/access_policy.rs
// ============================================================================
// Module: Access Policy Tests
// Description: Role and ownership decisions for every operation.
// Purpose: Ensure the policy table matches the role model exactly.
// Dependencies: fieldsync-core
// ============================================================================
//! ## Overview
//! Enumerates roles, operations, and ownership to check the policy table.

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

use fieldsync_core::AccessPolicy;
use fieldsync_core::AccountId;
use fieldsync_core::CoreError;
use fieldsync_core::ListScope;
use fieldsync_core::Operation;
use fieldsync_core::Role;
use fieldsync_core::Subject;

const READ_LIKE: [Operation; 4] =
    [Operation::Read, Operation::Update, Operation::Delete, Operation::List];

#[test]
fn privileged_roles_access_every_record() {
    let owner = AccountId::new("owner");
    for role in [Role::Supervisor, Role::Admin] {
        let subject = Subject::new(AccountId::new("boss"), role);
        for operation in READ_LIKE {
            assert!(AccessPolicy::can_access(&subject, &owner, operation), "{role} {operation:?}");
        }
        assert_eq!(AccessPolicy::list_scope(&subject), ListScope::All);
    }
}

#[test]
fn operators_are_limited_to_owned_records() {
    let subject = Subject::new(AccountId::new("op"), Role::Operator);
    let foreign = AccountId::new("someone-else");
    for operation in READ_LIKE {
        assert!(AccessPolicy::can_access(&subject, &subject.id, operation));
        assert!(!AccessPolicy::can_access(&subject, &foreign, operation));
    }
    assert_eq!(AccessPolicy::list_scope(&subject), ListScope::OwnedBy(subject.id.clone()));
}

#[test]
fn create_requires_self_ownership_for_every_role() {
    for role in [Role::Operator, Role::Supervisor, Role::Admin] {
        let subject = Subject::new(AccountId::new("me"), role);
        assert!(AccessPolicy::can_access(&subject, &subject.id, Operation::Create));
        assert!(!AccessPolicy::can_access(&subject, &AccountId::new("other"), Operation::Create));
    }
}

#[test]
fn authorize_maps_denial_to_forbidden() {
    let subject = Subject::new(AccountId::new("op"), Role::Operator);
    let err = AccessPolicy::authorize(&subject, &AccountId::new("x"), Operation::Read).unwrap_err();
    assert!(matches!(err, CoreError::Forbidden));
    assert_eq!(err.kind(), "forbidden");
}

#[test]
fn roles_parse_from_labels() {
    assert_eq!("Supervisor".parse::<Role>().unwrap(), Role::Supervisor);
    assert_eq!(" admin ".parse::<Role>().unwrap(), Role::Admin);
    assert!("chief".parse::<Role>().is_err());
}

#[test]
fn role_gates_admit_only_listed_roles() {
    let admin = Subject::new(AccountId::new("a"), Role::Admin);
    let supervisor = Subject::new(AccountId::new("s"), Role::Supervisor);
    let operator = Subject::new(AccountId::new("o"), Role::Operator);

    assert!(AccessPolicy::require_role(&admin, &[Role::Admin]).is_ok());
    assert!(matches!(
        AccessPolicy::require_role(&supervisor, &[Role::Admin]),
        Err(CoreError::Forbidden)
    ));
    assert!(matches!(
        AccessPolicy::require_role(&operator, &[Role::Admin]),
        Err(CoreError::Forbidden)
    ));
    assert!(AccessPolicy::require_role(&supervisor, &[Role::Supervisor, Role::Admin]).is_ok());
    assert!(AccessPolicy::require_role(&operator, &[]).is_err());
}
