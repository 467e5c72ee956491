// crates/fieldsync-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing and account request building.
// Purpose: Ensure CLI inputs map onto the expected commands and requests.
// Dependencies: fieldsync-cli main helpers, tempfile
// ============================================================================

//! ## Overview
//! Validates subcommand parsing, role handling for `account create`, and the
//! config validation command against real files.

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

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use fieldsync_core::Role;

use super::AccountCommand;
use super::Cli;
use super::Commands;
use super::ConfigCommand;
use super::ConfigValidateCommand;
use super::account_request;
use super::command_config_validate;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("fieldsync").chain(args.iter().copied())).unwrap()
}

fn create_command(role: &str) -> super::AccountCreateCommand {
    let cli = parse(&[
        "account",
        "create",
        "--email",
        "admin@example.com",
        "--password",
        "pw",
        "--role",
        role,
        "--username",
        "root",
    ]);
    match cli.command {
        Commands::Account {
            command: AccountCommand::Create(command),
        } => command,
        other => panic!("unexpected command: {other:?}"),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn serve_accepts_optional_config_path() {
    let cli = parse(&["serve", "--config", "/etc/fieldsync.toml"]);
    match cli.command {
        Commands::Serve(command) => {
            assert_eq!(command.config.as_deref(), Some(Path::new("/etc/fieldsync.toml")));
        }
        other => panic!("unexpected command: {other:?}"),
    }
    let cli = parse(&["serve"]);
    assert!(matches!(cli.command, Commands::Serve(command) if command.config.is_none()));
}

#[test]
fn missing_subcommand_is_rejected() {
    assert!(Cli::try_parse_from(["fieldsync"]).is_err());
    assert!(Cli::try_parse_from(["fieldsync", "account", "create", "--email", "a@b.c"]).is_err());
}

#[test]
fn account_create_builds_register_request() {
    let request = account_request(create_command("Admin")).unwrap();
    assert_eq!(request.email, "admin@example.com");
    assert_eq!(request.password, "pw");
    assert_eq!(request.role, Some(Role::Admin));
    assert_eq!(request.profile.username.as_deref(), Some("root"));
}

#[test]
fn account_create_defaults_to_operator() {
    let cli = parse(&["account", "create", "--email", "op@example.com", "--password", "pw"]);
    let Commands::Account {
        command: AccountCommand::Create(command),
    } = cli.command
    else {
        panic!("expected account create");
    };
    assert_eq!(account_request(command).unwrap().role, Some(Role::Operator));
}

#[test]
fn account_create_rejects_unknown_role() {
    let err = account_request(create_command("root")).unwrap_err();
    assert!(err.to_string().contains("unknown role"));
}

#[test]
fn config_validate_reports_invalid_files() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.toml");
    std::fs::write(&good, "[server]\nbind = \"127.0.0.1:9000\"\n").unwrap();
    let bad = dir.path().join("bad.toml");
    std::fs::write(&bad, "[store]\ntype = \"sqlite\"\n").unwrap();

    let code = command_config_validate(&ConfigValidateCommand {
        config: Some(good),
    })
    .unwrap();
    assert_eq!(code, ExitCode::SUCCESS);

    let err = command_config_validate(&ConfigValidateCommand {
        config: Some(bad),
    })
    .unwrap_err();
    assert!(err.to_string().contains("sqlite store requires path"));
}

#[test]
fn config_subcommand_parses_validate() {
    let cli = parse(&["config", "validate", "--config", "fieldsync.toml"]);
    assert!(matches!(
        cli.command,
        Commands::Config {
            command: ConfigCommand::Validate(_)
        }
    ));
}
