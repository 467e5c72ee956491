// crates/fieldsync-cli/src/main.rs
// ============================================================================
// Module: Field Sync CLI Entry Point
// Description: Command dispatcher for serving, config checks, and bootstrap.
// Purpose: Provide a small operator CLI around the Field Sync server.
// Dependencies: clap, fieldsync-config, fieldsync-core, fieldsync-server, tokio.
// ============================================================================

//! ## Overview
//! The `fieldsync` binary starts the HTTP server, validates configuration
//! files, and provisions accounts directly against the configured store. The
//! last one is how the first administrator is created when anonymous
//! registration is disabled.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use fieldsync_config::FieldSyncConfig;
use fieldsync_core::Profile;
use fieldsync_core::RegisterRequest;
use fieldsync_core::Role;
use fieldsync_server::FieldSyncService;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "fieldsync", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Field Sync HTTP server.
    Serve(ServeCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Account administration utilities.
    Account {
        /// Selected account subcommand.
        #[command(subcommand)]
        command: AccountCommand,
    },
}

/// Arguments for `serve`.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Optional config file path (defaults to `fieldsync.toml` or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a configuration file.
    Validate(ConfigValidateCommand),
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to `fieldsync.toml` or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Account subcommands.
#[derive(Subcommand, Debug)]
enum AccountCommand {
    /// Create an account directly in the configured store.
    Create(AccountCreateCommand),
}

/// Arguments for `account create`.
#[derive(Args, Debug)]
struct AccountCreateCommand {
    /// Login email.
    #[arg(long, value_name = "EMAIL")]
    email: String,
    /// Initial password.
    #[arg(long, value_name = "PASSWORD")]
    password: String,
    /// Account role (`operator`, `supervisor`, or `admin`).
    #[arg(long, value_name = "ROLE", default_value = "operator")]
    role: String,
    /// Optional display username.
    #[arg(long, value_name = "NAME")]
    username: Option<String>,
    /// Optional config file path (defaults to `fieldsync.toml` or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Config {
            command,
        } => match command {
            ConfigCommand::Validate(command) => command_config_validate(&command),
        },
        Commands::Account {
            command,
        } => match command {
            AccountCommand::Create(command) => command_account_create(command).await,
        },
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Loads configuration and serves the HTTP adapter until interrupted.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = FieldSyncConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    if config.auth.signing_key.is_none() {
        write_stderr_line(
            "warning: no auth.signing_key configured; tokens will not survive a restart",
        )
        .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }
    write_stderr_line(&format!("fieldsync listening on {}", config.server.bind))
        .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    fieldsync_server::serve(config)
        .await
        .map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Validates a configuration file without starting the server.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let _config = FieldSyncConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    write_stdout_line("config valid").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Account Commands
// ============================================================================

/// Creates an account in the configured store and prints its profile.
async fn command_account_create(command: AccountCreateCommand) -> CliResult<ExitCode> {
    let config = FieldSyncConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let request = account_request(command)?;
    let account = tokio::task::spawn_blocking(move || {
        let service = FieldSyncService::from_config(&config)
            .map_err(|err| CliError::new(format!("failed to open store: {err}")))?;
        service
            .bootstrap_account(request)
            .map_err(|err| CliError::new(format!("account creation failed: {err}")))
    })
    .await
    .map_err(|err| CliError::new(format!("account creation join failed: {err}")))??;
    let rendered = serde_json::to_string_pretty(&account.view())
        .map_err(|err| CliError::new(format!("failed to render account: {err}")))?;
    write_stdout_line(&rendered).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Builds a registration request from CLI arguments.
fn account_request(command: AccountCreateCommand) -> CliResult<RegisterRequest> {
    let role = Role::from_str(&command.role).map_err(|err| CliError::new(err.to_string()))?;
    Ok(RegisterRequest {
        email: command.email,
        password: command.password,
        role: Some(role),
        profile: Profile {
            username: command.username,
            ..Profile::default()
        },
    })
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output stream failure.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
