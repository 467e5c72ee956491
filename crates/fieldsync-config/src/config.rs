// crates/fieldsync-config/src/config.rs
// ============================================================================
// Module: Field Sync Configuration
// Description: Configuration loading and validation for Field Sync.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: fieldsync-store-sqlite, base64, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed. Every section has defaults
//! so an empty file yields a loopback server over the in-memory store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use fieldsync_store_sqlite::SqliteStoreConfig;
use fieldsync_store_sqlite::SqliteJournalMode;
use fieldsync_store_sqlite::SqliteSynchronous;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "fieldsync.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "FIELDSYNC_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Longest accepted path segment, in bytes.
const MAX_SEGMENT_BYTES: usize = 255;
/// Longest accepted path, in bytes.
const MAX_PATH_BYTES: usize = 4096;
/// Upper bound for `server.max_body_bytes`.
const MAX_BODY_BYTES_CEILING: usize = 256 * 1024 * 1024;
/// Default bind address for the HTTP adapter.
const DEFAULT_BIND: &str = "127.0.0.1:8080";
/// Length in bytes of an Ed25519 signing seed.
pub const SIGNING_SEED_LENGTH: usize = 32;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Field Sync configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSyncConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Account and occurrence store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Token and registration configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl FieldSyncConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit `path`, then [`CONFIG_ENV_VAR`], then
    /// `fieldsync.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = path.map_or_else(default_config_path, Path::to_path_buf);
        check_path("config path", &resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Parses and validates configuration from raw file bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the bytes exceed limits, are not UTF-8,
    /// fail to parse, or fail validation.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate(&self.auth)?;
        self.store.validate()?;
        self.auth.validate()?;
        self.audit.validate()?;
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address the HTTP adapter binds to.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address does not parse.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))
    }

    /// Validates server configuration.
    fn validate(&self, auth: &AuthConfig) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_body_bytes > MAX_BODY_BYTES_CEILING {
            return Err(ConfigError::Invalid("max_body_bytes exceeds ceiling".to_string()));
        }
        let addr = self.socket_addr()?;
        // Non-loopback binds need a stable signing key.
        if !addr.ip().is_loopback() && auth.signing_key.is_none() {
            return Err(ConfigError::Invalid(
                "non-loopback bind requires auth.signing_key".to_string(),
            ));
        }
        Ok(())
    }
}

/// Store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` synchronous level.
    #[serde(default)]
    pub synchronous: SqliteSynchronous,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteJournalMode::default(),
            synchronous: SqliteSynchronous::default(),
        }
    }
}

impl StoreConfig {
    /// Returns the `SQLite` store configuration for the sqlite backend.
    ///
    /// Returns `None` for the memory backend.
    #[must_use]
    pub fn sqlite(&self) -> Option<SqliteStoreConfig> {
        match self.store_type {
            StoreType::Memory => None,
            StoreType::Sqlite => self.path.as_ref().map(|path| SqliteStoreConfig {
                path: path.clone(),
                busy_timeout_ms: self.busy_timeout_ms,
                journal_mode: self.journal_mode,
                synchronous: self.synchronous,
            }),
        }
    }

    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            StoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid("memory store must not set path".to_string()));
                }
                Ok(())
            }
            StoreType::Sqlite => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sqlite store requires path".to_string())
                })?;
                check_path("store.path", path)
            }
        }
    }
}

/// Store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Use the in-memory store.
    #[default]
    Memory,
    /// Use `SQLite`-backed durable store.
    Sqlite,
}

/// Token signing and registration configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Base64-encoded 32-byte Ed25519 signing seed.
    ///
    /// When absent the server generates an ephemeral key at startup.
    #[serde(default)]
    pub signing_key: Option<String>,
    /// Allow anonymous callers to register operator accounts.
    #[serde(default)]
    pub allow_self_registration: bool,
}

impl AuthConfig {
    /// Decodes the configured signing seed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the key is not base64 or not
    /// exactly [`SIGNING_SEED_LENGTH`] bytes.
    pub fn signing_seed(&self) -> Result<Option<[u8; SIGNING_SEED_LENGTH]>, ConfigError> {
        let Some(encoded) = &self.signing_key else {
            return Ok(None);
        };
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| ConfigError::Invalid("auth.signing_key must be base64".to_string()))?;
        let seed: [u8; SIGNING_SEED_LENGTH] = bytes.try_into().map_err(|_| {
            ConfigError::Invalid(format!("auth.signing_key must decode to {SIGNING_SEED_LENGTH} bytes"))
        })?;
        Ok(Some(seed))
    }

    /// Validates auth configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.signing_seed().map(|_| ())
    }
}

/// Audit logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines). Stderr when absent.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
        }
    }
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match &self.path {
            Some(path) => check_path("audit.path", Path::new(path.trim())),
            None => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Config path used when none is passed: [`CONFIG_ENV_VAR`] or the default name.
fn default_config_path() -> PathBuf {
    env::var_os(CONFIG_ENV_VAR).map_or_else(|| PathBuf::from(DEFAULT_CONFIG_NAME), PathBuf::from)
}

/// Rejects empty paths and paths over the byte limits; `label` names the setting.
fn check_path(label: &str, path: &Path) -> Result<(), ConfigError> {
    let length = path.as_os_str().len();
    if length == 0 {
        return Err(ConfigError::Invalid(format!("{label} must be non-empty")));
    }
    if length > MAX_PATH_BYTES {
        return Err(ConfigError::Invalid(format!("{label} longer than {MAX_PATH_BYTES} bytes")));
    }
    if path.iter().any(|segment| segment.len() > MAX_SEGMENT_BYTES) {
        return Err(ConfigError::Invalid(format!(
            "{label} has a segment longer than {MAX_SEGMENT_BYTES} bytes"
        )));
    }
    Ok(())
}

/// Default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Default maximum request body size in bytes.
const fn default_max_body_bytes() -> usize {
    16 * 1024 * 1024
}

/// Default `SQLite` busy timeout in milliseconds.
const fn default_store_busy_timeout_ms() -> u64 {
    5_000
}

/// Audit logging is on unless disabled.
const fn default_audit_enabled() -> bool {
    true
}

// ============================================================================
// SECTION: Tests
// ============================================================================
