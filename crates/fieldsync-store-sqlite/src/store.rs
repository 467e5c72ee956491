// crates/fieldsync-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Field Sync Store
// Description: Durable AccountStore and OccurrenceStore backed by SQLite.
// Purpose: Persist records as canonical JSON with integrity hashes.
// Dependencies: fieldsync-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Each account and occurrence is stored as one row holding its canonical
//! JSON (RFC 8785) and a hash of those bytes. Indexed columns (email, local
//! id, owner, status, creation time) are duplicated out of the payload so
//! uniqueness and listing are enforced by `SQLite` itself. Loads verify the
//! stored hash and fail closed on mismatch.
//!
//! The connection is serialized through a mutex; every operation is a single
//! statement or a short transaction, bounded by the configured busy timeout.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use fieldsync_core::Account;
use fieldsync_core::AccountId;
use fieldsync_core::AccountStore;
use fieldsync_core::LocalId;
use fieldsync_core::Occurrence;
use fieldsync_core::OccurrenceId;
use fieldsync_core::OccurrenceQuery;
use fieldsync_core::OccurrenceStore;
use fieldsync_core::StoreError;
use fieldsync_core::hashing::DEFAULT_HASH_ALGORITHM;
use fieldsync_core::hashing::HashAlgorithm;
use fieldsync_core::hashing::canonical_json_bytes;
use fieldsync_core::hashing::hash_bytes;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Schema version written to `store_meta`.
const SCHEMA_VERSION: i64 = 1;
/// Busy timeout used by [`SqliteStoreConfig::for_path`].
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Largest canonical record the store writes or reads back.
pub const MAX_RECORD_BYTES: usize = 32 * 1024 * 1024;

// ============================================================================
// SECTION: Config
// ============================================================================

/// Value for `PRAGMA journal_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// Write-ahead log.
    #[default]
    Wal,
    /// Rollback journal deleted after each transaction.
    Delete,
}

impl SqliteJournalMode {
    /// Pragma argument for this mode.
    #[must_use]
    pub const fn as_pragma(self) -> &'static str {
        match self {
            Self::Wal => "WAL",
            Self::Delete => "DELETE",
        }
    }
}

/// Value for `PRAGMA synchronous`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSynchronous {
    /// Sync on every commit.
    #[default]
    Full,
    /// Sync at checkpoints only.
    Normal,
}

impl SqliteSynchronous {
    /// Pragma argument for this level.
    #[must_use]
    pub const fn as_pragma(self) -> &'static str {
        match self {
            Self::Full => "FULL",
            Self::Normal => "NORMAL",
        }
    }
}

/// Settings for opening a [`SqliteFieldSyncStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteStoreConfig {
    /// Database file; missing parent directories are created.
    pub path: PathBuf,
    /// Milliseconds a statement waits on a locked database.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Journal mode pragma.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// Synchronous pragma.
    #[serde(default)]
    pub synchronous: SqliteSynchronous,
}

impl SqliteStoreConfig {
    /// Settings for `path` with the default timeout and pragmas.
    #[must_use]
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteJournalMode::default(),
            synchronous: SqliteSynchronous::default(),
        }
    }
}

/// Serde default for `busy_timeout_ms`.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures raised by [`SqliteFieldSyncStore`].
///
/// Messages name rows and columns, never record payloads.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// The database file, its directory, or the connection lock is unusable.
    #[error("sqlite store unavailable: {0}")]
    Unavailable(String),
    /// A statement failed inside `SQLite`.
    #[error("sqlite statement failed: {0}")]
    Sql(#[from] rusqlite::Error),
    /// The file was written with another schema version.
    #[error("sqlite schema version {found} is not supported (expected {SCHEMA_VERSION})")]
    Schema {
        /// Version found in `store_meta`.
        found: i64,
    },
    /// A row failed its content hash check.
    #[error("sqlite row tampered: {0}")]
    Tampered(String),
    /// A record could not be encoded, decoded, or matched to its row.
    #[error("sqlite record rejected: {0}")]
    Record(String),
    /// A unique column already holds the value.
    #[error("sqlite duplicate: {0}")]
    Duplicate(String),
    /// An update matched no row.
    #[error("sqlite row not found: {0}")]
    NoRow(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Unavailable(message) => Self::Io(message),
            SqliteStoreError::Sql(err) => Self::Store(err.to_string()),
            err @ SqliteStoreError::Schema {
                ..
            } => Self::VersionMismatch(err.to_string()),
            SqliteStoreError::Tampered(message) => Self::Corrupt(message),
            SqliteStoreError::Record(message) => Self::Invalid(message),
            SqliteStoreError::Duplicate(message) => Self::Conflict(message),
            SqliteStoreError::NoRow(message) => Self::Missing(message),
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed account and occurrence store.
///
/// # Invariants
/// - Loads verify stored hashes before deserialization.
/// - Connection access is serialized through a mutex.
#[derive(Clone)]
pub struct SqliteFieldSyncStore {
    /// Shared connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

/// Canonical payload prepared for storage.
struct EncodedRecord {
    /// Canonical JSON bytes.
    bytes: Vec<u8>,
    /// Hex hash of `bytes`.
    hash: String,
}

/// Raw payload columns read from a row.
struct StoredPayload {
    /// Canonical JSON bytes.
    bytes: Vec<u8>,
    /// Stored hash value.
    hash_value: String,
    /// Stored hash algorithm label.
    hash_algorithm: String,
}

impl SqliteFieldSyncStore {
    /// Opens (and initializes if needed) an `SQLite` store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized, or when it carries an unknown schema version.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        prepare_path(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection
            .lock()
            .map_err(|_| SqliteStoreError::Unavailable("connection mutex poisoned".to_string()))
    }

    // ------------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------------

    /// Inserts an account row.
    fn insert_account_row(&self, account: &Account) -> Result<(), SqliteStoreError> {
        let encoded = encode_record(account)?;
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO accounts (account_id, email, account_json, account_hash, \
                 hash_algorithm, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    account.id.as_str(),
                    account.email,
                    encoded.bytes,
                    encoded.hash,
                    DEFAULT_HASH_ALGORITHM.label(),
                    account.updated_at.as_unix_millis(),
                ],
            )
            .map_err(|err| map_write_error(err, "account email already registered"))?;
        drop(guard);
        Ok(())
    }

    /// Replaces an account row.
    fn update_account_row(&self, account: &Account) -> Result<(), SqliteStoreError> {
        let encoded = encode_record(account)?;
        let guard = self.lock()?;
        let changed = guard
            .execute(
                "UPDATE accounts SET email = ?2, account_json = ?3, account_hash = ?4, \
                 hash_algorithm = ?5, updated_at = ?6 WHERE account_id = ?1",
                params![
                    account.id.as_str(),
                    account.email,
                    encoded.bytes,
                    encoded.hash,
                    DEFAULT_HASH_ALGORITHM.label(),
                    account.updated_at.as_unix_millis(),
                ],
            )
            .map_err(|err| map_write_error(err, "account email already registered"))?;
        drop(guard);
        if changed == 0 {
            return Err(SqliteStoreError::NoRow(format!("account {}", account.id)));
        }
        Ok(())
    }

    /// Loads an account by a single-column key.
    fn load_account(&self, column: &str, key: &str) -> Result<Option<Account>, SqliteStoreError> {
        let sql = format!(
            "SELECT account_json, account_hash, hash_algorithm FROM accounts WHERE {column} = ?1"
        );
        let payload = {
            let guard = self.lock()?;
            guard
                .query_row(&sql, params![key], read_payload)
                .optional()?
        };
        let Some(payload) = payload else {
            return Ok(None);
        };
        let account: Account = decode_record(&payload, "account")?;
        let matches_key = match column {
            "account_id" => account.id.as_str() == key,
            _ => account.email == key,
        };
        if !matches_key {
            return Err(SqliteStoreError::Record(
                "account key mismatch between row and payload".to_string(),
            ));
        }
        Ok(Some(account))
    }

    // ------------------------------------------------------------------------
    // Occurrences
    // ------------------------------------------------------------------------

    /// Inserts an occurrence row.
    fn insert_occurrence_row(&self, occurrence: &Occurrence) -> Result<(), SqliteStoreError> {
        let encoded = encode_record(occurrence)?;
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO occurrences (occurrence_id, local_id, created_by, sync_status, \
                 created_at, occurrence_json, occurrence_hash, hash_algorithm) VALUES (?1, ?2, \
                 ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    occurrence.id.as_str(),
                    occurrence.local_id.as_ref().map(LocalId::as_str),
                    occurrence.created_by.as_str(),
                    occurrence.sync_status.as_str(),
                    occurrence.created_at.as_unix_millis(),
                    encoded.bytes,
                    encoded.hash,
                    DEFAULT_HASH_ALGORITHM.label(),
                ],
            )
            .map_err(|err| map_write_error(err, "local id already stored"))?;
        drop(guard);
        Ok(())
    }

    /// Replaces the mutable columns of an occurrence row.
    fn update_occurrence_row(&self, occurrence: &Occurrence) -> Result<(), SqliteStoreError> {
        let encoded = encode_record(occurrence)?;
        let guard = self.lock()?;
        let changed = guard
            .execute(
                "UPDATE occurrences SET sync_status = ?2, occurrence_json = ?3, \
                 occurrence_hash = ?4, hash_algorithm = ?5 WHERE occurrence_id = ?1",
                params![
                    occurrence.id.as_str(),
                    occurrence.sync_status.as_str(),
                    encoded.bytes,
                    encoded.hash,
                    DEFAULT_HASH_ALGORITHM.label(),
                ],
            )?;
        drop(guard);
        if changed == 0 {
            return Err(SqliteStoreError::NoRow(format!("occurrence {}", occurrence.id)));
        }
        Ok(())
    }

    /// Loads an occurrence by a single-column key.
    fn load_occurrence(
        &self,
        column: &str,
        key: &str,
    ) -> Result<Option<Occurrence>, SqliteStoreError> {
        let sql = format!(
            "SELECT occurrence_json, occurrence_hash, hash_algorithm FROM occurrences WHERE \
             {column} = ?1"
        );
        let payload = {
            let guard = self.lock()?;
            guard
                .query_row(&sql, params![key], read_payload)
                .optional()?
        };
        let Some(payload) = payload else {
            return Ok(None);
        };
        let occurrence: Occurrence = decode_record(&payload, "occurrence")?;
        let matches_key = match column {
            "occurrence_id" => occurrence.id.as_str() == key,
            _ => occurrence.local_id.as_ref().is_some_and(|local_id| local_id.as_str() == key),
        };
        if !matches_key {
            return Err(SqliteStoreError::Record(
                "occurrence key mismatch between row and payload".to_string(),
            ));
        }
        Ok(Some(occurrence))
    }

    /// Deletes an occurrence row.
    fn delete_occurrence_row(&self, id: &OccurrenceId) -> Result<bool, SqliteStoreError> {
        let guard = self.lock()?;
        let changed = guard
            .execute("DELETE FROM occurrences WHERE occurrence_id = ?1", params![id.as_str()])?;
        drop(guard);
        Ok(changed > 0)
    }

    /// Lists occurrences matching `query`, newest first.
    fn query_occurrence_rows(
        &self,
        query: &OccurrenceQuery,
    ) -> Result<Vec<Occurrence>, SqliteStoreError> {
        let payloads = {
            let guard = self.lock()?;
            let mut stmt = guard
                .prepare_cached(
                    "SELECT occurrence_json, occurrence_hash, hash_algorithm FROM occurrences \
                     WHERE (?1 IS NULL OR created_by = ?1) AND (?2 IS NULL OR sync_status = ?2) \
                     ORDER BY created_at DESC, seq DESC",
                )?;
            let rows = stmt
                .query_map(
                    params![
                        query.owner.as_ref().map(AccountId::as_str),
                        query.status.map(fieldsync_core::SyncStatus::as_str),
                    ],
                    read_payload,
                )?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        let mut records = Vec::with_capacity(payloads.len());
        for payload in &payloads {
            let record: Occurrence = decode_record(payload, "occurrence")?;
            if !query.matches(&record) {
                return Err(SqliteStoreError::Record(
                    "occurrence index columns disagree with payload".to_string(),
                ));
            }
            records.push(record);
        }
        Ok(records)
    }
}

// ============================================================================
// SECTION: Store Interfaces
// ============================================================================

impl AccountStore for SqliteFieldSyncStore {
    fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        self.insert_account_row(account).map_err(StoreError::from)
    }

    fn account_by_id(&self, id: &AccountId) -> Result<Option<Account>, StoreError> {
        self.load_account("account_id", id.as_str()).map_err(StoreError::from)
    }

    fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        self.load_account("email", email).map_err(StoreError::from)
    }

    fn update_account(&self, account: &Account) -> Result<(), StoreError> {
        self.update_account_row(account).map_err(StoreError::from)
    }
}

impl OccurrenceStore for SqliteFieldSyncStore {
    fn insert_occurrence(&self, occurrence: &Occurrence) -> Result<(), StoreError> {
        self.insert_occurrence_row(occurrence).map_err(StoreError::from)
    }

    fn occurrence(&self, id: &OccurrenceId) -> Result<Option<Occurrence>, StoreError> {
        self.load_occurrence("occurrence_id", id.as_str()).map_err(StoreError::from)
    }

    fn occurrence_by_local_id(
        &self,
        local_id: &LocalId,
    ) -> Result<Option<Occurrence>, StoreError> {
        self.load_occurrence("local_id", local_id.as_str()).map_err(StoreError::from)
    }

    fn update_occurrence(&self, occurrence: &Occurrence) -> Result<(), StoreError> {
        self.update_occurrence_row(occurrence).map_err(StoreError::from)
    }

    fn delete_occurrence(&self, id: &OccurrenceId) -> Result<bool, StoreError> {
        self.delete_occurrence_row(id).map_err(StoreError::from)
    }

    fn query_occurrences(&self, query: &OccurrenceQuery) -> Result<Vec<Occurrence>, StoreError> {
        self.query_occurrence_rows(query).map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Serializes a record to canonical JSON and hashes it.
fn encode_record<T: Serialize>(record: &T) -> Result<EncodedRecord, SqliteStoreError> {
    let bytes =
        canonical_json_bytes(record).map_err(|err| SqliteStoreError::Record(err.to_string()))?;
    check_record_size(bytes.len())?;
    let hash = hash_bytes(DEFAULT_HASH_ALGORITHM, &bytes).value;
    Ok(EncodedRecord {
        bytes,
        hash,
    })
}

/// Verifies a stored payload and deserializes it.
fn decode_record<T: DeserializeOwned>(
    payload: &StoredPayload,
    label: &str,
) -> Result<T, SqliteStoreError> {
    check_record_size(payload.bytes.len())?;
    let algorithm = parse_hash_algorithm(&payload.hash_algorithm)?;
    let expected = hash_bytes(algorithm, &payload.bytes);
    if expected.value != payload.hash_value {
        return Err(SqliteStoreError::Tampered(format!("hash mismatch for {label} row")));
    }
    serde_json::from_slice(&payload.bytes).map_err(|err| SqliteStoreError::Record(err.to_string()))
}

/// Rejects records over [`MAX_RECORD_BYTES`].
fn check_record_size(length: usize) -> Result<(), SqliteStoreError> {
    if length > MAX_RECORD_BYTES {
        return Err(SqliteStoreError::Record(format!(
            "record of {length} bytes exceeds {MAX_RECORD_BYTES}"
        )));
    }
    Ok(())
}

/// Reads payload columns from a row.
fn read_payload(row: &Row<'_>) -> rusqlite::Result<StoredPayload> {
    Ok(StoredPayload {
        bytes: row.get(0)?,
        hash_value: row.get(1)?,
        hash_algorithm: row.get(2)?,
    })
}

/// Parses a stored hash algorithm label.
fn parse_hash_algorithm(label: &str) -> Result<HashAlgorithm, SqliteStoreError> {
    HashAlgorithm::from_label(label)
        .ok_or_else(|| SqliteStoreError::Record(format!("unsupported hash algorithm: {label}")))
}

/// Maps an insert/update failure, surfacing unique constraint violations.
fn map_write_error(err: rusqlite::Error, conflict: &str) -> SqliteStoreError {
    match err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            SqliteStoreError::Duplicate(conflict.to_string())
        }
        other => SqliteStoreError::Sql(other),
    }
}

/// Creates the parent directory of a file-backed store; rejects empty and directory paths.
fn prepare_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Unavailable("store path is empty".to_string()));
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Unavailable(format!("{} is a directory", path.display())));
    }
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .map_err(|err| SqliteStoreError::Unavailable(err.to_string())),
        _ => Ok(()),
    }
}

/// Opens the database read-write and applies the configured pragmas.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let connection = Connection::open_with_flags(
        &config.path,
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
    )?;
    let _mode: String = connection.pragma_update_and_check(
        None,
        "journal_mode",
        config.journal_mode.as_pragma(),
        |row| row.get(0),
    )?;
    connection.pragma_update(None, "synchronous", config.synchronous.as_pragma())?;
    connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    Ok(connection)
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction()?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS accounts (
                    account_id TEXT PRIMARY KEY,
                    email TEXT NOT NULL UNIQUE,
                    account_json BLOB NOT NULL,
                    account_hash TEXT NOT NULL,
                    hash_algorithm TEXT NOT NULL,
                    updated_at INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS occurrences (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    occurrence_id TEXT NOT NULL UNIQUE,
                    local_id TEXT UNIQUE,
                    created_by TEXT NOT NULL,
                    sync_status TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    occurrence_json BLOB NOT NULL,
                    occurrence_hash TEXT NOT NULL,
                    hash_algorithm TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_occurrences_owner
                    ON occurrences (created_by, created_at);
                CREATE INDEX IF NOT EXISTS idx_occurrences_status
                    ON occurrences (sync_status, created_at);",
            )?;
        }
        Some(SCHEMA_VERSION) => {}
        Some(other) => {
            return Err(SqliteStoreError::Schema {
                found: other,
            });
        }
    }
    tx.commit()?;
    Ok(())
}
