// crates/fieldsync-store-sqlite/src/lib.rs
// ============================================================================
// Module: Field Sync SQLite Store
// Description: Durable account and occurrence stores using SQLite.
// Purpose: Provide production persistence for Field Sync records.
// Dependencies: fieldsync-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed implementation of both
//! [`fieldsync_core::AccountStore`] and [`fieldsync_core::OccurrenceStore`].
//! Rows hold canonical JSON plus a content hash that is verified on every
//! load. Email and local id uniqueness are enforced by `UNIQUE` columns.
//! Security posture: database contents are untrusted and fail closed on
//! tampering.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::MAX_RECORD_BYTES;
pub use store::SqliteFieldSyncStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteJournalMode;
pub use store::SqliteSynchronous;
