// crates/fieldsync-config/src/lib.rs
// ============================================================================
// Module: Field Sync Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for fieldsync.toml semantics.
// Dependencies: fieldsync-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `fieldsync-config` defines the configuration model for the Field Sync
//! server and CLI. Loading is strict and fails closed: oversized, non-UTF-8,
//! or inconsistent files are rejected before any component starts.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
