// crates/fieldsync-server/src/lib.rs
// ============================================================================
// Module: Field Sync Server Library
// Description: Service facade, credential primitives, audit, and HTTP adapter.
// Purpose: Expose Field Sync over HTTP with signed bearer tokens.
// Dependencies: fieldsync-core, fieldsync-config, fieldsync-store-sqlite, axum
// ============================================================================

//! ## Overview
//! `fieldsync-server` assembles the core runtime into a deployable service:
//! Argon2id password hashing, Ed25519-signed bearer tokens, JSON-line audit
//! sinks, and an axum HTTP adapter. Callers that do not need HTTP can drive
//! [`FieldSyncService`] directly.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod hasher;
pub mod http;
pub mod service;
pub mod token;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditEvent;
pub use audit::AuditSink;
pub use audit::AuthAuditEvent;
pub use audit::AuthOutcome;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::RequestAuditEvent;
pub use audit::StderrAuditSink;
pub use audit::StoreFailureEvent;
pub use audit::SyncAuditEvent;
pub use hasher::Argon2PasswordHasher;
pub use http::router;
pub use http::serve;
pub use http::serve_listener;
pub use service::FieldSyncService;
pub use service::LoginResponse;
pub use service::LogoutResponse;
pub use service::ServerError;
pub use service::ServiceComponents;
pub use token::IssuedToken;
pub use token::TOKEN_TTL_MILLIS;
pub use token::TokenAuthority;
pub use token::TokenClaims;
pub use token::TokenError;
pub use token::parse_bearer_token;
