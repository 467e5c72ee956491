// crates/fieldsync-server/src/audit.rs
// ============================================================================
// Module: Field Sync Audit Logging
// Description: Structured audit events for authentication, sync, and requests.
// Purpose: Emit redacted JSON-line audit logs without hard dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Audit events are plain serializable structs written as JSON lines. Events
//! never carry passwords, tokens, or occurrence payloads; they describe
//! outcomes and counts only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use fieldsync_core::RejectionReason;
use fieldsync_core::SyncReport;
use serde::Serialize;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Login attempt outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthOutcome {
    /// Credentials accepted.
    Success,
    /// Wrong password below the lock threshold.
    InvalidCredentials,
    /// Account locked (including the attempt that triggered the lock).
    Locked,
    /// Unknown email.
    UnknownAccount,
    /// Store or hasher failure.
    Error,
}

/// Authentication attempt audit event.
#[derive(Debug, Clone, Serialize)]
pub struct AuthAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Attempted login email.
    pub email: String,
    /// Attempt outcome.
    pub outcome: AuthOutcome,
    /// Remaining lock time when locked.
    pub remaining_seconds: Option<u64>,
}

impl AuthAuditEvent {
    /// Creates an authentication audit event.
    #[must_use]
    pub fn new(email: &str, outcome: AuthOutcome, remaining_seconds: Option<u64>) -> Self {
        Self {
            event: "auth_attempt",
            timestamp_ms: now_ms(),
            email: email.to_string(),
            outcome,
            remaining_seconds,
        }
    }
}

/// Batch sync audit event.
#[derive(Debug, Clone, Serialize)]
pub struct SyncAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Uploading account.
    pub subject: String,
    /// Items submitted.
    pub submitted: usize,
    /// Items accepted.
    pub accepted: usize,
    /// Items rejected as already synchronized.
    pub duplicates: usize,
    /// Items rejected for missing required fields.
    pub missing_fields: usize,
    /// Items rejected for invalid values.
    pub invalid_values: usize,
}

impl SyncAuditEvent {
    /// Summarizes a sync report for `subject`.
    #[must_use]
    pub fn from_report(subject: &str, report: &SyncReport) -> Self {
        Self {
            event: "sync_batch",
            timestamp_ms: now_ms(),
            subject: subject.to_string(),
            submitted: report.total(),
            accepted: report.accepted.len(),
            duplicates: report.rejected_with(RejectionReason::AlreadySynchronized),
            missing_fields: report.rejected_with(RejectionReason::MissingRequiredFields),
            invalid_values: report.rejected_with(RejectionReason::InvalidFieldValues),
        }
    }
}

/// HTTP request audit event.
#[derive(Debug, Clone, Serialize)]
pub struct RequestAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Route label.
    pub route: &'static str,
    /// HTTP status code.
    pub status: u16,
    /// Authenticated account when known.
    pub subject: Option<String>,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Request body size in bytes.
    pub request_bytes: usize,
}

impl RequestAuditEvent {
    /// Creates a request audit event.
    #[must_use]
    pub fn new(
        route: &'static str,
        status: u16,
        subject: Option<String>,
        error_kind: Option<&'static str>,
        request_bytes: usize,
    ) -> Self {
        Self {
            event: "request",
            timestamp_ms: now_ms(),
            route,
            status,
            subject,
            error_kind,
            request_bytes,
        }
    }
}

/// Internal failure audit event.
#[derive(Debug, Clone, Serialize)]
pub struct StoreFailureEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Operation label.
    pub operation: &'static str,
    /// Failure detail.
    pub message: String,
}

impl StoreFailureEvent {
    /// Creates a store failure event.
    #[must_use]
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            event: "store_failure",
            timestamp_ms: now_ms(),
            operation,
            message: message.into(),
        }
    }
}

/// Any audit event accepted by a sink.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AuditEvent {
    /// Authentication attempt.
    Auth(AuthAuditEvent),
    /// Batch sync summary.
    Sync(SyncAuditEvent),
    /// HTTP request.
    Request(RequestAuditEvent),
    /// Internal failure.
    StoreFailure(StoreFailureEvent),
}

impl AuditEvent {
    /// Returns the event identifier.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Auth(event) => event.event,
            Self::Sync(event) => event.event,
            Self::Request(event) => event.event,
            Self::StoreFailure(event) => event.event,
        }
    }
}

/// Returns the current wall-clock time in milliseconds.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for Field Sync events.
pub trait AuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &AuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, event: &AuditEvent) {
        let Ok(payload) = serde_json::to_string(event) else {
            return;
        };
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{payload}");
        }
    }
}

/// Audit sink that discards events.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &AuditEvent) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions and helpers are permitted."
    )]

    use super::*;

    #[test]
    fn file_sink_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = FileAuditSink::new(&path).unwrap();
        sink.record(&AuditEvent::Auth(AuthAuditEvent::new(
            "op@example.com",
            AuthOutcome::Locked,
            Some(900),
        )));
        sink.record(&AuditEvent::StoreFailure(StoreFailureEvent::new("sync", "disk full")));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> =
            content.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "auth_attempt");
        assert_eq!(lines[0]["outcome"], "locked");
        assert_eq!(lines[0]["remaining_seconds"], 900);
        assert_eq!(lines[1]["event"], "store_failure");
    }
}
