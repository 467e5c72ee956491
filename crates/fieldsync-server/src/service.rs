// crates/fieldsync-server/src/service.rs
// ============================================================================
// Module: Field Sync Service
// Description: Transport-agnostic facade over the core runtime components.
// Purpose: Wire stores, credentials, tokens, and audit into one entry point.
// Dependencies: fieldsync-config, fieldsync-core, fieldsync-store-sqlite
// ============================================================================

//! ## Overview
//! [`FieldSyncService`] is the single surface the HTTP adapter and CLI call.
//! It resolves bearer tokens into subjects, forwards operations to the core
//! runtime, and records audit events for logins, sync batches, and internal
//! failures. Every method is synchronous; async callers run it on a blocking
//! section.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;

use fieldsync_config::FieldSyncConfig;
use fieldsync_core::Account;
use fieldsync_core::AccountId;
use fieldsync_core::CoreError;
use fieldsync_core::CredentialGuard;
use fieldsync_core::InMemoryAccountStore;
use fieldsync_core::InMemoryOccurrenceStore;
use fieldsync_core::Occurrence;
use fieldsync_core::OccurrenceId;
use fieldsync_core::OccurrenceInput;
use fieldsync_core::OccurrenceLifecycle;
use fieldsync_core::OccurrencePatch;
use fieldsync_core::ProfilePatch;
use fieldsync_core::ProfileView;
use fieldsync_core::RegisterRequest;
use fieldsync_core::Role;
use fieldsync_core::SharedAccountStore;
use fieldsync_core::SharedClock;
use fieldsync_core::SharedOccurrenceStore;
use fieldsync_core::SharedPasswordHasher;
use fieldsync_core::Subject;
use fieldsync_core::SyncItem;
use fieldsync_core::SyncReconciler;
use fieldsync_core::SyncReport;
use fieldsync_core::SystemClock;
use fieldsync_core::Timestamp;
use fieldsync_store_sqlite::SqliteFieldSyncStore;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::audit::AuditEvent;
use crate::audit::AuditSink;
use crate::audit::AuthAuditEvent;
use crate::audit::AuthOutcome;
use crate::audit::FileAuditSink;
use crate::audit::NoopAuditSink;
use crate::audit::StderrAuditSink;
use crate::audit::StoreFailureEvent;
use crate::audit::SyncAuditEvent;
use crate::hasher::Argon2PasswordHasher;
use crate::token::TokenAuthority;
use crate::token::parse_bearer_token;

// ============================================================================
// SECTION: Responses
// ============================================================================

/// Successful login payload.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    /// Bearer token for subsequent requests.
    pub token: String,
    /// Token scheme.
    pub token_type: &'static str,
    /// Token expiry instant.
    pub expires_at: Timestamp,
    /// Account role.
    pub role: Role,
    /// Account profile.
    pub user: ProfileView,
}

/// Logout acknowledgement.
#[derive(Debug, Clone, Serialize)]
pub struct LogoutResponse {
    /// Acknowledgement message.
    pub message: &'static str,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Server startup and transport errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration is invalid.
    #[error("server config error: {0}")]
    Config(String),
    /// A component failed to initialize.
    #[error("server init error: {0}")]
    Init(String),
    /// Listener or transport failure.
    #[error("server transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Components required to assemble a [`FieldSyncService`].
pub struct ServiceComponents {
    /// Account storage.
    pub accounts: SharedAccountStore,
    /// Occurrence storage.
    pub occurrences: SharedOccurrenceStore,
    /// Password hashing backend.
    pub hasher: SharedPasswordHasher,
    /// Wall clock.
    pub clock: SharedClock,
    /// Bearer token authority.
    pub tokens: TokenAuthority,
    /// Audit sink.
    pub audit: Arc<dyn AuditSink>,
    /// Whether anonymous callers may register operator accounts.
    pub allow_self_registration: bool,
}

/// Transport-agnostic Field Sync facade.
#[derive(Clone)]
pub struct FieldSyncService {
    /// Credential checks and account management.
    guard: CredentialGuard,
    /// Occurrence lifecycle operations.
    lifecycle: OccurrenceLifecycle,
    /// Batch upload reconciliation.
    reconciler: SyncReconciler,
    /// Bearer token authority.
    tokens: TokenAuthority,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
}

impl FieldSyncService {
    /// Assembles a service from explicit components.
    #[must_use]
    pub fn new(components: ServiceComponents) -> Self {
        let guard = CredentialGuard::new(
            components.accounts,
            components.hasher,
            Arc::clone(&components.clock),
        )
        .with_self_registration(components.allow_self_registration);
        let lifecycle = OccurrenceLifecycle::new(components.occurrences, components.clock);
        let reconciler = SyncReconciler::new(lifecycle.clone());
        Self {
            guard,
            lifecycle,
            reconciler,
            tokens: components.tokens,
            audit: components.audit,
        }
    }

    /// Builds a service from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when validation fails or a component cannot be
    /// opened.
    pub fn from_config(config: &FieldSyncConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let (accounts, occurrences) = open_stores(config)?;
        let tokens = match config
            .auth
            .signing_seed()
            .map_err(|err| ServerError::Config(err.to_string()))?
        {
            Some(seed) => TokenAuthority::from_seed(&seed),
            None => TokenAuthority::ephemeral(),
        };
        Ok(Self::new(ServiceComponents {
            accounts,
            occurrences,
            hasher: Arc::new(Argon2PasswordHasher::new()),
            clock: Arc::new(SystemClock),
            tokens,
            audit: open_audit_sink(config)?,
            allow_self_registration: config.auth.allow_self_registration,
        }))
    }

    // ------------------------------------------------------------------------
    // Sessions and accounts
    // ------------------------------------------------------------------------

    /// Authenticates credentials and issues a bearer token.
    ///
    /// # Errors
    ///
    /// Returns the [`CredentialGuard::authenticate`] errors, or
    /// [`CoreError::Internal`] when the token cannot be issued.
    pub fn login(&self, email: &str, password: &str) -> Result<LoginResponse, CoreError> {
        let result = self.guard.authenticate(email, password);
        let (outcome, remaining) = match &result {
            Ok(_) => (AuthOutcome::Success, None),
            Err(CoreError::InvalidCredentials) => (AuthOutcome::InvalidCredentials, None),
            Err(CoreError::Locked {
                remaining_seconds,
            }) => (AuthOutcome::Locked, Some(*remaining_seconds)),
            Err(CoreError::NotFound) => (AuthOutcome::UnknownAccount, None),
            Err(_) => (AuthOutcome::Error, None),
        };
        self.audit.record(&AuditEvent::Auth(AuthAuditEvent::new(email.trim(), outcome, remaining)));
        let subject = self.observe("login", result)?;
        let user = self.observe("login", self.guard.profile(&subject))?;
        let issued = self
            .tokens
            .issue(&subject, &user.email, self.guard.now())
            .map_err(|err| CoreError::Internal(err.to_string()))?;
        Ok(LoginResponse {
            token: issued.token,
            token_type: "Bearer",
            expires_at: issued.expires_at,
            role: subject.role,
            user,
        })
    }

    /// Acknowledges a logout; tokens are stateless and simply expire.
    #[must_use]
    pub const fn logout(&self, _subject: &Subject) -> LogoutResponse {
        LogoutResponse {
            message: "logged out",
        }
    }

    /// Resolves an `Authorization` header value into a subject.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Unauthenticated`] for missing, malformed, forged,
    /// or expired tokens.
    pub fn authenticate_header(&self, header: Option<&str>) -> Result<Subject, CoreError> {
        let token = parse_bearer_token(header).map_err(|_| CoreError::Unauthenticated)?;
        let claims = self
            .tokens
            .verify(token, self.guard.now())
            .map_err(|_| CoreError::Unauthenticated)?;
        Ok(claims.subject())
    }

    /// Registers an account on behalf of `actor` (anonymous when `None`).
    ///
    /// # Errors
    ///
    /// Returns the [`CredentialGuard::register`] errors.
    pub fn register(
        &self,
        actor: Option<&Subject>,
        request: RegisterRequest,
    ) -> Result<ProfileView, CoreError> {
        self.observe("register", self.guard.register(actor, request)).map(|account| account.view())
    }

    /// Registers an account without an actor check, for operator bootstrap.
    ///
    /// # Errors
    ///
    /// Returns the [`CredentialGuard::register`] errors other than
    /// [`CoreError::Forbidden`].
    pub fn bootstrap_account(&self, request: RegisterRequest) -> Result<Account, CoreError> {
        let bootstrap = Subject::new(AccountId::new("bootstrap"), Role::Admin);
        self.observe("bootstrap_account", self.guard.register(Some(&bootstrap), request))
    }

    /// Returns the caller's profile.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] when the account no longer exists.
    pub fn profile(&self, subject: &Subject) -> Result<ProfileView, CoreError> {
        self.observe("profile", self.guard.profile(subject))
    }

    /// Applies a partial update to the caller's profile.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] when the account no longer exists.
    pub fn update_profile(
        &self,
        subject: &Subject,
        patch: &ProfilePatch,
    ) -> Result<ProfileView, CoreError> {
        self.observe("update_profile", self.guard.update_profile(subject, patch))
    }

    // ------------------------------------------------------------------------
    // Occurrences
    // ------------------------------------------------------------------------

    /// Creates a synchronized occurrence owned by `subject`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for missing or malformed fields.
    pub fn create_occurrence(
        &self,
        subject: &Subject,
        input: OccurrenceInput,
    ) -> Result<Occurrence, CoreError> {
        self.observe("create_occurrence", self.lifecycle.create(subject, input))
    }

    /// Reconciles a batch of raw uploaded entries.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Internal`] when storage fails mid-batch.
    pub fn sync(&self, subject: &Subject, entries: Vec<Value>) -> Result<SyncReport, CoreError> {
        let items = entries.into_iter().map(SyncItem::from_json).collect();
        let report = self.observe("sync", self.reconciler.sync_batch(subject, items))?;
        self.audit.record(&AuditEvent::Sync(SyncAuditEvent::from_report(subject.id.as_str(), &report)));
        Ok(report)
    }

    /// Lists occurrences visible to `subject`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Internal`] on store failure.
    pub fn list(&self, subject: &Subject) -> Result<Vec<Occurrence>, CoreError> {
        self.observe("list", self.lifecycle.list(subject))
    }

    /// Lists pending occurrences visible to `subject`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Internal`] on store failure.
    pub fn list_pending(&self, subject: &Subject) -> Result<Vec<Occurrence>, CoreError> {
        self.observe("list_pending", self.lifecycle.list_pending(subject))
    }

    /// Loads one occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] or [`CoreError::Forbidden`].
    pub fn get(&self, subject: &Subject, id: &OccurrenceId) -> Result<Occurrence, CoreError> {
        self.observe("get", self.lifecycle.get(subject, id))
    }

    /// Edits a pending occurrence.
    ///
    /// # Errors
    ///
    /// Returns the [`OccurrenceLifecycle::edit_pending`] errors.
    pub fn edit(
        &self,
        subject: &Subject,
        id: &OccurrenceId,
        patch: OccurrencePatch,
    ) -> Result<Occurrence, CoreError> {
        self.observe("edit", self.lifecycle.edit_pending(subject, id, patch))
    }

    /// Reopens a synchronized occurrence for editing.
    ///
    /// # Errors
    ///
    /// Returns the [`OccurrenceLifecycle::reopen`] errors.
    pub fn reopen(&self, subject: &Subject, id: &OccurrenceId) -> Result<Occurrence, CoreError> {
        self.observe("reopen", self.lifecycle.reopen(subject, id))
    }

    /// Deletes an occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] or [`CoreError::Forbidden`].
    pub fn delete(&self, subject: &Subject, id: &OccurrenceId) -> Result<(), CoreError> {
        self.observe("delete", self.lifecycle.delete(subject, id))
    }

    /// Forwards an event to the configured audit sink.
    pub fn record_audit(&self, event: &AuditEvent) {
        self.audit.record(event);
    }

    /// Records a `store_failure` event for internal errors and passes the
    /// result through.
    fn observe<T>(&self, operation: &'static str, result: Result<T, CoreError>) -> Result<T, CoreError> {
        if let Err(err) = &result
            && let Some(detail) = err.internal_detail()
        {
            self.audit.record(&AuditEvent::StoreFailure(StoreFailureEvent::new(operation, detail)));
        }
        result
    }
}

// ============================================================================
// SECTION: Wiring Helpers
// ============================================================================

/// Opens the configured account and occurrence stores.
fn open_stores(
    config: &FieldSyncConfig,
) -> Result<(SharedAccountStore, SharedOccurrenceStore), ServerError> {
    match config.store.sqlite() {
        Some(sqlite) => {
            let store = SqliteFieldSyncStore::new(&sqlite)
                .map_err(|err| ServerError::Init(err.to_string()))?;
            Ok((
                SharedAccountStore::from_store(store.clone()),
                SharedOccurrenceStore::from_store(store),
            ))
        }
        None => Ok((
            SharedAccountStore::from_store(InMemoryAccountStore::new()),
            SharedOccurrenceStore::from_store(InMemoryOccurrenceStore::new()),
        )),
    }
}

/// Opens the configured audit sink.
fn open_audit_sink(config: &FieldSyncConfig) -> Result<Arc<dyn AuditSink>, ServerError> {
    if !config.audit.enabled {
        return Ok(Arc::new(NoopAuditSink));
    }
    match &config.audit.path {
        Some(path) => {
            let sink = FileAuditSink::new(Path::new(path.trim()))
                .map_err(|err| ServerError::Init(format!("audit log: {err}")))?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(StderrAuditSink)),
    }
}
