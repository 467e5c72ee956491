// crates/fieldsync-server/src/http.rs
// ============================================================================
// Module: HTTP Adapter
// Description: axum routes exposing the Field Sync service as JSON over HTTP.
// Purpose: Map requests to service calls and core errors to status codes.
// Dependencies: axum, fieldsync-core, serde_json, tokio
// ============================================================================

//! ## Overview
//! Every route reads the raw body under `server.max_body_bytes`, decodes
//! JSON, and runs the synchronous service call inside
//! [`tokio::task::block_in_place`]. Body rejections, including oversized
//! bodies, are mapped into the same error path as service failures. Errors
//! map to a stable envelope `{"error":{"kind":..,"message":..}}`; internal
//! details never reach clients. Each request emits a `request` audit event.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::extract::Path;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use fieldsync_config::FieldSyncConfig;
use fieldsync_core::AccessPolicy;
use fieldsync_core::CoreError;
use fieldsync_core::OccurrenceId;
use fieldsync_core::OccurrenceInput;
use fieldsync_core::OccurrencePatch;
use fieldsync_core::ProfilePatch;
use fieldsync_core::ProfileView;
use fieldsync_core::RegisterRequest;
use fieldsync_core::Role;
use fieldsync_core::Subject;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::block_in_place;

use crate::audit::AuditEvent;
use crate::audit::RequestAuditEvent;
use crate::service::FieldSyncService;
use crate::service::LoginResponse;
use crate::service::ServerError;

// ============================================================================
// SECTION: Request Bodies
// ============================================================================

/// Request body as read by axum, or the reason it could not be read.
type RawBody = Result<Bytes, BytesRejection>;

/// Login request body.
#[derive(Deserialize)]
struct LoginRequest {
    /// Login email.
    #[serde(default)]
    email: String,
    /// Plaintext password.
    #[serde(default)]
    password: String,
}

/// Batch upload request body.
#[derive(Deserialize)]
struct SyncRequest {
    /// Raw occurrence entries; each is decoded independently.
    occurrences: Vec<Value>,
}

/// Plain acknowledgement body.
#[derive(Serialize)]
struct Acknowledgement {
    /// Acknowledgement message.
    message: &'static str,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Request failure before or during a service call.
#[derive(Debug)]
enum ApiError {
    /// Core runtime error.
    Core(CoreError),
    /// Body exceeds the configured limit.
    PayloadTooLarge,
    /// Body is not the expected JSON shape.
    BadRequest(&'static str),
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self::Core(err)
    }
}

impl ApiError {
    /// Returns the HTTP status for the error.
    const fn status(&self) -> StatusCode {
        match self {
            Self::Core(err) => status_for(err),
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Returns the stable error kind label.
    const fn kind(&self) -> &'static str {
        match self {
            Self::Core(err) => err.kind(),
            Self::PayloadTooLarge => "payload_too_large",
            Self::BadRequest(_) => "bad_request",
        }
    }

    /// Builds the JSON error envelope.
    fn body(&self) -> Value {
        let message = match self {
            Self::Core(err) => err.to_string(),
            Self::PayloadTooLarge => "request body exceeds size limit".to_string(),
            Self::BadRequest(message) => (*message).to_string(),
        };
        let mut error = json!({ "kind": self.kind(), "message": message });
        if let Self::Core(CoreError::Locked {
            remaining_seconds,
        }) = self
        {
            error["remaining_seconds"] = json!(remaining_seconds);
        }
        json!({ "error": error })
    }
}

/// Maps a core error to its HTTP status.
const fn status_for(err: &CoreError) -> StatusCode {
    match err {
        CoreError::NotFound => StatusCode::NOT_FOUND,
        CoreError::Forbidden => StatusCode::FORBIDDEN,
        CoreError::Unauthenticated | CoreError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        CoreError::Validation(_) => StatusCode::BAD_REQUEST,
        CoreError::State(_) | CoreError::Conflict(_) => StatusCode::CONFLICT,
        CoreError::Locked {
            ..
        } => StatusCode::LOCKED,
        CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Shared server state for HTTP handlers.
#[derive(Clone)]
struct ServerState {
    /// Service facade.
    service: FieldSyncService,
}

/// Builds the HTTP router for `service`.
#[must_use]
pub fn router(service: FieldSyncService, max_body_bytes: usize) -> Router {
    let state = Arc::new(ServerState {
        service,
    });
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/register", post(register))
        .route("/auth/profile", get(profile).put(update_profile))
        .route("/auth/admin-only", get(admin_only))
        .route("/occurrences", post(create_occurrence).get(list_occurrences))
        .route("/occurrences/sync", post(sync_occurrences))
        .route("/occurrences/pending", get(list_pending))
        .route(
            "/occurrences/{id}",
            get(get_occurrence).patch(edit_occurrence).delete(delete_occurrence),
        )
        .route("/occurrences/{id}/reopen", post(reopen_occurrence))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

/// Serves the HTTP adapter for `config` until interrupted.
///
/// # Errors
///
/// Returns [`ServerError`] when initialization, bind, or serving fails.
pub async fn serve(config: FieldSyncConfig) -> Result<(), ServerError> {
    let service = FieldSyncService::from_config(&config)?;
    let addr = config.server.socket_addr().map_err(|err| ServerError::Config(err.to_string()))?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|_| ServerError::Transport("http bind failed".to_string()))?;
    serve_listener(listener, router(service, config.server.max_body_bytes)).await
}

/// Serves `app` on an already-bound listener until interrupted.
///
/// # Errors
///
/// Returns [`ServerError::Transport`] when serving fails.
pub async fn serve_listener(listener: TcpListener, app: Router) -> Result<(), ServerError> {
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .map_err(|_| ServerError::Transport("http server failed".to_string()))
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Liveness check.
async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// `POST /auth/login`.
async fn login(State(state): State<Arc<ServerState>>, body: RawBody) -> Response {
    let request_bytes = body_len(&body);
    let result = block_in_place(|| -> Result<LoginResponse, ApiError> {
        let request: LoginRequest = decode_body(body)?;
        if request.email.trim().is_empty() || request.password.is_empty() {
            return Err(CoreError::Validation("email and password are required".to_string()).into());
        }
        Ok(state.service.login(&request.email, &request.password)?)
    });
    finish(&state, "auth.login", None, request_bytes, StatusCode::OK, result)
}

/// `POST /auth/logout`.
async fn logout(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    let (subject, result) =
        with_subject(&state, &headers, |subject| Ok(state.service.logout(subject)));
    finish(&state, "auth.logout", subject, 0, StatusCode::OK, result)
}

/// `POST /auth/register`; anonymous unless a bearer token is supplied.
async fn register(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: RawBody,
) -> Response {
    let request_bytes = body_len(&body);
    let register_with = |actor: Option<&Subject>| -> Result<ProfileView, ApiError> {
        let request: RegisterRequest = decode_body(body)?;
        Ok(block_in_place(|| state.service.register(actor, request))?)
    };
    let (subject, result) = if auth_header(&headers).is_some() {
        with_subject(&state, &headers, |subject| register_with(Some(subject)))
    } else {
        (None, register_with(None))
    };
    finish(&state, "auth.register", subject, request_bytes, StatusCode::CREATED, result)
}

/// `GET /auth/profile`.
async fn profile(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    let (subject, result) = with_subject(&state, &headers, |subject| {
        Ok(block_in_place(|| state.service.profile(subject))?)
    });
    finish(&state, "auth.profile", subject, 0, StatusCode::OK, result)
}

/// `GET /auth/admin-only`; succeeds for administrators only.
async fn admin_only(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    let (subject, result) = with_subject(&state, &headers, |subject| {
        AccessPolicy::require_role(subject, &[Role::Admin])?;
        Ok(Acknowledgement {
            message: "admin access granted",
        })
    });
    finish(&state, "auth.admin_only", subject, 0, StatusCode::OK, result)
}

/// `PUT /auth/profile`.
async fn update_profile(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: RawBody,
) -> Response {
    let request_bytes = body_len(&body);
    let (subject, result) = with_subject(&state, &headers, |subject| {
        let patch: ProfilePatch = decode_body(body)?;
        Ok(block_in_place(|| state.service.update_profile(subject, &patch))?)
    });
    finish(&state, "auth.profile.update", subject, request_bytes, StatusCode::OK, result)
}

/// `POST /occurrences`.
async fn create_occurrence(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: RawBody,
) -> Response {
    let request_bytes = body_len(&body);
    let (subject, result) = with_subject(&state, &headers, |subject| {
        let input: OccurrenceInput = decode_occurrence(body)?;
        Ok(block_in_place(|| state.service.create_occurrence(subject, input))?)
    });
    finish(&state, "occurrences.create", subject, request_bytes, StatusCode::CREATED, result)
}

/// `POST /occurrences/sync`.
async fn sync_occurrences(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: RawBody,
) -> Response {
    let request_bytes = body_len(&body);
    let (subject, result) = with_subject(&state, &headers, |subject| {
        let request: SyncRequest =
            decode_with(body, || ApiError::BadRequest("body must carry an occurrences array"))?;
        Ok(block_in_place(|| state.service.sync(subject, request.occurrences))?)
    });
    finish(&state, "occurrences.sync", subject, request_bytes, StatusCode::OK, result)
}

/// `GET /occurrences`.
async fn list_occurrences(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    let (subject, result) = with_subject(&state, &headers, |subject| {
        Ok(block_in_place(|| state.service.list(subject))?)
    });
    finish(&state, "occurrences.list", subject, 0, StatusCode::OK, result)
}

/// `GET /occurrences/pending`.
async fn list_pending(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    let (subject, result) = with_subject(&state, &headers, |subject| {
        Ok(block_in_place(|| state.service.list_pending(subject))?)
    });
    finish(&state, "occurrences.pending", subject, 0, StatusCode::OK, result)
}

/// `GET /occurrences/{id}`.
async fn get_occurrence(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let id = OccurrenceId::new(id);
    let (subject, result) = with_subject(&state, &headers, |subject| {
        Ok(block_in_place(|| state.service.get(subject, &id))?)
    });
    finish(&state, "occurrences.get", subject, 0, StatusCode::OK, result)
}

/// `PATCH /occurrences/{id}`.
async fn edit_occurrence(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: RawBody,
) -> Response {
    let request_bytes = body_len(&body);
    let id = OccurrenceId::new(id);
    let (subject, result) = with_subject(&state, &headers, |subject| {
        let patch: OccurrencePatch = decode_occurrence(body)?;
        Ok(block_in_place(|| state.service.edit(subject, &id, patch))?)
    });
    finish(&state, "occurrences.edit", subject, request_bytes, StatusCode::OK, result)
}

/// `DELETE /occurrences/{id}`.
async fn delete_occurrence(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let id = OccurrenceId::new(id);
    let (subject, result) = with_subject(&state, &headers, |subject| {
        block_in_place(|| state.service.delete(subject, &id))?;
        Ok(Acknowledgement {
            message: "occurrence deleted",
        })
    });
    finish(&state, "occurrences.delete", subject, 0, StatusCode::OK, result)
}

/// `POST /occurrences/{id}/reopen`.
async fn reopen_occurrence(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let id = OccurrenceId::new(id);
    let (subject, result) = with_subject(&state, &headers, |subject| {
        Ok(block_in_place(|| state.service.reopen(subject, &id))?)
    });
    finish(&state, "occurrences.reopen", subject, 0, StatusCode::OK, result)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the raw `Authorization` header value.
fn auth_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok())
}

/// Resolves the caller and runs `call`; returns the subject label for audit.
fn with_subject<T>(
    state: &ServerState,
    headers: &HeaderMap,
    call: impl FnOnce(&Subject) -> Result<T, ApiError>,
) -> (Option<String>, Result<T, ApiError>) {
    match state.service.authenticate_header(auth_header(headers)) {
        Ok(subject) => {
            let result = call(&subject);
            (Some(subject.id.to_string()), result)
        }
        Err(err) => (None, Err(err.into())),
    }
}

/// Returns the size of a body that was read, or zero for a rejected one.
fn body_len(body: &RawBody) -> usize {
    body.as_ref().map_or(0, Bytes::len)
}

/// Maps an axum body rejection; the size limit surfaces as `PayloadTooLarge`.
fn read_body(body: RawBody) -> Result<Bytes, ApiError> {
    body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::BadRequest("unreadable request body")
        }
    })
}

/// Reads and decodes a JSON body; `on_invalid` builds the decode error.
fn decode_with<T: DeserializeOwned>(
    body: RawBody,
    on_invalid: impl FnOnce() -> ApiError,
) -> Result<T, ApiError> {
    let bytes = read_body(body)?;
    serde_json::from_slice(&bytes).map_err(|_| on_invalid())
}

/// Decodes a JSON body.
fn decode_body<T: DeserializeOwned>(body: RawBody) -> Result<T, ApiError> {
    decode_with(body, || ApiError::BadRequest("invalid json body"))
}

/// Decodes an occurrence payload; shape errors are field validation errors.
fn decode_occurrence<T: DeserializeOwned>(body: RawBody) -> Result<T, ApiError> {
    decode_with(body, || CoreError::Validation("invalid field values".to_string()).into())
}

/// Serializes the outcome, records the request audit event, and responds.
fn finish<T: Serialize>(
    state: &ServerState,
    route: &'static str,
    subject: Option<String>,
    request_bytes: usize,
    success: StatusCode,
    result: Result<T, ApiError>,
) -> Response {
    let (status, body, error_kind) = match result.and_then(|value| {
        serde_json::to_value(value)
            .map_err(|err| ApiError::Core(CoreError::Internal(err.to_string())))
    }) {
        Ok(body) => (success, body, None),
        Err(err) => (err.status(), err.body(), Some(err.kind())),
    };
    state.service.record_audit(&AuditEvent::Request(RequestAuditEvent::new(
        route,
        status.as_u16(),
        subject,
        error_kind,
        request_bytes,
    )));
    (status, Json(body)).into_response()
}
