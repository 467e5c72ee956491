// crates/fieldsync-server/tests/http_api.rs
// ============================================================================
// Module: HTTP Adapter Tests
// Description: End-to-end route behavior over a loopback listener.
// Purpose: Validate status mapping, auth enforcement, and body limits.
// Dependencies: fieldsync-server, fieldsync-core, reqwest, tokio
// ============================================================================

//! ## Overview
//! Starts the axum router on an ephemeral loopback port and exercises the
//! session, profile, and occurrence routes with a real HTTP client.

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

use std::sync::Arc;
use std::sync::Mutex;

use fieldsync_core::InMemoryAccountStore;
use fieldsync_core::InMemoryOccurrenceStore;
use fieldsync_core::RegisterRequest;
use fieldsync_core::Role;
use fieldsync_core::SharedAccountStore;
use fieldsync_core::SharedOccurrenceStore;
use fieldsync_core::SystemClock;
use fieldsync_server::Argon2PasswordHasher;
use fieldsync_server::AuditEvent;
use fieldsync_server::AuditSink;
use fieldsync_server::FieldSyncService;
use fieldsync_server::ServiceComponents;
use fieldsync_server::TokenAuthority;
use fieldsync_server::router;
use reqwest::Client;
use serde_json::Value;
use serde_json::json;
use tokio::net::TcpListener;

const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<Value>>,
}

impl RecordingSink {
    fn requests(&self, route: &str) -> Vec<Value> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event["event"] == "request" && event["route"] == route)
            .cloned()
            .collect()
    }
}

impl AuditSink for RecordingSink {
    fn record(&self, event: &AuditEvent) {
        self.events.lock().unwrap().push(serde_json::to_value(event).unwrap());
    }
}

struct TestServer {
    base: String,
    client: Client,
    service: FieldSyncService,
    audit: Arc<RecordingSink>,
}

impl TestServer {
    async fn start(allow_self_registration: bool) -> Self {
        let audit = Arc::new(RecordingSink::default());
        let service = FieldSyncService::new(ServiceComponents {
            accounts: SharedAccountStore::from_store(InMemoryAccountStore::new()),
            occurrences: SharedOccurrenceStore::from_store(InMemoryOccurrenceStore::new()),
            hasher: Arc::new(Argon2PasswordHasher::new()),
            clock: Arc::new(SystemClock),
            tokens: TokenAuthority::from_seed(&[9u8; 32]),
            audit: Arc::clone(&audit) as Arc<dyn AuditSink>,
            allow_self_registration,
        });
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(service.clone(), MAX_BODY_BYTES);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            base: format!("http://{addr}"),
            client: Client::new(),
            service,
            audit,
        }
    }

    fn account(&self, email: &str, role: Role) {
        self.service
            .bootstrap_account(RegisterRequest {
                email: email.to_string(),
                password: "secret".to_string(),
                role: Some(role),
                ..RegisterRequest::default()
            })
            .unwrap();
    }

    async fn login(&self, email: &str) -> String {
        let (status, body) =
            self.send("POST", "/auth/login", None, Some(json!({"email": email, "password": "secret"}))).await;
        assert_eq!(status, 200, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    async fn send(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (u16, Value) {
        let url = format!("{}{path}", self.base);
        let mut request = match method {
            "GET" => self.client.get(url),
            "POST" => self.client.post(url),
            "PUT" => self.client.put(url),
            "PATCH" => self.client.patch(url),
            "DELETE" => self.client.delete(url),
            other => panic!("unsupported method {other}"),
        };
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.unwrap();
        let status = response.status().as_u16();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }
}

fn occurrence(local_id: Option<&str>) -> Value {
    let mut payload = json!({
        "type": "fire",
        "occurred_at": "2024-06-01T12:00:00Z",
        "unit": "Engine 4",
        "team": "Bravo",
        "description": "vehicle fire",
        "photos": ["aGVsbG8="],
        "location": {"latitude": -23.5, "longitude": -46.6, "accuracy": 5.0}
    });
    if let Some(local_id) = local_id {
        payload["local_id"] = json!(local_id);
    }
    payload
}

#[tokio::test(flavor = "multi_thread")]
async fn health_routes_respond() {
    let server = TestServer::start(false).await;
    assert_eq!(server.send("GET", "/", None, None).await.0, 200);
    let (status, body) = server.send("GET", "/health", None, None).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
}

#[tokio::test(flavor = "multi_thread")]
async fn session_and_profile_round() {
    let server = TestServer::start(false).await;
    server.account("op@example.com", Role::Operator);

    let (status, body) = server
        .send("POST", "/auth/login", None, Some(json!({"email": "op@example.com", "password": "secret"})))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["role"], "operator");
    assert_eq!(body["user"]["email"], "op@example.com");
    assert!(body["user"].get("password_digest").is_none());
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = server
        .send("PUT", "/auth/profile", Some(&token), Some(json!({"first_name": "Rita", "phone": "555"})))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["first_name"], "Rita");

    let (status, body) = server.send("GET", "/auth/profile", Some(&token), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["phone"], "555");

    let (status, body) = server.send("POST", "/auth/logout", Some(&token), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "logged out");

    assert_eq!(server.send("GET", "/auth/profile", None, None).await.0, 401);
    assert_eq!(server.send("GET", "/auth/profile", Some("forged.token"), None).await.0, 401);
}

#[tokio::test(flavor = "multi_thread")]
async fn login_failures_map_to_statuses() {
    let server = TestServer::start(false).await;
    server.account("op@example.com", Role::Operator);
    let bad = json!({"email": "op@example.com", "password": "wrong"});

    for _ in 0..4 {
        let (status, body) = server.send("POST", "/auth/login", None, Some(bad.clone())).await;
        assert_eq!(status, 401);
        assert_eq!(body["error"]["kind"], "invalid_credentials");
    }
    let (status, body) = server.send("POST", "/auth/login", None, Some(bad)).await;
    assert_eq!(status, 423);
    assert_eq!(body["error"]["kind"], "locked");
    assert!(body["error"]["remaining_seconds"].as_u64().unwrap() <= 900);

    let unknown = json!({"email": "nobody@example.com", "password": "x"});
    assert_eq!(server.send("POST", "/auth/login", None, Some(unknown)).await.0, 404);
    let blank = json!({"email": " ", "password": ""});
    assert_eq!(server.send("POST", "/auth/login", None, Some(blank)).await.0, 400);
}

#[tokio::test(flavor = "multi_thread")]
async fn registration_requires_admin_or_open_signup() {
    let server = TestServer::start(false).await;
    server.account("admin@example.com", Role::Admin);
    server.account("op@example.com", Role::Operator);
    let request = json!({"email": "new@example.com", "password": "pw", "role": "supervisor"});

    assert_eq!(server.send("POST", "/auth/register", None, Some(request.clone())).await.0, 403);
    let operator = server.login("op@example.com").await;
    assert_eq!(
        server.send("POST", "/auth/register", Some(&operator), Some(request.clone())).await.0,
        403
    );

    let admin = server.login("admin@example.com").await;
    let (status, body) = server.send("POST", "/auth/register", Some(&admin), Some(request.clone())).await;
    assert_eq!(status, 201);
    assert_eq!(body["role"], "supervisor");
    let (status, body) = server.send("POST", "/auth/register", Some(&admin), Some(request)).await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["kind"], "conflict");
}

#[tokio::test(flavor = "multi_thread")]
async fn occurrence_lifecycle_over_http() {
    let server = TestServer::start(true).await;
    server.account("a@example.com", Role::Operator);
    server.account("b@example.com", Role::Operator);
    server.account("sup@example.com", Role::Supervisor);
    let a = server.login("a@example.com").await;
    let b = server.login("b@example.com").await;
    let sup = server.login("sup@example.com").await;

    let (status, created) = server.send("POST", "/occurrences", Some(&a), Some(occurrence(Some("web-1")))).await;
    assert_eq!(status, 201);
    assert_eq!(created["sync_status"], "synchronized");
    assert_eq!(created["local_id"], "web-1");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, body) = server.send("POST", "/occurrences", Some(&b), Some(occurrence(Some("web-1")))).await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["kind"], "conflict");
    let batch = json!({"occurrences": [occurrence(Some("web-1"))]});
    let (status, report) = server.send("POST", "/occurrences/sync", Some(&b), Some(batch)).await;
    assert_eq!(status, 200);
    assert_eq!(report["rejected"][0]["reason"], "already synchronized");
    let path = format!("/occurrences/{id}");

    assert_eq!(server.send("GET", &path, Some(&b), None).await.0, 403);
    assert_eq!(server.send("GET", &path, Some(&sup), None).await.0, 200);
    assert_eq!(server.send("GET", "/occurrences/missing", Some(&a), None).await.0, 404);

    let edit = json!({"description": "contained"});
    let (status, body) = server.send("PATCH", &path, Some(&a), Some(edit.clone())).await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["kind"], "state");

    assert_eq!(server.send("POST", &format!("{path}/reopen"), Some(&b), None).await.0, 403);
    let (status, reopened) = server.send("POST", &format!("{path}/reopen"), Some(&a), None).await;
    assert_eq!(status, 200);
    assert_eq!(reopened["sync_status"], "pending");

    let (status, pending) = server.send("GET", "/occurrences/pending", Some(&sup), None).await;
    assert_eq!(status, 200);
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let (status, edited) = server.send("PATCH", &path, Some(&a), Some(edit)).await;
    assert_eq!(status, 200);
    assert_eq!(edited["description"], "contained");
    let (status, body) =
        server.send("PATCH", &path, Some(&a), Some(json!({"unit": null}))).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["kind"], "validation");

    assert_eq!(server.send("DELETE", &path, Some(&b), None).await.0, 403);
    let (status, body) = server.send("DELETE", &path, Some(&a), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "occurrence deleted");
    assert_eq!(server.send("GET", &path, Some(&a), None).await.0, 404);
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_route_reports_per_item_outcomes() {
    let server = TestServer::start(false).await;
    server.account("a@example.com", Role::Operator);
    server.account("sup@example.com", Role::Supervisor);
    let a = server.login("a@example.com").await;
    let sup = server.login("sup@example.com").await;

    let mut incomplete = occurrence(Some("L2"));
    incomplete.as_object_mut().unwrap().remove("team");
    let batch = json!({"occurrences": [occurrence(Some("L1")), incomplete, occurrence(Some("L1"))]});
    let (status, report) = server.send("POST", "/occurrences/sync", Some(&a), Some(batch.clone())).await;
    assert_eq!(status, 200);
    assert_eq!(report["accepted"].as_array().unwrap().len(), 1);
    assert_eq!(report["accepted"][0]["local_id"], "L1");
    assert_eq!(report["rejected"][0]["reason"], "missing required fields");
    assert_eq!(report["rejected"][1]["reason"], "already synchronized");

    let (_, replay) = server.send("POST", "/occurrences/sync", Some(&a), Some(batch)).await;
    assert!(replay["accepted"].as_array().unwrap().is_empty());

    let (_, listed) = server.send("GET", "/occurrences", Some(&sup), None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, body) =
        server.send("POST", "/occurrences/sync", Some(&a), Some(json!({"items": []}))).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["kind"], "bad_request");
}

#[tokio::test(flavor = "multi_thread")]
async fn oversized_bodies_are_rejected() {
    let server = TestServer::start(false).await;
    server.account("a@example.com", Role::Operator);
    let a = server.login("a@example.com").await;
    let padding = "x".repeat(MAX_BODY_BYTES + 1);

    let mut payload = occurrence(None);
    payload["description"] = json!(padding);
    let (status, body) = server.send("POST", "/occurrences", Some(&a), Some(payload)).await;
    assert_eq!(status, 413);
    assert_eq!(body["error"]["kind"], "payload_too_large");

    let batch = json!({"occurrences": [{"local_id": "big", "description": padding}]});
    let (status, body) = server.send("POST", "/occurrences/sync", Some(&a), Some(batch)).await;
    assert_eq!(status, 413);
    assert_eq!(body["error"]["kind"], "payload_too_large");

    let login = json!({"email": "a@example.com", "password": padding});
    let (status, body) = server.send("POST", "/auth/login", None, Some(login)).await;
    assert_eq!(status, 413);
    assert_eq!(body["error"]["kind"], "payload_too_large");

    let events = server.audit.requests("occurrences.create");
    let last = events.last().unwrap();
    assert_eq!(last["status"], 413);
    assert_eq!(last["error_kind"], "payload_too_large");
    let events = server.audit.requests("occurrences.sync");
    assert_eq!(events.last().unwrap()["status"], 413);
}

#[tokio::test(flavor = "multi_thread")]
async fn admin_only_route_admits_administrators() {
    let server = TestServer::start(false).await;
    server.account("root@example.com", Role::Admin);
    server.account("sup@example.com", Role::Supervisor);
    server.account("op@example.com", Role::Operator);
    let root = server.login("root@example.com").await;
    let sup = server.login("sup@example.com").await;
    let op = server.login("op@example.com").await;

    let (status, body) = server.send("GET", "/auth/admin-only", Some(&root), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "admin access granted");

    for token in [&sup, &op] {
        let (status, body) = server.send("GET", "/auth/admin-only", Some(token), None).await;
        assert_eq!(status, 403);
        assert_eq!(body["error"]["kind"], "forbidden");
    }

    let (status, body) = server.send("GET", "/auth/admin-only", None, None).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"]["kind"], "unauthenticated");
}
