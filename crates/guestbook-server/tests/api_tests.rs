//! End-to-end tests driving the real router over an in-memory store.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use guestbook_core::gate::AccessGate;
use guestbook_server::build_router;
use guestbook_server::config::ServerConfig;
use guestbook_server::state::AppState;
use guestbook_storage::{MemoryBackend, RetryPolicy, StoreClient};

const SIGNATURE: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAAB";

struct Harness {
    app: Router,
    backend: MemoryBackend,
    _assets: TempDir,
}

async fn harness(extra: &[(&str, &str)]) -> Harness {
    harness_with(extra, |_| {}).await
}

async fn harness_with(extra: &[(&str, &str)], adjust: impl FnOnce(&mut AppState)) -> Harness {
    let assets = tempfile::tempdir().unwrap();
    std::fs::write(
        assets.path().join("index.html"),
        "<!doctype html><title>Guestbook</title>",
    )
    .unwrap();
    std::fs::write(assets.path().join("app.js"), "console.log('guestbook');").unwrap();

    let mut vars: HashMap<String, String> = [
        ("DATABASE_URL", "memory://"),
        ("WRITE_PASSWORD", "correct"),
        ("READ_PASSWORD", "reader"),
    ]
    .iter()
    .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
    .collect();
    vars.insert(
        "GUESTBOOK_STATIC_DIR".to_owned(),
        assets.path().display().to_string(),
    );
    for (k, v) in extra {
        vars.insert((*k).to_owned(), (*v).to_owned());
    }
    let config = ServerConfig::from_lookup(|key| vars.get(key).cloned()).unwrap();

    let backend = MemoryBackend::new();
    let store = StoreClient::connect(Arc::new(backend.clone()), RetryPolicy::default())
        .await
        .unwrap();
    let mut state = AppState::new(Arc::new(config), Arc::new(store));
    adjust(&mut state);
    let state = Arc::new(state);

    Harness {
        app: build_router(state),
        backend,
        _assets: assets,
    }
}

async fn call(app: &Router, req: Request<Body>) -> Response {
    app.clone().oneshot(req).await.unwrap()
}

async fn json_of(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn text_of(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn entry(name: &str) -> Value {
    json!({
        "name": name,
        "message": "hi",
        "signature": SIGNATURE,
        "date": "2024-01-01T00:00:00Z",
    })
}

async fn create(app: &Router, password: &str, entry: Value) -> Response {
    call(
        app,
        post_json("/api/entries", &json!({"password": password, "entry": entry})),
    )
    .await
}

// ── Entry lifecycle ──────────────────────────────────────────────────

#[tokio::test]
async fn wrong_password_stores_nothing_then_correct_password_stores_one() {
    let h = harness(&[]).await;

    let response = create(&h.app, "wrongpass", entry("A")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_of(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Incorrect password");
    assert!(h.backend.is_empty().await);

    let response = create(&h.app, "correct", entry("A")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_of(response).await, json!({"success": true}));
    assert_eq!(h.backend.len().await, 1);

    let response = call(&h.app, get("/api/entries?password=reader")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let entries = json_of(response).await;
    let first = &entries[0];
    assert_eq!(first["name"], "A");
    assert_eq!(first["message"], "hi");
    assert_eq!(first["signature"], SIGNATURE);
    assert_eq!(first["date"], "2024-01-01T00:00:00Z");
    assert!(first["createdAt"].is_string());
    assert!(first["id"].is_string());
}

#[tokio::test]
async fn listing_is_newest_first_and_honors_limit() {
    let h = harness(&[]).await;
    for name in ["one", "two", "three"] {
        assert_eq!(create(&h.app, "correct", entry(name)).await.status(), StatusCode::OK);
    }

    let entries = json_of(call(&h.app, get("/api/entries?password=reader")).await).await;
    let names: Vec<&str> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["three", "two", "one"]);

    let entries =
        json_of(call(&h.app, get("/api/entries?password=reader&limit=1")).await).await;
    assert_eq!(entries.as_array().unwrap().len(), 1);
    assert_eq!(entries[0]["name"], "three");
}

#[tokio::test]
async fn listing_is_capped_by_configuration() {
    let h = harness(&[("GUESTBOOK_LIST_LIMIT", "2")]).await;
    for i in 0..4 {
        create(&h.app, "correct", entry(&format!("n{i}"))).await;
    }
    let entries =
        json_of(call(&h.app, get("/api/entries?password=reader&limit=50")).await).await;
    assert_eq!(entries.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn omitted_date_is_filled_from_creation_time() {
    let h = harness(&[]).await;
    let mut e = entry("A");
    e.as_object_mut().unwrap().remove("date");
    assert_eq!(create(&h.app, "correct", e).await.status(), StatusCode::OK);

    let entries = json_of(call(&h.app, get("/api/entries?password=reader")).await).await;
    let date = entries[0]["date"].as_str().unwrap();
    let created = entries[0]["createdAt"].as_str().unwrap();
    assert_eq!(date[..19], created[..19]);
    assert!(date.ends_with('Z'));
}

#[tokio::test]
async fn large_signature_round_trips_unmodified() {
    let h = harness(&[]).await;
    let signature = format!("data:image/jpeg;base64,{}", "/9j/4AAQSkZJRg+=".repeat(4000));
    let mut e = entry("A");
    e["signature"] = json!(signature);

    assert_eq!(create(&h.app, "correct", e).await.status(), StatusCode::OK);
    let entries = json_of(call(&h.app, get("/api/entries?password=reader")).await).await;
    assert_eq!(entries[0]["signature"], signature);
}

// ── Create validation ────────────────────────────────────────────────

#[tokio::test]
async fn invalid_entries_are_rejected_and_not_stored() {
    let h = harness(&[]).await;

    let mut empty_name = entry("A");
    empty_name["name"] = json!("");
    let mut no_message = entry("A");
    no_message.as_object_mut().unwrap().remove("message");
    let mut bad_signature = entry("A");
    bad_signature["signature"] = json!("javascript:alert(1)");
    let long_name = entry(&"x".repeat(101));

    for invalid in [empty_name, no_message, bad_signature, long_name] {
        let response = create(&h.app, "correct", invalid).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_of(response).await["message"], "Invalid entry data");
    }
    assert!(h.backend.is_empty().await);
}

#[tokio::test]
async fn create_requires_password_and_entry() {
    let h = harness(&[]).await;
    for body in [
        json!({"entry": entry("A")}),
        json!({"password": "correct"}),
        json!({"password": "", "entry": entry("A")}),
    ] {
        let response = call(&h.app, post_json("/api/entries", &body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_of(response).await["message"], "Missing required fields");
    }
    assert!(h.backend.is_empty().await);
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let h = harness(&[]).await;
    let req = Request::builder()
        .method("POST")
        .uri("/api/entries")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = call(&h.app, req).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_of(response).await["success"], false);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let h = harness(&[("GUESTBOOK_BODY_LIMIT_BYTES", "1024")]).await;
    let mut e = entry("A");
    e["signature"] = json!(format!("data:image/png;base64,{}", "A".repeat(4096)));

    let response = create(&h.app, "correct", e).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(h.backend.is_empty().await);
}

// ── Listing access ───────────────────────────────────────────────────

#[tokio::test]
async fn listing_requires_password() {
    let h = harness(&[]).await;
    for uri in ["/api/entries", "/api/entries?password="] {
        let response = call(&h.app, get(uri)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_of(response).await["message"], "Password is required");
    }
}

#[tokio::test]
async fn wrong_read_password_never_returns_entries() {
    let h = harness(&[]).await;
    create(&h.app, "correct", entry("secret-name")).await;

    for wrong in ["correct", "Reader", "reader%20"] {
        let response = call(&h.app, get(&format!("/api/entries?password={wrong}"))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(!text_of(response).await.contains("secret-name"));
    }

    let entries = json_of(call(&h.app, get("/api/entries?password=reader")).await).await;
    assert_eq!(entries.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_limit_is_bad_request() {
    let h = harness(&[]).await;
    let response = call(&h.app, get("/api/entries?password=reader&limit=lots")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn storage_failure_is_generic_500() {
    let h = harness(&[]).await;
    h.backend.set_offline(true);

    for response in [
        create(&h.app, "correct", entry("A")).await,
        call(&h.app, get("/api/entries?password=reader")).await,
    ] {
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_of(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Internal server error");
    }
}

// ── Password verification ────────────────────────────────────────────

#[tokio::test]
async fn verify_password_reports_match() {
    let h = harness(&[]).await;
    let cases = [
        ("correct", "write", true),
        ("reader", "read", true),
        ("reader", "write", false),
        ("correct ", "write", false),
        ("CORRECT", "write", false),
    ];
    for (password, kind, expected) in cases {
        let response = call(
            &h.app,
            post_json(
                "/api/verify-password",
                &json!({"password": password, "type": kind}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_of(response).await,
            json!({"success": true, "isCorrect": expected})
        );
    }
}

#[tokio::test]
async fn missing_secret_is_generic_500() {
    let h = harness_with(&[], |state| {
        state.gate = AccessGate::new(Some("correct".to_owned()), None);
    })
    .await;

    let response = call(
        &h.app,
        post_json(
            "/api/verify-password",
            &json!({"password": "reader", "type": "read"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let text = text_of(response).await;
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Server configuration error");
    let lowered = text.to_lowercase();
    assert!(!lowered.contains("read"));
    assert!(!lowered.contains("write"));

    // The configured side keeps working.
    let response = call(
        &h.app,
        post_json(
            "/api/verify-password",
            &json!({"password": "correct", "type": "write"}),
        ),
    )
    .await;
    assert_eq!(
        json_of(response).await,
        json!({"success": true, "isCorrect": true})
    );
}

#[tokio::test]
async fn verify_password_rejects_bad_input() {
    let h = harness(&[]).await;
    for body in [
        json!({"password": "correct", "type": "admin"}),
        json!({"password": "correct", "type": "WRITE"}),
        json!({"password": "correct"}),
        json!({"type": "write"}),
    ] {
        let response = call(&h.app, post_json("/api/verify-password", &body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
    }
}

#[tokio::test]
async fn verify_password_is_rate_limited_per_client() {
    let h = harness(&[
        ("GUESTBOOK_RATE_LIMIT_MAX", "2"),
        ("GUESTBOOK_RATE_LIMIT_WINDOW_SECS", "60"),
    ])
    .await;

    let from = |ip: [u8; 4]| {
        let mut req = post_json(
            "/api/verify-password",
            &json!({"password": "x", "type": "read"}),
        );
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((ip, 40000))));
        req
    };

    for remaining in ["1", "0"] {
        let response = call(&h.app, from([10, 0, 0, 1])).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-remaining"], remaining);
    }

    let response = call(&h.app, from([10, 0, 0, 1])).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));

    let response = call(&h.app, from([10, 0, 0, 2])).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Other endpoints are not limited.
    let response = call(&h.app, get("/api/entries?password=reader")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ── System and static assets ─────────────────────────────────────────

#[tokio::test]
async fn health_reports_database_state() {
    let h = harness(&[]).await;
    let response = call(&h.app, get("/api/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_of(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn api_responses_carry_security_headers() {
    let h = harness(&[]).await;
    let response = call(&h.app, get("/api/health")).await;
    let headers = response.headers();
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
    assert_eq!(headers[header::CACHE_CONTROL], "no-store");
}

#[tokio::test]
async fn static_files_are_served() {
    let h = harness(&[]).await;
    let response = call(&h.app, get("/app.js")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(text_of(response).await, "console.log('guestbook');");
}

#[tokio::test]
async fn unknown_paths_fall_back_to_index() {
    let h = harness(&[]).await;
    for uri in ["/", "/read", "/some/deep/route"] {
        let response = call(&h.app, get(uri)).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        assert!(text_of(response).await.contains("<title>Guestbook</title>"));
    }
}
