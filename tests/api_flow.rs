//! End-to-end tests through the actix service with in-memory stores.

use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::http::{StatusCode, header};
use actix_web::{App, test};
use serde_json::{Value, json};

use attendance_tracker::attendance::{AttendanceEngine, UserLocks};
use attendance_tracker::config::Config;
use attendance_tracker::routes::{AppState, RateLimits, configure};
use attendance_tracker::store::memory::{MemoryAttendanceStore, MemoryIdentityStore};

fn test_config() -> Config {
    Config {
        database_url: "mysql://unused".to_string(),
        db_max_connections: 1,
        jwt_secret: "e2e-secret".to_string(),
        jwt_issuer: "attendance-tracker".to_string(),
        token_ttl: 604800,
        server_addr: "127.0.0.1:0".to_string(),
        cors_origins: Vec::new(),
        rate_login_per_min: 600,
        rate_register_per_min: 600,
        rate_protected_per_min: 6000,
        lock_idle_secs: 600,
        log_dir: "logs".to_string(),
        log_level: tracing::Level::DEBUG,
    }
}

fn state_with(config: Config) -> AppState {
    AppState {
        limits: Arc::new(RateLimits::from_config(&config).unwrap()),
        identity: Arc::new(MemoryIdentityStore::new()),
        engine: AttendanceEngine::new(Arc::new(MemoryAttendanceStore::new()), UserLocks::default()),
        config,
    }
}

macro_rules! call {
    ($app:expr, $req:expr $(,)?) => {
        test::call_service(&$app, $req.to_request())
    };
}

fn peer() -> SocketAddr {
    "127.0.0.1:40000".parse().unwrap()
}

fn post(uri: &str, body: Value, token: Option<&str>) -> test::TestRequest {
    let mut req = test::TestRequest::post()
        .uri(uri)
        .peer_addr(peer())
        .set_json(body);
    if let Some(token) = token {
        req = req.insert_header((header::AUTHORIZATION, format!("Bearer {}", token)));
    }
    req
}

fn get(uri: &str, auth: Option<&str>) -> test::TestRequest {
    let mut req = test::TestRequest::get().uri(uri).peer_addr(peer());
    if let Some(auth) = auth {
        req = req.insert_header((header::AUTHORIZATION, auth.to_string()));
    }
    req
}

#[actix_web::test]
async fn register_login_check_in_out_and_history() {
    let state = state_with(test_config());
    let app = test::init_service(App::new().configure(|cfg| configure(cfg, &state))).await;

    // register
    let resp = call!(
        app,
        post(
            "/api/register",
            json!({ "email": "alice@example.com", "password": "secret1", "fullName": "Alice" }),
            None,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert_eq!(body["user"]["fullName"], "Alice");
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("passwordHash").is_none());

    // login
    let resp = call!(
        app,
        post(
            "/api/login",
            json!({ "email": "alice@example.com", "password": "secret1" }),
            None,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let token = body["token"].as_str().unwrap().to_string();

    // check in
    let resp = call!(
        app,
        post("/api/attendance/check", json!({ "action": "check-in" }), Some(&token)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let opened: Value = test::read_body_json(resp).await;
    assert_eq!(opened["status"], "checked-in");
    assert!(opened["checkOut"].is_null());
    assert_eq!(opened["userId"], body["user"]["id"]);

    // check in again
    let resp = call!(
        app,
        post("/api/attendance/check", json!({ "action": "check-in" }), Some(&token)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let conflict: Value = test::read_body_json(resp).await;
    assert_eq!(conflict["error"], "You are already checked in");
    assert_eq!(conflict["attendance"]["id"], opened["id"]);

    // current session
    let resp = call!(
        app,
        get("/api/attendance/current", Some(&format!("Bearer {}", token))),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let current: Value = test::read_body_json(resp).await;
    assert_eq!(current["checkedIn"], true);
    assert_eq!(current["attendance"]["id"], opened["id"]);

    // check out
    let resp = call!(
        app,
        post("/api/attendance/check", json!({ "action": "check-out" }), Some(&token)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let closed: Value = test::read_body_json(resp).await;
    assert_eq!(closed["status"], "checked-out");
    assert_eq!(closed["id"], opened["id"]);
    assert!(closed["checkOut"].is_string());

    // check out again
    let resp = call!(
        app,
        post("/api/attendance/check", json!({ "action": "check-out" }), Some(&token)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "You are not currently checked in");

    // history
    let resp = call!(
        app,
        get("/api/attendance/me", Some(&format!("Bearer {}", token))),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let history: Value = test::read_body_json(resp).await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["status"], "checked-out");
    assert_eq!(history[0]["id"], opened["id"]);

    // profile
    let resp = call!(app, get("/api/me", Some(&format!("Bearer {}", token)))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let me: Value = test::read_body_json(resp).await;
    assert_eq!(me["email"], "alice@example.com");
}

#[actix_web::test]
async fn duplicate_email_is_rejected_and_original_user_kept() {
    let state = state_with(test_config());
    let app = test::init_service(App::new().configure(|cfg| configure(cfg, &state))).await;

    let first = call!(
        app,
        post(
            "/api/register",
            json!({ "email": "alice@example.com", "password": "secret1", "fullName": "Alice" }),
            None,
        ),
    )
    .await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let dup = call!(
        app,
        post(
            "/api/register",
            json!({ "email": "Alice@Example.com", "password": "other-pass", "fullName": "Mallory" }),
            None,
        ),
    )
    .await;
    assert_eq!(dup.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(dup).await;
    assert_eq!(body["error"], "User with this email already exists");

    let original = call!(
        app,
        post(
            "/api/login",
            json!({ "email": "alice@example.com", "password": "secret1" }),
            None,
        ),
    )
    .await;
    assert_eq!(original.status(), StatusCode::OK);
    let body: Value = test::read_body_json(original).await;
    assert_eq!(body["user"]["fullName"], "Alice");

    let intruder = call!(
        app,
        post(
            "/api/login",
            json!({ "email": "alice@example.com", "password": "other-pass" }),
            None,
        ),
    )
    .await;
    assert_eq!(intruder.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn login_with_unknown_email_is_unauthorized() {
    let state = state_with(test_config());
    let app = test::init_service(App::new().configure(|cfg| configure(cfg, &state))).await;

    let resp = call!(
        app,
        post(
            "/api/login",
            json!({ "email": "nobody@example.com", "password": "secret1" }),
            None,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Invalid email or password");
}

#[actix_web::test]
async fn gate_distinguishes_missing_from_invalid_tokens() {
    let state = state_with(test_config());
    let app = test::init_service(App::new().configure(|cfg| configure(cfg, &state))).await;

    let missing = call!(app, get("/api/attendance/me", None)).await;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let malformed = call!(app, get("/api/attendance/me", Some("Token abc"))).await;
    assert_eq!(malformed.status(), StatusCode::UNAUTHORIZED);

    let forged = call!(
        app,
        get("/api/attendance/me", Some("Bearer eyJhbGciOiJIUzI1NiJ9.e30.bogus")),
    )
    .await;
    assert_eq!(forged.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(forged).await;
    assert_eq!(body["error"], "Invalid or expired token");
}

#[actix_web::test]
async fn validation_failures_never_reach_the_engine() {
    let state = state_with(test_config());
    let app = test::init_service(App::new().configure(|cfg| configure(cfg, &state))).await;

    let resp = call!(
        app,
        post(
            "/api/register",
            json!({ "email": "not-an-email", "password": "123", "fullName": "" }),
            None,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Validation failed");
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["email", "password", "fullName"]);

    let resp = call!(
        app,
        post(
            "/api/register",
            json!({ "email": "bob@example.com", "password": "secret1", "fullName": "Bob" }),
            None,
        ),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    let token = body["token"].as_str().unwrap().to_string();

    let resp = call!(
        app,
        post("/api/attendance/check", json!({ "action": "dance" }), Some(&token)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["details"][0]["field"], "action");

    let resp = call!(
        app,
        post("/api/attendance/check", json!({ "action": 7 }), Some(&token)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = call!(
        app,
        get("/api/attendance/me", Some(&format!("Bearer {}", token))),
    )
    .await;
    let history: Value = test::read_body_json(resp).await;
    assert_eq!(history, json!([]));
}

#[actix_web::test]
async fn register_is_rate_limited_per_peer() {
    let config = Config {
        rate_register_per_min: 2,
        ..test_config()
    };
    let state = state_with(config);
    let app = test::init_service(App::new().configure(|cfg| configure(cfg, &state))).await;

    let mut statuses = Vec::new();
    for i in 0..3 {
        let req = post(
            "/api/register",
            json!({ "email": format!("user{i}@example.com"), "password": "secret1", "fullName": "U" }),
            None,
        );
        // the limiter may answer with an error rather than a response
        let status = match test::try_call_service(&app, req.to_request()).await {
            Ok(resp) => resp.status(),
            Err(err) => err.as_response_error().status_code(),
        };
        statuses.push(status);
    }

    assert_eq!(
        statuses,
        vec![StatusCode::CREATED, StatusCode::CREATED, StatusCode::TOO_MANY_REQUESTS]
    );
}

#[actix_web::test]
async fn health_and_openapi_are_public() {
    let state = state_with(test_config());
    let app = test::init_service(App::new().configure(|cfg| configure(cfg, &state))).await;

    let resp = call!(app, get("/health", None)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = call!(app, get("/api-doc/openapi.json", None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let doc: Value = test::read_body_json(resp).await;
    assert!(doc["paths"].get("/api/attendance/check").is_some());
}
