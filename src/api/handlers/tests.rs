use crate::api::app;
use crate::gate::{test_support::StubFace, GateConfig, SystemClock, VerificationOrchestrator};
use crate::threat::ThreatSimulator;
use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    extract::connect_info::MockConnectInfo,
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::{net::SocketAddr, sync::Arc};
use tower::ServiceExt;

const BOUNDARY: &str = "biogate-test-boundary";

fn gateway() -> Arc<VerificationOrchestrator> {
    Arc::new(VerificationOrchestrator::new(
        &GateConfig::default(),
        Arc::new(StubFace::default()),
        Arc::new(ThreatSimulator),
        Arc::new(SystemClock),
    ))
}

fn test_app() -> Router {
    app(gateway())
}

fn multipart(fields: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        let disposition = if *name == "image" {
            format!("form-data; name=\"{name}\"; filename=\"capture.jpg\"")
        } else {
            format!("form-data; name=\"{name}\"")
        };
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: {disposition}\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(value);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn form_request(uri: &str, fields: &[(&str, &[u8])]) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart(fields)))?)
}

fn json_request(uri: &str, payload: &Value) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(payload)?))?)
}

fn get(uri: &str) -> Result<Request<Body>> {
    Ok(Request::builder().uri(uri).body(Body::empty())?)
}

async fn send(app: &Router, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    let payload = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body)?
    };
    Ok((status, payload))
}

async fn nonce(app: &Router) -> Result<String> {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/challenge")
        .body(Body::empty())?;
    let (status, payload) = send(app, request).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(payload["nonce"].as_str().unwrap_or_default().to_string())
}

async fn register_and_enroll(app: &Router, username: &str) -> Result<()> {
    let (status, _) = send(
        app,
        form_request(
            "/auth/register",
            &[("username", username.as_bytes()), ("role", b"admin")],
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, payload) = send(
        app,
        form_request(
            "/auth/enroll",
            &[("username", username.as_bytes()), ("image", username.as_bytes())],
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["success"], true);
    Ok(())
}

#[tokio::test]
async fn health_reports_build_and_request_id() -> Result<()> {
    let response = test_app().oneshot(get("/health")?).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let x_app = response
        .headers()
        .get("X-App")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    assert!(x_app.is_some_and(|value| value.starts_with(env!("CARGO_PKG_NAME"))));
    assert!(response.headers().contains_key("x-request-id"));

    let body = to_bytes(response.into_body(), usize::MAX).await?;
    let payload: Value = serde_json::from_slice(&body)?;
    assert_eq!(payload["name"], env!("CARGO_PKG_NAME"));
    assert_eq!(payload["locked"], false);
    assert_eq!(payload["gallery"], 0);
    Ok(())
}

#[tokio::test]
async fn health_options_has_empty_body() -> Result<()> {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/health")
        .body(Body::empty())?;
    let (status, payload) = send(&test_app(), request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload, Value::Null);
    Ok(())
}

#[tokio::test]
async fn request_id_is_propagated() -> Result<()> {
    let request = Request::builder()
        .uri("/")
        .header("x-request-id", "01JTESTREQUEST")
        .body(Body::empty())?;
    let response = test_app().oneshot(request).await?;
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|value| value.to_str().ok()),
        Some("01JTESTREQUEST")
    );
    Ok(())
}

#[tokio::test]
async fn register_validates_and_rejects_duplicates() -> Result<()> {
    let app = test_app();

    let (status, payload) = send(
        &app,
        form_request("/auth/register", &[("username", b"alice"), ("role", b"admin")])?,
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(payload["username"], "alice");
    assert_eq!(payload["enrolled"], false);
    assert!(payload.get("embedding").is_none());

    let (status, payload) = send(
        &app,
        form_request("/auth/register", &[("username", b"alice"), ("role", b"guest")])?,
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(payload["detail"], "Username already exists");

    let (status, payload) = send(
        &app,
        form_request("/auth/register", &[("username", b"bob")])?,
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(payload["detail"], "Missing field: role");

    let (status, _) = send(
        &app,
        form_request("/auth/register", &[("username", b"bad name"), ("role", b"x")])?,
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn enroll_unknown_user_is_not_found() -> Result<()> {
    let (status, payload) = send(
        &test_app(),
        form_request("/auth/enroll", &[("username", b"ghost"), ("image", b"alice")])?,
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(payload["detail"], "User not found");
    Ok(())
}

#[tokio::test]
async fn enroll_liveness_failure_is_bad_request() -> Result<()> {
    let app = test_app();
    send(
        &app,
        form_request("/auth/register", &[("username", b"alice"), ("role", b"admin")])?,
    )
    .await?;

    let (status, payload) = send(
        &app,
        form_request(
            "/auth/enroll",
            &[("username", b"alice"), ("image", b"spoof-photo")],
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(payload["detail"], "Image Quality Check Failed: printed photo");
    Ok(())
}

#[tokio::test]
async fn verify_grants_enrolled_face() -> Result<()> {
    let app = test_app();
    register_and_enroll(&app, "alice").await?;

    let nonce = nonce(&app).await?;
    let (status, payload) = send(
        &app,
        form_request(
            "/auth/verify",
            &[("image", b"alice"), ("nonce", nonce.as_bytes())],
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["authorized"], true);
    assert_eq!(payload["message"], "Welcome, alice");
    assert_eq!(payload["user"], json!({"username": "alice", "role": "admin"}));
    Ok(())
}

#[tokio::test]
async fn verify_denial_is_a_soft_response() -> Result<()> {
    let app = test_app();
    register_and_enroll(&app, "alice").await?;

    let nonce = nonce(&app).await?;
    let (status, payload) = send(
        &app,
        form_request(
            "/auth/verify",
            &[("image", b"stranger"), ("nonce", nonce.as_bytes())],
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["authorized"], false);
    assert_eq!(payload["message"], "Access Denied: Face not recognized");
    assert!(payload.get("user").is_none());
    Ok(())
}

#[tokio::test]
async fn replayed_nonce_locks_then_rejects() -> Result<()> {
    let app = test_app();
    register_and_enroll(&app, "alice").await?;

    let (status, payload) = send(
        &app,
        form_request("/auth/verify", &[("image", b"alice"), ("nonce", b"forged")])?,
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        payload["detail"],
        "Invalid or expired challenge (Replay Attack Protection)"
    );

    let (status, payload) = send(&app, get("/api/status")?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["locked"], true);
    assert_eq!(payload["remaining"], 60);

    let nonce = nonce(&app).await?;
    let (status, _) = send(
        &app,
        form_request(
            "/auth/verify",
            &[("image", b"alice"), ("nonce", nonce.as_bytes())],
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::LOCKED);
    Ok(())
}

#[tokio::test]
async fn verify_requires_image() -> Result<()> {
    let app = test_app();
    let nonce = nonce(&app).await?;
    let (status, payload) = send(
        &app,
        form_request("/auth/verify", &[("nonce", nonce.as_bytes())])?,
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(payload["detail"], "Missing field: image");
    Ok(())
}

#[tokio::test]
async fn external_events_use_forwarded_ip() -> Result<()> {
    let app = test_app();
    let mut request = json_request(
        "/api/logs/external",
        &json!({
            "eventType": "WEBAUTHN_LOGIN",
            "severity": "INFO",
            "details": "Passkey assertion accepted",
            "username": "alice",
            "sourceIp": "6.6.6.6"
        }),
    )?;
    request
        .headers_mut()
        .insert("x-forwarded-for", "203.0.113.5, 10.0.0.1".parse()?);

    let (status, payload) = send(&app, request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["status"], "logged");

    let (_, logs) = send(&app, get("/api/logs")?).await?;
    assert_eq!(logs[0]["eventType"], "WEBAUTHN_LOGIN");
    assert_eq!(logs[0]["sourceIp"], "203.0.113.5");
    Ok(())
}

#[tokio::test]
async fn peer_address_is_used_without_forwarded_header() -> Result<()> {
    let addr: SocketAddr = "198.51.100.7:40000".parse()?;
    let app = test_app().layer(MockConnectInfo(addr));

    send(
        &app,
        form_request("/auth/register", &[("username", b"alice"), ("role", b"admin")])?,
    )
    .await?;

    let (_, logs) = send(&app, get("/api/logs?limit=1")?).await?;
    assert_eq!(logs[0]["eventType"], "REGISTRATION");
    assert_eq!(logs[0]["sourceIp"], "198.51.100.7");
    Ok(())
}

#[tokio::test]
async fn external_event_requires_valid_json() -> Result<()> {
    let (status, payload) = send(
        &test_app(),
        json_request("/api/logs/external", &json!({"details": "no type"}))?,
    )
    .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(payload["detail"].is_string());
    Ok(())
}

#[tokio::test]
async fn logs_honour_limit_and_metrics_count() -> Result<()> {
    let app = test_app();
    for name in ["alice", "bob", "carol"] {
        send(
            &app,
            form_request(
                "/auth/register",
                &[("username", name.as_bytes()), ("role", b"staff")],
            )?,
        )
        .await?;
    }

    let (_, logs) = send(&app, get("/api/logs?limit=2")?).await?;
    assert_eq!(logs.as_array().map(Vec::len), Some(2));
    assert!(logs[0]["details"]
        .as_str()
        .is_some_and(|details| details.contains("carol")));

    let (status, metrics) = send(&app, get("/api/metrics")?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(metrics["totalEvents"], 3);
    assert_eq!(metrics["byEventType"]["REGISTRATION"], 3);
    assert_eq!(metrics["verificationSuccessRate"], Value::Null);
    Ok(())
}

#[tokio::test]
async fn high_security_simulation_locks_gateway() -> Result<()> {
    let app = test_app();
    let (status, payload) = send(
        &app,
        json_request(
            "/api/threat-sim/execute",
            &json!({
                "attackType": "BRUTE_FORCE",
                "targetUser": "test_user",
                "securityLevel": "HIGH"
            }),
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["success"], false);
    assert_eq!(payload["lockTriggered"], true);
    assert_eq!(payload["attackType"], "BRUTE_FORCE");

    let (_, status_payload) = send(&app, get("/api/status")?).await?;
    assert_eq!(status_payload["locked"], true);

    let (_, again) = send(
        &app,
        json_request(
            "/api/threat-sim/execute",
            &json!({
                "attackType": "REPLAY",
                "targetUser": "test_user",
                "securityLevel": "LOW"
            }),
        )?,
    )
    .await?;
    assert_eq!(again["blockedByLock"], true);
    Ok(())
}

#[tokio::test]
async fn unknown_attack_type_is_unprocessable() -> Result<()> {
    let (status, _) = send(
        &test_app(),
        json_request(
            "/api/threat-sim/execute",
            &json!({"attackType": "TELEPATHY", "securityLevel": "HIGH"}),
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    Ok(())
}

#[tokio::test]
async fn docs_and_root_are_served() -> Result<()> {
    let app = test_app();
    let (status, payload) = send(&app, get("/")?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["name"], env!("CARGO_PKG_NAME"));

    let (status, doc) = send(&app, get("/api-docs/openapi.json")?).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/auth/verify"].is_object());
    Ok(())
}
