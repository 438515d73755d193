use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use loanledger::config::Config;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn spawn_app() -> Router {
    let db_path = std::env::temp_dir().join(format!("loanledger-test-{}.db", uuid::Uuid::new_v4()));
    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.server.secure_cookies = false;

    let state = loanledger::api::create_app_state_from_config(config)
        .await
        .expect("Failed to create app state");
    loanledger::api::router(state).await
}

async fn post_json(app: &Router, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("X-Session-Token", token);
    }

    let response = app
        .clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn get_json(app: &Router, uri: &str, token: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .header("X-Session-Token", token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn register(app: &Router, username: &str) -> Value {
    let (status, body) = post_json(
        app,
        "/api/auth/register",
        None,
        json!({
            "username": username,
            "first_name": "Anna",
            "last_name": "Nowak",
            "password": "xK3!abcdef",
            "repeat_password": "xK3!abcdef",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

async fn login_with(app: &Router, username: &str, password: &str) -> (StatusCode, Value) {
    post_json(
        app,
        "/api/auth/login",
        None,
        json!({"username": username, "password": password}),
    )
    .await
}

fn desktop_fingerprint() -> Value {
    json!({
        "browser_family": "Firefox",
        "browser_version": "131.0",
        "os_family": "Linux",
        "os_version": "6.1",
        "device_family": "Other",
        "device_brand": "N/A",
        "device_model": "N/A",
        "is_pc": true,
    })
}

#[tokio::test]
async fn register_validates_and_rejects_duplicates() {
    let app = spawn_app().await;

    // Every failed rule is reported in one response.
    let (status, body) = post_json(
        &app,
        "/api/auth/register",
        None,
        json!({
            "username": "x",
            "first_name": "anna",
            "last_name": "nowak",
            "password": "short",
            "repeat_password": "different",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("Username"));
    assert!(error.contains("First name"));
    assert!(error.contains("do not match"));

    // Weak passwords never pass, even with the right shape.
    let (status, body) = post_json(
        &app,
        "/api/auth/register",
        None,
        json!({
            "username": "anna",
            "first_name": "Anna",
            "last_name": "Nowak",
            "password": "password1",
            "repeat_password": "password1",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("weak"));

    register(&app, "anna").await;
    let (status, _) = post_json(
        &app,
        "/api/auth/register",
        None,
        json!({
            "username": "anna",
            "first_name": "Anna",
            "last_name": "Nowak",
            "password": "xK3!abcdef",
            "repeat_password": "xK3!abcdef",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn register_returns_a_recovery_password_once() {
    let app = spawn_app().await;
    let body = register(&app, "anna").await;

    let recovery = body["data"]["recovery_password"].as_str().unwrap();
    assert_eq!(recovery.len(), 16);
    assert!(recovery.chars().all(|c| c.is_ascii_alphanumeric()));
}

#[tokio::test]
async fn failed_login_threshold_fires_one_alert_until_rearmed() {
    let app = spawn_app().await;
    register(&app, "anna").await;

    for _ in 0..2 {
        let (status, _) = login_with(&app, "anna", "wrong-pass1!").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    // Below the threshold: no alert yet.
    let (_, body) = login_with(&app, "anna", "xK3!abcdef").await;
    let token = body["data"]["session_token"].as_str().unwrap().to_string();
    let (_, body) = get_json(&app, "/api/notifications", &token).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    // The successful login reset the counter; three fresh failures fire
    // exactly one alert, and a fourth stays quiet.
    for _ in 0..4 {
        login_with(&app, "anna", "wrong-pass1!").await;
    }

    let (_, body) = login_with(&app, "anna", "xK3!abcdef").await;
    let token = body["data"]["session_token"].as_str().unwrap().to_string();
    let (_, body) = get_json(&app, "/api/notifications", &token).await;
    let alerts: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["message"].as_str().unwrap())
        .filter(|m| m.contains("unsuccessfully"))
        .collect();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].contains("3 times"));
}

#[tokio::test]
async fn failed_logins_against_unknown_accounts_leave_no_trace() {
    let app = spawn_app().await;
    let (status, _) = login_with(&app, "ghost", "whatever1!").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn fingerprint_drift_notifies_the_owner() {
    let app = spawn_app().await;
    register(&app, "anna").await;

    let (status, _) = post_json(
        &app,
        "/api/auth/login",
        None,
        json!({
            "username": "anna",
            "password": "xK3!abcdef",
            "fingerprint": desktop_fingerprint(),
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Same fingerprint again: quiet.
    let (_, body) = post_json(
        &app,
        "/api/auth/login",
        None,
        json!({
            "username": "anna",
            "password": "xK3!abcdef",
            "fingerprint": desktop_fingerprint(),
        }),
    )
    .await;
    let token = body["data"]["session_token"].as_str().unwrap().to_string();
    let (_, body) = get_json(&app, "/api/notifications", &token).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    // New browser version on the same hardware: browser alert.
    let mut fingerprint = desktop_fingerprint();
    fingerprint["browser_version"] = json!("132.0");
    let (_, body) = post_json(
        &app,
        "/api/auth/login",
        None,
        json!({"username": "anna", "password": "xK3!abcdef", "fingerprint": fingerprint}),
    )
    .await;
    let token = body["data"]["session_token"].as_str().unwrap().to_string();
    let (_, body) = get_json(&app, "/api/notifications", &token).await;
    let texts: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["message"].as_str().unwrap())
        .collect();
    assert!(texts.iter().any(|t| t.contains("new browser")));

    // Different device hardware wins over browser drift.
    let mut fingerprint = desktop_fingerprint();
    fingerprint["device_brand"] = json!("Apple");
    fingerprint["browser_family"] = json!("Safari");
    let (_, body) = post_json(
        &app,
        "/api/auth/login",
        None,
        json!({"username": "anna", "password": "xK3!abcdef", "fingerprint": fingerprint}),
    )
    .await;
    let token = body["data"]["session_token"].as_str().unwrap().to_string();
    let (_, body) = get_json(&app, "/api/notifications", &token).await;
    let texts: Vec<String> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["message"].as_str().unwrap().to_string())
        .collect();
    assert!(texts.iter().any(|t| t.contains("new device")));
}

#[tokio::test]
async fn a_login_records_the_drift_alert_and_rearms_the_counter_together() {
    let app = spawn_app().await;
    register(&app, "anna").await;

    // Seed the known fingerprint.
    let (status, _) = post_json(
        &app,
        "/api/auth/login",
        None,
        json!({
            "username": "anna",
            "password": "xK3!abcdef",
            "fingerprint": desktop_fingerprint(),
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Two failures, then a login from a changed browser. The one login
    // call both writes the drift alert and resets the failure counter.
    for _ in 0..2 {
        login_with(&app, "anna", "wrong-pass1!").await;
    }
    let mut fingerprint = desktop_fingerprint();
    fingerprint["browser_version"] = json!("132.0");
    let (_, body) = post_json(
        &app,
        "/api/auth/login",
        None,
        json!({"username": "anna", "password": "xK3!abcdef", "fingerprint": fingerprint.clone()}),
    )
    .await;
    let token = body["data"]["session_token"].as_str().unwrap().to_string();

    let (_, body) = get_json(&app, "/api/notifications", &token).await;
    let texts: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["message"].as_str().unwrap())
        .collect();
    assert!(texts.iter().any(|t| t.contains("new browser")));
    assert!(!texts.iter().any(|t| t.contains("unsuccessfully")));

    // The counter restarted from zero: one more failure leaves it below
    // the threshold, so the next login still sees no failure alert.
    login_with(&app, "anna", "wrong-pass1!").await;
    let (_, body) = post_json(
        &app,
        "/api/auth/login",
        None,
        json!({"username": "anna", "password": "xK3!abcdef", "fingerprint": fingerprint}),
    )
    .await;
    let token = body["data"]["session_token"].as_str().unwrap().to_string();
    let (_, body) = get_json(&app, "/api/notifications", &token).await;
    assert!(
        !body["data"]
            .as_array()
            .unwrap()
            .iter()
            .any(|n| n["message"].as_str().unwrap().contains("unsuccessfully"))
    );
}

#[tokio::test]
async fn a_new_login_expires_the_previous_token() {
    let app = spawn_app().await;
    register(&app, "anna").await;

    let (_, body) = login_with(&app, "anna", "xK3!abcdef").await;
    let first = body["data"]["session_token"].as_str().unwrap().to_string();

    let (status, _) = get_json(&app, "/api/auth/me", &first).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = login_with(&app, "anna", "xK3!abcdef").await;
    let second = body["data"]["session_token"].as_str().unwrap().to_string();
    assert_ne!(first, second);

    let (status, _) = get_json(&app, "/api/auth/me", &first).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = get_json(&app, "/api/auth/me", &second).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/loans")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (status, _) = get_json(&app, "/api/loans", "not-a-real-token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn change_password_reverifies_the_current_one() {
    let app = spawn_app().await;
    register(&app, "anna").await;
    let (_, body) = login_with(&app, "anna", "xK3!abcdef").await;
    let token = body["data"]["session_token"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/auth/password")
                .header("Content-Type", "application/json")
                .header("X-Session-Token", &token)
                .body(Body::from(
                    json!({
                        "current_password": "wrong-pass1!",
                        "new_password": "nEw9$secret",
                        "repeat_password": "nEw9$secret",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/auth/password")
                .header("Content-Type", "application/json")
                .header("X-Session-Token", &token)
                .body(Body::from(
                    json!({
                        "current_password": "xK3!abcdef",
                        "new_password": "nEw9$secret",
                        "repeat_password": "nEw9$secret",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, _) = login_with(&app, "anna", "xK3!abcdef").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = login_with(&app, "anna", "nEw9$secret").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn recovery_resets_the_password_and_rotates_the_secret() {
    let app = spawn_app().await;
    let body = register(&app, "anna").await;
    let recovery = body["data"]["recovery_password"].as_str().unwrap().to_string();

    // A wrong recovery secret is rejected.
    let (status, _) = post_json(
        &app,
        "/api/auth/recover",
        None,
        json!({
            "username": "anna",
            "recovery_password": "0000000000000000",
            "new_password": "nEw9$secret",
            "repeat_password": "nEw9$secret",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = post_json(
        &app,
        "/api/auth/recover",
        None,
        json!({
            "username": "anna",
            "recovery_password": recovery,
            "new_password": "nEw9$secret",
            "repeat_password": "nEw9$secret",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let next_recovery = body["data"]["recovery_password"].as_str().unwrap();
    assert_eq!(next_recovery.len(), 16);
    assert_ne!(next_recovery, recovery);

    // The old recovery password is spent.
    let (status, _) = post_json(
        &app,
        "/api/auth/recover",
        None,
        json!({
            "username": "anna",
            "recovery_password": recovery,
            "new_password": "oTher3^pass",
            "repeat_password": "oTher3^pass",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = login_with(&app, "anna", "nEw9$secret").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn notifications_are_acknowledged_per_owner() {
    let app = spawn_app().await;
    register(&app, "anna").await;
    register(&app, "jan").await;

    // Trip the failed-login alarm for Anna.
    for _ in 0..3 {
        login_with(&app, "anna", "wrong-pass1!").await;
    }
    let (_, body) = login_with(&app, "anna", "xK3!abcdef").await;
    let anna = body["data"]["session_token"].as_str().unwrap().to_string();
    let (_, body) = login_with(&app, "jan", "xK3!abcdef").await;
    let jan = body["data"]["session_token"].as_str().unwrap().to_string();

    let (_, body) = get_json(&app, "/api/notifications", &anna).await;
    let id = body["data"][0]["id"].as_i64().unwrap();

    // Jan cannot acknowledge Anna's notification.
    let uri = format!("/api/notifications/{id}/seen");
    let (status, _) = post_json(&app, &uri, Some(&jan), json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post_json(&app, &uri, Some(&anna), json!({})).await;
    assert_eq!(status, StatusCode::OK);

    // Seen notifications drop out of the unseen list; a second ack 404s.
    let (_, body) = get_json(&app, "/api/notifications", &anna).await;
    assert!(body["data"].as_array().unwrap().is_empty());
    let (status, _) = post_json(&app, &uri, Some(&anna), json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn password_strength_feedback_is_public() {
    let app = spawn_app().await;

    let (status, body) = post_json(
        &app,
        "/api/password/strength",
        None,
        json!({"password": "xK3!abcd"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["acceptable"], true);
    let bits = body["data"]["entropy_bits"].as_f64().unwrap();
    assert!(bits > 52.0 && bits < 53.0);

    let (_, body) = post_json(
        &app,
        "/api/password/strength",
        None,
        json!({"password": "abcdefg"}),
    )
    .await;
    assert_eq!(body["data"]["acceptable"], false);
    assert_eq!(body["data"]["failures"].as_array().unwrap().len(), 3);
}
