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

async fn register(app: &Router, username: &str, first: &str, last: &str) {
    let (status, _) = post_json(
        app,
        "/api/auth/register",
        None,
        json!({
            "username": username,
            "first_name": first,
            "last_name": last,
            "password": "xK3!abcdef",
            "repeat_password": "xK3!abcdef",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

async fn login(app: &Router, username: &str) -> String {
    let (status, body) = post_json(
        app,
        "/api/auth/login",
        None,
        json!({"username": username, "password": "xK3!abcdef"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["session_token"].as_str().unwrap().to_string()
}

async fn create_loan(app: &Router, borrower_token: &str, lender: &str, amount: &str) -> i64 {
    let (status, body) = post_json(
        app,
        "/api/loans",
        Some(borrower_token),
        json!({"lender_username": lender, "amount": amount, "deadline": "2030-01-01"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn full_lifecycle_request_accept_payback_confirm() {
    let app = spawn_app().await;
    register(&app, "anna", "Anna", "Nowak").await;
    register(&app, "jan", "Jan", "Kowalski").await;
    let anna = login(&app, "anna").await;
    let jan = login(&app, "jan").await;

    let loan_id = create_loan(&app, &anna, "jan", "250").await;

    // The lender gets an unresolved new-loan prompt.
    let (status, body) = get_json(&app, "/api/messages", &jan).await;
    assert_eq!(status, StatusCode::OK);
    let messages = body["data"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["new_loan"], true);
    assert!(
        messages[0]["message"]
            .as_str()
            .unwrap()
            .contains("wants to borrow 250")
    );

    // Accept: debt goes live, prompt is resolved.
    let uri = format!("/api/loans/{loan_id}/accept");
    let (status, body) = post_json(&app, &uri, Some(&jan), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "NOT_PAYED");

    let (_, body) = get_json(&app, "/api/messages", &jan).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    // Both parties were notified about the decision.
    let (_, body) = get_json(&app, "/api/notifications", &anna).await;
    let texts: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["message"].as_str().unwrap())
        .collect();
    assert!(texts.iter().any(|t| t.contains("accepted your loan request")));

    // Borrower claims repayment; lender gets a repayment prompt.
    let uri = format!("/api/loans/{loan_id}/payback");
    let (status, body) = post_json(&app, &uri, Some(&anna), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "PENDING");

    let (_, body) = get_json(&app, "/api/messages", &jan).await;
    let messages = body["data"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["new_loan"], false);
    assert!(messages[0]["message"].as_str().unwrap().contains("claims to repay"));

    // Confirm: loan settles.
    let uri = format!("/api/loans/{loan_id}/confirm");
    let (status, body) = post_json(&app, &uri, Some(&jan), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "PAYED");

    // Four audit-log lines, in lifecycle order.
    let (_, body) = get_json(&app, "/api/loans/logs", &anna).await;
    let logs = body["data"].as_array().unwrap();
    assert_eq!(logs.len(), 4);
    assert_eq!(logs[0]["status"], "REQUEST IN PROGRESS");
    assert_eq!(logs[1]["status"], "NOT PAYED");
    assert_eq!(logs[2]["status"], "PENDING");
    assert_eq!(logs[3]["status"], "PAYED");
}

#[tokio::test]
async fn rejected_request_is_canceled_and_replay_conflicts() {
    let app = spawn_app().await;
    register(&app, "anna", "Anna", "Nowak").await;
    register(&app, "jan", "Jan", "Kowalski").await;
    let anna = login(&app, "anna").await;
    let jan = login(&app, "jan").await;

    let loan_id = create_loan(&app, &anna, "jan", "100").await;

    let uri = format!("/api/loans/{loan_id}/reject");
    let (status, body) = post_json(&app, &uri, Some(&jan), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "CANCELED");

    // The losing side of the decision race (or a replay) conflicts.
    let uri = format!("/api/loans/{loan_id}/accept");
    let (status, _) = post_json(&app, &uri, Some(&jan), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let uri = format!("/api/loans/{loan_id}/reject");
    let (status, _) = post_json(&app, &uri, Some(&jan), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The conflicting attempts left no extra audit lines.
    let (_, body) = get_json(&app, "/api/loans/logs", &jan).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    // Canceled loans never appear in history views.
    let (_, body) = get_json(&app, "/api/debts", &anna).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn disputed_repayment_restores_the_debt() {
    let app = spawn_app().await;
    register(&app, "anna", "Anna", "Nowak").await;
    register(&app, "jan", "Jan", "Kowalski").await;
    let anna = login(&app, "anna").await;
    let jan = login(&app, "jan").await;

    let loan_id = create_loan(&app, &anna, "jan", "75.50").await;
    let uri = format!("/api/loans/{loan_id}/accept");
    post_json(&app, &uri, Some(&jan), json!({})).await;
    let uri = format!("/api/loans/{loan_id}/payback");
    post_json(&app, &uri, Some(&anna), json!({})).await;

    let uri = format!("/api/loans/{loan_id}/dispute");
    let (status, body) = post_json(&app, &uri, Some(&jan), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "NOT_PAYED");

    // The debt still counts toward what the borrower owes.
    let (_, body) = get_json(&app, "/api/loans/taken", &anna).await;
    assert_eq!(body["data"]["count"], 1);
    assert_eq!(body["data"]["total"], 75.5);

    // And the borrower can claim repayment again.
    let uri = format!("/api/loans/{loan_id}/payback");
    let (status, _) = post_json(&app, &uri, Some(&anna), json!({})).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn only_the_right_party_may_act() {
    let app = spawn_app().await;
    register(&app, "anna", "Anna", "Nowak").await;
    register(&app, "jan", "Jan", "Kowalski").await;
    register(&app, "eva", "Eva", "Lis").await;
    let anna = login(&app, "anna").await;
    let jan = login(&app, "jan").await;
    let eva = login(&app, "eva").await;

    let loan_id = create_loan(&app, &anna, "jan", "50").await;

    // The borrower cannot decide their own request; neither can a stranger.
    let uri = format!("/api/loans/{loan_id}/accept");
    let (status, _) = post_json(&app, &uri, Some(&anna), json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = post_json(&app, &uri, Some(&eva), json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    post_json(&app, &uri, Some(&jan), json!({})).await;

    // Only the borrower claims repayment.
    let uri = format!("/api/loans/{loan_id}/payback");
    let (status, _) = post_json(&app, &uri, Some(&jan), json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn loan_input_is_validated() {
    let app = spawn_app().await;
    register(&app, "anna", "Anna", "Nowak").await;
    register(&app, "jan", "Jan", "Kowalski").await;
    let anna = login(&app, "anna").await;

    for (amount, deadline) in [
        ("0", "2030-01-01"),
        ("-5", "2030-01-01"),
        ("10.123", "2030-01-01"),
        ("abc", "2030-01-01"),
        ("100", "2000-01-01"),
        ("100", "not-a-date"),
    ] {
        let (status, _) = post_json(
            &app,
            "/api/loans",
            Some(&anna),
            json!({"lender_username": "jan", "amount": amount, "deadline": deadline}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "amount={amount} deadline={deadline}");
    }

    // Unknown lender and self-lending are rejected too.
    let (status, _) = post_json(
        &app,
        "/api/loans",
        Some(&anna),
        json!({"lender_username": "nobody", "amount": "100", "deadline": "2030-01-01"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post_json(
        &app,
        "/api/loans",
        Some(&anna),
        json!({"lender_username": "anna", "amount": "100", "deadline": "2030-01-01"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_accept_and_reject_have_one_winner() {
    let app = spawn_app().await;
    register(&app, "anna", "Anna", "Nowak").await;
    register(&app, "jan", "Jan", "Kowalski").await;
    let anna = login(&app, "anna").await;
    let jan = login(&app, "jan").await;

    let rounds = 10;
    for _ in 0..rounds {
        let loan_id = create_loan(&app, &anna, "jan", "10").await;

        let accept = {
            let app = app.clone();
            let jan = jan.clone();
            tokio::spawn(async move {
                let uri = format!("/api/loans/{loan_id}/accept");
                post_json(&app, &uri, Some(&jan), json!({})).await.0
            })
        };
        let reject = {
            let app = app.clone();
            let jan = jan.clone();
            tokio::spawn(async move {
                let uri = format!("/api/loans/{loan_id}/reject");
                post_json(&app, &uri, Some(&jan), json!({})).await.0
            })
        };

        let statuses = [accept.await.unwrap(), reject.await.unwrap()];
        assert!(statuses.contains(&StatusCode::OK), "statuses: {statuses:?}");
        assert!(
            statuses.contains(&StatusCode::CONFLICT),
            "statuses: {statuses:?}"
        );
    }

    // Each round left exactly two audit lines: the request and the winning
    // decision. The losing side wrote nothing.
    let (_, body) = get_json(&app, "/api/loans/logs", &jan).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2 * rounds);
}

#[tokio::test]
async fn summaries_and_debtor_search() {
    let app = spawn_app().await;
    register(&app, "anna", "Anna", "Nowak").await;
    register(&app, "jan", "Jan", "Kowalski").await;
    register(&app, "eva", "Eva", "Lis").await;
    let anna = login(&app, "anna").await;
    let jan = login(&app, "jan").await;
    let eva = login(&app, "eva").await;

    // Jan lends to both Anna and Eva.
    let loan_a = create_loan(&app, &anna, "jan", "100").await;
    let loan_b = create_loan(&app, &eva, "jan", "40").await;
    for id in [loan_a, loan_b] {
        let uri = format!("/api/loans/{id}/accept");
        let (status, _) = post_json(&app, &uri, Some(&jan), json!({})).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = get_json(&app, "/api/loans/given", &jan).await;
    assert_eq!(body["data"]["count"], 2);
    assert_eq!(body["data"]["total"], 140.0);

    let (_, body) = get_json(&app, "/api/loans/taken", &anna).await;
    assert_eq!(body["data"]["count"], 1);
    assert_eq!(body["data"]["total"], 100.0);

    // The summaries group the owed amounts per counterparty.
    let by_counterparty = body["data"]["by_counterparty"].as_array().unwrap();
    assert_eq!(by_counterparty.len(), 1);
    assert_eq!(by_counterparty[0]["username"], "jan");
    assert_eq!(by_counterparty[0]["total"], 100.0);

    // Search matches by username fragment; deadlines are in the future so
    // both debtors land in the on-time bucket.
    let (_, body) = get_json(&app, "/api/debtors?q=ann", &jan).await;
    let on_time = body["data"]["on_time"].as_array().unwrap();
    assert_eq!(on_time.len(), 1);
    assert_eq!(on_time[0]["username"], "anna");
    assert_eq!(on_time[0]["amount"], 100.0);
    assert!(body["data"]["overdue"].as_array().unwrap().is_empty());

    let (_, body) = get_json(&app, "/api/debtors?q=", &jan).await;
    assert_eq!(body["data"]["on_time"].as_array().unwrap().len(), 2);

    // Debtor search is lender-side; Anna has no debtors.
    let (_, body) = get_json(&app, "/api/debtors?q=", &anna).await;
    assert!(body["data"]["on_time"].as_array().unwrap().is_empty());
}
