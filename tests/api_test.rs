use axum::http::StatusCode;
use chrono::Utc;
use liqguard::api::{self, AppState};
use liqguard::domain::ObservedPrice;
use liqguard::{MockPayout, PolicyStore, PremiumCalculator, ResolutionHandler};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tower::util::ServiceExt;

struct TestApp {
    app: axum::Router,
    store: Arc<PolicyStore>,
    payout: Arc<MockPayout>,
    price_tx: watch::Sender<Option<ObservedPrice>>,
}

fn setup_test_app() -> TestApp {
    setup_with_payout(MockPayout::new())
}

fn setup_with_payout(payout: MockPayout) -> TestApp {
    let store = Arc::new(PolicyStore::new());
    let payout = Arc::new(payout);
    let resolver = Arc::new(ResolutionHandler::new(store.clone(), payout.clone()));
    let (price_tx, price_rx) = watch::channel(None);
    let state = AppState::new(
        store.clone(),
        PremiumCalculator::default(),
        resolver,
        price_rx,
    );

    TestApp {
        app: api::create_router(state),
        store,
        payout,
        price_tx,
    }
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = axum::http::Request::builder().method(method).uri(uri);
    let req = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(axum::body::Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(axum::body::Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn paid_put(barrier: f64) -> Value {
    json!({
        "barrierPrice": barrier,
        "coverageAmount": 1000.0,
        "userWallet": "0xabc",
        "premiumPaid": true,
        "optionDirection": "put",
    })
}

async fn register(app: &axum::Router, body: Value) -> String {
    let (status, policy) = send(app, "POST", "/v1/policies", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    policy["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_endpoint() {
    let test_app = setup_test_app();

    let (status, body) = send(&test_app.app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["latestPrice"].is_null());
    assert_eq!(body["activePolicies"], 0);
}

#[tokio::test]
async fn test_health_reflects_latest_price() {
    let test_app = setup_test_app();
    test_app.price_tx.send_replace(Some(ObservedPrice {
        price: 151.25,
        published_at: Utc::now(),
    }));

    let (_, body) = send(&test_app.app, "GET", "/health", None).await;
    assert_eq!(body["latestPrice"], 151.25);
    assert!(body["priceTimestamp"].is_string());
}

#[tokio::test]
async fn test_ready_endpoint() {
    let test_app = setup_test_app();
    let (status, body) = send(&test_app.app, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_quote_below_barrier() {
    let test_app = setup_test_app();

    let (status, quote) = send(
        &test_app.app,
        "POST",
        "/v1/quote",
        Some(json!({
            "coverageAmount": 1000.0,
            "barrierPrice": 135.0,
            "spotPrice": 150.0,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["direction"], "below");
    assert_eq!(quote["daysToExpiration"], 30);
    let probability = quote["touchProbability"].as_f64().unwrap();
    assert!(probability > 0.0 && probability < 1.0);
    let premium = quote["premium"].as_f64().unwrap();
    let value = quote["touchOrOptionValue"].as_f64().unwrap();
    assert!(premium > value);
    assert!(premium < 1000.0);
}

#[tokio::test]
async fn test_quote_barrier_at_spot_is_certain_touch() {
    let test_app = setup_test_app();

    let (status, quote) = send(
        &test_app.app,
        "POST",
        "/v1/quote",
        Some(json!({
            "coverageAmount": 1000.0,
            "barrierPrice": 150.0,
            "spotPrice": 150.0,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["touchProbability"], 1.0);
    let value = quote["touchOrOptionValue"].as_f64().unwrap();
    assert!(value > 990.0 && value <= 1000.0);
}

#[tokio::test]
async fn test_quote_uses_observed_price_when_spot_missing() {
    let test_app = setup_test_app();
    test_app.price_tx.send_replace(Some(ObservedPrice {
        price: 150.0,
        published_at: Utc::now(),
    }));

    let (status, quote) = send(
        &test_app.app,
        "POST",
        "/v1/quote",
        Some(json!({"coverageAmount": 500.0, "barrierPrice": 135.0})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["spotPrice"], 150.0);
}

#[tokio::test]
async fn test_quote_rejects_invalid_inputs() {
    let test_app = setup_test_app();

    let (status, body) = send(
        &test_app.app,
        "POST",
        "/v1/quote",
        Some(json!({"coverageAmount": 0.0, "barrierPrice": 135.0, "spotPrice": 150.0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("coverage"));

    let (status, _) = send(
        &test_app.app,
        "POST",
        "/v1/quote",
        Some(json!({"coverageAmount": 1000.0, "barrierPrice": 135.0, "spotPrice": 0.0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // No spot in the body and no price observed yet.
    let (status, _) = send(
        &test_app.app,
        "POST",
        "/v1/quote",
        Some(json!({"coverageAmount": 1000.0, "barrierPrice": 135.0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_unpaid_policy_is_rejected() {
    let test_app = setup_test_app();
    let mut body = paid_put(135.0);
    body["premiumPaid"] = json!(false);

    let (status, err) = send(&test_app.app, "POST", "/v1/policies", Some(body)).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert!(err["error"].as_str().unwrap().contains("premium"));

    let (_, active) = send(&test_app.app, "GET", "/v1/policies/active", None).await;
    assert_eq!(active["count"], 0);
    assert_eq!(test_app.store.count(), 0);
}

#[tokio::test]
async fn test_register_without_wallet_is_rejected() {
    let test_app = setup_test_app();
    let mut body = paid_put(135.0);
    body.as_object_mut().unwrap().remove("userWallet");

    let (status, _) = send(&test_app.app, "POST", "/v1/policies", Some(body)).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
}

#[tokio::test]
async fn test_register_rejects_past_expiration() {
    let test_app = setup_test_app();
    let mut body = paid_put(135.0);
    body["expirationDate"] = json!("2020-01-01");

    let (status, _) = send(&test_app.app, "POST", "/v1/policies", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_and_list_active() {
    let test_app = setup_test_app();

    let (status, policy) = send(&test_app.app, "POST", "/v1/policies", Some(paid_put(135.0))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(policy["status"], "ACTIVE");
    assert_eq!(policy["direction"], "below");
    assert_eq!(policy["asset"], "BTC");
    assert_eq!(policy["userWallet"], "0xabc");

    let mut call = paid_put(200.0);
    call["optionDirection"] = json!("call");
    register(&test_app.app, call).await;

    let (status, active) = send(&test_app.app, "GET", "/v1/policies/active", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active["count"], 2);
    assert_eq!(active["policies"][0]["barrierPrice"], 135.0);
    assert_eq!(active["policies"][1]["direction"], "above");
}

#[tokio::test]
async fn test_get_and_delete_policy() {
    let test_app = setup_test_app();
    let id = register(&test_app.app, paid_put(135.0)).await;
    let uri = format!("/v1/policies/{}", id);

    let (status, policy) = send(&test_app.app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(policy["id"], id.as_str());

    let (status, _) = send(&test_app.app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&test_app.app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&test_app.app, "GET", "/v1/policies/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_resolve_requires_trigger_condition() {
    let test_app = setup_test_app();
    let id = register(&test_app.app, paid_put(135.0)).await;

    // Touching the barrier exactly does not trigger.
    let (status, _) = send(
        &test_app.app,
        "POST",
        "/v1/resolve",
        Some(json!({"policyId": id, "observedPrice": 135.0})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(test_app.payout.sent_count(), 0);
}

#[tokio::test]
async fn test_resolve_rejects_mismatched_barrier() {
    let test_app = setup_test_app();
    let id = register(&test_app.app, paid_put(135.0)).await;

    let (status, _) = send(
        &test_app.app,
        "POST",
        "/v1/resolve",
        Some(json!({"policyId": id, "observedPrice": 120.0, "barrierPrice": 140.0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_resolve_pays_once() {
    let test_app = setup_test_app();
    let id = register(&test_app.app, paid_put(135.0)).await;
    let body = json!({
        "policyId": id,
        "observedPrice": 134.5,
        "barrierPrice": 135.0,
        "direction": "below",
    });

    let (status, first) = send(&test_app.app, "POST", "/v1/resolve", Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["outcome"], "resolved");
    assert_eq!(first["status"], "RESOLVED");
    assert_eq!(first["payoutAmount"], 1000.0);
    assert!(first["resolvedAt"].is_string());

    let (status, second) = send(&test_app.app, "POST", "/v1/resolve", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["outcome"], "alreadyClosed");
    assert_eq!(second["status"], "RESOLVED");

    assert_eq!(test_app.payout.sent_count(), 1);
    let (_, active) = send(&test_app.app, "GET", "/v1/policies/active", None).await;
    assert_eq!(active["count"], 0);
}

#[tokio::test]
async fn test_resolve_unknown_policy() {
    let test_app = setup_test_app();
    let (status, _) = send(
        &test_app.app,
        "POST",
        "/v1/resolve",
        Some(json!({"policyId": uuid::Uuid::new_v4().to_string(), "observedPrice": 1.0})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_during_resolution_conflicts() {
    let test_app = setup_with_payout(MockPayout::new().with_delay(Duration::from_millis(50)));
    let id = register(&test_app.app, paid_put(135.0)).await;

    let app = test_app.app.clone();
    let body = json!({"policyId": id, "observedPrice": 130.0});
    let resolving = tokio::spawn(async move { send(&app, "POST", "/v1/resolve", Some(body)).await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    let uri = format!("/v1/policies/{}", id);
    let (status, err) = send(&test_app.app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(err["error"].as_str().unwrap().contains("being resolved"));

    let (status, resolved) = resolving.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["outcome"], "resolved");
    assert_eq!(test_app.payout.sent_count(), 1);

    let (status, policy) = send(&test_app.app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(policy["status"], "RESOLVED");
}

async fn send_raw(app: &axum::Router, uri: &str, content_type: Option<&str>, body: &str) -> (StatusCode, Value) {
    let mut builder = axum::http::Request::builder().method("POST").uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header("content-type", content_type);
    }
    let req = builder.body(axum::body::Body::from(body.to_string())).unwrap();

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_malformed_bodies_return_json_bad_request() {
    let test_app = setup_test_app();

    let (status, err) = send_raw(&test_app.app, "/v1/quote", Some("application/json"), "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["error"].is_string());

    let (status, err) = send_raw(
        &test_app.app,
        "/v1/policies",
        Some("application/json"),
        r#"{"barrierPrice": "cheap", "coverageAmount": 1000}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["error"].is_string());

    let (status, err) = send_raw(&test_app.app, "/v1/resolve", None, "{}").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["error"].is_string());
    assert_eq!(test_app.store.count(), 0);
}
