use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::Request;
use stockwatch_core::{AvailabilitySnapshot, Catalog, Clock, StoreConfig, SystemClock, Variant};
use stockwatch_notify::{DeliveryId, NotificationSender, NotifyError};
use stockwatch_scraper::{AvailabilitySource, ScraperError, SourceChain, UnavailableDefault};
use stockwatch_tracker::{Notifier, SmsRoute};
use tower::ServiceExt;

use super::*;

fn catalog() -> Arc<Catalog> {
    Arc::new(Catalog {
        product_name: "iPhone 17 Pro Max".to_string(),
        product_url: "https://example.test/buy".to_string(),
        pickup_url: "https://example.test/pickup".to_string(),
        preferred_sku: "MZ7C3ZP/A".to_string(),
        variants: vec![Variant {
            sku: "MZ7C3ZP/A".to_string(),
            model: "Pro Max".to_string(),
            storage: "256GB".to_string(),
            color: "Silver".to_string(),
        }],
        stores: vec![
            StoreConfig {
                id: "R669".to_string(),
                name: "Apple Orchard Road".to_string(),
                address: String::new(),
            },
            StoreConfig {
                id: "R673".to_string(),
                name: "Apple Marina Bay Sands".to_string(),
                address: String::new(),
            },
        ],
    })
}

struct FailingSource;

#[async_trait]
impl AvailabilitySource for FailingSource {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn fetch(
        &self,
        _variants: &[Variant],
        _stores: &[StoreConfig],
    ) -> Result<AvailabilitySnapshot, ScraperError> {
        Err(ScraperError::NoData {
            source_name: "failing",
        })
    }
}

struct EchoSender;

#[async_trait]
impl NotificationSender for EchoSender {
    async fn send(&self, _to: &str, _from: &str, _body: &str) -> Result<DeliveryId, NotifyError> {
        Ok(DeliveryId("SM-test".to_string()))
    }
}

async fn state_with(source: Box<dyn AvailabilitySource>, sender: bool) -> AppState {
    let catalog = catalog();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut notifier = Notifier::new(Arc::clone(&catalog), Arc::clone(&clock), 30, 10);
    if sender {
        notifier = notifier.with_sender(
            Arc::new(EchoSender),
            SmsRoute {
                from: "+15550001111".to_string(),
                to: "+6590000000".to_string(),
            },
        );
    }
    let tracker = Arc::new(Tracker::new(
        catalog,
        SourceChain::new(vec![source]),
        Arc::new(notifier),
        Arc::clone(&clock),
    ));
    let scheduler = CheckScheduler::new(Arc::clone(&tracker), clock, 5, false)
        .await
        .expect("scheduler");
    AppState {
        tracker,
        scheduler: Arc::new(scheduler),
    }
}

async fn default_state() -> AppState {
    state_with(Box::new(UnavailableDefault), false).await
}

fn app(state: AppState) -> Router {
    build_app(state, AuthState::disabled(), default_rate_limit_state())
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    body: Option<&str>,
) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    let request = builder
        .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
        .expect("request");
    app.oneshot(request).await.expect("response")
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&body).expect("json parse")
}

#[test]
fn api_error_codes_map_to_statuses() {
    let cases = [
        ("validation_error", StatusCode::BAD_REQUEST),
        ("conflict", StatusCode::CONFLICT),
        ("upstream_error", StatusCode::BAD_GATEWAY),
        ("not_configured", StatusCode::SERVICE_UNAVAILABLE),
        ("something_else", StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (code, status) in cases {
        let response = ApiError::new("req-1", code, "message").into_response();
        assert_eq!(response.status(), status, "code {code}");
    }
}

#[test]
fn history_limit_defaults_and_bounds() {
    assert_eq!(checks::validate_history_limit(None), Ok(10));
    assert_eq!(checks::validate_history_limit(Some(1)), Ok(1));
    assert_eq!(checks::validate_history_limit(Some(100)), Ok(100));
    assert!(checks::validate_history_limit(Some(0)).is_err());
    assert!(checks::validate_history_limit(Some(101)).is_err());
    assert!(checks::validate_history_limit(Some(-3)).is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn health_reports_scheduler_state_and_echoes_request_id() {
    let response = app(default_state().await)
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .header("x-request-id", "req-health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("req-health")
    );
    let json = json_body(response).await;
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["data"]["scheduler"], "stopped");
    assert_eq!(json["meta"]["request_id"], "req-health");
}

#[tokio::test(flavor = "multi_thread")]
async fn status_combines_scheduler_tracker_and_gate() {
    let response = send(app(default_state().await), Method::GET, "/api/v1/status", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let data = &json["data"];
    assert_eq!(data["scheduler"]["interval_minutes"], 5);
    assert_eq!(data["tracker"]["total_checks"], 0);
    assert_eq!(data["tracker"]["checking"], false);
    assert_eq!(data["notifications"]["daily_count"], 0);
    assert_eq!(data["notifications"]["daily_limit"], 10);
    assert_eq!(data["sms_configured"], false);
    assert_eq!(data["catalog"]["preferred_sku"], "MZ7C3ZP/A");
    assert_eq!(data["catalog"]["stores"].as_array().map(Vec::len), Some(2));
}

#[tokio::test(flavor = "multi_thread")]
async fn manual_check_returns_summary_and_lands_in_history() {
    let state = default_state().await;

    let response = send(app(state.clone()), Method::POST, "/api/v1/check", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["trigger"], "manual");
    assert_eq!(json["data"]["source"], "unavailable_default");
    assert_eq!(json["data"]["stores_checked"], 2);
    assert_eq!(json["data"]["available_stores"], serde_json::json!([]));

    let response = send(app(state), Method::GET, "/api/v1/history?limit=5", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["records"].as_array().map(Vec::len), Some(1));
    assert_eq!(
        json["data"]["current"]["R669"]["message"],
        stockwatch_core::availability::NOT_AVAILABLE_MESSAGE
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_check_maps_to_bad_gateway() {
    let state = state_with(Box::new(FailingSource), false).await;
    let response = send(app(state), Method::POST, "/api/v1/check", None).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "upstream_error");
}

#[tokio::test(flavor = "multi_thread")]
async fn history_rejects_out_of_range_limit() {
    let response = send(
        app(default_state().await),
        Method::GET,
        "/api/v1/history?limit=500",
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test(flavor = "multi_thread")]
async fn interval_update_validates_range() {
    let state = default_state().await;

    for bad in ["0", "61", "-5"] {
        let body = format!(r#"{{"minutes":{bad}}}"#);
        let response = send(
            app(state.clone()),
            Method::PUT,
            "/api/v1/config/interval",
            Some(&body),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "minutes {bad}");
    }

    let response = send(
        app(state.clone()),
        Method::PUT,
        "/api/v1/config/interval",
        Some(r#"{"minutes":15}"#),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["interval_minutes"], 15);
    assert_eq!(state.scheduler.status().await.interval_minutes, 15);
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_interval_body_uses_error_envelope() {
    let state = default_state().await;

    for bad in [r#"{"minutes":2.5}"#, r#"{"minutes":"ten"}"#, "{}", "not json"] {
        let response = send(
            app(state.clone()),
            Method::PUT,
            "/api/v1/config/interval",
            Some(bad),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {bad}");
        let json = json_body(response).await;
        assert_eq!(json["error"]["code"], "validation_error", "body {bad}");
    }
    assert_eq!(state.scheduler.status().await.interval_minutes, 5);
}

#[tokio::test(flavor = "multi_thread")]
async fn pause_and_resume_report_scheduler_state() {
    let state = default_state().await;

    let response = send(app(state.clone()), Method::POST, "/api/v1/scheduler/resume", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["data"]["state"], "running");

    let response = send(app(state.clone()), Method::POST, "/api/v1/scheduler/pause", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["data"]["state"], "paused");

    state.scheduler.shutdown().await.expect("shutdown");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sms_without_credentials_is_service_unavailable() {
    let response = send(
        app(default_state().await),
        Method::POST,
        "/api/v1/notifications/test",
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "not_configured");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sms_returns_message_id() {
    let state = state_with(Box::new(UnavailableDefault), true).await;
    let response = send(app(state), Method::POST, "/api/v1/notifications/test", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["message_id"], "SM-test");
}

#[tokio::test(flavor = "multi_thread")]
async fn protected_routes_require_bearer_token_when_keys_configured() {
    let auth = AuthState::from_keys("secret-key", false).expect("auth");
    let state = default_state().await;

    let app = build_app(state.clone(), auth.clone(), default_rate_limit_state());
    let response = send(app, Method::GET, "/api/v1/status", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let app = build_app(state.clone(), auth.clone(), default_rate_limit_state());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/status")
                .header(header::AUTHORIZATION, "Bearer secret-key")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let app = build_app(state, auth, default_rate_limit_state());
    let response = send(app, Method::GET, "/api/v1/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test(flavor = "multi_thread")]
async fn rate_limit_rejects_requests_past_the_window_budget() {
    let state = default_state().await;
    let app = build_app(
        state,
        AuthState::disabled(),
        RateLimitState::new(1, Duration::from_secs(60)),
    );

    let first = send(app.clone(), Method::GET, "/api/v1/status", None).await;
    assert_eq!(first.status(), StatusCode::OK);
    let second = send(app, Method::GET, "/api/v1/status", None).await;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(second.headers().contains_key(header::RETRY_AFTER));
}
