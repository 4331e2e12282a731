//! Integration tests for `TwilioClient` using wiremock HTTP mocks.

use stockwatch_notify::{DeliveryId, NotificationSender, NotifyError, TwilioClient};
use wiremock::matchers::{body_string_contains, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MESSAGES_PATH: &str = "/2010-04-01/Accounts/AC0123456789/Messages.json";

fn test_client(base_url: &str) -> TwilioClient {
    TwilioClient::with_base_url("AC0123456789", "secret-token", 5, base_url)
        .expect("client construction should not fail")
}

#[tokio::test]
async fn send_posts_form_and_returns_sid() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .and(header_exists("authorization"))
        .and(body_string_contains("To=%2B6591234567"))
        .and(body_string_contains("From=%2B15005550006"))
        .and(body_string_contains("Body=hello+there"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "sid": "SM9f2c",
            "status": "queued",
            "body": "hello there"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let id = test_client(&server.uri())
        .send("+6591234567", "+15005550006", "hello there")
        .await
        .expect("send should succeed");

    assert_eq!(id, DeliveryId("SM9f2c".to_string()));
}

#[tokio::test]
async fn provider_error_surfaces_code_and_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "code": 21211,
            "message": "The 'To' number is not a valid phone number.",
            "more_info": "https://www.twilio.com/docs/errors/21211",
            "status": 400
        })))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .send("not-a-number", "+15005550006", "hi")
        .await
        .unwrap_err();

    match err {
        NotifyError::Api {
            status,
            code,
            message,
        } => {
            assert_eq!(status, 400);
            assert_eq!(code, Some(21211));
            assert!(message.contains("not a valid phone number"));
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn non_json_error_body_falls_back_to_reason() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .send("+6591234567", "+15005550006", "hi")
        .await
        .unwrap_err();

    assert!(
        matches!(err, NotifyError::Api { status: 503, code: None, ref message } if message == "Service Unavailable"),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn success_without_sid_is_a_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({ "status": "queued" })))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .send("+6591234567", "+15005550006", "hi")
        .await
        .unwrap_err();

    assert!(matches!(err, NotifyError::Deserialize { .. }), "got: {err:?}");
}
