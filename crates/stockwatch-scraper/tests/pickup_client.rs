//! Integration tests for `PickupClient` against a local mock endpoint.
//!
//! Each test stands up its own `wiremock` server so no real network traffic
//! is made.

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stockwatch_core::{StoreConfig, Variant};
use stockwatch_scraper::{
    AvailabilitySource, ClientOptions, PickupClient, ScraperError, SourceChain,
    UnavailableDefault,
};

const PREFERRED: &str = "MZ7C3ZP/A";
const OTHER: &str = "MZ7E3ZP/A";

fn options(max_retries: u32) -> ClientOptions {
    ClientOptions {
        timeout_secs: 5,
        user_agent: "stockwatch-test/0.1".to_string(),
        max_retries,
        retry_backoff_base_ms: 0,
        max_concurrent_fetches: 2,
    }
}

fn client(server: &MockServer, max_retries: u32) -> PickupClient {
    PickupClient::new(
        &format!("{}/sg/shop/retail/pickup-message", server.uri()),
        "https://www.apple.com/sg/shop/buy-iphone/iphone-17-pro",
        &options(max_retries),
    )
    .expect("failed to build test PickupClient")
}

fn variant(sku: &str, color: &str) -> Variant {
    Variant {
        sku: sku.to_string(),
        model: "Pro Max".to_string(),
        storage: "256GB".to_string(),
        color: color.to_string(),
    }
}

fn stores() -> Vec<StoreConfig> {
    vec![
        StoreConfig {
            id: "R669".to_string(),
            name: "Apple Orchard Road".to_string(),
            address: "270 Orchard Road".to_string(),
        },
        StoreConfig {
            id: "R673".to_string(),
            name: "Apple Marina Bay Sands".to_string(),
            address: String::new(),
        },
        StoreConfig {
            id: "R676".to_string(),
            name: "Apple Jewel Changi Airport".to_string(),
            address: "78 Airport Boulevard".to_string(),
        },
    ]
}

fn pickup_body(sku: &str, r669: &str, r673: &str) -> serde_json::Value {
    json!({
        "body": {
            "stores": [
                {
                    "storeNumber": "R669",
                    "storeName": "Orchard Road",
                    "partsAvailability": { sku: { "pickupDisplay": r669, "pickupSearchQuote": "Today" } }
                },
                {
                    "storeNumber": "R673",
                    "storeName": "Marina Bay Sands",
                    "address": { "address": "10 Bayfront Avenue" },
                    "partsAvailability": { sku: { "pickupDisplay": r673 } }
                }
            ]
        }
    })
}

#[tokio::test]
async fn merges_variants_and_pads_missing_stores() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sg/shop/retail/pickup-message"))
        .and(query_param("parts.0", PREFERRED))
        .and(query_param("searchNearby", "true"))
        .and(query_param("store", "R669,R673,R676"))
        .and(header("accept", "application/json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(pickup_body(PREFERRED, "available", "unavailable")),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sg/shop/retail/pickup-message"))
        .and(query_param("parts.0", OTHER))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(pickup_body(OTHER, "available", "available")),
        )
        .mount(&server)
        .await;

    let variants = vec![variant(PREFERRED, "Silver"), variant(OTHER, "Cosmic Orange")];
    let snapshot = client(&server, 0).fetch(&variants, &stores()).await.unwrap();

    assert_eq!(snapshot.len(), 3);

    let r669 = &snapshot["R669"];
    assert!(r669.available);
    assert_eq!(r669.name, "Apple Orchard Road", "configured name wins");
    assert_eq!(r669.address, "270 Orchard Road");
    assert_eq!(r669.available_variants.len(), 2);
    assert_eq!(r669.message, "2 variant(s) available");
    assert_eq!(r669.available_variants[0].variant.sku, PREFERRED);
    assert_eq!(
        r669.available_variants[0].pickup_quote.as_deref(),
        Some("Today")
    );

    let r673 = &snapshot["R673"];
    assert!(r673.available);
    assert!(!r673.offers_sku(PREFERRED));
    assert_eq!(r673.address, "10 Bayfront Avenue", "response address fills gaps");

    let r676 = &snapshot["R676"];
    assert!(!r676.available);
    assert_eq!(r676.message, "Not yet available for pickup");
}

#[tokio::test]
async fn fetch_runs_on_spawned_task_and_ignores_unlisted_stores() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "stores": [
                {
                    "storeNumber": "R999",
                    "storeName": "Somewhere Else",
                    "partsAvailability": { PREFERRED: { "pickupDisplay": "available" } }
                },
                {
                    "storeNumber": "R676",
                    "storeName": "Jewel Changi Airport",
                    "partsAvailability": { PREFERRED: { "pickupDisplay": "available" } }
                }
            ]
        })))
        .mount(&server)
        .await;

    let source: Box<dyn AvailabilitySource> = Box::new(client(&server, 0));
    let variants = vec![variant(PREFERRED, "Silver"), variant(OTHER, "Cosmic Orange")];
    let snapshot = tokio::spawn(async move { source.fetch(&variants, &stores()).await })
        .await
        .expect("fetch task panicked")
        .unwrap();

    let keys: Vec<&str> = snapshot.keys().map(String::as_str).collect();
    assert_eq!(keys, ["R669", "R673", "R676"]);
    assert!(snapshot["R676"].offers_sku(PREFERRED));
    assert_eq!(snapshot["R676"].name, "Apple Jewel Changi Airport");
    assert!(!snapshot["R669"].available);
}

#[tokio::test]
async fn failed_variant_is_skipped() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("parts.0", PREFERRED))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(pickup_body(PREFERRED, "available", "unavailable")),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("parts.0", OTHER))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let variants = vec![variant(PREFERRED, "Silver"), variant(OTHER, "Cosmic Orange")];
    let snapshot = client(&server, 0).fetch(&variants, &stores()).await.unwrap();

    assert!(snapshot["R669"].offers_sku(PREFERRED));
    assert_eq!(snapshot["R669"].available_variants.len(), 1);
}

#[tokio::test]
async fn no_store_data_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "body": {} })))
        .mount(&server)
        .await;

    let err = client(&server, 0)
        .fetch(&[variant(PREFERRED, "Silver")], &stores())
        .await
        .unwrap_err();
    assert!(
        matches!(err, ScraperError::NoData { source_name: "pickup_api" }),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn chain_falls_back_to_all_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let chain = SourceChain::new(vec![
        Box::new(client(&server, 0)),
        Box::new(UnavailableDefault),
    ]);
    let result = chain
        .fetch(&[variant(PREFERRED, "Silver")], &stores())
        .await
        .unwrap();

    assert_eq!(result.source, "unavailable_default");
    assert_eq!(result.snapshot.len(), 3);
    assert!(result.snapshot.values().all(|s| !s.available));
}

#[tokio::test]
async fn rate_limit_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(pickup_body(PREFERRED, "available", "unavailable")),
        )
        .mount(&server)
        .await;

    let response = client(&server, 2)
        .fetch_pickup_message(PREFERRED, &["R669"])
        .await
        .unwrap();
    assert_eq!(response.stores().len(), 2);
}

#[tokio::test]
async fn not_found_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, 3)
        .fetch_pickup_message(PREFERRED, &["R669"])
        .await
        .unwrap_err();
    assert!(matches!(err, ScraperError::NotFound { .. }), "got: {err:?}");
}

#[tokio::test]
async fn malformed_body_is_a_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
        .mount(&server)
        .await;

    let err = client(&server, 0)
        .fetch_pickup_message(PREFERRED, &["R669"])
        .await
        .unwrap_err();
    assert!(
        matches!(err, ScraperError::Deserialize { .. }),
        "got: {err:?}"
    );
}
