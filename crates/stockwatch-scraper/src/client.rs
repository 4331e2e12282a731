use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use stockwatch_core::{
    AppConfig, AvailabilitySnapshot, AvailableVariant, StoreAvailability, StoreConfig, Variant,
};

use crate::error::ScraperError;
use crate::parse::parse_pickup_response;
use crate::retry::RetryPolicy;
use crate::source::AvailabilitySource;
use crate::types::PickupMessageResponse;

/// HTTP tuning shared by every outbound request.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Additional attempts after the first failure for retriable errors.
    pub max_retries: u32,
    /// Base delay for exponential backoff, in milliseconds.
    pub retry_backoff_base_ms: u64,
    /// Upper bound on in-flight variant requests.
    pub max_concurrent_fetches: usize,
}

impl ClientOptions {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.request_timeout_secs,
            user_agent: config.user_agent.clone(),
            max_retries: config.max_retries,
            retry_backoff_base_ms: config.retry_backoff_base_ms,
            max_concurrent_fetches: config.max_concurrent_fetches.max(1),
        }
    }
}

/// Client for the retailer's structured `pickup-message` endpoint.
///
/// One request is issued per variant, each asking about every configured
/// store at once. Variant requests run concurrently (bounded by
/// [`ClientOptions::max_concurrent_fetches`]); a variant whose request fails
/// is logged and skipped so one bad SKU never hides the others.
///
/// Transient errors (429, timeouts, 5xx) are retried with exponential backoff.
pub struct PickupClient {
    client: Client,
    pickup_url: String,
    referer: String,
    retry: RetryPolicy,
    max_concurrent_fetches: usize,
}

impl PickupClient {
    /// Creates a client for `pickup_url`, sending `referer` on every request.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        pickup_url: &str,
        referer: &str,
        options: &ClientOptions,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(options.user_agent.as_str())
            .build()?;
        Ok(Self {
            client,
            pickup_url: pickup_url.to_owned(),
            referer: referer.to_owned(),
            retry: RetryPolicy::new(options.max_retries, options.retry_backoff_base_ms),
            max_concurrent_fetches: options.max_concurrent_fetches.max(1),
        })
    }

    /// Fetches the raw pickup payload for one SKU across `store_ids`.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::InvalidUrl`] if the configured endpoint does not parse.
    /// - [`ScraperError::RateLimited`] if HTTP 429 persists after all retries.
    /// - [`ScraperError::NotFound`] on HTTP 404 (not retried).
    /// - [`ScraperError::UnexpectedStatus`] on any other non-2xx status.
    /// - [`ScraperError::Http`] on network failure after all retries.
    /// - [`ScraperError::Deserialize`] if the body is not the expected JSON.
    pub async fn fetch_pickup_message(
        &self,
        sku: &str,
        store_ids: &[&str],
    ) -> Result<PickupMessageResponse, ScraperError> {
        let url = pickup_message_url(&self.pickup_url, sku, store_ids)?;

        self.retry.run(|| {
            let url = url.clone();
            async move {
                let response = self
                    .client
                    .get(url.as_str())
                    .header(reqwest::header::ACCEPT, "application/json")
                    .header(reqwest::header::ACCEPT_LANGUAGE, "en-SG,en;q=0.9")
                    .header(reqwest::header::REFERER, self.referer.as_str())
                    .send()
                    .await?;
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(0);
                    return Err(ScraperError::RateLimited {
                        domain: url.host_str().unwrap_or_default().to_owned(),
                        retry_after_secs,
                    });
                }

                if status == reqwest::StatusCode::NOT_FOUND {
                    return Err(ScraperError::NotFound {
                        url: url.to_string(),
                    });
                }

                if !status.is_success() {
                    return Err(ScraperError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }

                let body = response.text().await?;
                serde_json::from_str::<PickupMessageResponse>(&body).map_err(|e| {
                    ScraperError::Deserialize {
                        context: format!("pickup message for {sku}"),
                        source: e,
                    }
                })
            }
        })
        .await
    }
}

#[async_trait]
impl AvailabilitySource for PickupClient {
    fn name(&self) -> &'static str {
        "pickup_api"
    }

    async fn fetch(
        &self,
        variants: &[Variant],
        stores: &[StoreConfig],
    ) -> Result<AvailabilitySnapshot, ScraperError> {
        let store_ids: Vec<&str> = stores.iter().map(|s| s.id.as_str()).collect();
        let owned_ids: Arc<[String]> = stores.iter().map(|s| s.id.clone()).collect();

        let responses: Vec<_> = stream::iter(variants.iter().cloned())
            .map(move |variant| {
                let ids = Arc::clone(&owned_ids);
                async move {
                    let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
                    let result = self.fetch_pickup_message(&variant.sku, &ids).await;
                    (variant, result)
                }
            })
            .buffered(self.max_concurrent_fetches)
            .collect()
            .await;

        let mut snapshot = AvailabilitySnapshot::new();
        for (variant, result) in responses {
            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(sku = %variant.sku, error = %e, "variant pickup check failed; skipping");
                    continue;
                }
            };

            for pickup in parse_pickup_response(&response, &variant.sku, &store_ids) {
                let Some(store) = stores.iter().find(|s| s.id == pickup.store_id) else {
                    continue;
                };
                let entry = snapshot.entry(store.id.clone()).or_insert_with(|| {
                    let mut entry = StoreAvailability::unavailable(store);
                    if entry.address.is_empty() {
                        if let Some(address) = &pickup.address {
                            entry.address.clone_from(address);
                        }
                    }
                    entry
                });

                if pickup.available {
                    entry.push_variant(AvailableVariant {
                        variant: variant.clone(),
                        pickup_quote: pickup.pickup_quote,
                    });
                }
            }
        }

        if snapshot.is_empty() {
            return Err(ScraperError::NoData {
                source_name: self.name(),
            });
        }

        for store in stores {
            snapshot
                .entry(store.id.clone())
                .or_insert_with(|| StoreAvailability::unavailable(store));
        }

        Ok(snapshot)
    }
}

/// Builds `{pickup_url}?parts.0={sku}&searchNearby=true&store={ids}`.
///
/// Query values are encoded by `reqwest::Url`; the store list is
/// comma-joined.
pub(crate) fn pickup_message_url(
    pickup_url: &str,
    sku: &str,
    store_ids: &[&str],
) -> Result<reqwest::Url, ScraperError> {
    let mut url = reqwest::Url::parse(pickup_url).map_err(|e| ScraperError::InvalidUrl {
        url: pickup_url.to_owned(),
        reason: e.to_string(),
    })?;
    url.query_pairs_mut()
        .append_pair("parts.0", sku)
        .append_pair("searchNearby", "true")
        .append_pair("store", &store_ids.join(","));
    Ok(url)
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
