//! The availability-source contract and its fallback chain.

use async_trait::async_trait;
use stockwatch_core::{
    AppConfig, AvailabilitySnapshot, Catalog, StoreAvailability, StoreConfig, Variant,
};

use crate::client::{ClientOptions, PickupClient};
use crate::error::ScraperError;
use crate::page::{HttpPageRenderer, PageScraper};

/// Anything that can report current pickup availability for a set of stores.
///
/// Implementations return one entry per store they have facts for. A failure
/// means "no usable answer"; the [`SourceChain`] then moves on.
#[async_trait]
pub trait AvailabilitySource: Send + Sync {
    /// Short identifier recorded in check history, e.g. `"pickup_api"`.
    fn name(&self) -> &'static str;

    async fn fetch(
        &self,
        variants: &[Variant],
        stores: &[StoreConfig],
    ) -> Result<AvailabilitySnapshot, ScraperError>;
}

/// A snapshot together with the strategy that produced it.
#[derive(Debug, Clone)]
pub struct SourcedSnapshot {
    pub source: &'static str,
    pub snapshot: AvailabilitySnapshot,
}

/// Ordered list of strategies, tried until one succeeds.
pub struct SourceChain {
    sources: Vec<Box<dyn AvailabilitySource>>,
}

impl SourceChain {
    #[must_use]
    pub fn new(sources: Vec<Box<dyn AvailabilitySource>>) -> Self {
        Self { sources }
    }

    /// The production chain: the pickup API, then the product page when
    /// `scrape_fallback` is on, then [`UnavailableDefault`].
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if an HTTP client cannot be built.
    pub fn standard(catalog: &Catalog, config: &AppConfig) -> Result<Self, ScraperError> {
        let options = ClientOptions::from_app_config(config);
        let mut sources: Vec<Box<dyn AvailabilitySource>> = vec![Box::new(PickupClient::new(
            &catalog.pickup_url,
            &catalog.product_url,
            &options,
        )?)];

        if config.scrape_fallback {
            let renderer = HttpPageRenderer::new(&options)?;
            sources.push(Box::new(PageScraper::new(
                Box::new(renderer),
                &catalog.product_url,
                &catalog.preferred_sku,
            )));
        }

        sources.push(Box::new(UnavailableDefault));
        Ok(Self::new(sources))
    }

    /// Names of the strategies in the order they are tried.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Try each strategy in order and return the first success.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::AllSourcesFailed`] carrying the last failure
    /// when every strategy fails (or the chain is empty).
    pub async fn fetch(
        &self,
        variants: &[Variant],
        stores: &[StoreConfig],
    ) -> Result<SourcedSnapshot, ScraperError> {
        let mut last = String::from("no availability sources configured");

        for source in &self.sources {
            match source.fetch(variants, stores).await {
                Ok(snapshot) => {
                    tracing::debug!(
                        source = source.name(),
                        stores = snapshot.len(),
                        "availability source succeeded"
                    );
                    return Ok(SourcedSnapshot {
                        source: source.name(),
                        snapshot,
                    });
                }
                Err(e) => {
                    tracing::info!(
                        source = source.name(),
                        error = %e,
                        "availability source failed; trying next"
                    );
                    last = e.to_string();
                }
            }
        }

        Err(ScraperError::AllSourcesFailed { last })
    }
}

/// Reports every store as unavailable. Never fails.
///
/// Used as the last link of the chain: when the retailer has no pickup data at
/// all the product is treated as not yet stocked rather than as an error.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableDefault;

#[async_trait]
impl AvailabilitySource for UnavailableDefault {
    fn name(&self) -> &'static str {
        "unavailable_default"
    }

    async fn fetch(
        &self,
        _variants: &[Variant],
        stores: &[StoreConfig],
    ) -> Result<AvailabilitySnapshot, ScraperError> {
        tracing::info!(
            stores = stores.len(),
            "no store availability data; marking all stores unavailable"
        );
        Ok(stores
            .iter()
            .map(|s| (s.id.clone(), StoreAvailability::unavailable(s)))
            .collect())
    }
}
