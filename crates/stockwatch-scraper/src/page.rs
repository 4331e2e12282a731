//! Page-scrape availability: reads per-store pickup markup from the product
//! page when the structured endpoint has nothing to say.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use stockwatch_core::{
    AvailabilitySnapshot, AvailableVariant, StoreAvailability, StoreConfig, Variant,
};

use crate::client::ClientOptions;
use crate::error::ScraperError;
use crate::source::AvailabilitySource;

static STORE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)data-store-id\s*=\s*["']([^"']+)["']"#).expect("valid store id regex")
});
static STATUS_RE: LazyLock<Regex> =
    LazyLock::new(|| class_regex("rf-pickup-store-availability"));
static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| class_regex("rf-pickup-store-address"));
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<[^>]+>").expect("valid tags regex"));

const BROWSER_FALLBACK_UA: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const HTML_FETCH_BACKOFF_MS: [u64; 3] = [0, 300, 900];

/// Produces the HTML of a page.
///
/// The default implementation is a plain HTTP GET. A browser-backed renderer
/// can be slotted in for pages that only populate pickup data client-side.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<String, ScraperError>;
}

/// Renders a page by fetching its HTML over HTTP.
pub struct HttpPageRenderer {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpPageRenderer {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(options: &ClientOptions) -> Result<Self, ScraperError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            user_agent: options.user_agent.clone(),
        })
    }
}

#[async_trait]
impl PageRenderer for HttpPageRenderer {
    /// Tries the configured user agent, then a browser user agent, with a
    /// short backoff between rounds. Bot-challenge interstitials are rejected.
    async fn render(&self, url: &str) -> Result<String, ScraperError> {
        let mut user_agents = vec![self.user_agent.as_str()];
        if self.user_agent != BROWSER_FALLBACK_UA {
            user_agents.push(BROWSER_FALLBACK_UA);
        }

        let mut last_reason = String::from("no attempt made");

        for (attempt, delay_ms) in HTML_FETCH_BACKOFF_MS.iter().copied().enumerate() {
            if delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }

            for ua in &user_agents {
                let response = match self
                    .client
                    .get(url)
                    .header(reqwest::header::USER_AGENT, *ua)
                    .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml")
                    .header(reqwest::header::ACCEPT_LANGUAGE, "en-SG,en;q=0.9")
                    .send()
                    .await
                {
                    Ok(resp) => resp,
                    Err(err) => {
                        tracing::debug!(url, attempt, error = %err, "page fetch failed");
                        last_reason = err.to_string();
                        continue;
                    }
                };

                let status = response.status();
                if !status.is_success() {
                    last_reason = format!("HTTP {}", status.as_u16());
                    continue;
                }

                let body = response.text().await?;
                if is_usable_html(&body) {
                    return Ok(body);
                }
                last_reason = "empty body or bot challenge".to_string();
            }
        }

        Err(ScraperError::UnusablePage {
            url: url.to_owned(),
            reason: last_reason,
        })
    }
}

pub(crate) fn is_usable_html(body: &str) -> bool {
    let trimmed = body.trim();
    !trimmed.is_empty() && !looks_like_bot_challenge(trimmed)
}

fn looks_like_bot_challenge(body: &str) -> bool {
    let lowered = body.to_ascii_lowercase();
    let has_just_a_moment = lowered.contains("just a moment...");
    let has_cookie_gate = lowered.contains("please enable cookies");

    lowered.contains("attention required! | cloudflare")
        || lowered.contains("/cdn-cgi/challenge-platform/")
        || (has_just_a_moment && has_cookie_gate)
}

/// Availability from the product page's store-pickup markup.
///
/// The page is configured for a single variant, so every store that shows as
/// available is credited with `page_sku` (or the first variant when that SKU
/// is not among those requested).
pub struct PageScraper {
    renderer: Box<dyn PageRenderer>,
    page_url: String,
    page_sku: String,
}

impl PageScraper {
    #[must_use]
    pub fn new(renderer: Box<dyn PageRenderer>, page_url: &str, page_sku: &str) -> Self {
        Self {
            renderer,
            page_url: page_url.to_owned(),
            page_sku: page_sku.to_owned(),
        }
    }
}

#[async_trait]
impl AvailabilitySource for PageScraper {
    fn name(&self) -> &'static str {
        "page_scrape"
    }

    async fn fetch(
        &self,
        variants: &[Variant],
        stores: &[StoreConfig],
    ) -> Result<AvailabilitySnapshot, ScraperError> {
        let html = self.renderer.render(&self.page_url).await?;
        let variant = variants
            .iter()
            .find(|v| v.sku == self.page_sku)
            .or_else(|| variants.first());

        let mut snapshot = AvailabilitySnapshot::new();
        for block in extract_store_blocks(&html) {
            let Some(store) = stores.iter().find(|s| s.id == block.store_id) else {
                continue;
            };
            let mut entry = StoreAvailability::unavailable(store);
            if entry.address.is_empty() {
                if let Some(address) = block.address {
                    entry.address = address;
                }
            }
            match (block.available, variant) {
                (true, Some(variant)) => entry.push_variant(AvailableVariant {
                    variant: variant.clone(),
                    pickup_quote: block.status_text,
                }),
                _ => {
                    if let Some(text) = block.status_text {
                        entry.message = text;
                    }
                }
            }
            snapshot.insert(store.id.clone(), entry);
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

/// One `data-store-id` element and what it says about pickup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoreBlock {
    pub store_id: String,
    pub available: bool,
    pub status_text: Option<String>,
    pub address: Option<String>,
}

/// Split the page at each `data-store-id` attribute and read the markup up to
/// the next one. The first block for a given store id wins.
pub(crate) fn extract_store_blocks(html: &str) -> Vec<StoreBlock> {
    let starts: Vec<(usize, String)> = STORE_ID_RE
        .captures_iter(html)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let id = caps.get(1)?.as_str().trim().to_owned();
            Some((whole.start(), id))
        })
        .collect();

    let mut blocks: Vec<StoreBlock> = Vec::new();
    for (i, (start, store_id)) in starts.iter().enumerate() {
        if blocks.iter().any(|b| &b.store_id == store_id) {
            continue;
        }
        let end = starts.get(i + 1).map_or(html.len(), |(next, _)| *next);
        let segment = &html[*start..end];

        let status_text = class_text(segment, &STATUS_RE);
        let has_marker = segment.contains(r#"data-autom="pickupAvailable""#);
        blocks.push(StoreBlock {
            store_id: store_id.clone(),
            available: has_marker || status_text.as_deref().is_some_and(says_available),
            status_text,
            address: class_text(segment, &ADDRESS_RE),
        });
    }
    blocks
}

/// Positive-only: "available" must be present and no negative wording.
pub(crate) fn says_available(text: &str) -> bool {
    let lowered = text.to_ascii_lowercase();
    lowered.contains("available")
        && !lowered.contains("unavailable")
        && !lowered.contains("not available")
}

/// Matches the first element whose `class` contains `class_name`, capturing
/// its inner markup.
fn class_regex(class_name: &str) -> Regex {
    let pattern = format!(
        r#"(?is)class\s*=\s*["'][^"']*\b{}\b[^"']*["'][^>]*>(.*?)</[a-z0-9]+>"#,
        regex::escape(class_name)
    );
    Regex::new(&pattern).expect("valid class regex")
}

/// Tag-stripped, whitespace-collapsed text of the element `re` matches.
fn class_text(segment: &str, re: &Regex) -> Option<String> {
    let inner = re.captures(segment)?.get(1)?.as_str();
    let text = TAG_RE.replace_all(inner, " ");
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

#[cfg(test)]
#[path = "page_test.rs"]
mod tests;
