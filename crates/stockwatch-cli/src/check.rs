//! `check` and `test-sms` command handlers.

use std::sync::Arc;

use serde::Serialize;
use stockwatch_core::{AppConfig, AvailabilitySnapshot, Catalog, Clock, SystemClock};
use stockwatch_notify::{NotificationSender, TwilioClient, TEST_MESSAGE};
use stockwatch_scraper::SourceChain;
use stockwatch_tracker::{CheckOutcome, CheckSummary, Notifier, SmsRoute, Tracker, Trigger};

/// Printed by `check`: what the cycle did and the snapshot it produced.
#[derive(Debug, Serialize)]
pub(crate) struct CheckReport {
    pub summary: CheckSummary,
    pub snapshot: AvailabilitySnapshot,
}

/// Build the notifier for a one-shot run. With `dry_run`, or without Twilio
/// credentials, alerts resolve as not configured and nothing is sent.
pub(crate) fn build_notifier(
    config: &AppConfig,
    catalog: Arc<Catalog>,
    clock: Arc<dyn Clock>,
    dry_run: bool,
) -> anyhow::Result<Notifier> {
    let notifier = Notifier::new(
        catalog,
        clock,
        config.cooldown_minutes,
        config.max_notifications_per_day,
    );

    match (&config.twilio, dry_run) {
        (Some(twilio), false) => {
            let client = TwilioClient::from_config(twilio, config.request_timeout_secs)?;
            Ok(notifier.with_sender(Arc::new(client), SmsRoute::from(twilio)))
        }
        (Some(_), true) => {
            tracing::info!("dry-run: SMS delivery disabled");
            Ok(notifier)
        }
        (None, _) => Ok(notifier),
    }
}

pub(crate) fn render_report(report: &CheckReport) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Run one manual cycle against the configured catalog and print the result.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded, an HTTP client cannot be
/// built, or every availability source fails.
pub(crate) async fn run_check(config: &AppConfig, dry_run: bool) -> anyhow::Result<()> {
    let catalog = Arc::new(stockwatch_core::load_catalog(&config.catalog_path)?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let sources = SourceChain::standard(&catalog, config)?;
    let notifier = build_notifier(config, Arc::clone(&catalog), Arc::clone(&clock), dry_run)?;
    let tracker = Tracker::new(catalog, sources, Arc::new(notifier), clock);

    match tracker.run_check(Trigger::Manual).await {
        CheckOutcome::Completed(summary) => {
            let report = CheckReport {
                summary,
                snapshot: tracker.snapshot().await,
            };
            println!("{}", render_report(&report)?);
            Ok(())
        }
        CheckOutcome::Busy => anyhow::bail!("an availability check is already in progress"),
        CheckOutcome::Failed(reason) => anyhow::bail!("availability check failed: {reason}"),
    }
}

/// Send the fixed test message, bypassing the notification gate.
///
/// # Errors
///
/// Returns an error if Twilio is not configured or the send fails.
pub(crate) async fn run_test_sms(config: &AppConfig) -> anyhow::Result<()> {
    let Some(twilio) = &config.twilio else {
        anyhow::bail!(
            "SMS is not configured; set TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN, \
             TWILIO_PHONE_FROM and PHONE_TO"
        );
    };

    let client = TwilioClient::from_config(twilio, config.request_timeout_secs)?;
    let id = client
        .send(&twilio.phone_to, &twilio.phone_from, TEST_MESSAGE)
        .await?;
    println!("test SMS sent: {id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};
    use stockwatch_core::{
        Environment, ManualClock, StoreAvailability, StoreConfig, TwilioConfig, Variant,
    };

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
            stores: vec![StoreConfig {
                id: "R669".to_string(),
                name: "Apple Orchard Road".to_string(),
                address: String::new(),
            }],
        })
    }

    fn config(twilio: bool) -> AppConfig {
        AppConfig {
            env: Environment::Test,
            bind_addr: "127.0.0.1:3000".parse().unwrap(),
            log_level: "info".to_string(),
            catalog_path: "config/catalog.yaml".into(),
            check_interval_minutes: 1,
            check_enabled: false,
            cooldown_minutes: 30,
            max_notifications_per_day: 10,
            scrape_fallback: false,
            request_timeout_secs: 5,
            user_agent: "stockwatch-test".to_string(),
            max_concurrent_fetches: 2,
            max_retries: 0,
            retry_backoff_base_ms: 1,
            twilio: twilio.then(|| TwilioConfig {
                account_sid: "AC123".to_string(),
                auth_token: "token".to_string(),
                phone_from: "+15550001111".to_string(),
                phone_to: "+6590000000".to_string(),
            }),
        }
    }

    fn clock() -> Arc<dyn Clock> {
        Arc::new(ManualClock::new(
            FixedOffset::east_opt(8 * 3600)
                .unwrap()
                .with_ymd_and_hms(2025, 9, 19, 10, 0, 0)
                .unwrap(),
        ))
    }

    #[test]
    fn notifier_sends_when_credentials_present() {
        let notifier = build_notifier(&config(true), catalog(), clock(), false).unwrap();
        assert!(notifier.is_configured());
    }

    #[test]
    fn dry_run_disables_delivery() {
        let notifier = build_notifier(&config(true), catalog(), clock(), true).unwrap();
        assert!(!notifier.is_configured());
    }

    #[test]
    fn missing_credentials_disable_delivery() {
        let notifier = build_notifier(&config(false), catalog(), clock(), false).unwrap();
        assert!(!notifier.is_configured());
    }

    #[test]
    fn report_renders_summary_and_snapshot() {
        let catalog = catalog();
        let mut snapshot = AvailabilitySnapshot::new();
        snapshot.insert(
            "R669".to_string(),
            StoreAvailability::unavailable(&catalog.stores[0]),
        );
        let report = CheckReport {
            summary: CheckSummary {
                timestamp: clock().now(),
                duration_ms: 42,
                trigger: Trigger::Manual,
                source: "unavailable_default".to_string(),
                stores_checked: 1,
                available_stores: Vec::new(),
                notifications_attempted: 0,
                notifications_sent: 0,
            },
            snapshot,
        };

        let rendered = render_report(&report).unwrap();
        let json: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(json["summary"]["trigger"], "manual");
        assert_eq!(json["summary"]["source"], "unavailable_default");
        assert_eq!(json["snapshot"]["R669"]["available"], false);
        assert_eq!(json["snapshot"]["R669"]["name"], "Apple Orchard Road");
    }
}
