//! `validate` command: load configuration the way the server does and report
//! what it would run with.

use stockwatch_core::{AppConfig, Catalog, Environment};

const API_KEYS_VAR: &str = "STOCKWATCH_API_KEYS";

/// Human-readable summary of the effective configuration.
pub(crate) fn describe(config: &AppConfig, catalog: &Catalog) -> Vec<String> {
    let preferred = catalog.preferred().map_or_else(
        || catalog.preferred_sku.clone(),
        |v| format!("{} ({})", v.label(), v.sku),
    );

    let mut lines = vec![
        format!("environment: {}", config.env),
        format!("catalog: {}", config.catalog_path.display()),
        format!("product: {}", catalog.product_name),
        format!("preferred variant: {preferred}"),
        format!("variants: {}", catalog.variants.len()),
    ];
    lines.extend(
        catalog
            .stores
            .iter()
            .map(|s| format!("store: {} ({})", s.name, s.id)),
    );
    lines.push(format!(
        "check interval: {} min (auto-start: {})",
        config.check_interval_minutes, config.check_enabled
    ));
    lines.push(format!(
        "notifications: cooldown {} min, max {} per day",
        config.cooldown_minutes, config.max_notifications_per_day
    ));
    lines.push(format!(
        "sms: {}",
        if config.twilio.is_some() {
            "configured"
        } else {
            "disabled"
        }
    ));
    lines
}

/// Settings that load cleanly but will not behave as an operator expects.
pub(crate) fn warnings(config: &AppConfig, api_keys_set: bool) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.twilio.is_none() {
        warnings.push(
            "Twilio credentials incomplete; availability alerts will not be sent".to_string(),
        );
    }
    if config.max_notifications_per_day == 0 {
        warnings.push(
            "STOCKWATCH_MAX_NOTIFICATIONS_PER_DAY is 0; every alert will be suppressed"
                .to_string(),
        );
    }
    if !api_keys_set && config.env != Environment::Development {
        warnings.push(format!(
            "{API_KEYS_VAR} is not set; the server refuses to start outside development"
        ));
    }
    if !config.check_enabled {
        warnings.push(
            "STOCKWATCH_CHECK_ENABLED is false; checks start only when resumed via the API"
                .to_string(),
        );
    }

    warnings
}

/// Load env config and catalog, print the summary and any warnings.
///
/// # Errors
///
/// Returns the first configuration or catalog error encountered.
pub(crate) fn run_validate() -> anyhow::Result<()> {
    let config = stockwatch_core::load_app_config_from_env()
        .map_err(|e| anyhow::anyhow!("environment configuration is invalid: {e}"))?;
    let catalog = stockwatch_core::load_catalog(&config.catalog_path)
        .map_err(|e| anyhow::anyhow!("catalog is invalid: {e}"))?;

    for line in describe(&config, &catalog) {
        println!("{line}");
    }

    let api_keys_set = std::env::var(API_KEYS_VAR)
        .map(|v| v.split(',').any(|k| !k.trim().is_empty()))
        .unwrap_or(false);
    for warning in warnings(&config, api_keys_set) {
        println!("warning: {warning}");
    }

    println!("configuration OK");
    Ok(())
}
