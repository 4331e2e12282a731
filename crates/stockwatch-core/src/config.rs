use crate::app_config::{AppConfig, Environment, TwilioConfig};
use crate::ConfigError;

/// Smallest accepted check interval, in minutes.
pub const MIN_INTERVAL_MINUTES: u32 = 1;
/// Largest accepted check interval, in minutes.
pub const MAX_INTERVAL_MINUTES: u32 = 60;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Check that a polling interval lies within `[1, 60]` minutes.
///
/// Shared by startup parsing and runtime interval changes.
///
/// # Errors
///
/// Returns [`ConfigError::IntervalOutOfRange`] when `minutes` is outside the range.
pub fn validate_interval_minutes(minutes: u32) -> Result<u32, ConfigError> {
    if (MIN_INTERVAL_MINUTES..=MAX_INTERVAL_MINUTES).contains(&minutes) {
        Ok(minutes)
    } else {
        Err(ConfigError::IntervalOutOfRange(minutes))
    }
}

/// Build application configuration using the provided env-var lookup function.
///
/// The parsing and validation logic is decoupled from the process environment
/// so it can be tested with a plain `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("STOCKWATCH_ENV", "development"))?;

    let bind_addr = or_default("STOCKWATCH_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("STOCKWATCH_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("STOCKWATCH_LOG_LEVEL", "info");
    let catalog_path = PathBuf::from(or_default(
        "STOCKWATCH_CATALOG_PATH",
        "./config/catalog.yaml",
    ));

    let check_interval_minutes = parse_u32("STOCKWATCH_CHECK_INTERVAL_MINUTES", "1")?;
    validate_interval_minutes(check_interval_minutes).map_err(|e| {
        invalid("STOCKWATCH_CHECK_INTERVAL_MINUTES", e.to_string())
    })?;
    let check_enabled = parse_bool(&or_default("STOCKWATCH_CHECK_ENABLED", "false"));
    let cooldown_minutes = parse_u32("STOCKWATCH_COOLDOWN_MINUTES", "30")?;
    let max_notifications_per_day = parse_u32("STOCKWATCH_MAX_NOTIFICATIONS_PER_DAY", "10")?;
    let scrape_fallback = parse_bool(&or_default("STOCKWATCH_SCRAPE_FALLBACK", "false"));

    let request_timeout_secs = parse_u64("STOCKWATCH_REQUEST_TIMEOUT_SECS", "5")?;
    let user_agent = or_default("STOCKWATCH_USER_AGENT", DEFAULT_USER_AGENT);
    let max_concurrent_fetches = parse_usize("STOCKWATCH_MAX_CONCURRENT_FETCHES", "4")?;
    if max_concurrent_fetches == 0 {
        return Err(invalid(
            "STOCKWATCH_MAX_CONCURRENT_FETCHES",
            "must be at least 1".to_string(),
        ));
    }
    let max_retries = parse_u32("STOCKWATCH_MAX_RETRIES", "0")?;
    let retry_backoff_base_ms = parse_u64("STOCKWATCH_RETRY_BACKOFF_BASE_MS", "500")?;

    let twilio = match (
        lookup("TWILIO_ACCOUNT_SID"),
        lookup("TWILIO_AUTH_TOKEN"),
        lookup("TWILIO_PHONE_FROM"),
        lookup("PHONE_TO"),
    ) {
        (Ok(account_sid), Ok(auth_token), Ok(phone_from), Ok(phone_to))
            if !account_sid.trim().is_empty() && !auth_token.trim().is_empty() =>
        {
            Some(TwilioConfig {
                account_sid,
                auth_token,
                phone_from,
                phone_to,
            })
        }
        _ => None,
    };

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        catalog_path,
        check_interval_minutes,
        check_enabled,
        cooldown_minutes,
        max_notifications_per_day,
        scrape_fallback,
        request_timeout_secs,
        user_agent,
        max_concurrent_fetches,
        max_retries,
        retry_backoff_base_ms,
        twilio,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "STOCKWATCH_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

/// Only the literal `true` (any case) or `1` enables a flag.
fn parse_bool(s: &str) -> bool {
    let trimmed = s.trim();
    trimmed.eq_ignore_ascii_case("true") || trimmed == "1"
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
