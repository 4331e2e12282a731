mod app_config;
pub mod availability;
pub mod catalog;
pub mod clock;
mod config;
mod error;

pub use app_config::{AppConfig, Environment, TwilioConfig};
pub use availability::{AvailabilitySnapshot, AvailableVariant, StoreAvailability};
pub use catalog::{load_catalog, parse_catalog, Catalog, StoreConfig, Variant};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    load_app_config, load_app_config_from_env, validate_interval_minutes, MAX_INTERVAL_MINUTES,
    MIN_INTERVAL_MINUTES,
};
pub use error::ConfigError;
