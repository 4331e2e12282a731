//! SMS bodies.

use chrono::{DateTime, FixedOffset};
use stockwatch_core::{Catalog, StoreAvailability, Variant};

/// Body of the configuration-check SMS.
pub const TEST_MESSAGE: &str = "iPhone Checker Test Message - Your notifications are working! 📱";

/// Alert text for `variant` becoming available at `store`.
///
/// `now` is rendered in its own offset, day-first with a 12-hour clock.
#[must_use]
pub fn format_availability_message(
    catalog: &Catalog,
    variant: &Variant,
    store: &StoreAvailability,
    now: DateTime<FixedOffset>,
) -> String {
    let address = if store.address.trim().is_empty() {
        "Check Apple Store"
    } else {
        store.address.as_str()
    };

    format!(
        "🚨 iPhone AVAILABLE! 🚨\n\n\
         {product} {storage} ({color})\n\
         Store: {store}\n\
         Address: {address}\n\n\
         Quick link: {link}\n\n\
         Act fast - limited stock!\n\
         Time: {time}",
        product = catalog.product_name,
        storage = variant.storage,
        color = variant.color,
        store = store.name,
        link = catalog.product_url,
        time = now.format("%d/%m/%Y, %-I:%M:%S %P"),
    )
}
