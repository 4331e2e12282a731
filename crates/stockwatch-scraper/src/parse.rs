//! Interpretation of `pickup-message` payloads.

use crate::types::{PartAvailability, PickupMessageResponse, PickupStore};

/// Pickup status of one part at one store, as reported by the retailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePickup {
    pub store_id: String,
    pub store_name: Option<String>,
    pub address: Option<String>,
    pub available: bool,
    pub pickup_quote: Option<String>,
    pub message: String,
}

/// Extract per-store pickup status for `sku`, keeping only `store_ids`.
///
/// Stores outside the requested set (the endpoint also returns nearby
/// stores when `searchNearby=true`) are dropped.
#[must_use]
pub fn parse_pickup_response(
    response: &PickupMessageResponse,
    sku: &str,
    store_ids: &[&str],
) -> Vec<StorePickup> {
    response
        .stores()
        .iter()
        .filter(|store| store_ids.contains(&store.store_number.as_str()))
        .map(|store| store_pickup(store, sku))
        .collect()
}

fn store_pickup(store: &PickupStore, sku: &str) -> StorePickup {
    let part = store.parts_availability.get(sku);
    let available = part.is_some_and(is_part_available);
    let pickup_quote = part
        .and_then(|p| p.pickup_search_quote.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned);
    let message = pickup_quote
        .clone()
        .or_else(|| part.and_then(|p| p.store_pickup_product_title.clone()))
        .unwrap_or_else(|| "Not available".to_string());

    StorePickup {
        store_id: store.store_number.clone(),
        store_name: store.store_name.clone().filter(|s| !s.trim().is_empty()),
        address: store.address.as_ref().and_then(|a| {
            let parts: Vec<&str> = [a.address.as_deref(), a.address2.as_deref()]
                .into_iter()
                .flatten()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }),
        available,
        pickup_quote,
        message,
    }
}

/// A part counts as available when `pickupDisplay` says so, or when the
/// product title carries the retailer's "Available" wording.
pub(crate) fn is_part_available(part: &PartAvailability) -> bool {
    part.pickup_display
        .as_deref()
        .is_some_and(|d| d.eq_ignore_ascii_case("available"))
        || part
            .store_pickup_product_title
            .as_deref()
            .is_some_and(|t| t.contains("Available"))
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
