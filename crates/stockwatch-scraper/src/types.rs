//! Response types for the retailer's `pickup-message` endpoint.
//!
//! ## Observed shape
//!
//! ```json
//! { "head": {...},
//!   "body": { "stores": [ {
//!       "storeNumber": "R669",
//!       "storeName": "Orchard Road",
//!       "address": { "address": "Apple Orchard Road", "address2": "270 Orchard Road" },
//!       "partsAvailability": {
//!         "MZ7C3ZP/A": {
//!           "pickupDisplay": "available",
//!           "pickupSearchQuote": "Today",
//!           "storePickupProductTitle": "iPhone 17 Pro Max 256GB Silver"
//!         } } } ] } }
//! ```
//!
//! Some regional variants of the endpoint return `stores` at the top level
//! instead of under `body`; both are accepted. A store with no entry for the
//! requested part in `partsAvailability` is treated as unavailable.

use std::collections::HashMap;

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct PickupMessageResponse {
    #[serde(default)]
    pub body: Option<PickupBody>,
    #[serde(default)]
    pub stores: Vec<PickupStore>,
}

impl PickupMessageResponse {
    /// Stores from `body.stores`, falling back to top-level `stores`.
    #[must_use]
    pub fn stores(&self) -> &[PickupStore] {
        match &self.body {
            Some(body) if !body.stores.is_empty() => &body.stores,
            _ => &self.stores,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PickupBody {
    #[serde(default)]
    pub stores: Vec<PickupStore>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupStore {
    /// Retailer store number, e.g. `"R669"`.
    pub store_number: String,

    #[serde(default)]
    pub store_name: Option<String>,

    #[serde(default)]
    pub address: Option<PickupAddress>,

    /// Keyed by part number (SKU).
    #[serde(default)]
    pub parts_availability: HashMap<String, PartAvailability>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PickupAddress {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub address2: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartAvailability {
    /// `"available"`, `"unavailable"`, or `"ineligible"`.
    #[serde(default)]
    pub pickup_display: Option<String>,

    /// Pickup window, e.g. `"Today"` or `"Available Sat 20/09"`.
    #[serde(default)]
    pub pickup_search_quote: Option<String>,

    #[serde(default)]
    pub store_pickup_product_title: Option<String>,
}
