//! Per-store availability facts produced by one check cycle.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{StoreConfig, Variant};

/// Message attached to a store with nothing available.
pub const NOT_AVAILABLE_MESSAGE: &str = "Not yet available for pickup";

/// Store id → availability, ordered by store id.
pub type AvailabilitySnapshot = BTreeMap<String, StoreAvailability>;

/// A variant the retailer currently offers for pickup at a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableVariant {
    #[serde(flatten)]
    pub variant: Variant,
    /// Retailer's pickup window text, e.g. `"Today 2:00 PM - 4:00 PM"`.
    pub pickup_quote: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreAvailability {
    pub store_id: String,
    pub name: String,
    pub address: String,
    pub available: bool,
    pub available_variants: Vec<AvailableVariant>,
    pub message: String,
}

impl StoreAvailability {
    /// An entry with nothing available.
    #[must_use]
    pub fn unavailable(store: &StoreConfig) -> Self {
        Self {
            store_id: store.id.clone(),
            name: store.name.clone(),
            address: store.address.clone(),
            available: false,
            available_variants: Vec::new(),
            message: NOT_AVAILABLE_MESSAGE.to_string(),
        }
    }

    /// Record one more available variant and refresh the derived fields.
    pub fn push_variant(&mut self, variant: AvailableVariant) {
        self.available_variants.push(variant);
        self.available = true;
        self.message = format!(
            "{} variant(s) available",
            self.available_variants.len()
        );
    }

    #[must_use]
    pub fn offers_sku(&self, sku: &str) -> bool {
        self.available_variants.iter().any(|v| v.variant.sku == sku)
    }
}
