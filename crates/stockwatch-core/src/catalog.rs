//! Product and store catalog loaded from YAML at startup.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// One purchasable configuration of the watched product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    /// Retailer part number, e.g. `"MZ7C3ZP/A"`.
    pub sku: String,
    pub model: String,
    pub storage: String,
    pub color: String,
}

impl Variant {
    /// Short human label, e.g. `"Pro Max Silver 256GB"`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {} {}", self.model, self.color, self.storage)
    }
}

/// A physical store that offers in-store pickup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Retailer store number, e.g. `"R669"`.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    /// Display name used in alerts, e.g. `"iPhone 17 Pro Max"`.
    pub product_name: String,
    /// Product purchase page; sent as `Referer` and linked in alerts.
    pub product_url: String,
    /// Structured pickup-availability endpoint.
    pub pickup_url: String,
    /// SKU whose arrival triggers an SMS.
    pub preferred_sku: String,
    pub variants: Vec<Variant>,
    pub stores: Vec<StoreConfig>,
}

impl Catalog {
    /// The preferred variant. Validation guarantees it exists.
    #[must_use]
    pub fn preferred(&self) -> Option<&Variant> {
        self.variants.iter().find(|v| v.sku == self.preferred_sku)
    }

    #[must_use]
    pub fn variant(&self, sku: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.sku == sku)
    }

    #[must_use]
    pub fn store(&self, id: &str) -> Option<&StoreConfig> {
        self.stores.iter().find(|s| s.id == id)
    }

    #[must_use]
    pub fn store_ids(&self) -> Vec<String> {
        self.stores.iter().map(|s| s.id.clone()).collect()
    }

    /// Display name for a store id, falling back to the id itself.
    #[must_use]
    pub fn store_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.store(id).map_or(id, |s| s.name.as_str())
    }
}

/// Load and validate the catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_catalog(path: &Path) -> Result<Catalog, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CatalogFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_catalog(&content)
}

/// Parse and validate catalog YAML already in memory.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_catalog(content: &str) -> Result<Catalog, ConfigError> {
    let catalog: Catalog = serde_yaml::from_str(content)?;
    validate_catalog(&catalog)?;
    Ok(catalog)
}

fn validate_catalog(catalog: &Catalog) -> Result<(), ConfigError> {
    if catalog.variants.is_empty() {
        return Err(ConfigError::Validation(
            "catalog must list at least one variant".to_string(),
        ));
    }
    if catalog.stores.is_empty() {
        return Err(ConfigError::Validation(
            "catalog must list at least one store".to_string(),
        ));
    }

    let mut seen_skus = HashSet::new();
    for variant in &catalog.variants {
        if variant.sku.trim().is_empty() {
            return Err(ConfigError::Validation(
                "variant sku must be non-empty".to_string(),
            ));
        }
        if !seen_skus.insert(variant.sku.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate variant sku: '{}'",
                variant.sku
            )));
        }
    }

    let mut seen_stores = HashSet::new();
    for store in &catalog.stores {
        if store.id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "store id must be non-empty".to_string(),
            ));
        }
        if !seen_stores.insert(store.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate store id: '{}'",
                store.id
            )));
        }
    }

    if !seen_skus.contains(catalog.preferred_sku.as_str()) {
        return Err(ConfigError::Validation(format!(
            "preferred sku '{}' is not among the catalog variants",
            catalog.preferred_sku
        )));
    }

    Ok(())
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
