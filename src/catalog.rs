//! Product catalog mapping store product ids to credit amounts.
//!
//! The catalog is built once at startup and shared read-only by every
//! request.

use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// Immutable product id to credit amount mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductCatalog {
    products: BTreeMap<String, u64>,
}

impl ProductCatalog {
    /// Build a catalog from `(product_id, credits)` pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if a product id is blank, a credit amount is zero,
    /// or a product id appears twice.
    pub fn new<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let mut products = BTreeMap::new();
        for (product_id, credits) in entries {
            let product_id = product_id.into();
            if product_id.trim().is_empty() {
                return Err(Error::Catalog("product id must not be blank".to_string()));
            }
            if credits == 0 {
                return Err(Error::Catalog(format!(
                    "product {product_id} must grant a positive credit amount"
                )));
            }
            if products.insert(product_id.clone(), credits).is_some() {
                return Err(Error::Catalog(format!(
                    "product {product_id} is listed more than once"
                )));
            }
        }
        Ok(Self { products })
    }

    /// Build a catalog from the `[products]` table of the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any entry fails validation.
    pub fn from_config(products: &BTreeMap<String, u64>) -> Result<Self> {
        Self::new(products.iter().map(|(id, credits)| (id.as_str(), *credits)))
    }

    /// Credit amount granted by `product_id`, if the product is known.
    #[must_use]
    pub fn credits_for(&self, product_id: &str) -> Option<u64> {
        self.products.get(product_id).copied()
    }

    /// Iterate over `(product_id, credits)` in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.products.iter().map(|(id, credits)| (id.as_str(), *credits))
    }

    /// Number of products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether the catalog has no products.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
