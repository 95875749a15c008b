//! # Catalog Stock Semantics
//!
//! Products and variants carry two independent stock counters:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Product "Kurta"            stock_quantity = 4   (used only if no       │
//! │   ├── Variant Red M         stock_quantity = 5    variants exist)       │
//! │   └── Variant Blue L        stock_quantity = 2                          │
//! │                                                                         │
//! │  aggregate stock (Kurta) = 5 + 2 = 7                                    │
//! │                                                                         │
//! │  A line with variant Red M  → validated and deducted against Red M     │
//! │  A line with no variant     → validated against the aggregate,         │
//! │                               deducted from the product's own counter  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The counters are never summed and then split.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use ts_rs::TS;

use crate::types::{Product, Variant};

/// The single counter a line is validated and deducted against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum StockTarget {
    Variant { variant_id: String },
    Product { product_id: String },
}

impl StockTarget {
    /// Target for a catalog line: its variant if one was chosen, else the
    /// bare product.
    pub fn for_line(product_id: &str, variant_id: Option<&str>) -> Self {
        match variant_id {
            Some(variant_id) => StockTarget::Variant {
                variant_id: variant_id.to_string(),
            },
            None => StockTarget::Product {
                product_id: product_id.to_string(),
            },
        }
    }

    pub fn id(&self) -> &str {
        match self {
            StockTarget::Variant { variant_id } => variant_id,
            StockTarget::Product { product_id } => product_id,
        }
    }
}

impl fmt::Display for StockTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockTarget::Variant { variant_id } => write!(f, "variant:{}", variant_id),
            StockTarget::Product { product_id } => write!(f, "product:{}", product_id),
        }
    }
}

/// Aggregate stock for a product given its variants.
pub fn aggregate_stock(product: &Product, variants: &[&Variant]) -> i64 {
    if variants.is_empty() {
        product.stock_quantity
    } else {
        variants.iter().map(|v| v.stock_quantity).sum()
    }
}

/// An in-memory snapshot of the catalog, as loaded for reports.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
    variants_by_product: HashMap<String, Vec<Variant>>,
}

impl Catalog {
    pub fn new(products: Vec<Product>, variants: Vec<Variant>) -> Self {
        let mut variants_by_product: HashMap<String, Vec<Variant>> = HashMap::new();
        for variant in variants {
            variants_by_product
                .entry(variant.product_id.clone())
                .or_default()
                .push(variant);
        }

        Catalog {
            products,
            variants_by_product,
        }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn product(&self, product_id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == product_id)
    }

    pub fn variants_of(&self, product_id: &str) -> &[Variant] {
        self.variants_by_product
            .get(product_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Aggregate stock of a product, or `None` if it is not in the catalog.
    pub fn aggregate_stock(&self, product_id: &str) -> Option<i64> {
        let product = self.product(product_id)?;
        let variants: Vec<&Variant> = self.variants_of(product_id).iter().collect();
        Some(aggregate_stock(product, &variants))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(id: &str, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            name: id.to_string(),
            item_code: None,
            price_paise: 1_000,
            offer_price_paise: None,
            stock_quantity: stock,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn variant(id: &str, product_id: &str, stock: i64) -> Variant {
        Variant {
            id: id.to_string(),
            product_id: product_id.to_string(),
            color: None,
            size: None,
            price_paise: None,
            stock_quantity: stock,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_aggregate_prefers_variants() {
        let catalog = Catalog::new(
            vec![product("kurta", 4), product("dupatta", 9)],
            vec![variant("red-m", "kurta", 5), variant("blue-l", "kurta", 2)],
        );

        assert_eq!(catalog.aggregate_stock("kurta"), Some(7));
        assert_eq!(catalog.aggregate_stock("dupatta"), Some(9));
        assert_eq!(catalog.aggregate_stock("missing"), None);
    }

    #[test]
    fn test_target_for_line() {
        assert_eq!(
            StockTarget::for_line("kurta", Some("red-m")),
            StockTarget::Variant {
                variant_id: "red-m".to_string()
            }
        );
        let bare = StockTarget::for_line("kurta", None);
        assert_eq!(bare.to_string(), "product:kurta");
    }
}
