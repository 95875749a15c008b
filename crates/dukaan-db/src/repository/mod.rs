//! # Repository Module
//!
//! Database repository implementations for the back office.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories and Seams                               │
//! │                                                                         │
//! │  CommitSequencer<S, L>                                                 │
//! │       │                                                                 │
//! │       ├── S: InvoiceStore ──► InvoiceRepository (invoices, items,      │
//! │       │                        payment ledger, status audit)            │
//! │       │                                                                 │
//! │       └── L: StockLedger ───► SqliteStockLedger (guarded decrements)   │
//! │                                                                         │
//! │  Reports  ──► CatalogRepository + OrderRepository + InvoiceRepository  │
//! │  Drafts   ──► DraftStore (session key → JSON draft)                    │
//! │  Counter  ──► CustomerRepository (customer list)                       │
//! │                                                                         │
//! │  The two traits are the seams the commit saga is tested through;       │
//! │  the other repositories are used concretely.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`catalog::CatalogRepository`] - Products and variants
//! - [`customers::CustomerRepository`] - Registered customers
//! - [`stock::SqliteStockLedger`] - Stock counters with guarded decrements
//! - [`invoice::InvoiceRepository`] - Invoices, items, payment ledger
//! - [`orders::OrderRepository`] - Online order lines
//! - [`drafts::DraftStore`] - Draft session key-value store

pub mod catalog;
pub mod customers;
pub mod drafts;
pub mod invoice;
pub mod orders;
pub mod stock;

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{DateTime, TimeZone, Utc};
    use dukaan_core::{
        Customer, Invoice, InvoiceItem, LineKind, PaymentStatus, Product, TaxType, Variant,
    };

    use crate::{Database, DbConfig};

    pub async fn database() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, day, hour, 0, 0).unwrap()
    }

    pub fn product(id: &str, price: i64, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {}", id),
            item_code: Some(id.to_uppercase()),
            price_paise: price,
            offer_price_paise: None,
            stock_quantity: stock,
            is_active: true,
            created_at: at(1, 9),
            updated_at: at(1, 9),
        }
    }

    pub fn variant(id: &str, product_id: &str, stock: i64) -> Variant {
        Variant {
            id: id.to_string(),
            product_id: product_id.to_string(),
            color: Some("Blue".to_string()),
            size: Some("M".to_string()),
            price_paise: None,
            stock_quantity: stock,
            created_at: at(1, 9),
            updated_at: at(1, 9),
        }
    }

    pub fn customer(id: &str, name: &str, created_at: DateTime<Utc>) -> Customer {
        Customer {
            id: id.to_string(),
            name: name.to_string(),
            phone: Some("9811122233".to_string()),
            email: Some(format!("{}@example.in", id)),
            address: None,
            created_at,
        }
    }

    /// Untaxed invoice with nothing paid.
    pub fn invoice(id: &str, total: i64, created_at: DateTime<Utc>) -> Invoice {
        Invoice {
            id: id.to_string(),
            invoice_number: format!("INV-{}", id),
            customer_name: "Meera Shah".to_string(),
            customer_phone: Some("9811122233".to_string()),
            reference_by: None,
            tax_type: TaxType::None,
            tax_rate_bps: 0,
            subtotal_paise: total,
            total_discount_paise: 0,
            taxable_paise: total,
            cgst_paise: 0,
            sgst_paise: 0,
            igst_paise: 0,
            grand_total_paise: total,
            paid_amount_paise: 0,
            payment_status: PaymentStatus::Unpaid,
            line_count: 1,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn catalog_item(
        id: &str,
        invoice: &Invoice,
        position: i64,
        product_id: &str,
        variant_id: Option<&str>,
        quantity: i64,
    ) -> InvoiceItem {
        InvoiceItem {
            id: id.to_string(),
            invoice_id: invoice.id.clone(),
            position,
            kind: LineKind::Catalog,
            product_id: Some(product_id.to_string()),
            variant_id: variant_id.map(str::to_string),
            item_code: None,
            description: format!("Product {}", product_id),
            quantity,
            unit_price_paise: 100,
            discount_bps: 0,
            discount_paise: 0,
            line_total_paise: 100 * quantity,
            stock_deducted: false,
            created_at: invoice.created_at,
        }
    }
}
