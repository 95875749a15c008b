//! # Commands Module
//!
//! Everything the invoicing UI and the operator binary call into.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs      ◄─── You are here (exports)
//! ├── draft.rs    ◄─── Draft sessions and line editing
//! ├── invoice.rs  ◄─── Commit, invoice detail, stock repair
//! ├── payment.rs  ◄─── Payments, settlement discounts, status overrides
//! ├── archive.rs  ◄─── Invoice listing with totals
//! ├── customer.rs ◄─── Customer registry, billing a draft to a customer
//! └── report.rs   ◄─── Online + offline sales reconciliation
//! ```
//!
//! ## State Injection
//! Each command takes only the state it needs:
//! ```rust,ignore
//! // Only needs the draft sessions
//! pub async fn add_manual_line(drafts: &DraftSessions, key: &str) -> Result<DraftView, ApiError>
//!
//! // Needs the catalog and the draft sessions
//! pub async fn add_catalog_line(db: &DbState, drafts: &DraftSessions, ...) -> Result<DraftView, ApiError>
//!
//! // Needs all three
//! pub async fn commit_invoice(db: &DbState, drafts: &DraftSessions, config: &BackofficeConfig, ...)
//! ```

pub mod archive;
pub mod customer;
pub mod draft;
pub mod invoice;
pub mod payment;
pub mod report;

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::Utc;
    use dukaan_core::{Invoice, PaymentStatus, Product, TaxType, Variant};
    use dukaan_db::{Database, DbConfig, InvoiceStore};

    use crate::state::BackofficeConfig;
    use crate::Backoffice;

    /// In-memory back office with a small catalog:
    /// - `kurta`: ₹100, offer ₹80, variants `kurta-m` (5) and `kurta-l` (2)
    /// - `belt`: ₹50, no variants, 3 on hand
    pub async fn backoffice() -> Backoffice {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = db.catalog();

        for product in [
            product("kurta", 10_000, Some(8_000), 0),
            product("belt", 5_000, None, 3),
        ] {
            catalog.insert_product(&product).await.unwrap();
        }
        for variant in [
            variant("kurta-m", "kurta", "M", 5),
            variant("kurta-l", "kurta", "L", 2),
        ] {
            catalog.insert_variant(&variant).await.unwrap();
        }

        let mut config = BackofficeConfig::default();
        config.invoicing.default_tax_type = dukaan_core::TaxType::None;
        config.invoicing.default_tax_bps = 0;

        Backoffice::with_database(config, db).await.unwrap()
    }

    pub fn product(id: &str, price: i64, offer: Option<i64>, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            name: id[..1].to_uppercase() + &id[1..],
            item_code: Some(format!("IC-{}", id.to_uppercase())),
            price_paise: price,
            offer_price_paise: offer,
            stock_quantity: stock,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn variant(id: &str, product_id: &str, size: &str, stock: i64) -> Variant {
        Variant {
            id: id.to_string(),
            product_id: product_id.to_string(),
            color: None,
            size: Some(size.to_string()),
            price_paise: None,
            stock_quantity: stock,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// Writes a bare unpaid invoice header, as if committed without items.
    pub async fn committed_invoice(backoffice: &Backoffice, id: &str, grand_total: i64) -> Invoice {
        let now = Utc::now();
        let invoice = Invoice {
            id: id.to_string(),
            invoice_number: format!("DK-{}", id),
            customer_name: "Asha Verma".to_string(),
            customer_phone: None,
            reference_by: None,
            tax_type: TaxType::None,
            tax_rate_bps: 0,
            subtotal_paise: grand_total,
            total_discount_paise: 0,
            taxable_paise: grand_total,
            cgst_paise: 0,
            sgst_paise: 0,
            igst_paise: 0,
            grand_total_paise: grand_total,
            paid_amount_paise: 0,
            payment_status: PaymentStatus::Unpaid,
            line_count: 0,
            created_at: now,
            updated_at: now,
        };
        let invoices = backoffice.db.inner().invoices();
        invoices.insert_invoice(&invoice).await.unwrap();
        invoice
    }

    /// Key of the session opened by `restore()`.
    pub async fn first_session(backoffice: &Backoffice) -> String {
        backoffice.drafts.list().await[0].key.clone()
    }
}
