//! # Stock Ledger
//!
//! Per-variant and per-product stock counters with atomic decrements.
//!
//! ## Guarded Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ❌ WRONG: read, check, write (two tills can both pass the check)       │
//! │     SELECT stock_quantity ...; if qty <= stock { UPDATE ... = stock-q } │
//! │                                                                         │
//! │  ✅ CORRECT: the check lives inside the write                           │
//! │     UPDATE product_variants                                             │
//! │        SET stock_quantity = stock_quantity - ?2                         │
//! │      WHERE id = ?1 AND stock_quantity >= ?2                             │
//! │                                                                         │
//! │  rows_affected = 1 → deducted                                           │
//! │  rows_affected = 0 → look the row up: missing → NotFound                │
//! │                                        present → InsufficientStock      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! SQLite takes the write lock for the UPDATE, so concurrent decrements of
//! the same counter serialize and the counter never goes below zero.
//!
//! ## Per-line Deduction Marker
//! [`StockLedger::deduct_for_item`] flips `invoice_items.stock_deducted` in
//! the same transaction as the decrement. Running it twice for one item
//! deducts once, which is what lets stock repair be re-run safely.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use dukaan_core::catalog::StockTarget;

/// Outcome of a per-item deduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deduction {
    /// Stock was taken for this item just now.
    Applied,
    /// The item had already been deducted; nothing changed.
    AlreadyApplied,
}

/// A product's own counter next to what its variants hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductStock {
    /// `products.stock_quantity`, the counter a bare product line draws from.
    pub own: i64,
    pub variant_count: i64,
    pub variant_total: i64,
}

impl ProductStock {
    pub fn has_variants(&self) -> bool {
        self.variant_count > 0
    }

    /// Sum over variants, or the product's own counter when it has none.
    pub fn aggregate(&self) -> i64 {
        if self.has_variants() {
            self.variant_total
        } else {
            self.own
        }
    }
}

/// The stock ledger seam used by the commit saga and stock repair.
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Current stock of a variant.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Unknown variant
    async fn available_for_variant(&self, variant_id: &str) -> DbResult<i64>;

    /// Both stock figures for a product.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Unknown product
    async fn product_stock(&self, product_id: &str) -> DbResult<ProductStock>;

    /// Aggregate stock of a product: the sum over its variants, or the
    /// product's own counter when it has none.
    async fn available_for_product(&self, product_id: &str) -> DbResult<i64> {
        Ok(self.product_stock(product_id).await?.aggregate())
    }

    /// Atomically takes `quantity` units from exactly one counter.
    ///
    /// ## Returns
    /// * `Err(DbError::InsufficientStock)` - Not enough on hand; nothing changed
    /// * `Err(DbError::NotFound)` - Unknown target
    async fn reserve_and_deduct(&self, target: &StockTarget, quantity: i64) -> DbResult<()>;

    /// Like [`StockLedger::reserve_and_deduct`], but tied to one persisted
    /// invoice item and applied at most once for it.
    async fn deduct_for_item(
        &self,
        item_id: &str,
        target: &StockTarget,
        quantity: i64,
    ) -> DbResult<Deduction>;
}

/// SQLite-backed [`StockLedger`].
#[derive(Debug, Clone)]
pub struct SqliteStockLedger {
    pool: SqlitePool,
}

impl SqliteStockLedger {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteStockLedger { pool }
    }
}

#[async_trait]
impl StockLedger for SqliteStockLedger {
    async fn available_for_variant(&self, variant_id: &str) -> DbResult<i64> {
        let stock: Option<i64> =
            sqlx::query_scalar("SELECT stock_quantity FROM product_variants WHERE id = ?1")
                .bind(variant_id)
                .fetch_optional(&self.pool)
                .await?;

        stock.ok_or_else(|| DbError::not_found("Variant", variant_id))
    }

    async fn product_stock(&self, product_id: &str) -> DbResult<ProductStock> {
        let row: Option<(i64, i64, i64)> = sqlx::query_as(
            r#"
            SELECT
                p.stock_quantity,
                COUNT(v.id),
                COALESCE(SUM(v.stock_quantity), 0)
            FROM products p
            LEFT JOIN product_variants v ON v.product_id = p.id
            WHERE p.id = ?1
            GROUP BY p.id
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((own, variant_count, variant_total)) => Ok(ProductStock {
                own,
                variant_count,
                variant_total,
            }),
            None => Err(DbError::not_found("Product", product_id)),
        }
    }

    async fn reserve_and_deduct(&self, target: &StockTarget, quantity: i64) -> DbResult<()> {
        debug!(target = %target, quantity, "Deducting stock");

        let mut conn = self.pool.acquire().await?;
        guarded_decrement(&mut conn, target, quantity).await
    }

    async fn deduct_for_item(
        &self,
        item_id: &str,
        target: &StockTarget,
        quantity: i64,
    ) -> DbResult<Deduction> {
        debug!(item_id = %item_id, target = %target, quantity, "Deducting stock for item");

        let mut tx = self.pool.begin().await?;

        let marked = sqlx::query(
            "UPDATE invoice_items SET stock_deducted = 1 WHERE id = ?1 AND stock_deducted = 0",
        )
        .bind(item_id)
        .execute(&mut *tx)
        .await?;

        if marked.rows_affected() == 0 {
            let exists: Option<i64> =
                sqlx::query_scalar("SELECT 1 FROM invoice_items WHERE id = ?1")
                    .bind(item_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            tx.rollback().await?;

            return match exists {
                Some(_) => {
                    debug!(item_id = %item_id, "Stock already deducted for item");
                    Ok(Deduction::AlreadyApplied)
                }
                None => Err(DbError::not_found("InvoiceItem", item_id)),
            };
        }

        // An error here drops the transaction, which un-marks the item.
        guarded_decrement(&mut tx, target, quantity).await?;
        tx.commit().await?;

        Ok(Deduction::Applied)
    }
}

/// Decrements one counter if and only if it holds at least `quantity`.
async fn guarded_decrement(
    conn: &mut SqliteConnection,
    target: &StockTarget,
    quantity: i64,
) -> DbResult<()> {
    if quantity <= 0 {
        return Err(DbError::InvalidInput(format!(
            "deduction quantity must be positive, got {}",
            quantity
        )));
    }

    let (table, entity) = match target {
        StockTarget::Variant { .. } => ("product_variants", "Variant"),
        StockTarget::Product { .. } => ("products", "Product"),
    };

    let update = format!(
        "UPDATE {} SET stock_quantity = stock_quantity - ?2, updated_at = ?3 \
         WHERE id = ?1 AND stock_quantity >= ?2",
        table
    );
    let result = sqlx::query(&update)
        .bind(target.id())
        .bind(quantity)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 1 {
        return Ok(());
    }

    let lookup = format!("SELECT stock_quantity FROM {} WHERE id = ?1", table);
    let available: Option<i64> = sqlx::query_scalar(&lookup)
        .bind(target.id())
        .fetch_optional(&mut *conn)
        .await?;

    match available {
        Some(available) => {
            warn!(target = %target, available, requested = quantity, "Insufficient stock");
            Err(DbError::InsufficientStock {
                target: target.to_string(),
                available,
                requested: quantity,
            })
        }
        None => Err(DbError::not_found(entity, target.id())),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures;
    use crate::{Database, InvoiceStore};

    async fn seeded() -> Database {
        let db = fixtures::database().await;
        let catalog = db.catalog();
        for product in [
            fixtures::product("kurta", 1_000, 3),
            fixtures::product("scarf", 300, 2),
        ] {
            catalog.insert_product(&product).await.unwrap();
        }
        for variant in [
            fixtures::variant("kurta-m", "kurta", 1),
            fixtures::variant("kurta-l", "kurta", 4),
        ] {
            catalog.insert_variant(&variant).await.unwrap();
        }
        db
    }

    fn variant(id: &str) -> StockTarget {
        StockTarget::Variant {
            variant_id: id.to_string(),
        }
    }

    fn product(id: &str) -> StockTarget {
        StockTarget::Product {
            product_id: id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_availability_queries() {
        let db = seeded().await;
        let ledger = db.stock();

        assert_eq!(ledger.available_for_variant("kurta-m").await.unwrap(), 1);
        // Variants exist, so the product's own counter is ignored.
        assert_eq!(ledger.available_for_product("kurta").await.unwrap(), 5);
        assert_eq!(ledger.available_for_product("scarf").await.unwrap(), 2);
        assert_eq!(
            ledger.product_stock("kurta").await.unwrap(),
            ProductStock {
                own: 3,
                variant_count: 2,
                variant_total: 5,
            }
        );
        assert!(!ledger.product_stock("scarf").await.unwrap().has_variants());

        assert!(matches!(
            ledger.available_for_variant("nope").await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(
            ledger.available_for_product("nope").await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_deduct_touches_exactly_one_counter() {
        let db = seeded().await;
        let ledger = db.stock();

        ledger
            .reserve_and_deduct(&variant("kurta-l"), 3)
            .await
            .unwrap();
        assert_eq!(ledger.available_for_variant("kurta-l").await.unwrap(), 1);

        let kurta = db.catalog().get_product("kurta").await.unwrap().unwrap();
        assert_eq!(kurta.stock_quantity, 3);

        ledger
            .reserve_and_deduct(&product("scarf"), 2)
            .await
            .unwrap();
        assert_eq!(ledger.available_for_product("scarf").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insufficient_stock_leaves_counter_unchanged() {
        let db = seeded().await;
        let ledger = db.stock();

        let err = ledger
            .reserve_and_deduct(&variant("kurta-m"), 2)
            .await
            .unwrap_err();
        match err {
            DbError::InsufficientStock {
                target,
                available,
                requested,
            } => {
                assert_eq!(target, "variant:kurta-m");
                assert_eq!(available, 1);
                assert_eq!(requested, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(ledger.available_for_variant("kurta-m").await.unwrap(), 1);

        assert!(matches!(
            ledger.reserve_and_deduct(&variant("ghost"), 1).await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(
            ledger.reserve_and_deduct(&product("scarf"), 0).await,
            Err(DbError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_last_unit_goes_to_exactly_one_of_two_concurrent_deductions() {
        let db = seeded().await;
        let a = db.stock();
        let b = db.stock();

        let target = variant("kurta-m");
        let (first, second) = tokio::join!(
            a.reserve_and_deduct(&target, 1),
            b.reserve_and_deduct(&target, 1)
        );

        assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);
        assert_eq!(a.available_for_variant("kurta-m").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_deduct_for_item_applies_once() {
        let db = seeded().await;
        let invoice = fixtures::invoice("i1", 200, fixtures::at(5, 10));
        let item = fixtures::catalog_item("it1", &invoice, 0, "kurta", Some("kurta-l"), 2);
        let invoices = db.invoices();
        invoices.insert_invoice(&invoice).await.unwrap();
        invoices.insert_item(&item).await.unwrap();

        let ledger = db.stock();
        let target = variant("kurta-l");

        assert_eq!(
            ledger.deduct_for_item("it1", &target, 2).await.unwrap(),
            Deduction::Applied
        );
        assert_eq!(
            ledger.deduct_for_item("it1", &target, 2).await.unwrap(),
            Deduction::AlreadyApplied
        );
        assert_eq!(ledger.available_for_variant("kurta-l").await.unwrap(), 2);

        let items = invoices.get_items("i1").await.unwrap();
        assert!(items[0].stock_deducted);
    }

    #[tokio::test]
    async fn test_failed_item_deduction_leaves_item_unmarked() {
        let db = seeded().await;
        let invoice = fixtures::invoice("i1", 500, fixtures::at(5, 10));
        let item = fixtures::catalog_item("it1", &invoice, 0, "kurta", Some("kurta-m"), 5);
        let invoices = db.invoices();
        invoices.insert_invoice(&invoice).await.unwrap();
        invoices.insert_item(&item).await.unwrap();

        let target = variant("kurta-m");
        let result = db.stock().deduct_for_item("it1", &target, 5).await;
        assert!(matches!(result, Err(DbError::InsufficientStock { .. })));

        let items = invoices.get_items("i1").await.unwrap();
        assert!(!items[0].stock_deducted);
    }
}
