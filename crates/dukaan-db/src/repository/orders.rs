//! # Online Order Repository
//!
//! The storefront writes `order_items`; the back office only reads them to
//! reconcile sales across channels. `insert_item` exists for imports and
//! tests.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use dukaan_core::SaleEvent;

/// Repository for online order lines.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    pub async fn insert_item(
        &self,
        id: &str,
        order_id: &str,
        product_id: &str,
        quantity: i64,
        created_at: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(order_id = %order_id, product_id = %product_id, quantity, "Inserting order item");

        sqlx::query(
            r#"
            INSERT INTO order_items (id, order_id, product_id, quantity, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(id)
        .bind(order_id)
        .bind(product_id)
        .bind(quantity)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Online-channel sale events created in `[from, until)`.
    pub async fn sale_events(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> DbResult<Vec<SaleEvent>> {
        let events = sqlx::query_as::<_, SaleEvent>(
            r#"
            SELECT
                product_id,
                quantity,
                'online' AS channel,
                created_at AS occurred_at
            FROM order_items
            WHERE created_at >= ?1 AND created_at < ?2
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = events.len(), "Loaded online sale events");
        Ok(events)
    }
}
