//! # Invoice Repository
//!
//! Invoices, their items, the append-only payment ledger and the status
//! audit trail.
//!
//! ## Settlement Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  append_entries(invoice, audit?, entries)   (one transaction)           │
//! │                                                                         │
//! │    1. INSERT invoice_status_audit     (only when leaving paid)          │
//! │    2. INSERT invoice_payments ...                                       │
//! │    3. SELECT Σ signed amounts         ← re-summed, never P + a          │
//! │    4. Σ outside [0, G]?  → rollback, DbError::Conflict                  │
//! │    5. UPDATE invoices SET paid_amount, payment_status                   │
//! │                                                                         │
//! │  The INSERT in step 2 takes SQLite's write lock, so the sum in step 3   │
//! │  sees every entry committed by other tills.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use dukaan_core::archive::InvoiceFilter;
use dukaan_core::payment::Settlement;
use dukaan_core::{EntryKind, Invoice, InvoiceItem, Money, PaymentEntry, SaleEvent, StatusAudit};

const INVOICE_COLUMNS: &str = "id, invoice_number, customer_name, customer_phone, reference_by, \
     tax_type, tax_rate_bps, subtotal_paise, total_discount_paise, taxable_paise, \
     cgst_paise, sgst_paise, igst_paise, grand_total_paise, paid_amount_paise, \
     payment_status, line_count, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, invoice_id, position, kind, product_id, variant_id, item_code, \
     description, quantity, unit_price_paise, discount_bps, discount_paise, line_total_paise, \
     stock_deducted, created_at";

const LEDGER_SUM: &str = "SELECT COALESCE(SUM(CASE kind WHEN 'reversal' THEN -amount_paise \
     ELSE amount_paise END), 0) FROM invoice_payments WHERE invoice_id = ?1";

/// The invoice persistence seam used by the commit saga.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Writes a new invoice header.
    async fn insert_invoice(&self, invoice: &Invoice) -> DbResult<()>;

    /// Writes one line item of an existing invoice.
    async fn insert_item(&self, item: &InvoiceItem) -> DbResult<()>;

    /// Appends one payment ledger entry.
    async fn insert_payment(&self, entry: &PaymentEntry) -> DbResult<()>;
}

/// An invoice whose stored item count is short of its `line_count`.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct IncompleteInvoice {
    pub invoice_id: String,
    pub invoice_number: String,
    pub expected_lines: i64,
    pub stored_lines: i64,
}

/// Repository for invoice operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        let sql = format!("SELECT {} FROM invoices WHERE id = ?1", INVOICE_COLUMNS);
        let invoice = sqlx::query_as::<_, Invoice>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(invoice)
    }

    pub async fn get_by_number(&self, invoice_number: &str) -> DbResult<Option<Invoice>> {
        let sql = format!(
            "SELECT {} FROM invoices WHERE invoice_number = ?1",
            INVOICE_COLUMNS
        );
        let invoice = sqlx::query_as::<_, Invoice>(&sql)
            .bind(invoice_number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(invoice)
    }

    /// Items of an invoice in line order.
    pub async fn get_items(&self, invoice_id: &str) -> DbResult<Vec<InvoiceItem>> {
        let sql = format!(
            "SELECT {} FROM invoice_items WHERE invoice_id = ?1 ORDER BY position",
            ITEM_COLUMNS
        );
        let items = sqlx::query_as::<_, InvoiceItem>(&sql)
            .bind(invoice_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Payment ledger of an invoice, oldest first.
    pub async fn get_payments(&self, invoice_id: &str) -> DbResult<Vec<PaymentEntry>> {
        let entries = sqlx::query_as::<_, PaymentEntry>(
            r#"
            SELECT id, invoice_id, kind, method, amount_paise, note, created_at
            FROM invoice_payments
            WHERE invoice_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    pub async fn get_audit_trail(&self, invoice_id: &str) -> DbResult<Vec<StatusAudit>> {
        let audits = sqlx::query_as::<_, StatusAudit>(
            r#"
            SELECT id, invoice_id, reason, old_status, new_status, created_at
            FROM invoice_status_audit
            WHERE invoice_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(audits)
    }

    /// Raw signed sum of an invoice's ledger (not clamped).
    pub async fn ledger_sum(&self, invoice_id: &str) -> DbResult<Money> {
        let sum: i64 = sqlx::query_scalar(LEDGER_SUM)
            .bind(invoice_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(Money::from_paise(sum))
    }

    /// Writes the audit row (if any) and ledger entries, then re-derives the
    /// invoice's paid amount and status from the whole ledger.
    ///
    /// ## Returns
    /// * `Ok(Invoice)` - The refreshed invoice
    /// * `Err(DbError::NotFound)` - Unknown invoice
    /// * `Err(DbError::Conflict)` - The ledger would settle more than the
    ///   grand total, or go negative; nothing was written
    pub async fn append_entries(
        &self,
        invoice_id: &str,
        audit: Option<&StatusAudit>,
        entries: &[PaymentEntry],
    ) -> DbResult<Invoice> {
        debug!(
            invoice_id = %invoice_id,
            entries = entries.len(),
            audited = audit.is_some(),
            "Appending ledger entries"
        );

        let mut tx = self.pool.begin().await?;

        if let Some(audit) = audit {
            insert_audit(&mut tx, audit).await?;
        }
        for entry in entries {
            insert_entry(&mut tx, entry).await?;
        }

        let grand_total: Option<i64> =
            sqlx::query_scalar("SELECT grand_total_paise FROM invoices WHERE id = ?1")
                .bind(invoice_id)
                .fetch_optional(&mut *tx)
                .await?;
        let grand_total = Money::from_paise(
            grand_total.ok_or_else(|| DbError::not_found("Invoice", invoice_id))?,
        );

        let sum: i64 = sqlx::query_scalar(LEDGER_SUM)
            .bind(invoice_id)
            .fetch_one(&mut *tx)
            .await?;
        let sum = Money::from_paise(sum);

        let settles_more = entries.iter().any(|e| e.kind != EntryKind::Reversal);
        if (settles_more && sum > grand_total) || sum.is_negative() {
            return Err(DbError::Conflict(format!(
                "ledger for invoice {} would total {} against {}",
                invoice_id, sum, grand_total
            )));
        }

        let settlement = Settlement::from_ledger_sum(sum, grand_total);
        write_settlement(&mut tx, invoice_id, settlement).await?;

        tx.commit().await?;

        info!(
            invoice_id = %invoice_id,
            paid = %settlement.paid,
            status = %settlement.status,
            "Invoice settlement updated"
        );

        self.get_by_id(invoice_id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", invoice_id))
    }

    /// Re-derives paid amount and status from the ledger as it stands, for
    /// entries written out of band.
    pub async fn refresh_settlement(&self, invoice_id: &str) -> DbResult<Invoice> {
        self.append_entries(invoice_id, None, &[]).await
    }

    /// Committed invoices matching `filter`, newest first.
    pub async fn list(&self, filter: &InvoiceFilter) -> DbResult<Vec<Invoice>> {
        let from: Option<DateTime<Utc>> = filter.from.map(|d| d.and_time(NaiveTime::MIN).and_utc());
        let until: Option<DateTime<Utc>> = filter
            .to
            .and_then(|d| d.checked_add_days(Days::new(1)))
            .map(|d| d.and_time(NaiveTime::MIN).and_utc());

        let sql = format!(
            r#"
            SELECT {} FROM invoices
            WHERE (?1 IS NULL OR payment_status = ?1)
              AND (?2 IS NULL OR created_at >= ?2)
              AND (?3 IS NULL OR created_at < ?3)
            ORDER BY created_at DESC, invoice_number DESC
            "#,
            INVOICE_COLUMNS
        );

        let invoices = sqlx::query_as::<_, Invoice>(&sql)
            .bind(filter.status)
            .bind(from)
            .bind(until)
            .fetch_all(&self.pool)
            .await?;

        let invoices: Vec<Invoice> = invoices.into_iter().filter(|i| filter.matches(i)).collect();

        debug!(count = invoices.len(), "Listed invoices");
        Ok(invoices)
    }

    /// Invoices with at least one catalog item whose stock was never taken.
    pub async fn list_pending_stock(&self) -> DbResult<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT it.invoice_id
            FROM invoice_items it
            JOIN invoices i ON i.id = it.invoice_id
            WHERE it.kind = 'catalog'
              AND it.product_id IS NOT NULL
              AND it.stock_deducted = 0
            ORDER BY i.created_at, it.invoice_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Invoices whose headers were written but whose item set is short.
    pub async fn list_incomplete(&self) -> DbResult<Vec<IncompleteInvoice>> {
        let rows = sqlx::query_as::<_, IncompleteInvoice>(
            r#"
            SELECT
                i.id AS invoice_id,
                i.invoice_number,
                i.line_count AS expected_lines,
                COUNT(it.id) AS stored_lines
            FROM invoices i
            LEFT JOIN invoice_items it ON it.invoice_id = i.id
            GROUP BY i.id
            HAVING COUNT(it.id) < i.line_count
            ORDER BY i.created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Offline-channel sale events for catalog items of invoices created in
    /// `[from, until)`. Manual lines carry no product and are skipped.
    pub async fn sale_events(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> DbResult<Vec<SaleEvent>> {
        let events = sqlx::query_as::<_, SaleEvent>(
            r#"
            SELECT
                it.product_id AS product_id,
                it.quantity AS quantity,
                'offline' AS channel,
                i.created_at AS occurred_at
            FROM invoice_items it
            JOIN invoices i ON i.id = it.invoice_id
            WHERE it.kind = 'catalog'
              AND it.product_id IS NOT NULL
              AND i.created_at >= ?1
              AND i.created_at < ?2
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = events.len(), "Loaded offline sale events");
        Ok(events)
    }
}

#[async_trait]
impl InvoiceStore for InvoiceRepository {
    async fn insert_invoice(&self, invoice: &Invoice) -> DbResult<()> {
        debug!(id = %invoice.id, number = %invoice.invoice_number, "Inserting invoice");

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, invoice_number, customer_name, customer_phone, reference_by,
                tax_type, tax_rate_bps, subtotal_paise, total_discount_paise, taxable_paise,
                cgst_paise, sgst_paise, igst_paise, grand_total_paise, paid_amount_paise,
                payment_status, line_count, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14, ?15,
                ?16, ?17, ?18, ?19
            )
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.invoice_number)
        .bind(&invoice.customer_name)
        .bind(&invoice.customer_phone)
        .bind(&invoice.reference_by)
        .bind(invoice.tax_type)
        .bind(invoice.tax_rate_bps)
        .bind(invoice.subtotal_paise)
        .bind(invoice.total_discount_paise)
        .bind(invoice.taxable_paise)
        .bind(invoice.cgst_paise)
        .bind(invoice.sgst_paise)
        .bind(invoice.igst_paise)
        .bind(invoice.grand_total_paise)
        .bind(invoice.paid_amount_paise)
        .bind(invoice.payment_status)
        .bind(invoice.line_count)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_item(&self, item: &InvoiceItem) -> DbResult<()> {
        debug!(invoice_id = %item.invoice_id, position = item.position, "Inserting invoice item");

        sqlx::query(
            r#"
            INSERT INTO invoice_items (
                id, invoice_id, position, kind, product_id, variant_id, item_code,
                description, quantity, unit_price_paise, discount_bps, discount_paise,
                line_total_paise, stock_deducted, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&item.id)
        .bind(&item.invoice_id)
        .bind(item.position)
        .bind(item.kind)
        .bind(&item.product_id)
        .bind(&item.variant_id)
        .bind(&item.item_code)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.unit_price_paise)
        .bind(item.discount_bps)
        .bind(item.discount_paise)
        .bind(item.line_total_paise)
        .bind(item.stock_deducted)
        .bind(item.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_payment(&self, entry: &PaymentEntry) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_entry(&mut conn, entry).await
    }
}

async fn insert_entry(conn: &mut SqliteConnection, entry: &PaymentEntry) -> DbResult<()> {
    if !entry.amount().is_positive() {
        return Err(DbError::InvalidInput(format!(
            "ledger amounts must be positive, got {}",
            entry.amount()
        )));
    }

    debug!(
        invoice_id = %entry.invoice_id,
        kind = ?entry.kind,
        amount = %entry.amount(),
        "Inserting ledger entry"
    );

    sqlx::query(
        r#"
        INSERT INTO invoice_payments (id, invoice_id, kind, method, amount_paise, note, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.invoice_id)
    .bind(entry.kind)
    .bind(entry.method)
    .bind(entry.amount_paise)
    .bind(&entry.note)
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_audit(conn: &mut SqliteConnection, audit: &StatusAudit) -> DbResult<()> {
    info!(
        invoice_id = %audit.invoice_id,
        from = %audit.old_status,
        to = %audit.new_status,
        "Recording status override audit"
    );

    sqlx::query(
        r#"
        INSERT INTO invoice_status_audit
            (id, invoice_id, reason, old_status, new_status, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&audit.id)
    .bind(&audit.invoice_id)
    .bind(&audit.reason)
    .bind(audit.old_status)
    .bind(audit.new_status)
    .bind(audit.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn write_settlement(
    conn: &mut SqliteConnection,
    invoice_id: &str,
    settlement: Settlement,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE invoices
        SET paid_amount_paise = ?2, payment_status = ?3, updated_at = ?4
        WHERE id = ?1
        "#,
    )
    .bind(invoice_id)
    .bind(settlement.paid.paise())
    .bind(settlement.status)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Invoice", invoice_id));
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures;
    use chrono::NaiveDate;
    use dukaan_core::{LineKind, PaymentMethod, PaymentStatus};
    use uuid::Uuid;

    fn entry(invoice_id: &str, kind: EntryKind, amount: i64) -> PaymentEntry {
        PaymentEntry {
            id: Uuid::new_v4().to_string(),
            invoice_id: invoice_id.to_string(),
            kind,
            method: (kind == EntryKind::Payment).then_some(PaymentMethod::Upi),
            amount_paise: amount,
            note: None,
            created_at: Utc::now(),
        }
    }

    async fn with_invoice(total: i64) -> (crate::Database, InvoiceRepository) {
        let db = fixtures::database().await;
        let repo = db.invoices();
        repo.insert_invoice(&fixtures::invoice("i1", total, fixtures::at(5, 10)))
            .await
            .unwrap();
        (db, repo)
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let db = fixtures::database().await;
        db.catalog()
            .insert_product(&fixtures::product("kurta", 100, 5))
            .await
            .unwrap();

        let repo = db.invoices();
        let invoice = fixtures::invoice("i1", 300, fixtures::at(5, 10));
        repo.insert_invoice(&invoice).await.unwrap();
        for (id, position, quantity) in [("it2", 1, 1), ("it1", 0, 2)] {
            let item = fixtures::catalog_item(id, &invoice, position, "kurta", None, quantity);
            repo.insert_item(&item).await.unwrap();
        }

        let stored = repo.get_by_number("INV-i1").await.unwrap().unwrap();
        assert_eq!(stored.id, "i1");
        assert_eq!(stored.payment_status, PaymentStatus::Unpaid);

        let items = repo.get_items("i1").await.unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["it1", "it2"]);
        assert_eq!(items[0].kind, LineKind::Catalog);
        assert!(!items[0].stock_deducted);
    }

    #[tokio::test]
    async fn test_duplicate_invoice_number_rejected() {
        let (_db, repo) = with_invoice(100).await;
        let mut again = fixtures::invoice("i2", 100, fixtures::at(5, 11));
        again.invoice_number = "INV-i1".to_string();

        let err = repo.insert_invoice(&again).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_paid_amount_is_resummed_from_ledger() {
        let (_db, repo) = with_invoice(1_000).await;

        let invoice = repo
            .append_entries("i1", None, &[entry("i1", EntryKind::Payment, 400)])
            .await
            .unwrap();
        assert_eq!(invoice.paid_amount_paise, 400);
        assert_eq!(invoice.payment_status, PaymentStatus::Partial);

        // Written out of band, bypassing the settlement update.
        repo.insert_payment(&entry("i1", EntryKind::Payment, 100))
            .await
            .unwrap();

        let invoice = repo
            .append_entries("i1", None, &[entry("i1", EntryKind::Payment, 500)])
            .await
            .unwrap();
        assert_eq!(invoice.paid_amount_paise, 1_000);
        assert_eq!(invoice.payment_status, PaymentStatus::Paid);
        assert_eq!(repo.get_payments("i1").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_refresh_picks_up_out_of_band_entries() {
        let (_db, repo) = with_invoice(1_000).await;
        repo.insert_payment(&entry("i1", EntryKind::Payment, 250))
            .await
            .unwrap();

        let invoice = repo.refresh_settlement("i1").await.unwrap();
        assert_eq!(invoice.paid_amount_paise, 250);
        assert_eq!(invoice.payment_status, PaymentStatus::Partial);
    }

    #[tokio::test]
    async fn test_overpayment_rolls_back() {
        let (_db, repo) = with_invoice(1_000).await;
        repo.append_entries("i1", None, &[entry("i1", EntryKind::Payment, 900)])
            .await
            .unwrap();

        let err = repo
            .append_entries("i1", None, &[entry("i1", EntryKind::Payment, 200)])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));

        assert_eq!(repo.get_payments("i1").await.unwrap().len(), 1);
        assert_eq!(repo.ledger_sum("i1").await.unwrap().paise(), 900);
    }

    #[tokio::test]
    async fn test_audit_and_reversal_written_together() {
        let (_db, repo) = with_invoice(1_000).await;
        repo.append_entries("i1", None, &[entry("i1", EntryKind::Payment, 1_000)])
            .await
            .unwrap();

        let audit = StatusAudit {
            id: Uuid::new_v4().to_string(),
            invoice_id: "i1".to_string(),
            reason: "cheque bounced".to_string(),
            old_status: PaymentStatus::Paid,
            new_status: PaymentStatus::Unpaid,
            created_at: Utc::now(),
        };
        let reversal = entry("i1", EntryKind::Reversal, 1_000);
        let invoice = repo
            .append_entries("i1", Some(&audit), &[reversal])
            .await
            .unwrap();

        assert_eq!(invoice.payment_status, PaymentStatus::Unpaid);
        assert_eq!(invoice.paid_amount_paise, 0);

        let trail = repo.get_audit_trail("i1").await.unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].reason, "cheque bounced");
        assert_eq!(trail[0].old_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_unknown_invoice_writes_nothing() {
        let (_db, repo) = with_invoice(1_000).await;
        let err = repo
            .append_entries("ghost", None, &[entry("ghost", EntryKind::Payment, 1)])
            .await
            .unwrap_err();
        // The foreign key fires before the lookup.
        assert!(matches!(
            err,
            DbError::ForeignKeyViolation { .. } | DbError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_list_filters_by_window_and_fields() {
        let db = fixtures::database().await;
        let repo = db.invoices();
        repo.insert_invoice(&fixtures::invoice("a", 500, fixtures::at(3, 23)))
            .await
            .unwrap();
        repo.insert_invoice(&fixtures::invoice("b", 900, fixtures::at(4, 0)))
            .await
            .unwrap();
        repo.insert_invoice(&fixtures::invoice("c", 200, fixtures::at(5, 12)))
            .await
            .unwrap();

        let all = repo.list(&InvoiceFilter::default()).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["c", "b", "a"]);

        let day = NaiveDate::from_ymd_opt(2026, 10, 4);
        let fourth = repo
            .list(&InvoiceFilter {
                from: day,
                to: day,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(fourth.len(), 1);
        assert_eq!(fourth[0].id, "b");

        let big = repo
            .list(&InvoiceFilter {
                min_total: Some(Money::from_paise(400)),
                status: Some(PaymentStatus::Unpaid),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(big.len(), 2);
    }

    #[tokio::test]
    async fn test_repair_queries() {
        let db = fixtures::database().await;
        db.catalog()
            .insert_product(&fixtures::product("kurta", 100, 5))
            .await
            .unwrap();
        let repo = db.invoices();

        let mut short = fixtures::invoice("short", 200, fixtures::at(5, 9));
        short.line_count = 2;
        repo.insert_invoice(&short).await.unwrap();
        repo.insert_item(&fixtures::catalog_item("s0", &short, 0, "kurta", None, 1))
            .await
            .unwrap();

        let done = fixtures::invoice("done", 100, fixtures::at(5, 10));
        repo.insert_invoice(&done).await.unwrap();
        let mut item = fixtures::catalog_item("d0", &done, 0, "kurta", None, 1);
        item.stock_deducted = true;
        repo.insert_item(&item).await.unwrap();

        let pending = repo.list_pending_stock().await.unwrap();
        assert_eq!(pending, vec!["short".to_string()]);

        let incomplete = repo.list_incomplete().await.unwrap();
        assert_eq!(incomplete.len(), 1);
        assert_eq!(incomplete[0].invoice_id, "short");
        assert_eq!(incomplete[0].expected_lines, 2);
        assert_eq!(incomplete[0].stored_lines, 1);
    }

    #[tokio::test]
    async fn test_sale_events_use_invoice_time_and_skip_manual_lines() {
        let db = fixtures::database().await;
        db.catalog()
            .insert_product(&fixtures::product("kurta", 100, 5))
            .await
            .unwrap();
        let repo = db.invoices();

        let invoice = fixtures::invoice("i1", 300, fixtures::at(5, 10));
        repo.insert_invoice(&invoice).await.unwrap();
        let sold = fixtures::catalog_item("it0", &invoice, 0, "kurta", None, 3);
        repo.insert_item(&sold).await.unwrap();
        let mut manual = fixtures::catalog_item("it1", &invoice, 1, "kurta", None, 1);
        manual.kind = LineKind::Manual;
        manual.product_id = None;
        repo.insert_item(&manual).await.unwrap();

        let events = repo
            .sale_events(fixtures::at(5, 0), fixtures::at(6, 0))
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].quantity, 3);
        assert_eq!(events[0].channel, dukaan_core::SalesChannel::Offline);
        assert_eq!(events[0].occurred_at, fixtures::at(5, 10));

        let none = repo
            .sale_events(fixtures::at(6, 0), fixtures::at(7, 0))
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
