//! # Stock Repair
//!
//! Finishes stock deduction for invoices a commit left partway.
//!
//! Every catalog item carries a `stock_deducted` flag that the ledger sets
//! in the same transaction as its decrement, so running a repair twice (or
//! alongside a late commit) never takes stock twice for one item.
//!
//! Items that were never written (a header saved with fewer items than its
//! `line_count`) cannot be rebuilt from the invoice alone; they are reported
//! as missing for an operator to handle.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use dukaan_db::{DbError, DbResult, Deduction, InvoiceRepository, StockLedger};

use crate::commit::{item_target, DEFAULT_STEP_TIMEOUT};

/// A line whose stock was taken by this repair run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairedLine {
    pub line: usize,
    pub target: String,
    pub quantity: i64,
}

/// A line that still could not be deducted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedLine {
    pub line: usize,
    pub target: String,
    pub reason: String,
}

/// Header says more lines than were stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingItems {
    pub expected: i64,
    pub stored: i64,
}

/// Outcome of repairing one invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairReport {
    pub invoice_id: String,
    pub invoice_number: String,
    pub applied: Vec<RepairedLine>,
    pub already_applied: Vec<usize>,
    pub failed: Vec<FailedLine>,
    pub missing_items: Option<MissingItems>,
}

impl RepairReport {
    /// Nothing left for an operator to do.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.missing_items.is_none()
    }
}

/// Outcome of a sweep over every invoice needing attention.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairSweep {
    pub reports: Vec<RepairReport>,
}

impl RepairSweep {
    pub fn lines_applied(&self) -> usize {
        self.reports.iter().map(|r| r.applied.len()).sum()
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &RepairReport> {
        self.reports.iter().filter(|r| !r.is_clean())
    }
}

/// Re-runs stock deduction against the ledger.
#[derive(Debug, Clone)]
pub struct StockRepair<L> {
    invoices: InvoiceRepository,
    ledger: L,
    step_timeout: Duration,
}

impl<L: StockLedger> StockRepair<L> {
    pub fn new(invoices: InvoiceRepository, ledger: L) -> Self {
        StockRepair {
            invoices,
            ledger,
            step_timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    pub fn step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Deducts every catalog item of `invoice_id` not yet marked deducted.
    ///
    /// A failing line does not stop the others; it is listed in
    /// [`RepairReport::failed`] and can be retried later.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Unknown invoice
    pub async fn repair_invoice(&self, invoice_id: &str) -> DbResult<RepairReport> {
        let invoice = self
            .invoices
            .get_by_id(invoice_id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", invoice_id))?;
        let items = self.invoices.get_items(invoice_id).await?;

        debug!(
            invoice = %invoice.invoice_number,
            items = items.len(),
            expected = invoice.line_count,
            "Repairing invoice stock"
        );

        let mut report = RepairReport {
            invoice_id: invoice.id.clone(),
            invoice_number: invoice.invoice_number.clone(),
            applied: Vec::new(),
            already_applied: Vec::new(),
            failed: Vec::new(),
            missing_items: None,
        };

        let stored = items.len() as i64;
        if stored < invoice.line_count {
            warn!(
                invoice = %invoice.invoice_number,
                expected = invoice.line_count,
                stored,
                "Invoice is missing items; they cannot be repaired automatically"
            );
            report.missing_items = Some(MissingItems {
                expected: invoice.line_count,
                stored,
            });
        }

        for item in &items {
            let Some(target) = item_target(item) else {
                continue;
            };
            let line = item.position as usize;

            if item.stock_deducted {
                report.already_applied.push(line);
                continue;
            }

            let quantity = item.quantity;
            let deduction = self.ledger.deduct_for_item(&item.id, &target, quantity);
            let outcome = tokio::time::timeout(self.step_timeout, deduction)
            .await
            .unwrap_or_else(|_| Err(DbError::timeout("deduct stock")));

            match outcome {
                Ok(Deduction::Applied) => {
                    info!(
                        invoice = %invoice.invoice_number,
                        line,
                        target = %target,
                        quantity = item.quantity,
                        "Repaired stock deduction"
                    );
                    report.applied.push(RepairedLine {
                        line,
                        target: target.to_string(),
                        quantity: item.quantity,
                    });
                }
                Ok(Deduction::AlreadyApplied) => report.already_applied.push(line),
                Err(e) => {
                    warn!(
                        invoice = %invoice.invoice_number,
                        line,
                        target = %target,
                        error = %e,
                        "Stock repair failed for line"
                    );
                    report.failed.push(FailedLine {
                        line,
                        target: target.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// Repairs every invoice with undeducted catalog items or missing items.
    pub async fn repair_pending(&self) -> DbResult<RepairSweep> {
        let pending = self.invoices.list_pending_stock().await?;
        let mut ids: BTreeSet<String> = pending.into_iter().collect();
        ids.extend(
            self.invoices
                .list_incomplete()
                .await?
                .into_iter()
                .map(|inc| inc.invoice_id),
        );

        info!(invoices = ids.len(), "Stock repair sweep started");

        let mut sweep = RepairSweep::default();
        for id in &ids {
            sweep.reports.push(self.repair_invoice(id).await?);
        }

        info!(
            invoices = sweep.reports.len(),
            applied = sweep.lines_applied(),
            unresolved = sweep.unresolved().count(),
            "Stock repair sweep finished"
        );
        Ok(sweep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dukaan_core::{Invoice, InvoiceItem, LineKind, PaymentStatus, Product, TaxType};
    use dukaan_db::{Database, DbConfig, InvoiceStore, StockLedger};

    async fn database() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.catalog()
            .insert_product(&Product {
                id: "belt".to_string(),
                name: "Belt".to_string(),
                item_code: None,
                price_paise: 5_000,
                offer_price_paise: None,
                stock_quantity: 3,
                is_active: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .await
            .unwrap();
        db
    }

    fn invoice(id: &str, line_count: i64) -> Invoice {
        let now = Utc::now();
        Invoice {
            id: id.to_string(),
            invoice_number: format!("DK-{}", id),
            customer_name: "Asha".to_string(),
            customer_phone: None,
            reference_by: None,
            tax_type: TaxType::None,
            tax_rate_bps: 0,
            subtotal_paise: 10_000,
            total_discount_paise: 0,
            taxable_paise: 10_000,
            cgst_paise: 0,
            sgst_paise: 0,
            igst_paise: 0,
            grand_total_paise: 10_000,
            paid_amount_paise: 0,
            payment_status: PaymentStatus::Unpaid,
            line_count,
            created_at: now,
            updated_at: now,
        }
    }

    fn belt_item(invoice_id: &str, position: i64, quantity: i64) -> InvoiceItem {
        InvoiceItem {
            id: format!("{}-{}", invoice_id, position),
            invoice_id: invoice_id.to_string(),
            position,
            kind: LineKind::Catalog,
            product_id: Some("belt".to_string()),
            variant_id: None,
            item_code: None,
            description: "Belt".to_string(),
            quantity,
            unit_price_paise: 5_000,
            discount_bps: 0,
            discount_paise: 0,
            line_total_paise: 5_000 * quantity,
            stock_deducted: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_repair_is_idempotent() {
        let db = database().await;
        let invoices = db.invoices();
        invoices.insert_invoice(&invoice("a", 2)).await.unwrap();
        invoices.insert_item(&belt_item("a", 0, 1)).await.unwrap();
        invoices.insert_item(&belt_item("a", 1, 1)).await.unwrap();

        let repair = StockRepair::new(db.invoices(), db.stock());

        let first = repair.repair_invoice("a").await.unwrap();
        assert_eq!(first.applied.len(), 2);
        assert!(first.is_clean());
        assert_eq!(db.stock().available_for_product("belt").await.unwrap(), 1);

        let second = repair.repair_invoice("a").await.unwrap();
        assert!(second.applied.is_empty());
        assert_eq!(second.already_applied, vec![0, 1]);
        assert_eq!(db.stock().available_for_product("belt").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_line_does_not_block_others() {
        let db = database().await;
        let invoices = db.invoices();
        invoices.insert_invoice(&invoice("b", 2)).await.unwrap();
        invoices.insert_item(&belt_item("b", 0, 5)).await.unwrap();
        invoices.insert_item(&belt_item("b", 1, 2)).await.unwrap();

        let report = StockRepair::new(db.invoices(), db.stock())
            .repair_invoice("b")
            .await
            .unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].line, 0);
        assert_eq!(report.applied[0].line, 1);
        assert_eq!(db.stock().available_for_product("belt").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sweep_reports_missing_items() {
        let db = database().await;
        let invoices = db.invoices();
        invoices.insert_invoice(&invoice("c", 3)).await.unwrap();
        invoices.insert_item(&belt_item("c", 0, 1)).await.unwrap();

        let sweep = StockRepair::new(db.invoices(), db.stock())
            .repair_pending()
            .await
            .unwrap();

        assert_eq!(sweep.reports.len(), 1);
        assert_eq!(sweep.lines_applied(), 1);
        let missing = sweep.reports[0].missing_items.unwrap();
        assert_eq!((missing.expected, missing.stored), (3, 1));
        assert_eq!(sweep.unresolved().count(), 1);

        // Second sweep still surfaces the incomplete invoice but applies nothing
        let again = StockRepair::new(db.invoices(), db.stock())
            .repair_pending()
            .await
            .unwrap();
        assert_eq!(again.lines_applied(), 0);
        assert_eq!(again.reports.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_invoice() {
        let db = database().await;
        let err = StockRepair::new(db.invoices(), db.stock())
            .repair_invoice("nope")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
