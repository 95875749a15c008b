//! # Invoice Commit Sequencer
//!
//! Turns a draft into a committed invoice and takes its stock.
//!
//! ## Stages
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Validating ───► Persisting ───► DeductingStock ───► Committed          │
//! │      │               │                 │                                │
//! │      ▼               ▼                 ▼                                │
//! │  Validation     Persistence        Deduction                            │
//! │  Insufficient   Failure            Failure                              │
//! │  Stock          (header without    (invoice valid,                      │
//! │  (no writes)     all items)         stock partly taken)                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Once `Persisting` starts the invoice row exists. A failure after that
//! point is reported with the invoice id and number and is never rolled
//! back or retried here; [`crate::repair`] finishes stock deduction for it.
//!
//! Validation and deduction read the ledger at different moments. Two
//! commits racing for the last units can both pass validation; the guarded
//! decrement then lets exactly one of them through and the other ends in
//! [`CommitError::DeductionFailure`].

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use dukaan_core::catalog::StockTarget;
use dukaan_core::draft::{compute_totals, InvoiceDraft};
use dukaan_core::payment::Settlement;
use dukaan_core::{EntryKind, Invoice, InvoiceItem, LineKind, PaymentEntry, ValidationError};
use dukaan_db::{DbError, DbResult, Deduction, InvoiceStore, StockLedger};

/// Default bound on each ledger or persistence call.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Stages & Errors
// =============================================================================

/// Where a commit is, or where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitStage {
    Validating,
    Persisting,
    DeductingStock,
    Committed,
}

impl fmt::Display for CommitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitStage::Validating => write!(f, "validating"),
            CommitStage::Persisting => write!(f, "persisting"),
            CommitStage::DeductingStock => write!(f, "deducting_stock"),
            CommitStage::Committed => write!(f, "committed"),
        }
    }
}

/// Why a commit failed.
///
/// The first five variants happen before any write. The last two are
/// partial states: an invoice row exists and carries the id to repair.
#[derive(Debug, Error)]
pub enum CommitError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Insufficient stock for line {line} ({description}): available {available}, requested {requested}")]
    InsufficientStock {
        line: usize,
        description: String,
        available: i64,
        requested: i64,
    },

    /// A bare product line for a product that sells by variant.
    #[error("Line {line} ({description}): product {product_id} has variants; choose one")]
    VariantRequired {
        line: usize,
        description: String,
        product_id: String,
    },

    /// A catalog line names a product or variant the ledger does not know.
    #[error("Line {line} ({description}) references unknown stock {target}")]
    UnknownStockTarget {
        line: usize,
        description: String,
        target: String,
    },

    #[error("Stock ledger unavailable: {0}")]
    LedgerUnavailable(#[source] DbError),

    /// Header or item write failed. With `header_written` set, the invoice
    /// exists with fewer than `items_expected` items.
    #[error("Invoice {invoice_number} was not fully saved ({items_written} of {items_expected} items): {source}")]
    PersistenceFailure {
        invoice_id: String,
        invoice_number: String,
        header_written: bool,
        items_written: usize,
        items_expected: usize,
        #[source]
        source: DbError,
    },

    /// Items are saved but stock was not (fully) taken.
    #[error("Invoice {invoice_number} saved but stock deduction failed at line {line}: {source}")]
    DeductionFailure {
        invoice_id: String,
        invoice_number: String,
        line: usize,
        deducted_lines: Vec<usize>,
        #[source]
        source: DbError,
    },
}

impl CommitError {
    /// Stage the commit was in when it failed.
    pub fn stage(&self) -> CommitStage {
        match self {
            CommitError::Validation(_)
            | CommitError::InsufficientStock { .. }
            | CommitError::VariantRequired { .. }
            | CommitError::UnknownStockTarget { .. }
            | CommitError::LedgerUnavailable(_) => CommitStage::Validating,
            CommitError::PersistenceFailure { .. } => CommitStage::Persisting,
            CommitError::DeductionFailure { .. } => CommitStage::DeductingStock,
        }
    }

    /// True when an invoice row was left behind.
    pub fn is_partial(&self) -> bool {
        match self {
            CommitError::PersistenceFailure { header_written, .. } => *header_written,
            CommitError::DeductionFailure { .. } => true,
            _ => false,
        }
    }

    pub fn invoice_id(&self) -> Option<&str> {
        match self {
            CommitError::PersistenceFailure { invoice_id, .. }
            | CommitError::DeductionFailure { invoice_id, .. } => Some(invoice_id),
            _ => None,
        }
    }
}

// =============================================================================
// Receipt
// =============================================================================

/// What a successful commit wrote.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitReceipt {
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
    pub opening_payment: Option<PaymentEntry>,
}

// =============================================================================
// Sequencer
// =============================================================================

/// Runs commits against an invoice store and a stock ledger.
///
/// ## Usage
/// ```rust,ignore
/// let sequencer = CommitSequencer::new(db.invoices(), db.stock())
///     .step_timeout(Duration::from_millis(3_000))
///     .invoice_prefix("DK");
/// let receipt = sequencer.commit(&draft).await?;
/// ```
#[derive(Debug, Clone)]
pub struct CommitSequencer<S, L> {
    store: S,
    ledger: L,
    step_timeout: Duration,
    invoice_prefix: String,
}

impl<S, L> CommitSequencer<S, L>
where
    S: InvoiceStore,
    L: StockLedger,
{
    pub fn new(store: S, ledger: L) -> Self {
        CommitSequencer {
            store,
            ledger,
            step_timeout: DEFAULT_STEP_TIMEOUT,
            invoice_prefix: "INV".to_string(),
        }
    }

    pub fn step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    pub fn invoice_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.invoice_prefix = prefix.into();
        self
    }

    /// Commits `draft`.
    ///
    /// ## Returns
    /// * `Ok(CommitReceipt)` - Header, items and any opening payment are
    ///   saved and every catalog line's stock is taken
    /// * `Err(CommitError)` - See [`CommitError::stage`] and
    ///   [`CommitError::is_partial`]
    pub async fn commit(&self, draft: &InvoiceDraft) -> Result<CommitReceipt, CommitError> {
        debug!(stage = %CommitStage::Validating, lines = draft.lines().len(), "Commit started");

        if let Err(e) = draft.validate_for_commit() {
            warn!(error = %e, "Draft rejected");
            return Err(e.into());
        }
        self.check_stock(draft).await?;

        let now = Utc::now();
        let (invoice, items, opening) = self.build_records(draft, now);
        debug!(
            stage = %CommitStage::Persisting,
            invoice = %invoice.invoice_number,
            grand_total = %invoice.grand_total(),
            "Writing invoice"
        );
        self.persist(&invoice, &items, opening.as_ref()).await?;

        debug!(
            stage = %CommitStage::DeductingStock,
            invoice = %invoice.invoice_number,
            "Taking stock"
        );
        let items = self.deduct(&invoice, items).await?;

        info!(
            stage = %CommitStage::Committed,
            invoice = %invoice.invoice_number,
            grand_total = %invoice.grand_total(),
            paid = %invoice.paid_amount(),
            status = %invoice.payment_status,
            "Invoice committed"
        );

        Ok(CommitReceipt {
            invoice,
            items,
            opening_payment: opening,
        })
    }

    /// Checks every catalog line against the counter it will be deducted
    /// from. Lines sharing a target are checked against their running total.
    async fn check_stock(&self, draft: &InvoiceDraft) -> Result<(), CommitError> {
        let mut requested: HashMap<StockTarget, i64> = HashMap::new();
        let mut available: HashMap<StockTarget, i64> = HashMap::new();

        for (line, draft_line) in draft.lines().iter().enumerate() {
            let Some(target) = draft_line.stock_target() else {
                continue;
            };

            let on_hand = match available.get(&target) {
                Some(on_hand) => *on_hand,
                None => {
                    let on_hand = self
                        .read_counter(line, &draft_line.description, &target)
                        .await?;
                    available.insert(target.clone(), on_hand);
                    on_hand
                }
            };

            let total = requested.entry(target).or_insert(0);
            *total += draft_line.quantity;

            if *total > on_hand {
                warn!(
                    line,
                    available = on_hand,
                    requested = *total,
                    "Commit rejected: insufficient stock"
                );
                return Err(CommitError::InsufficientStock {
                    line,
                    description: draft_line.description.clone(),
                    available: on_hand,
                    requested: *total,
                });
            }
        }

        Ok(())
    }

    /// Reads the counter `target` deducts from. A bare product line only
    /// has one when the product has no variants.
    async fn read_counter(
        &self,
        line: usize,
        description: &str,
        target: &StockTarget,
    ) -> Result<i64, CommitError> {
        let read = match target {
            StockTarget::Variant { variant_id } => {
                self.bounded("read stock", self.ledger.available_for_variant(variant_id))
                    .await
            }
            StockTarget::Product { product_id } => {
                match self
                    .bounded("read stock", self.ledger.product_stock(product_id))
                    .await
                {
                    Ok(stock) if stock.has_variants() => {
                        warn!(line, product_id = %product_id, "Commit rejected: variant required");
                        return Err(CommitError::VariantRequired {
                            line,
                            description: description.to_string(),
                            product_id: product_id.clone(),
                        });
                    }
                    Ok(stock) => Ok(stock.own),
                    Err(e) => Err(e),
                }
            }
        };

        read.map_err(|e| match e {
            DbError::NotFound { .. } => CommitError::UnknownStockTarget {
                line,
                description: description.to_string(),
                target: target.to_string(),
            },
            other => {
                warn!(error = %other, "Stock ledger read failed");
                CommitError::LedgerUnavailable(other)
            }
        })
    }

    fn build_records(
        &self,
        draft: &InvoiceDraft,
        now: DateTime<Utc>,
    ) -> (Invoice, Vec<InvoiceItem>, Option<PaymentEntry>) {
        let invoice_id = Uuid::new_v4().to_string();
        let tax = draft.tax();
        let totals = compute_totals(draft.lines(), &tax);
        let opening = draft.payment().opening_amount(totals.grand_total);
        let settlement = Settlement::from_ledger_sum(opening, totals.grand_total);
        let customer = draft.customer();

        let invoice = Invoice {
            id: invoice_id.clone(),
            invoice_number: self.next_invoice_number(now),
            customer_name: customer.name.trim().to_string(),
            customer_phone: non_blank(&customer.phone),
            reference_by: non_blank(&customer.reference_by),
            tax_type: tax.tax_type,
            tax_rate_bps: tax.rate.bps(),
            subtotal_paise: totals.subtotal.paise(),
            total_discount_paise: totals.total_discount.paise(),
            taxable_paise: totals.taxable.paise(),
            cgst_paise: totals.cgst.paise(),
            sgst_paise: totals.sgst.paise(),
            igst_paise: totals.igst.paise(),
            grand_total_paise: totals.grand_total.paise(),
            paid_amount_paise: settlement.paid.paise(),
            payment_status: settlement.status,
            line_count: draft.lines().len() as i64,
            created_at: now,
            updated_at: now,
        };

        let items = draft
            .lines()
            .iter()
            .enumerate()
            .map(|(position, line)| InvoiceItem {
                id: Uuid::new_v4().to_string(),
                invoice_id: invoice_id.clone(),
                position: position as i64,
                kind: line.kind,
                product_id: line.product_id.clone(),
                variant_id: line.variant_id.clone(),
                item_code: line.item_code.clone(),
                description: line.description.trim().to_string(),
                quantity: line.quantity,
                unit_price_paise: line.unit_price_paise,
                discount_bps: line.discount_bps,
                discount_paise: line.discount_paise,
                line_total_paise: line.line_total().paise(),
                stock_deducted: false,
                created_at: now,
            })
            .collect();

        let opening = settlement.paid.is_positive().then(|| PaymentEntry {
            id: Uuid::new_v4().to_string(),
            invoice_id,
            kind: EntryKind::Payment,
            method: Some(draft.payment().method),
            amount_paise: settlement.paid.paise(),
            note: Some("Paid at billing".to_string()),
            created_at: now,
        });

        (invoice, items, opening)
    }

    /// Header, then items in order, then the opening payment.
    async fn persist(
        &self,
        invoice: &Invoice,
        items: &[InvoiceItem],
        opening: Option<&PaymentEntry>,
    ) -> Result<(), CommitError> {
        let failure = |header_written: bool, items_written: usize, source: DbError| {
            if header_written {
                warn!(
                    invoice = %invoice.invoice_number,
                    invoice_id = %invoice.id,
                    items_written,
                    items_expected = items.len(),
                    error = %source,
                    "Invoice partially saved"
                );
            } else {
                warn!(
                    invoice = %invoice.invoice_number,
                    error = %source,
                    "Invoice header not saved"
                );
            }
            CommitError::PersistenceFailure {
                invoice_id: invoice.id.clone(),
                invoice_number: invoice.invoice_number.clone(),
                header_written,
                items_written,
                items_expected: items.len(),
                source,
            }
        };

        self.bounded("write invoice", self.store.insert_invoice(invoice))
            .await
            .map_err(|e| failure(false, 0, e))?;

        for (written, item) in items.iter().enumerate() {
            self.bounded("write invoice item", self.store.insert_item(item))
                .await
                .map_err(|e| failure(true, written, e))?;
        }

        if let Some(entry) = opening {
            self.bounded("write opening payment", self.store.insert_payment(entry))
                .await
                .map_err(|e| failure(true, items.len(), e))?;
        }

        Ok(())
    }

    /// Takes stock for each catalog item, strictly after all items are saved.
    async fn deduct(
        &self,
        invoice: &Invoice,
        mut items: Vec<InvoiceItem>,
    ) -> Result<Vec<InvoiceItem>, CommitError> {
        let mut deducted_lines = Vec::new();

        for item in items.iter_mut() {
            let Some(target) = item_target(item) else {
                continue;
            };
            let line = item.position as usize;

            let quantity = item.quantity;
            let deduction = self.ledger.deduct_for_item(&item.id, &target, quantity);
            let outcome = self.bounded("deduct stock", deduction).await;

            match outcome {
                Ok(Deduction::Applied) | Ok(Deduction::AlreadyApplied) => {
                    item.stock_deducted = true;
                    deducted_lines.push(line);
                }
                Err(source) => {
                    error!(
                        invoice = %invoice.invoice_number,
                        invoice_id = %invoice.id,
                        line,
                        target = %target,
                        deducted = deducted_lines.len(),
                        error = %source,
                        "Stock deduction failed after invoice was saved"
                    );
                    return Err(CommitError::DeductionFailure {
                        invoice_id: invoice.id.clone(),
                        invoice_number: invoice.invoice_number.clone(),
                        line,
                        deducted_lines,
                        source,
                    });
                }
            }
        }

        Ok(items)
    }

    /// `{prefix}-{millis}-{4 hex}`
    fn next_invoice_number(&self, now: DateTime<Utc>) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!(
            "{}-{}-{}",
            self.invoice_prefix,
            now.timestamp_millis(),
            &suffix[..4]
        )
    }

    async fn bounded<T, F>(&self, operation: &str, call: F) -> DbResult<T>
    where
        F: Future<Output = DbResult<T>>,
    {
        match tokio::time::timeout(self.step_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(DbError::timeout(operation)),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.trim().is_empty())
}

/// Ledger counter a persisted item draws from.
pub(crate) fn item_target(item: &InvoiceItem) -> Option<StockTarget> {
    if item.kind != LineKind::Catalog {
        return None;
    }
    let product_id = item.product_id.as_deref()?;
    Some(StockTarget::for_line(product_id, item.variant_id.as_deref()))
}

// =============================================================================
// Unit Tests
// =============================================================================
