//! # Invoice Commands
//!
//! Committing a draft, reading a committed invoice, and repairing stock
//! for commits that stopped partway.

use serde::Serialize;
use tracing::{debug, info, warn};

use dukaan_core::{Invoice, InvoiceItem, PaymentEntry, StatusAudit};
use dukaan_db::SqliteStockLedger;

use crate::commit::{CommitReceipt, CommitSequencer};
use crate::error::ApiError;
use crate::repair::{RepairReport, RepairSweep, StockRepair};
use crate::state::{BackofficeConfig, DbState, DraftSessions, SessionSummary};

/// Result of committing a draft session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResponse {
    #[serde(flatten)]
    pub receipt: CommitReceipt,

    /// The session, now holding a fresh draft.
    pub session: SessionSummary,
}

/// A committed invoice with everything written against it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDetail {
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
    pub payments: Vec<PaymentEntry>,
    pub audit_trail: Vec<StatusAudit>,
}

/// Commits the draft in session `key`.
///
/// ## Flow
/// ```text
/// snapshot draft ──► CommitSequencer::commit ──► Ok  ──► reset session
///                                            └─► Err ──► draft kept as-is
/// ```
///
/// The session lock is not held while committing. A failed commit keeps
/// the draft; if the error is `PARTIAL_COMMIT` the invoice already exists
/// and must be repaired, not committed again.
pub async fn commit_invoice(
    db: &DbState,
    drafts: &DraftSessions,
    config: &BackofficeConfig,
    key: &str,
) -> Result<CommitResponse, ApiError> {
    debug!(key = %key, "commit_invoice command");

    let draft = drafts.snapshot(key).await?;
    let database = db.inner();

    let sequencer = CommitSequencer::new(database.invoices(), database.stock())
        .step_timeout(config.step_timeout())
        .invoice_prefix(config.invoicing.invoice_prefix.clone());

    let receipt = match sequencer.commit(&draft).await {
        Ok(receipt) => receipt,
        Err(e) => {
            if e.is_partial() {
                warn!(
                    key = %key,
                    stage = %e.stage(),
                    invoice_id = ?e.invoice_id(),
                    "Commit left a partial invoice"
                );
            }
            return Err(e.into());
        }
    };

    let session = drafts.discard_committed(key, &draft).await?;

    info!(
        key = %key,
        invoice = %receipt.invoice.invoice_number,
        "Draft committed"
    );

    Ok(CommitResponse { receipt, session })
}

pub async fn get_invoice(db: &DbState, invoice_id: &str) -> Result<InvoiceDetail, ApiError> {
    debug!(invoice_id = %invoice_id, "get_invoice command");

    let invoices = db.inner().invoices();
    let invoice = invoices
        .get_by_id(invoice_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Invoice", invoice_id))?;

    Ok(InvoiceDetail {
        items: invoices.get_items(invoice_id).await?,
        payments: invoices.get_payments(invoice_id).await?,
        audit_trail: invoices.get_audit_trail(invoice_id).await?,
        invoice,
    })
}

/// Re-runs stock deduction for one invoice. Safe to repeat.
pub async fn repair_invoice_stock(
    db: &DbState,
    config: &BackofficeConfig,
    invoice_id: &str,
) -> Result<RepairReport, ApiError> {
    Ok(stock_repair(db, config).repair_invoice(invoice_id).await?)
}

/// Repairs every invoice with undeducted stock or missing items.
pub async fn repair_pending(
    db: &DbState,
    config: &BackofficeConfig,
) -> Result<RepairSweep, ApiError> {
    Ok(stock_repair(db, config).repair_pending().await?)
}

fn stock_repair(db: &DbState, config: &BackofficeConfig) -> StockRepair<SqliteStockLedger> {
    let database = db.inner();
    StockRepair::new(database.invoices(), database.stock()).step_timeout(config.step_timeout())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dukaan_core::draft::{CustomerInfo, LineUpdate};
    use dukaan_core::{Money, PaymentStatus};
    use dukaan_db::StockLedger;

    use crate::commands::draft;
    use crate::commands::fixtures::{backoffice, first_session};
    use crate::error::ErrorCode;

    async fn ready_draft(bo: &crate::Backoffice, key: &str) {
        draft::set_customer(
            &bo.drafts,
            key,
            CustomerInfo {
                name: "Asha Verma".into(),
                phone: Some("9876543210".into()),
                reference_by: None,
            },
        )
        .await
        .unwrap();
        draft::add_catalog_line(&bo.db, &bo.drafts, key, "kurta", Some("kurta-m"))
            .await
            .unwrap();
        draft::update_line(&bo.drafts, key, 0, LineUpdate::Quantity(2))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_commit_resets_session_and_takes_stock() {
        let bo = backoffice().await;
        let key = first_session(&bo).await;
        ready_draft(&bo, &key).await;
        draft::select_payment_status(&bo.drafts, &key, PaymentStatus::Partial)
            .await
            .unwrap();
        draft::set_partial_amount(&bo.drafts, &key, Money::from_paise(5_000))
            .await
            .unwrap();

        let response = commit_invoice(&bo.db, &bo.drafts, &bo.config, &key)
            .await
            .unwrap();

        assert_eq!(response.session.key, key);
        assert_eq!(response.session.line_count, 0);
        assert!(response.receipt.invoice.invoice_number.starts_with("DK-"));
        let status = response.receipt.invoice.payment_status;
        assert_eq!(status, PaymentStatus::Partial);

        let invoice_id = &response.receipt.invoice.id;
        let detail = get_invoice(&bo.db, invoice_id).await.unwrap();
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.payments.len(), 1);
        assert_eq!(detail.invoice.paid_amount_paise, 5_000);
        assert!(detail.items[0].stock_deducted);

        let stock = bo.db.inner().stock();
        assert_eq!(stock.available_for_variant("kurta-m").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_insufficient_stock_keeps_draft() {
        let bo = backoffice().await;
        let key = first_session(&bo).await;
        ready_draft(&bo, &key).await;
        draft::update_line(&bo.drafts, &key, 0, LineUpdate::Quantity(6))
            .await
            .unwrap();

        let err = commit_invoice(&bo.db, &bo.drafts, &bo.config, &key)
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::InsufficientStock);
        let kept = draft::get_draft(&bo.drafts, &key).await.unwrap();
        assert_eq!(kept.lines.len(), 1);
        let stock = bo.db.inner().stock();
        assert_eq!(stock.available_for_variant("kurta-m").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_empty_draft_is_a_validation_error() {
        let bo = backoffice().await;
        let key = first_session(&bo).await;

        let err = commit_invoice(&bo.db, &bo.drafts, &bo.config, &key)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_repair_after_commit_is_a_no_op() {
        let bo = backoffice().await;
        let key = first_session(&bo).await;
        ready_draft(&bo, &key).await;
        let response = commit_invoice(&bo.db, &bo.drafts, &bo.config, &key)
            .await
            .unwrap();

        let report = repair_invoice_stock(&bo.db, &bo.config, &response.receipt.invoice.id)
            .await
            .unwrap();

        assert!(report.applied.is_empty());
        assert_eq!(report.already_applied, vec![0]);
        let sweep = repair_pending(&bo.db, &bo.config).await.unwrap();
        assert!(sweep.reports.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_invoice() {
        let bo = backoffice().await;
        let err = get_invoice(&bo.db, "missing").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
