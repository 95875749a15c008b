//! # Payment Commands
//!
//! Payments, settlement discounts and status overrides on committed
//! invoices.
//!
//! Both commands plan against the paid amount re-summed from the ledger,
//! never the cached `paid_amount_paise`, and append in one transaction that
//! re-derives the invoice's settlement.

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use dukaan_core::payment::{
    plan_override, plan_settlement, PlannedEntry, Settlement, SettlementRequest, StatusOverride,
};
use dukaan_core::{Invoice, PaymentEntry, StatusAudit};

use crate::error::ApiError;
use crate::state::DbState;

/// Records a payment and/or settlement discount.
///
/// ## Returns
/// * `Err` (`PAYMENT_ERROR`) - Zero or negative amounts, more than the
///   balance, or a discount without a reason
pub async fn record_payment(
    db: &DbState,
    invoice_id: &str,
    request: SettlementRequest,
) -> Result<Invoice, ApiError> {
    debug!(
        invoice_id = %invoice_id,
        amount = %request.amount,
        discount = %request.discount,
        "record_payment command"
    );

    let invoices = db.inner().invoices();
    let (invoice, settlement) = current_settlement(db, invoice_id).await?;

    let planned = plan_settlement(settlement.paid, invoice.grand_total(), &request)?;
    let entries = to_entries(invoice_id, planned);

    let updated = invoices.append_entries(invoice_id, None, &entries).await?;

    info!(
        invoice = %updated.invoice_number,
        paid = updated.paid_amount_paise,
        status = %updated.payment_status,
        "Payment recorded"
    );
    Ok(updated)
}

/// Moves an invoice to another payment status.
///
/// Leaving `paid` needs a reason, which is written to the audit trail
/// together with the reversing entry.
pub async fn override_status(
    db: &DbState,
    invoice_id: &str,
    request: StatusOverride,
) -> Result<Invoice, ApiError> {
    debug!(invoice_id = %invoice_id, target = %request.target, "override_status command");

    let invoices = db.inner().invoices();
    let (invoice, settlement) = current_settlement(db, invoice_id).await?;

    let plan = plan_override(
        invoice_id,
        settlement.status,
        settlement.paid,
        invoice.grand_total(),
        &request,
    )?;

    let audit = plan.audit.map(|note| StatusAudit {
        id: Uuid::new_v4().to_string(),
        invoice_id: invoice_id.to_string(),
        reason: note.reason,
        old_status: note.old_status,
        new_status: note.new_status,
        created_at: Utc::now(),
    });
    let entries = to_entries(invoice_id, plan.entry);

    let updated = invoices
        .append_entries(invoice_id, audit.as_ref(), &entries)
        .await?;

    info!(
        invoice = %updated.invoice_number,
        from = %settlement.status,
        to = %updated.payment_status,
        audited = audit.is_some(),
        "Payment status overridden"
    );
    Ok(updated)
}

async fn current_settlement(
    db: &DbState,
    invoice_id: &str,
) -> Result<(Invoice, Settlement), ApiError> {
    let invoices = db.inner().invoices();
    let invoice = invoices
        .get_by_id(invoice_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Invoice", invoice_id))?;

    let sum = invoices.ledger_sum(invoice_id).await?;
    let settlement = Settlement::from_ledger_sum(sum, invoice.grand_total());
    Ok((invoice, settlement))
}

fn to_entries(
    invoice_id: &str,
    planned: impl IntoIterator<Item = PlannedEntry>,
) -> Vec<PaymentEntry> {
    let now = Utc::now();
    planned
        .into_iter()
        .map(|p| PaymentEntry {
            id: Uuid::new_v4().to_string(),
            invoice_id: invoice_id.to_string(),
            kind: p.kind,
            method: p.method,
            amount_paise: p.amount.paise(),
            note: p.note,
            created_at: now,
        })
        .collect()
}
