//! # Archive Commands
//!
//! Browsing committed invoices.

use serde::Serialize;
use tracing::debug;

use dukaan_core::archive::{InvoiceFilter, SalesSummary};
use dukaan_core::Invoice;

use crate::error::ApiError;
use crate::state::DbState;

/// Matching invoices, newest first, with totals over the same set.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceArchive {
    pub invoices: Vec<Invoice>,
    pub summary: SalesSummary,
}

pub async fn list_invoices(
    db: &DbState,
    filter: &InvoiceFilter,
) -> Result<InvoiceArchive, ApiError> {
    debug!(?filter, "list_invoices command");

    let invoices = db.inner().invoices().list(filter).await?;
    let summary = SalesSummary::of(&invoices);

    Ok(InvoiceArchive { invoices, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dukaan_core::payment::SettlementRequest;
    use dukaan_core::{Money, PaymentStatus};

    use crate::commands::fixtures::{backoffice, committed_invoice};
    use crate::commands::payment::record_payment;

    #[tokio::test]
    async fn test_summary_covers_filtered_invoices() {
        let bo = backoffice().await;
        committed_invoice(&bo, "a", 10_000).await;
        committed_invoice(&bo, "b", 20_000).await;
        record_payment(
            &bo.db,
            "b",
            SettlementRequest {
                amount: Money::from_paise(5_000),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let all = list_invoices(&bo.db, &InvoiceFilter::default())
            .await
            .unwrap();
        assert_eq!(all.summary.invoice_count, 2);
        assert_eq!(all.summary.total_sold, Money::from_paise(30_000));
        assert_eq!(all.summary.total_paid, Money::from_paise(5_000));
        assert_eq!(all.summary.total_remaining, Money::from_paise(25_000));

        let partial = list_invoices(
            &bo.db,
            &InvoiceFilter {
                status: Some(PaymentStatus::Partial),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(partial.invoices.len(), 1);
        assert_eq!(partial.invoices[0].id, "b");
    }
}
