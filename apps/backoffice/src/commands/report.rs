//! # Report Commands
//!
//! Sales reconciliation across the online store and the counter.

use chrono::NaiveDate;
use tracing::{debug, info};

use dukaan_core::reconciliation::{aggregate, ReportRange, SalesReport};
use dukaan_core::CoreError;

use crate::error::ApiError;
use crate::state::DbState;

/// Builds the sales report for the inclusive day range `start..=end`.
///
/// ## Returns
/// * `Err` (`VALIDATION_ERROR`) - `start` is after `end`
pub async fn sales_report(
    db: &DbState,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<SalesReport, ApiError> {
    debug!(%start, %end, "sales_report command");

    let range = ReportRange::new(start, end).map_err(CoreError::from)?;
    let (from, until) = range.window();
    let database = db.inner();

    let catalog = database.catalog().load_catalog().await?;
    let online = database.orders().sale_events(from, until).await?;
    let offline = database.invoices().sale_events(from, until).await?;

    let report = aggregate(&range, &catalog, online.iter().chain(offline.iter()));

    info!(
        %start,
        %end,
        units = report.total_units,
        revenue = %report.total_revenue,
        "Sales report built"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dukaan_core::draft::{CustomerInfo, LineUpdate};
    use dukaan_core::Money;

    use crate::commands::fixtures::{backoffice, first_session};
    use crate::commands::{draft, invoice};
    use crate::error::ErrorCode;

    #[tokio::test]
    async fn test_online_and_offline_sales_merge() {
        let bo = backoffice().await;
        let today = Utc::now();

        bo.db
            .inner()
            .orders()
            .insert_item("oi-1", "order-1", "belt", 2, today)
            .await
            .unwrap();

        let key = first_session(&bo).await;
        draft::set_customer(
            &bo.drafts,
            &key,
            CustomerInfo {
                name: "Ravi Kumar".into(),
                phone: None,
                reference_by: None,
            },
        )
        .await
        .unwrap();
        draft::add_catalog_line(&bo.db, &bo.drafts, &key, "belt", None)
            .await
            .unwrap();
        draft::update_line(&bo.drafts, &key, 0, LineUpdate::Quantity(3))
            .await
            .unwrap();
        let committed = invoice::commit_invoice(&bo.db, &bo.drafts, &bo.config, &key)
            .await
            .unwrap();
        assert_eq!(committed.receipt.invoice.customer_name, "Ravi Kumar");

        let report = sales_report(&bo.db, today.date_naive(), today.date_naive())
            .await
            .unwrap();

        assert_eq!(report.daily.len(), 1);
        assert_eq!(report.daily[0].units, 5);
        assert_eq!(report.daily[0].revenue, Money::from_paise(25_000));
        assert_eq!(report.channel_units.online, 2);
        assert_eq!(report.channel_units.offline, 3);

        let row = |id: &str| report.products.iter().find(|p| p.product_id == id).unwrap();

        let belt = row("belt");
        assert_eq!(belt.sold_units, 5);
        assert_eq!(belt.revenue, Money::from_paise(25_000));

        let kurta = row("kurta");
        assert_eq!(kurta.sold_units, 0);
        assert_eq!(kurta.variant_total, 7);
    }

    #[tokio::test]
    async fn test_reversed_range_is_rejected() {
        let bo = backoffice().await;
        let day = |d| NaiveDate::from_ymd_opt(2026, 10, d).unwrap();

        let err = sales_report(&bo.db, day(12), day(3)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_empty_range() {
        let bo = backoffice().await;
        let day = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();

        let report = sales_report(&bo.db, day, day).await.unwrap();
        assert!(report.daily.is_empty());
        assert_eq!(report.total_revenue, Money::zero());
    }
}
