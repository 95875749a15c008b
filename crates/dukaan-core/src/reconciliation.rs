//! # Sales Reconciliation Aggregator
//!
//! Folds online order lines and offline invoice lines into one report.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  online order_items ──┐                                                 │
//! │                       ├─► filter [start, end] ─► merge ─┬─► by day      │
//! │  offline invoice_items┘                                 │   units       │
//! │                                                         │   revenue     │
//! │                                                         │               │
//! │  catalog (current prices, aggregate stock) ─────────────┴─► by product  │
//! │                                                             sold_units  │
//! │                                                             variant_total│
//! │                                                             available   │
//! │                                                             revenue     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Revenue uses each product's *current* report price, so reports for past
//! days move when prices change. `available_stock` is surfaced as-is and may
//! be negative.
//!
//! Aggregation only adds, so the result does not depend on event order.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use ts_rs::TS;

use crate::catalog::Catalog;
use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{SaleEvent, SalesChannel};

// =============================================================================
// Range
// =============================================================================

/// Inclusive day range, `[start 00:00:00, end 23:59:59]` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportRange {
    #[ts(as = "String")]
    start: NaiveDate,
    #[ts(as = "String")]
    end: NaiveDate,
}

impl ReportRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvalidFormat {
                field: "date_range".to_string(),
                reason: format!("start {} is after end {}", start, end),
            });
        }
        Ok(ReportRange { start, end })
    }

    /// A single day.
    pub fn day(date: NaiveDate) -> Self {
        ReportRange {
            start: date,
            end: date,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        day >= self.start && day <= self.end
    }

    /// Half-open instant window `[start 00:00, end+1 00:00)` for storage
    /// queries.
    pub fn window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let from = self.start.and_time(NaiveTime::MIN).and_utc();
        let until = self
            .end
            .checked_add_days(Days::new(1))
            .unwrap_or(self.end)
            .and_time(NaiveTime::MIN)
            .and_utc();
        (from, until)
    }
}

// =============================================================================
// Report Rows
// =============================================================================

/// Units and revenue for one calendar day, across both channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DailySalesBucket {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub units: i64,
    pub revenue: Money,
}

/// Per-product reconciliation row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductSalesRow {
    pub product_id: String,
    pub name: String,
    pub item_code: Option<String>,
    pub unit_price: Money,
    pub sold_units: i64,
    pub variant_total: i64,
    pub available_stock: i64,
    pub revenue: Money,
}

/// Unit split by channel, for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ChannelUnits {
    pub online: i64,
    pub offline: i64,
}

/// Complete reconciliation output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesReport {
    pub range: ReportRange,
    pub daily: Vec<DailySalesBucket>,
    pub products: Vec<ProductSalesRow>,
    pub total_units: i64,
    pub total_revenue: Money,
    pub channel_units: ChannelUnits,
}

// =============================================================================
// Aggregation
// =============================================================================

/// Builds the report for `range` from both channels' events.
///
/// Events outside the range or with a non-positive quantity are ignored.
/// Events for products missing from the catalog still count towards daily
/// units, with zero revenue.
pub fn aggregate<'a, I>(range: &ReportRange, catalog: &Catalog, events: I) -> SalesReport
where
    I: IntoIterator<Item = &'a SaleEvent>,
{
    let mut daily: BTreeMap<NaiveDate, (i64, Money)> = BTreeMap::new();
    let mut sold: HashMap<&str, i64> = HashMap::new();
    let mut channel_units = ChannelUnits::default();

    for event in events {
        if event.quantity <= 0 || !range.contains(event.occurred_at) {
            continue;
        }

        let price = catalog
            .product(&event.product_id)
            .map(|p| p.report_price())
            .unwrap_or_default();

        let bucket = daily
            .entry(event.occurred_at.date_naive())
            .or_insert((0, Money::zero()));
        bucket.0 += event.quantity;
        bucket.1 += price.multiply_quantity(event.quantity);

        *sold.entry(event.product_id.as_str()).or_insert(0) += event.quantity;

        match event.channel {
            SalesChannel::Online => channel_units.online += event.quantity,
            SalesChannel::Offline => channel_units.offline += event.quantity,
        }
    }

    let products: Vec<ProductSalesRow> = catalog
        .products()
        .iter()
        .map(|product| {
            let sold_units = sold.get(product.id.as_str()).copied().unwrap_or(0);
            let variant_total = catalog.aggregate_stock(&product.id).unwrap_or(0);
            let unit_price = product.report_price();

            ProductSalesRow {
                product_id: product.id.clone(),
                name: product.name.clone(),
                item_code: product.item_code.clone(),
                unit_price,
                sold_units,
                variant_total,
                available_stock: variant_total - sold_units,
                revenue: unit_price.multiply_quantity(sold_units),
            }
        })
        .collect();

    let daily: Vec<DailySalesBucket> = daily
        .into_iter()
        .map(|(date, (units, revenue))| DailySalesBucket {
            date,
            units,
            revenue,
        })
        .collect();

    SalesReport {
        range: *range,
        total_units: daily.iter().map(|d| d.units).sum(),
        total_revenue: daily.iter().map(|d| d.revenue).sum(),
        daily,
        products,
        channel_units,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Product, Variant};
    use chrono::TimeZone;

    fn product(id: &str, price: i64, offer: Option<i64>, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            name: id.to_uppercase(),
            item_code: None,
            price_paise: price,
            offer_price_paise: offer,
            stock_quantity: stock,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn variant(id: &str, product_id: &str, stock: i64) -> Variant {
        Variant {
            id: id.to_string(),
            product_id: product_id.to_string(),
            color: None,
            size: Some("M".to_string()),
            price_paise: None,
            stock_quantity: stock,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn event(product_id: &str, qty: i64, channel: SalesChannel, day: u32, hour: u32) -> SaleEvent {
        SaleEvent {
            product_id: product_id.to_string(),
            quantity: qty,
            channel,
            occurred_at: Utc.with_ymd_and_hms(2026, 10, day, hour, 0, 0).unwrap(),
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, day).unwrap()
    }

    #[test]
    fn test_both_channels_merge_into_one_bucket() {
        let catalog = Catalog::new(
            vec![product("kurta", 1_000, Some(800), 0)],
            vec![variant("m", "kurta", 10)],
        );
        let events = vec![
            event("kurta", 2, SalesChannel::Online, 5, 10),
            event("kurta", 3, SalesChannel::Offline, 5, 16),
        ];

        let report = aggregate(&ReportRange::day(date(5)), &catalog, &events);

        assert_eq!(report.daily.len(), 1);
        assert_eq!(report.daily[0].units, 5);
        assert_eq!(report.daily[0].revenue.paise(), 4_000);

        let row = &report.products[0];
        assert_eq!(row.sold_units, 5);
        assert_eq!(row.variant_total, 10);
        assert_eq!(row.available_stock, 5);
        assert_eq!(row.revenue.paise(), 4_000);
        assert_eq!(report.channel_units.online, 2);
        assert_eq!(report.channel_units.offline, 3);
    }

    #[test]
    fn test_range_is_inclusive_by_day() {
        let catalog = Catalog::new(vec![product("a", 100, None, 50)], vec![]);
        let events = vec![
            event("a", 1, SalesChannel::Offline, 4, 23),
            event("a", 1, SalesChannel::Offline, 5, 0),
            event("a", 1, SalesChannel::Offline, 6, 23),
            event("a", 1, SalesChannel::Offline, 7, 0),
        ];

        let range = ReportRange::new(date(5), date(6)).unwrap();
        let report = aggregate(&range, &catalog, &events);

        assert_eq!(report.total_units, 2);
        assert_eq!(
            report.daily.iter().map(|d| d.date).collect::<Vec<_>>(),
            vec![date(5), date(6)]
        );
    }

    #[test]
    fn test_order_independent() {
        let catalog = Catalog::new(
            vec![product("a", 100, None, 50), product("b", 250, Some(200), 9)],
            vec![],
        );
        let mut events = vec![
            event("a", 1, SalesChannel::Online, 3, 9),
            event("b", 4, SalesChannel::Offline, 3, 11),
            event("a", 2, SalesChannel::Offline, 4, 12),
            event("b", 1, SalesChannel::Online, 5, 18),
        ];
        let range = ReportRange::new(date(1), date(31)).unwrap();

        let forward = aggregate(&range, &catalog, &events);
        events.reverse();
        let backward = aggregate(&range, &catalog, &events);

        assert_eq!(forward, backward);
        assert_eq!(forward.total_units, 8);
        assert_eq!(forward.total_revenue.paise(), 300 + 1_000);
    }

    #[test]
    fn test_negative_available_stock_surfaces() {
        let catalog = Catalog::new(vec![product("a", 100, None, 1)], vec![]);
        let events = vec![event("a", 3, SalesChannel::Online, 2, 8)];

        let report = aggregate(&ReportRange::day(date(2)), &catalog, &events);
        assert_eq!(report.products[0].available_stock, -2);
    }

    #[test]
    fn test_unknown_product_counts_units_without_revenue() {
        let catalog = Catalog::new(vec![], vec![]);
        let events = vec![
            event("ghost", 2, SalesChannel::Online, 2, 8),
            event("ghost", 0, SalesChannel::Online, 2, 9),
        ];

        let report = aggregate(&ReportRange::day(date(2)), &catalog, &events);
        assert_eq!(report.total_units, 2);
        assert_eq!(report.total_revenue, Money::zero());
        assert!(report.products.is_empty());
    }

    #[test]
    fn test_window_covers_last_day() {
        let range = ReportRange::new(date(5), date(6)).unwrap();
        let (from, until) = range.window();
        assert_eq!(from, Utc.with_ymd_and_hms(2026, 10, 5, 0, 0, 0).unwrap());
        assert_eq!(until, Utc.with_ymd_and_hms(2026, 10, 7, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_reversed_range_rejected() {
        assert!(ReportRange::new(date(6), date(5)).is_err());
    }
}
