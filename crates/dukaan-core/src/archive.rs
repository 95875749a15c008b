//! # Invoice Archive
//!
//! Filters and totals for browsing committed invoices.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Invoice, PaymentStatus};

/// Archive filter. Every field is optional; unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct InvoiceFilter {
    /// Matches invoice number, customer name or phone, case-insensitively.
    pub search: Option<String>,
    pub status: Option<PaymentStatus>,
    /// Exact customer name (case-insensitive).
    pub customer: Option<String>,
    pub min_total: Option<Money>,
    pub max_total: Option<Money>,
    #[ts(as = "Option<String>")]
    pub from: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub to: Option<NaiveDate>,
}

impl InvoiceFilter {
    pub fn matches(&self, invoice: &Invoice) -> bool {
        if let Some(search) = non_blank(&self.search) {
            let needle = search.to_lowercase();
            let hit = invoice.invoice_number.to_lowercase().contains(&needle)
                || invoice.customer_name.to_lowercase().contains(&needle)
                || invoice
                    .customer_phone
                    .as_deref()
                    .is_some_and(|p| p.contains(&needle));
            if !hit {
                return false;
            }
        }

        if self.status.is_some_and(|s| s != invoice.payment_status) {
            return false;
        }

        if let Some(customer) = non_blank(&self.customer) {
            if !invoice.customer_name.trim().eq_ignore_ascii_case(customer) {
                return false;
            }
        }

        let total = invoice.grand_total();
        if self.min_total.is_some_and(|min| total < min) {
            return false;
        }
        if self.max_total.is_some_and(|max| total > max) {
            return false;
        }

        let day = invoice.created_at.date_naive();
        if self.from.is_some_and(|from| day < from) {
            return false;
        }
        if self.to.is_some_and(|to| day > to) {
            return false;
        }

        true
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Totals across a set of invoices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SalesSummary {
    pub invoice_count: usize,
    pub total_sold: Money,
    pub total_paid: Money,
    pub total_remaining: Money,
}

impl SalesSummary {
    pub fn of<'a, I>(invoices: I) -> Self
    where
        I: IntoIterator<Item = &'a Invoice>,
    {
        invoices
            .into_iter()
            .fold(SalesSummary::default(), |mut acc, invoice| {
                acc.invoice_count += 1;
                acc.total_sold += invoice.grand_total();
                acc.total_paid += invoice.paid_amount();
                acc.total_remaining += invoice.remaining();
                acc
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaxType;
    use chrono::{TimeZone, Utc};

    fn invoice(number: &str, customer: &str, total: i64, paid: i64, day: u32) -> Invoice {
        let created = Utc.with_ymd_and_hms(2026, 10, day, 12, 0, 0).unwrap();
        Invoice {
            id: number.to_lowercase(),
            invoice_number: number.to_string(),
            customer_name: customer.to_string(),
            customer_phone: Some("9876543210".to_string()),
            reference_by: None,
            tax_type: TaxType::None,
            tax_rate_bps: 0,
            subtotal_paise: total,
            total_discount_paise: 0,
            taxable_paise: total,
            cgst_paise: 0,
            sgst_paise: 0,
            igst_paise: 0,
            grand_total_paise: total,
            paid_amount_paise: paid,
            payment_status: PaymentStatus::derive(
                Money::from_paise(paid),
                Money::from_paise(total),
            ),
            line_count: 1,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_filter_fields() {
        let inv = invoice("INV-100", "Asha Verma", 5_000, 2_000, 10);

        assert!(InvoiceFilter::default().matches(&inv));
        assert!(InvoiceFilter {
            search: Some("asha".into()),
            ..Default::default()
        }
        .matches(&inv));
        assert!(InvoiceFilter {
            search: Some("98765".into()),
            ..Default::default()
        }
        .matches(&inv));
        assert!(!InvoiceFilter {
            status: Some(PaymentStatus::Paid),
            ..Default::default()
        }
        .matches(&inv));
        assert!(!InvoiceFilter {
            min_total: Some(Money::from_paise(6_000)),
            ..Default::default()
        }
        .matches(&inv));
        assert!(InvoiceFilter {
            from: NaiveDate::from_ymd_opt(2026, 10, 10),
            to: NaiveDate::from_ymd_opt(2026, 10, 10),
            ..Default::default()
        }
        .matches(&inv));
        assert!(!InvoiceFilter {
            customer: Some("Ravi".into()),
            ..Default::default()
        }
        .matches(&inv));
    }

    #[test]
    fn test_summary() {
        let invoices = [
            invoice("INV-1", "A", 5_000, 5_000, 1),
            invoice("INV-2", "B", 3_000, 1_000, 2),
        ];
        let summary = SalesSummary::of(&invoices);

        assert_eq!(summary.invoice_count, 2);
        assert_eq!(summary.total_sold.paise(), 8_000);
        assert_eq!(summary.total_paid.paise(), 6_000);
        assert_eq!(summary.total_remaining.paise(), 2_000);
    }
}
