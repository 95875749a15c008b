//! # Domain Types
//!
//! Core domain records used throughout the back office.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │     Invoice     │   │  PaymentEntry   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  name           │ 1 │  invoice_number │ 1 │  invoice_id(FK) │       │
//! │  │  price_paise    │◄┐ │  grand_total    │◄──│  kind / method  │       │
//! │  │  offer_price    │ │ │  paid_amount    │ * │  amount_paise   │       │
//! │  │  stock_quantity │ │ │  payment_status │   └─────────────────┘       │
//! │  └─────────────────┘ │ └────────┬────────┘                              │
//! │          ▲ 1         │          │ 1                                      │
//! │          │ *         │          │ *                                      │
//! │  ┌───────┴─────────┐ │ ┌────────▼────────┐   ┌─────────────────┐       │
//! │  │    Variant      │ └─│   InvoiceItem   │   │   StatusAudit   │       │
//! │  │  color / size   │   │  kind, qty      │   │  reason         │       │
//! │  │  stock_quantity │◄──│  unit_price     │   │  old → new      │       │
//! │  └─────────────────┘   │  stock_deducted │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Monetary columns are stored as `*_paise: i64` and exposed through
//! accessor methods returning [`Money`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate in basis points (bps).
///
/// 1 basis point = 0.01%, so the common GST slabs are 500 / 1200 / 1800 / 2800.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a whole percentage (18 -> 1800 bps).
    #[inline]
    pub const fn from_percent(pct: u32) -> Self {
        TaxRate(pct * 100)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

// =============================================================================
// Tax Type
// =============================================================================

/// GST regime applied to an invoice.
///
/// ```text
///   CGST_SGST  intra-state sale: two equal halves of the rate
///   IGST       inter-state sale: the full rate once
///   NONE       untaxed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum TaxType {
    #[default]
    CgstSgst,
    Igst,
    None,
}

impl fmt::Display for TaxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaxType::CgstSgst => write!(f, "CGST_SGST"),
            TaxType::Igst => write!(f, "IGST"),
            TaxType::None => write!(f, "NONE"),
        }
    }
}

impl FromStr for TaxType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CGST_SGST" | "CGST" | "SGST" => Ok(TaxType::CgstSgst),
            "IGST" => Ok(TaxType::Igst),
            "NONE" => Ok(TaxType::None),
            other => Err(format!("unknown tax type: {}", other)),
        }
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A product owned by catalog management. Read-only to invoicing except for
/// its stock counter.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub item_code: Option<String>,
    pub price_paise: i64,
    pub offer_price_paise: Option<i64>,

    /// Product-level stock, used only when the product has no variants.
    pub stock_quantity: i64,

    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_paise(self.price_paise)
    }

    /// Offer price, when one is set to a positive amount.
    pub fn offer_price(&self) -> Option<Money> {
        self.offer_price_paise
            .filter(|p| *p > 0)
            .map(Money::from_paise)
    }

    /// Price a new invoice line starts with: the offer price when it actually
    /// undercuts the list price.
    pub fn draft_price(&self) -> Money {
        match self.offer_price() {
            Some(offer) if offer < self.price() => offer,
            _ => self.price(),
        }
    }

    /// Unit price used by sales reports: the current offer price if set,
    /// otherwise the list price.
    pub fn report_price(&self) -> Money {
        self.offer_price().unwrap_or_else(|| self.price())
    }
}

/// A purchasable size/colour configuration of a product with its own stock.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Variant {
    pub id: String,
    pub product_id: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub price_paise: Option<i64>,
    pub stock_quantity: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Variant {
    /// "Red M", "Red", "M" or "" depending on which attributes are set.
    pub fn label(&self) -> String {
        [self.color.as_deref(), self.size.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn price_override(&self) -> Option<Money> {
        self.price_paise.map(Money::from_paise)
    }
}

// =============================================================================
// Customers
// =============================================================================

/// A registered customer. Invoices copy the name and phone when they are
/// committed and never point back at this row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Invoice Line Items
// =============================================================================

/// Whether a line is backed by inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum LineKind {
    /// References a product and optionally a variant; deducts stock.
    Catalog,
    /// Free-text line with no inventory linkage.
    Manual,
}

/// A committed invoice line.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InvoiceItem {
    pub id: String,
    pub invoice_id: String,

    /// Zero-based position on the invoice.
    pub position: i64,

    pub kind: LineKind,
    pub product_id: Option<String>,
    pub variant_id: Option<String>,
    pub item_code: Option<String>,
    pub description: String,
    pub quantity: i64,
    pub unit_price_paise: i64,
    pub discount_bps: u32,

    /// Fixed per-unit discount; wins over `discount_bps` when positive.
    pub discount_paise: i64,

    pub line_total_paise: i64,

    /// Set in the same transaction as the ledger decrement for this line.
    pub stock_deducted: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl InvoiceItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_paise(self.unit_price_paise)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_paise(self.line_total_paise)
    }

    /// True for catalog lines whose stock has not been taken yet.
    pub fn awaits_deduction(&self) -> bool {
        self.kind == LineKind::Catalog && self.product_id.is_some() && !self.stock_deducted
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// Settlement state of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Partial,
    Paid,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Unpaid => write!(f, "unpaid"),
            PaymentStatus::Partial => write!(f, "partial"),
            PaymentStatus::Paid => write!(f, "paid"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unpaid" => Ok(PaymentStatus::Unpaid),
            "partial" => Ok(PaymentStatus::Partial),
            "paid" => Ok(PaymentStatus::Paid),
            other => Err(format!("unknown payment status: {}", other)),
        }
    }
}

/// A committed invoice header.
///
/// Header fields are written once. Only `paid_amount_paise`,
/// `payment_status` and `updated_at` change afterwards, and only by
/// re-summing the payment ledger.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    pub invoice_number: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub reference_by: Option<String>,
    pub tax_type: TaxType,
    pub tax_rate_bps: u32,
    pub subtotal_paise: i64,
    pub total_discount_paise: i64,
    pub taxable_paise: i64,
    pub cgst_paise: i64,
    pub sgst_paise: i64,
    pub igst_paise: i64,
    pub grand_total_paise: i64,
    pub paid_amount_paise: i64,
    pub payment_status: PaymentStatus,

    /// Number of lines the draft had; lets repair spot a missing item set.
    pub line_count: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    #[inline]
    pub fn grand_total(&self) -> Money {
        Money::from_paise(self.grand_total_paise)
    }

    #[inline]
    pub fn paid_amount(&self) -> Money {
        Money::from_paise(self.paid_amount_paise)
    }

    /// Balance still owed, never negative.
    pub fn remaining(&self) -> Money {
        let remaining = self.grand_total() - self.paid_amount();
        if remaining.is_negative() {
            Money::zero()
        } else {
            remaining
        }
    }

    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }

    /// Sum of all tax components.
    pub fn total_tax(&self) -> Money {
        Money::from_paise(self.cgst_paise + self.sgst_paise + self.igst_paise)
    }
}

// =============================================================================
// Payment Ledger
// =============================================================================

/// How money was tendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PaymentMethod {
    #[default]
    Cash,
    Upi,
    Card,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "cash"),
            PaymentMethod::Upi => write!(f, "upi"),
            PaymentMethod::Card => write!(f, "card"),
        }
    }
}

/// What a ledger entry does to the settled amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum EntryKind {
    /// Money received.
    Payment,
    /// Settlement discount written off the balance (needs a reason).
    Waiver,
    /// Takes settled money back off the invoice (status override).
    Reversal,
}

/// An append-only row in an invoice's payment ledger. `amount_paise` is
/// always positive; `kind` decides the sign.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PaymentEntry {
    pub id: String,
    pub invoice_id: String,
    pub kind: EntryKind,
    pub method: Option<PaymentMethod>,
    pub amount_paise: i64,
    pub note: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl PaymentEntry {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_paise(self.amount_paise)
    }

    /// Contribution to the settled amount.
    pub fn signed_amount(&self) -> Money {
        match self.kind {
            EntryKind::Payment | EntryKind::Waiver => self.amount(),
            EntryKind::Reversal => Money::zero() - self.amount(),
        }
    }
}

/// Audit trail row written before an invoice leaves `paid`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StatusAudit {
    pub id: String,
    pub invoice_id: String,
    pub reason: String,
    pub old_status: PaymentStatus,
    pub new_status: PaymentStatus,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sales Events
// =============================================================================

/// Origin of a sale event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum SalesChannel {
    /// Online storefront order line.
    Online,
    /// In-store invoice line.
    Offline,
}

/// One line sold through either channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleEvent {
    pub product_id: String,
    pub quantity: i64,
    pub channel: SalesChannel,

    #[ts(as = "String")]
    pub occurred_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
