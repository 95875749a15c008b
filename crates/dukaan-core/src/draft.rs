//! # Invoice Draft Builder
//!
//! An invoice being assembled: ordered lines, customer info, tax regime and
//! the payment status picked at the counter.
//!
//! ## Edit Cycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Draft Edit Cycle                                │
//! │                                                                         │
//! │   add_catalog_line / add_manual_line / update_line / remove_line       │
//! │   select_variant / set_tax / set_customer / select_payment_status      │
//! │                              │                                          │
//! │                              ▼                                          │
//! │                         refresh()                                       │
//! │          ┌───────────────────┼────────────────────────┐                 │
//! │          ▼                   ▼                        ▼                 │
//! │   line.line_total    compute_totals(lines, tax)   payment.reconcile(G) │
//! │                              │                                          │
//! │                              ▼                                          │
//! │       draft is immutable until the next edit call                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Totals
//! ```text
//!   subtotal        = Σ quantity × unit_price
//!   unit discount   = discount_amount if > 0, else unit_price × pct
//!   total_discount  = Σ unit discount × quantity
//!   taxable         = subtotal − total_discount
//!   CGST_SGST       → cgst = sgst = taxable × rate / 200
//!   IGST            → igst = taxable × rate / 100
//!   grand_total     = taxable + cgst + sgst + igst
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::catalog::StockTarget;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::payment::DraftPayment;
use crate::types::{LineKind, PaymentMethod, PaymentStatus, Product, TaxRate, TaxType, Variant};
use crate::validation::{
    validate_customer_name, validate_phone, validate_quantity, validate_rate_bps,
};
use crate::{DEFAULT_DRAFT_LABEL, MAX_DRAFT_LINES, MAX_LINE_QUANTITY, MAX_UNIT_PRICE_PAISE};

// =============================================================================
// Tax Configuration
// =============================================================================

/// Invoice-level tax selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TaxConfig {
    pub tax_type: TaxType,
    pub rate: TaxRate,
}

impl TaxConfig {
    pub const fn new(tax_type: TaxType, rate: TaxRate) -> Self {
        TaxConfig { tax_type, rate }
    }

    /// No tax at all.
    pub const fn none() -> Self {
        TaxConfig {
            tax_type: TaxType::None,
            rate: TaxRate::zero(),
        }
    }
}

// =============================================================================
// Draft Line
// =============================================================================

/// One editable invoice line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DraftLine {
    pub kind: LineKind,
    pub product_id: Option<String>,
    pub variant_id: Option<String>,
    pub item_code: Option<String>,
    pub description: String,
    pub quantity: i64,
    pub unit_price_paise: i64,

    /// Percentage discount per unit, in basis points.
    pub discount_bps: u32,

    /// Fixed discount per unit. Takes precedence over `discount_bps` when > 0.
    pub discount_paise: i64,

    /// `quantity × unit_price − unit discount × quantity`, kept current by
    /// the draft after every edit.
    pub line_total_paise: i64,
}

impl DraftLine {
    /// A blank free-text line: quantity 1, unit price 0.
    pub fn manual() -> Self {
        let mut line = DraftLine {
            kind: LineKind::Manual,
            product_id: None,
            variant_id: None,
            item_code: None,
            description: String::new(),
            quantity: 1,
            unit_price_paise: 0,
            discount_bps: 0,
            discount_paise: 0,
            line_total_paise: 0,
        };
        line.recompute();
        line
    }

    /// A catalog line seeded from the product (and variant, if chosen).
    pub fn from_catalog(product: &Product, variant: Option<&Variant>) -> Self {
        let mut line = DraftLine {
            kind: LineKind::Catalog,
            product_id: Some(product.id.clone()),
            variant_id: variant.map(|v| v.id.clone()),
            item_code: product.item_code.clone(),
            description: describe(product, variant),
            quantity: 1,
            unit_price_paise: clamp_price(product.draft_price()),
            discount_bps: 0,
            discount_paise: 0,
            line_total_paise: 0,
        };
        line.recompute();
        line
    }

    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_paise(self.unit_price_paise)
    }

    /// Discount taken off each unit, never more than the unit price.
    pub fn unit_discount(&self) -> Money {
        let discount = if self.discount_paise > 0 {
            Money::from_paise(self.discount_paise)
        } else {
            self.unit_price().percentage(self.discount_bps)
        };
        discount.clamp_to(Money::zero(), self.unit_price())
    }

    /// `quantity × unit_price`, before discount.
    pub fn gross(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }

    pub fn discount_total(&self) -> Money {
        self.unit_discount().multiply_quantity(self.quantity)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_paise(self.line_total_paise)
    }

    /// Ledger counter this line draws from. `None` for manual lines.
    pub fn stock_target(&self) -> Option<StockTarget> {
        if self.kind != LineKind::Catalog {
            return None;
        }
        let product_id = self.product_id.as_deref()?;
        Some(StockTarget::for_line(product_id, self.variant_id.as_deref()))
    }

    fn recompute(&mut self) {
        self.line_total_paise = (self.gross() - self.discount_total()).paise();
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_quantity(self.quantity)?;

        if self.description.trim().is_empty() {
            return Err(ValidationError::required("description"));
        }

        if self.kind == LineKind::Catalog && self.product_id.is_none() {
            return Err(ValidationError::required("product_id"));
        }

        Ok(())
    }
}

/// Per-unit amounts entered on a line, held to `[0, MAX_UNIT_PRICE_PAISE]`.
fn clamp_price(amount: Money) -> i64 {
    amount.paise().clamp(0, MAX_UNIT_PRICE_PAISE)
}

fn describe(product: &Product, variant: Option<&Variant>) -> String {
    let label = variant.map(Variant::label).unwrap_or_default();
    if label.is_empty() {
        product.name.clone()
    } else {
        format!("{} ({})", product.name, label)
    }
}

/// A single-field edit to a draft line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
#[ts(export)]
pub enum LineUpdate {
    /// Negative input is clamped to 0.
    Quantity(i64),
    /// Negative input is clamped to 0.
    UnitPrice(Money),
    Description(String),
    /// Basis points, clamped to 0..=10000.
    DiscountPercent(u32),
    /// Per-unit amount, clamped to >= 0.
    DiscountAmount(Money),
    ItemCode(Option<String>),
}

// =============================================================================
// Totals
// =============================================================================

/// Invoice money breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InvoiceTotals {
    pub subtotal: Money,
    pub total_discount: Money,
    pub taxable: Money,
    pub cgst: Money,
    pub sgst: Money,
    pub igst: Money,
    pub grand_total: Money,
}

/// Computes invoice totals from lines and the tax selection.
///
/// Pure: the same lines and tax always give the same totals, and the result
/// always satisfies `grand_total = taxable + cgst + sgst + igst` and
/// `taxable = subtotal − total_discount`.
pub fn compute_totals(lines: &[DraftLine], tax: &TaxConfig) -> InvoiceTotals {
    let subtotal: Money = lines.iter().map(DraftLine::gross).sum();
    let total_discount: Money = lines.iter().map(DraftLine::discount_total).sum();
    let taxable = subtotal - total_discount;

    let (cgst, sgst, igst) = match tax.tax_type {
        TaxType::CgstSgst => {
            let half = taxable.calculate_half_tax(tax.rate);
            (half, half, Money::zero())
        }
        TaxType::Igst => (Money::zero(), Money::zero(), taxable.calculate_tax(tax.rate)),
        TaxType::None => (Money::zero(), Money::zero(), Money::zero()),
    };

    InvoiceTotals {
        subtotal,
        total_discount,
        taxable,
        cgst,
        sgst,
        igst,
        grand_total: taxable + cgst + sgst + igst,
    }
}

// =============================================================================
// Invoice Draft
// =============================================================================

/// Who the invoice is for.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CustomerInfo {
    pub name: String,
    pub phone: Option<String>,
    pub reference_by: Option<String>,
}

/// The in-progress invoice.
///
/// ## Invariants
/// - `totals` always equals `compute_totals(&lines, &tax)`
/// - every line's `line_total_paise` is current
/// - `payment` is re-clamped against the current grand total
///
/// Fields are read-only outside this module; every mutation goes through a
/// method that ends in `refresh()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InvoiceDraft {
    customer: CustomerInfo,
    lines: Vec<DraftLine>,
    tax: TaxConfig,
    payment: DraftPayment,
    totals: InvoiceTotals,

    #[ts(as = "String")]
    updated_at: DateTime<Utc>,
}

impl InvoiceDraft {
    pub fn new(tax: TaxConfig) -> Self {
        let mut draft = InvoiceDraft {
            customer: CustomerInfo::default(),
            lines: Vec::new(),
            tax,
            payment: DraftPayment::default(),
            totals: InvoiceTotals::default(),
            updated_at: Utc::now(),
        };
        draft.refresh();
        draft
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub fn customer(&self) -> &CustomerInfo {
        &self.customer
    }

    pub fn lines(&self) -> &[DraftLine] {
        &self.lines
    }

    pub fn tax(&self) -> TaxConfig {
        self.tax
    }

    pub fn payment(&self) -> &DraftPayment {
        &self.payment
    }

    pub fn totals(&self) -> &InvoiceTotals {
        &self.totals
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Tab label: the customer name, or "New Invoice" until one is typed.
    pub fn label(&self) -> String {
        let name = self.customer.name.trim();
        if name.is_empty() {
            DEFAULT_DRAFT_LABEL.to_string()
        } else {
            name.to_string()
        }
    }

    // -------------------------------------------------------------------------
    // Line edits
    // -------------------------------------------------------------------------

    /// Appends a catalog line and returns its index.
    pub fn add_catalog_line(
        &mut self,
        product: &Product,
        variant: Option<&Variant>,
    ) -> CoreResult<usize> {
        check_variant(product, variant)?;
        self.push_line(DraftLine::from_catalog(product, variant))
    }

    /// Appends a blank free-text line and returns its index.
    pub fn add_manual_line(&mut self) -> CoreResult<usize> {
        self.push_line(DraftLine::manual())
    }

    pub fn update_line(&mut self, index: usize, update: LineUpdate) -> CoreResult<()> {
        let line = self.line_mut(index)?;

        match update {
            LineUpdate::Quantity(qty) => line.quantity = qty.clamp(0, MAX_LINE_QUANTITY),
            LineUpdate::UnitPrice(price) => line.unit_price_paise = clamp_price(price),
            LineUpdate::Description(text) => line.description = text,
            LineUpdate::DiscountPercent(bps) => line.discount_bps = bps.min(10_000),
            LineUpdate::DiscountAmount(amount) => line.discount_paise = clamp_price(amount),
            LineUpdate::ItemCode(code) => line.item_code = code,
        }

        self.refresh();
        Ok(())
    }

    /// Points an existing catalog line at a different variant (or none),
    /// re-seeding its description. Quantity, price and discounts are kept.
    pub fn select_variant(
        &mut self,
        index: usize,
        product: &Product,
        variant: Option<&Variant>,
    ) -> CoreResult<()> {
        check_variant(product, variant)?;
        let line = self.line_mut(index)?;

        if line.kind != LineKind::Catalog
            || line.product_id.as_deref() != Some(product.id.as_str())
        {
            return Err(CoreError::NotCatalogLine { index });
        }

        line.variant_id = variant.map(|v| v.id.clone());
        line.description = describe(product, variant);

        self.refresh();
        Ok(())
    }

    pub fn remove_line(&mut self, index: usize) -> CoreResult<DraftLine> {
        self.line_mut(index)?;
        let removed = self.lines.remove(index);
        self.refresh();
        Ok(removed)
    }

    // -------------------------------------------------------------------------
    // Invoice-level edits
    // -------------------------------------------------------------------------

    pub fn set_customer(&mut self, customer: CustomerInfo) {
        self.customer = customer;
        self.refresh();
    }

    pub fn set_tax(&mut self, tax: TaxConfig) {
        self.tax = tax;
        self.refresh();
    }

    /// Direct status selection at the counter.
    pub fn select_payment_status(&mut self, status: PaymentStatus) {
        self.payment.select(status, self.totals.grand_total);
        self.refresh();
    }

    /// Manually entered amount for a partial payment.
    pub fn set_partial_amount(&mut self, amount: Money) {
        self.payment
            .set_partial_amount(amount, self.totals.grand_total);
        self.refresh();
    }

    pub fn set_payment_method(&mut self, method: PaymentMethod) {
        self.payment.method = method;
        self.refresh();
    }

    // -------------------------------------------------------------------------
    // Commit checks
    // -------------------------------------------------------------------------

    /// Everything that can be checked without the ledger.
    pub fn validate_for_commit(&self) -> Result<(), ValidationError> {
        validate_customer_name(&self.customer.name)?;
        validate_phone(self.customer.phone.as_deref())?;
        validate_rate_bps("tax_rate", self.tax.rate.bps())?;

        if self.lines.is_empty() {
            return Err(ValidationError::EmptyDraft);
        }

        for (index, line) in self.lines.iter().enumerate() {
            line.validate().map_err(|e| e.at_line(index))?;
        }

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn push_line(&mut self, line: DraftLine) -> CoreResult<usize> {
        if self.lines.len() >= MAX_DRAFT_LINES {
            return Err(CoreError::DraftTooLarge {
                max: MAX_DRAFT_LINES,
            });
        }
        self.lines.push(line);
        self.refresh();
        Ok(self.lines.len() - 1)
    }

    fn line_mut(&mut self, index: usize) -> CoreResult<&mut DraftLine> {
        let len = self.lines.len();
        self.lines
            .get_mut(index)
            .ok_or(CoreError::LineOutOfRange { index, len })
    }

    fn refresh(&mut self) {
        for line in &mut self.lines {
            line.recompute();
        }
        self.totals = compute_totals(&self.lines, &self.tax);
        self.payment.reconcile(self.totals.grand_total);
        self.updated_at = Utc::now();
    }
}

fn check_variant(product: &Product, variant: Option<&Variant>) -> CoreResult<()> {
    match variant {
        Some(v) if v.product_id != product.id => Err(CoreError::VariantNotFound(v.id.clone())),
        _ => Ok(()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
