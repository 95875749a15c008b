//! # Draft Commands
//!
//! Session management and line editing for in-progress invoices.
//!
//! ## Draft Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  open_draft ──► add_catalog_line / add_manual_line                      │
//! │                   update_line / select_variant / remove_line            │
//! │                   set_customer / set_tax                                │
//! │                   select_payment_status / set_partial_amount            │
//! │                        │                                                │
//! │                        ▼                                                │
//! │                 commit_invoice (invoice.rs) ──► fresh draft, same tab   │
//! │                                                                         │
//! │  Totals are recomputed after every edit; every edit is persisted.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tracing::debug;

use dukaan_core::draft::{
    CustomerInfo, DraftLine, InvoiceDraft, InvoiceTotals, LineUpdate, TaxConfig,
};
use dukaan_core::payment::DraftPayment;
use dukaan_core::validation::validate_rate_bps;
use dukaan_core::{
    CoreError, LineKind, Money, PaymentMethod, PaymentStatus, Product, TaxRate, TaxType, Variant,
};

use crate::error::ApiError;
use crate::state::{DbState, DraftSessions, SessionSummary};

/// Full draft as the invoicing screen renders it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftView {
    pub key: String,
    pub label: String,
    pub customer: CustomerInfo,
    pub lines: Vec<DraftLine>,
    pub tax: TaxConfig,
    pub payment: DraftPayment,
    pub totals: InvoiceTotals,
}

impl DraftView {
    pub(crate) fn of(key: &str, draft: &InvoiceDraft) -> Self {
        DraftView {
            key: key.to_string(),
            label: draft.label(),
            customer: draft.customer().clone(),
            lines: draft.lines().to_vec(),
            tax: draft.tax(),
            payment: *draft.payment(),
            totals: *draft.totals(),
        }
    }
}

// =============================================================================
// Sessions
// =============================================================================

pub async fn list_drafts(drafts: &DraftSessions) -> Vec<SessionSummary> {
    drafts.list().await
}

pub async fn open_draft(drafts: &DraftSessions) -> Result<SessionSummary, ApiError> {
    drafts.open().await
}

pub async fn close_draft(drafts: &DraftSessions, key: &str) -> Result<(), ApiError> {
    drafts.close(key).await
}

pub async fn get_draft(drafts: &DraftSessions, key: &str) -> Result<DraftView, ApiError> {
    debug!(key = %key, "get_draft command");
    drafts.with_draft(key, |d| DraftView::of(key, d)).await
}

// =============================================================================
// Lines
// =============================================================================

/// Adds a catalog line for a product, and the chosen variant if any.
///
/// Products that sell by variant need one: their stock lives on the
/// variants, so a bare product line would have nothing to deduct from.
pub async fn add_catalog_line(
    db: &DbState,
    drafts: &DraftSessions,
    key: &str,
    product_id: &str,
    variant_id: Option<&str>,
) -> Result<DraftView, ApiError> {
    debug!(key = %key, product_id = %product_id, ?variant_id, "add_catalog_line command");

    let (product, variant) = resolve(db, product_id, variant_id).await?;

    drafts
        .with_draft_mut(key, |d| {
            d.add_catalog_line(&product, variant.as_ref())?;
            Ok(DraftView::of(key, d))
        })
        .await
}

pub async fn add_manual_line(drafts: &DraftSessions, key: &str) -> Result<DraftView, ApiError> {
    drafts
        .with_draft_mut(key, |d| {
            d.add_manual_line()?;
            Ok(DraftView::of(key, d))
        })
        .await
}

pub async fn update_line(
    drafts: &DraftSessions,
    key: &str,
    index: usize,
    update: LineUpdate,
) -> Result<DraftView, ApiError> {
    debug!(key = %key, index, ?update, "update_line command");
    drafts
        .with_draft_mut(key, |d| {
            d.update_line(index, update)?;
            Ok(DraftView::of(key, d))
        })
        .await
}

/// Points a catalog line at another variant of its product.
pub async fn select_variant(
    db: &DbState,
    drafts: &DraftSessions,
    key: &str,
    index: usize,
    variant_id: Option<&str>,
) -> Result<DraftView, ApiError> {
    let product_id = drafts
        .with_draft(key, |d| match d.lines().get(index) {
            Some(line) if line.kind == LineKind::Catalog => line
                .product_id
                .clone()
                .ok_or(CoreError::NotCatalogLine { index }),
            Some(_) => Err(CoreError::NotCatalogLine { index }),
            None => Err(CoreError::LineOutOfRange {
                index,
                len: d.lines().len(),
            }),
        })
        .await??;

    let (product, variant) = resolve(db, &product_id, variant_id).await?;

    drafts
        .with_draft_mut(key, |d| {
            d.select_variant(index, &product, variant.as_ref())?;
            Ok(DraftView::of(key, d))
        })
        .await
}

pub async fn remove_line(
    drafts: &DraftSessions,
    key: &str,
    index: usize,
) -> Result<DraftView, ApiError> {
    drafts
        .with_draft_mut(key, |d| {
            d.remove_line(index)?;
            Ok(DraftView::of(key, d))
        })
        .await
}

// =============================================================================
// Invoice-level fields
// =============================================================================

pub async fn set_customer(
    drafts: &DraftSessions,
    key: &str,
    customer: CustomerInfo,
) -> Result<DraftView, ApiError> {
    drafts
        .with_draft_mut(key, |d| {
            d.set_customer(customer);
            Ok(DraftView::of(key, d))
        })
        .await
}

/// Changes the invoice tax. `tax_bps` is basis points (1800 = 18%).
pub async fn set_tax(
    drafts: &DraftSessions,
    key: &str,
    tax_type: TaxType,
    tax_bps: u32,
) -> Result<DraftView, ApiError> {
    validate_rate_bps("tax_rate", tax_bps).map_err(CoreError::from)?;

    drafts
        .with_draft_mut(key, |d| {
            d.set_tax(TaxConfig::new(tax_type, TaxRate::from_bps(tax_bps)));
            Ok(DraftView::of(key, d))
        })
        .await
}

pub async fn select_payment_status(
    drafts: &DraftSessions,
    key: &str,
    status: PaymentStatus,
) -> Result<DraftView, ApiError> {
    drafts
        .with_draft_mut(key, |d| {
            d.select_payment_status(status);
            Ok(DraftView::of(key, d))
        })
        .await
}

pub async fn set_partial_amount(
    drafts: &DraftSessions,
    key: &str,
    amount: Money,
) -> Result<DraftView, ApiError> {
    drafts
        .with_draft_mut(key, |d| {
            d.set_partial_amount(amount);
            Ok(DraftView::of(key, d))
        })
        .await
}

pub async fn set_payment_method(
    drafts: &DraftSessions,
    key: &str,
    method: PaymentMethod,
) -> Result<DraftView, ApiError> {
    drafts
        .with_draft_mut(key, |d| {
            d.set_payment_method(method);
            Ok(DraftView::of(key, d))
        })
        .await
}

/// Loads a product and the requested variant, enforcing that products with
/// variants are sold by variant.
async fn resolve(
    db: &DbState,
    product_id: &str,
    variant_id: Option<&str>,
) -> Result<(Product, Option<Variant>), ApiError> {
    let catalog = db.inner().catalog();

    let product = catalog
        .get_product(product_id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
    let variants = catalog.variants_of(product_id).await?;

    let variant = match variant_id {
        Some(id) => Some(
            variants
                .into_iter()
                .find(|v| v.id == id)
                .ok_or_else(|| CoreError::VariantNotFound(id.to_string()))?,
        ),
        None if !variants.is_empty() => {
            return Err(CoreError::VariantRequired {
                product_id: product_id.to_string(),
            }
            .into())
        }
        None => None,
    };

    Ok((product, variant))
}
