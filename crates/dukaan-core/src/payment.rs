//! # Payment State Machine
//!
//! Derives an invoice's settlement status from the paid amount `P` against
//! the grand total `G`, and plans the ledger entries for every way `P` can
//! move.
//!
//! ## Derivation Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │    P = 0          ──►  unpaid                                           │
//! │    0 < P < G      ──►  partial                                          │
//! │    P ≥ G          ──►  paid      (P clamped to G)                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Entry Points
//! ```text
//!   Draft (before commit)        DraftPayment::select / set_partial_amount
//!   Committed invoice            plan_settlement   → Payment / Waiver entries
//!   Status override              plan_override     → Payment / Reversal entry
//!                                                    (+ audit when leaving paid)
//!
//!   After any ledger append:     P = clamp(Σ signed entries, 0, G)
//!                                status = derive(P, G)
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{EntryKind, PaymentEntry, PaymentMethod, PaymentStatus};
use crate::validation::validate_reason;

// =============================================================================
// Derivation
// =============================================================================

impl PaymentStatus {
    /// Status implied by `paid` against `grand_total`.
    pub fn derive(paid: Money, grand_total: Money) -> PaymentStatus {
        if paid.paise() <= 0 {
            PaymentStatus::Unpaid
        } else if paid < grand_total {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Paid
        }
    }
}

/// Clamps a paid amount into `[0, grand_total]`.
pub fn clamp_paid(paid: Money, grand_total: Money) -> Money {
    paid.clamp_to(Money::zero(), grand_total.max(Money::zero()))
}

/// Settled amount implied by a full payment ledger.
pub fn settled_amount(entries: &[PaymentEntry], grand_total: Money) -> Money {
    let sum: Money = entries.iter().map(PaymentEntry::signed_amount).sum();
    clamp_paid(sum, grand_total)
}

/// Paid amount and status recomputed from a ledger sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Settlement {
    pub paid: Money,
    pub status: PaymentStatus,
}

impl Settlement {
    /// Builds the cached view from a raw signed ledger sum.
    pub fn from_ledger_sum(sum: Money, grand_total: Money) -> Self {
        let paid = clamp_paid(sum, grand_total);
        Settlement {
            paid,
            status: PaymentStatus::derive(paid, grand_total),
        }
    }
}

// =============================================================================
// Draft-time Selection
// =============================================================================

/// Payment status picked while drafting, before any ledger entry exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DraftPayment {
    pub status: PaymentStatus,
    pub paid_paise: i64,
    pub method: PaymentMethod,
}

impl DraftPayment {
    #[inline]
    pub fn paid(&self) -> Money {
        Money::from_paise(self.paid_paise)
    }

    /// `paid` sets P = G, `unpaid` sets P = 0. `partial` keeps the current
    /// amount and waits for [`DraftPayment::set_partial_amount`].
    pub fn select(&mut self, status: PaymentStatus, grand_total: Money) {
        self.status = status;
        match status {
            PaymentStatus::Paid => self.paid_paise = grand_total.paise(),
            PaymentStatus::Unpaid => self.paid_paise = 0,
            PaymentStatus::Partial => {
                self.paid_paise = clamp_paid(self.paid(), grand_total).paise();
            }
        }
    }

    /// Clamps the typed amount to `[0, G]` and re-derives the status, so
    /// typing the full total snaps to `paid`.
    pub fn set_partial_amount(&mut self, amount: Money, grand_total: Money) {
        let paid = clamp_paid(amount, grand_total);
        self.paid_paise = paid.paise();
        self.status = PaymentStatus::derive(paid, grand_total);
    }

    /// Re-applies the selection after the grand total changed.
    pub fn reconcile(&mut self, grand_total: Money) {
        match self.status {
            PaymentStatus::Paid => self.paid_paise = grand_total.paise().max(0),
            PaymentStatus::Unpaid => self.paid_paise = 0,
            PaymentStatus::Partial => {
                let paid = clamp_paid(self.paid(), grand_total);
                self.paid_paise = paid.paise();
                // Zero means the amount has not been typed yet.
                if paid.is_positive() {
                    self.status = PaymentStatus::derive(paid, grand_total);
                }
            }
        }
    }

    /// Amount to record as the opening payment at commit time.
    pub fn opening_amount(&self, grand_total: Money) -> Money {
        clamp_paid(self.paid(), grand_total)
    }
}

// =============================================================================
// Planned Ledger Entries
// =============================================================================

/// A ledger entry about to be appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedEntry {
    pub kind: EntryKind,
    pub method: Option<PaymentMethod>,
    pub amount: Money,
    pub note: Option<String>,
}

impl PlannedEntry {
    pub fn payment(amount: Money, method: PaymentMethod) -> Self {
        PlannedEntry {
            kind: EntryKind::Payment,
            method: Some(method),
            amount,
            note: None,
        }
    }
}

/// Payment dialog input for a committed invoice.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SettlementRequest {
    pub amount: Money,
    pub method: PaymentMethod,

    /// Settlement discount written off the balance.
    #[serde(default)]
    pub discount: Money,

    #[serde(default)]
    pub discount_reason: Option<String>,
}

/// Checks a payment dialog submission against the invoice's current `P`/`G`
/// and returns the entries to append. Nothing is written on error.
pub fn plan_settlement(
    paid: Money,
    grand_total: Money,
    request: &SettlementRequest,
) -> CoreResult<Vec<PlannedEntry>> {
    if request.amount.is_negative() || request.discount.is_negative() {
        return Err(CoreError::PaymentAmountInvalid {
            reason: "amounts cannot be negative".to_string(),
        });
    }

    if request.amount.is_zero() && request.discount.is_zero() {
        return Err(CoreError::PaymentAmountInvalid {
            reason: "enter a payment or discount amount".to_string(),
        });
    }

    let remaining = clamp_paid(grand_total - paid, grand_total);

    if request.amount > remaining {
        return Err(CoreError::exceeds_balance("payment", request.amount, remaining));
    }

    let mut entries = Vec::with_capacity(2);

    if request.discount.is_positive() {
        let reason = validate_reason(request.discount_reason.as_deref()).map_err(|_| {
            CoreError::PaymentAmountInvalid {
                reason: "a reason is required for a settlement discount".to_string(),
            }
        })?;

        if request.discount > remaining {
            return Err(CoreError::exceeds_balance("discount", request.discount, remaining));
        }

        if request.amount + request.discount > remaining {
            return Err(CoreError::exceeds_balance(
                "payment plus discount",
                request.amount + request.discount,
                remaining,
            ));
        }

        entries.push(PlannedEntry {
            kind: EntryKind::Waiver,
            method: None,
            amount: request.discount,
            note: Some(reason),
        });
    }

    if request.amount.is_positive() {
        entries.insert(0, PlannedEntry::payment(request.amount, request.method));
    }

    Ok(entries)
}

// =============================================================================
// Status Override
// =============================================================================

/// Explicit status change on a committed invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StatusOverride {
    pub target: PaymentStatus,

    /// Required when leaving `paid`.
    #[serde(default)]
    pub reason: Option<String>,

    /// Paid amount to land on when the target is `partial`.
    #[serde(default)]
    pub partial_amount: Option<Money>,

    #[serde(default)]
    pub method: PaymentMethod,
}

/// Audit row to write before the override is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditNote {
    pub reason: String,
    pub old_status: PaymentStatus,
    pub new_status: PaymentStatus,
}

/// What an override will do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverridePlan {
    pub audit: Option<AuditNote>,
    pub entry: Option<PlannedEntry>,
    pub target_paid: Money,
}

/// Plans an override from the invoice's current state.
///
/// Leaving `paid` without a non-empty reason fails with
/// [`CoreError::ReasonRequired`] and plans nothing.
pub fn plan_override(
    invoice_id: &str,
    current_status: PaymentStatus,
    paid: Money,
    grand_total: Money,
    request: &StatusOverride,
) -> CoreResult<OverridePlan> {
    let target = request.target;
    let leaving_paid = current_status == PaymentStatus::Paid && target != PaymentStatus::Paid;

    let reason = if leaving_paid {
        let reason = validate_reason(request.reason.as_deref()).map_err(|_| {
            CoreError::ReasonRequired {
                invoice_id: invoice_id.to_string(),
                from: current_status,
                to: target,
            }
        })?;
        Some(reason)
    } else {
        request
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
    };

    let target_paid = match target {
        PaymentStatus::Unpaid => Money::zero(),
        PaymentStatus::Paid => {
            if !grand_total.is_positive() {
                return Err(CoreError::InvalidStatusTransition {
                    to: target,
                    reason: "invoice total is zero".to_string(),
                });
            }
            grand_total
        }
        PaymentStatus::Partial => {
            let amount = request.partial_amount.unwrap_or_default();
            if !amount.is_positive() || amount >= grand_total {
                return Err(CoreError::InvalidStatusTransition {
                    to: target,
                    reason: format!("partial amount must be between ₹0 and {}", grand_total),
                });
            }
            amount
        }
    };

    let delta = target_paid - paid;
    let entry = if delta.is_positive() {
        Some(PlannedEntry {
            note: reason.clone(),
            ..PlannedEntry::payment(delta, request.method)
        })
    } else if delta.is_negative() {
        Some(PlannedEntry {
            kind: EntryKind::Reversal,
            method: None,
            amount: delta.abs(),
            note: reason.clone(),
        })
    } else {
        None
    };

    let audit = match (leaving_paid, reason) {
        (true, Some(reason)) => Some(AuditNote {
            reason,
            old_status: current_status,
            new_status: target,
        }),
        _ => None,
    };

    Ok(OverridePlan {
        audit,
        entry,
        target_paid,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
