//! # Money
//!
//! Rupee amounts as whole paise, percentages as basis points.
//!
//! ```text
//! GST split on ₹300 at 18%, done in f64:
//!   300 × 0.09 = 26.999999999999996  → CGST prints as ₹26.99
//!
//! Done in paise and bps:
//!   30000 × 1800 / 20000 = 2700 paise = ₹27.00
//! ```
//!
//! ## Usage
//! ```rust
//! use dukaan_core::money::Money;
//!
//! let price = Money::from_paise(10_050); // ₹100.50
//! let doubled = price * 2;               // ₹201.00
//! assert_eq!(doubled.paise(), 20_100);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (paise for INR).
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                                                                         │
/// │  Product.price ──► DraftLine.unit_price ──► line discount ──► line_total│
/// │                                                                         │
/// │  compute_totals: subtotal − discount = taxable ──► CGST/SGST/IGST       │
/// │                                                   ──► grand_total       │
/// │                                                                         │
/// │  PaymentEntry.amount ──► Σ ledger ──► Invoice.paid_amount ──► status   │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise.
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from rupees and paise.
    ///
    /// For negative amounts only the rupee part should be negative:
    /// `from_rupees(-5, 50)` is -₹5.50.
    ///
    /// ```rust
    /// use dukaan_core::money::Money;
    ///
    /// assert_eq!(Money::from_rupees(10, 99).paise(), 1_099);
    /// assert_eq!(Money::from_rupees(-5, 50).paise(), -550);
    /// ```
    #[inline]
    pub const fn from_rupees(rupees: i64, paise: i64) -> Self {
        if rupees < 0 {
            Money(rupees * 100 - paise)
        } else {
            Money(rupees * 100 + paise)
        }
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion.
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Takes a basis-point share of this amount, rounding half up.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`, in `i128` so large
    /// invoices cannot overflow.
    ///
    /// ```rust
    /// use dukaan_core::money::Money;
    ///
    /// // 10% of ₹50.00
    /// assert_eq!(Money::from_paise(5_000).percentage(1_000).paise(), 500);
    /// ```
    pub fn percentage(&self, bps: u32) -> Money {
        let share = (self.0 as i128 * bps as i128 + 5_000) / 10_000;
        Money::from_paise(share as i64)
    }

    /// Full-rate tax on this amount (IGST).
    #[inline]
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        self.percentage(rate.bps())
    }

    /// One half of a split tax (CGST or SGST): `amount × rate / 200`.
    ///
    /// Each half is rounded on its own, so the two halves are always equal.
    ///
    /// ```rust
    /// use dukaan_core::money::Money;
    /// use dukaan_core::types::TaxRate;
    ///
    /// let taxable = Money::from_paise(30_000); // ₹300.00
    /// let half = taxable.calculate_half_tax(TaxRate::from_bps(1_800));
    /// assert_eq!(half.paise(), 2_700); // ₹27.00
    /// ```
    pub fn calculate_half_tax(&self, rate: TaxRate) -> Money {
        let half = (self.0 as i128 * rate.bps() as i128 + 10_000) / 20_000;
        Money::from_paise(half as i64)
    }

    /// Saturates at the `i64` bounds instead of wrapping.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Clamps into `[min, max]`.
    #[inline]
    pub fn clamp_to(self, min: Money, max: Money) -> Money {
        if self < min {
            min
        } else if self > max {
            max
        } else {
            self
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug/log rendering. The UI formats with the configured currency symbol.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let rupees = self.rupees().abs();
        write!(f, "{}₹{}.{:02}", sign, rupees, self.paise_part())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
