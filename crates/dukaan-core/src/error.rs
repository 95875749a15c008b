//! # Error Types
//!
//! Domain-specific error types for dukaan-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  dukaan-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  dukaan-db errors (separate crate)                                     │
//! │  └── DbError          - Database / ledger failures                     │
//! │                                                                         │
//! │  Back office (app)                                                     │
//! │  ├── CommitError      - Saga outcome with partial-failure states       │
//! │  └── ApiError         - What callers see (serialized)                  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CommitError/ApiError → Caller     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Money;
use crate::types::PaymentStatus;

/// Result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Variant not found: {0}")]
    VariantNotFound(String),

    /// The product sells by variant, so a line must name one.
    #[error("Product {product_id} has variants; choose one")]
    VariantRequired { product_id: String },

    /// Payment or discount does not fit the remaining balance, or a discount
    /// was entered without a reason.
    #[error("Invalid payment amount: {reason}")]
    PaymentAmountInvalid { reason: String },

    /// Moving an invoice out of `paid` needs a written reason.
    #[error("A reason is required to change invoice {invoice_id} from {from} to {to}")]
    ReasonRequired {
        invoice_id: String,
        from: PaymentStatus,
        to: PaymentStatus,
    },

    /// Status override that cannot be expressed against the grand total.
    #[error("Cannot move invoice to {to}: {reason}")]
    InvalidStatusTransition { to: PaymentStatus, reason: String },

    /// Draft line index does not exist.
    #[error("Draft has no line at index {index} (lines: {len})")]
    LineOutOfRange { index: usize, len: usize },

    /// The edit only applies to catalog lines.
    #[error("Line {index} is not a catalog line")]
    NotCatalogLine { index: usize },

    #[error("Draft session not found: {0}")]
    DraftSessionNotFound(String),

    /// At least one draft session stays open at all times.
    #[error("Cannot close the last open draft")]
    LastDraftSession,

    /// Draft cannot take more lines.
    #[error("Draft cannot have more than {max} lines")]
    DraftTooLarge { max: usize },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Builds a `PaymentAmountInvalid` for an amount above the balance.
    pub fn exceeds_balance(what: &str, amount: Money, remaining: Money) -> Self {
        CoreError::PaymentAmountInvalid {
            reason: format!(
                "{} {} exceeds remaining balance {}",
                what, amount, remaining
            ),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These are always recoverable: the caller corrects the input and resubmits
/// with no side effects.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Commit attempted on a draft without lines.
    #[error("Invoice must have at least one line item")]
    EmptyDraft,

    /// A specific draft line failed validation.
    #[error("Line {line}: {source}")]
    Line {
        line: usize,
        #[source]
        source: Box<ValidationError>,
    },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Wraps this error with the draft line it came from.
    pub fn at_line(self, line: usize) -> Self {
        ValidationError::Line {
            line,
            source: Box::new(self),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
