//! # dukaan-core: Pure Business Logic for the Dukaan Back Office
//!
//! This crate holds every invoicing, payment and reporting rule as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Dukaan Back Office Architecture                    │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Invoicing UI / Online storefront (external)        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 dukaan-backoffice (commands)                    │   │
//! │  │   draft sessions, commit saga, payments, reports, repair        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ dukaan-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌────────────┐  │   │
//! │  │   │   draft   │  │  payment  │  │  catalog  │  │ reconcile  │  │   │
//! │  │   │  Builder  │  │  Status   │  │   Stock   │  │  Reports   │  │   │
//! │  │   │  Totals   │  │  Machine  │  │  Targets  │  │  Buckets   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  dukaan-db (Database Layer)                     │   │
//! │  │          SQLite queries, migrations, stock ledger               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Persisted domain records (Product, Invoice, PaymentEntry, ...)
//! - [`money`] - Money type with integer arithmetic (paise, no floating point)
//! - [`catalog`] - Aggregate stock and stock targets
//! - [`customer`] - Customer registry input and draft billing details
//! - [`draft`] - Invoice draft builder and the pure `compute_totals`
//! - [`payment`] - Payment state machine
//! - [`reconciliation`] - Multi-channel sales aggregation
//! - [`archive`] - Invoice listing filters and summaries
//! - [`error`] / [`validation`] - Domain errors and input rules
//!
//! ## Example Usage
//!
//! ```rust
//! use dukaan_core::draft::{compute_totals, DraftLine, TaxConfig};
//! use dukaan_core::{Money, TaxRate, TaxType};
//!
//! let mut line = DraftLine::manual();
//! line.quantity = 3;
//! line.unit_price_paise = 10_000;
//!
//! let tax = TaxConfig::new(TaxType::CgstSgst, TaxRate::from_bps(1800));
//! let totals = compute_totals(&[line], &tax);
//!
//! assert_eq!(totals.cgst, Money::from_paise(2_700));
//! assert_eq!(totals.grand_total, Money::from_paise(35_400));
//! ```

pub mod archive;
pub mod catalog;
pub mod customer;
pub mod draft;
pub mod error;
pub mod money;
pub mod payment;
pub mod reconciliation;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed on a single invoice draft.
pub const MAX_DRAFT_LINES: usize = 200;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 9_999;

/// Highest unit price or per-unit discount a line accepts: ₹1 crore.
pub const MAX_UNIT_PRICE_PAISE: i64 = 1_000_000_000;

/// Label shown for a draft session before a customer name is entered.
pub const DEFAULT_DRAFT_LABEL: &str = "New Invoice";
