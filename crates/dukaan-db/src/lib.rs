//! # dukaan-db: Database Layer for the Dukaan Back Office
//!
//! This crate provides database access for the back office.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Dukaan Data Flow                                 │
//! │                                                                         │
//! │  Back office command (commit_invoice)                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     dukaan-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ CatalogRepo   │    │ 001_init.sql │  │   │
//! │  │   │ SqlitePool    │◄───│ StockLedger   │    │ 002_drafts   │  │   │
//! │  │   │ Connection    │    │ InvoiceRepo   │    │ 003_customers│  │   │
//! │  │   │ Management    │    │ OrderRepo     │    │ ...          │  │   │
//! │  │   │               │    │ DraftStore    │    │              │  │   │
//! │  │   │               │    │ CustomerRepo  │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repositories and the `StockLedger` / `InvoiceStore` seams
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dukaan_db::{Database, DbConfig, StockLedger};
//!
//! let db = Database::new(DbConfig::new("path/to/dukaan.db")).await?;
//!
//! let on_hand = db.stock().available_for_variant("variant-id").await?;
//! let invoices = db.invoices().list(&InvoiceFilter::default()).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::catalog::CatalogRepository;
pub use repository::customers::CustomerRepository;
pub use repository::drafts::{DraftRecord, DraftStore};
pub use repository::invoice::{InvoiceRepository, InvoiceStore};
pub use repository::orders::OrderRepository;
pub use repository::stock::{Deduction, ProductStock, SqliteStockLedger, StockLedger};
