//! # State Module
//!
//! One state type per concern, so each command declares exactly what it
//! touches.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────────┐  ┌──────────────────────┐      │
//! │  │   DbState    │  │  DraftSessions   │  │  BackofficeConfig    │      │
//! │  │              │  │                  │  │                      │      │
//! │  │  Database    │  │  Arc<Mutex<      │  │  store / database /  │      │
//! │  │  (SQLite     │  │    key → draft   │  │  invoicing sections  │      │
//! │  │   pool)      │  │  >>              │  │                      │      │
//! │  └──────────────┘  └──────────────────┘  └──────────────────────┘      │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • DbState: Database has internal connection pool (thread-safe)        │
//! │  • DraftSessions: async Mutex; each edit is persisted under the lock   │
//! │  • BackofficeConfig: Read-only after startup                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod drafts;

pub use config::{BackofficeConfig, ConfigError, DatabaseSettings, InvoicingSettings, StoreSettings};
pub use db::DbState;
pub use drafts::{DraftSessions, SessionSummary};
