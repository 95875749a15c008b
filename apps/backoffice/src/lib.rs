//! # Dukaan Back Office
//!
//! Service layer over `dukaan-core` and `dukaan-db`: draft sessions, the
//! invoice commit sequencer, payments, the archive and reports.
//!
//! ## Module Organization
//! ```text
//! dukaan_backoffice/
//! ├── lib.rs          ◄─── You are here (startup & tracing)
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── config.rs   ◄─── BackofficeConfig (file → env → validate)
//! │   ├── db.rs       ◄─── Database state wrapper
//! │   └── drafts.rs   ◄─── Keyed draft sessions, persisted per edit
//! ├── commands/
//! │   ├── draft.rs    ◄─── Draft editing
//! │   ├── invoice.rs  ◄─── Commit, detail, stock repair
//! │   ├── payment.rs  ◄─── Payments, waivers, status overrides
//! │   ├── archive.rs  ◄─── Invoice listing + summary
//! │   └── report.rs   ◄─── Sales reconciliation
//! ├── commit.rs       ◄─── Commit saga (Validating → Persisting → DeductingStock)
//! ├── repair.rs       ◄─── Idempotent stock repair for partial commits
//! └── error.rs        ◄─── API error type for commands
//! ```
//!
//! ## State Management
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ┌──────────────────┐ ┌──────────────────┐ ┌──────────────────────┐    │
//! │  │    DbState       │ │  DraftSessions   │ │  BackofficeConfig    │    │
//! │  │                  │ │                  │ │                      │    │
//! │  │  • Database pool │ │  • Open drafts   │ │  • Default tax       │    │
//! │  │  • Repositories  │ │  • KV snapshots  │ │  • Invoice prefix    │    │
//! │  │  • Stock ledger  │ │                  │ │  • Step timeout      │    │
//! │  └──────────────────┘ └──────────────────┘ └──────────────────────┘    │
//! │                                                                         │
//! │  Each command takes only the state it needs.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod commit;
pub mod error;
pub mod repair;
pub mod state;

use tracing::info;
use tracing_subscriber::EnvFilter;

use dukaan_db::Database;
use error::ApiError;
use state::{BackofficeConfig, DbState, DraftSessions};

/// Everything a running back office holds.
#[derive(Debug)]
pub struct Backoffice {
    pub config: BackofficeConfig,
    pub db: DbState,
    pub drafts: DraftSessions,
}

impl Backoffice {
    /// Connects the database, runs migrations and restores draft sessions.
    ///
    /// ## Startup Sequence
    /// ```text
    /// 1. Connect ─────► SQLite (WAL), pending migrations applied
    /// 2. Restore ─────► draft_sessions rows → open drafts
    ///                   (a fresh "New Invoice" when none were saved)
    /// ```
    pub async fn start(config: BackofficeConfig) -> Result<Self, ApiError> {
        let db_config = config.db_config()?;
        info!(path = ?db_config.database_path, "Opening database");

        let db = Database::new(db_config).await?;
        Self::with_database(config, db).await
    }

    /// Same as [`Backoffice::start`] over an already-open database.
    pub async fn with_database(config: BackofficeConfig, db: Database) -> Result<Self, ApiError> {
        let drafts = DraftSessions::new(db.drafts(), config.tax_config());
        let restored = drafts.restore().await?;
        info!(restored, "Draft sessions ready");

        Ok(Backoffice {
            config,
            db: DbState::new(db),
            drafts,
        })
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=dukaan=trace` - Show trace for dukaan crates only
/// - Default: `info,dukaan=debug,sqlx=warn`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,dukaan=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
