//! # Schema Migrations
//!
//! The SQL under `migrations/sqlite/` is compiled into the binary and
//! applied on open. Files are append-only: a schema change is a new
//! `NNN_what_changed.sql`, never an edit to a shipped one.
//!
//! ```text
//! migrations/sqlite/
//! ├── 001_initial_schema.sql  catalog, invoices + items, payment ledger, audit, orders
//! ├── 002_draft_sessions.sql  draft session KV store
//! └── 003_customers.sql       customer registry
//! ```

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies whatever `_sqlx_migrations` does not list yet.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let known = MIGRATOR.migrations.len();
    debug!(known, "Applying pending migrations");
    MIGRATOR.run(pool).await?;
    info!("Schema migrated");
    Ok(())
}

/// `(known, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((MIGRATOR.migrations.len(), applied as usize))
}
