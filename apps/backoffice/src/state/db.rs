//! # Database State
//!
//! The shop database as commands receive it.
//!
//! ```rust,ignore
//! pub async fn get_invoice(db: &DbState, invoice_id: &str) -> Result<InvoiceDetail, ApiError> {
//!     let invoice = db.inner().invoices().get_by_id(invoice_id).await?;
//!     ...
//! }
//! ```

use dukaan_db::Database;

#[derive(Debug, Clone)]
pub struct DbState {
    db: Database,
}

impl DbState {
    pub fn new(db: Database) -> Self {
        DbState { db }
    }

    pub fn inner(&self) -> &Database {
        &self.db
    }
}
