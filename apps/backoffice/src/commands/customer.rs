//! # Customer Commands
//!
//! The customer list kept at the counter, and billing a draft to a
//! customer picked from it.

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use dukaan_core::customer::NewCustomer;
use dukaan_core::{CoreError, Customer};

use crate::commands::draft::DraftView;
use crate::error::ApiError;
use crate::state::{DbState, DraftSessions};

/// Every registered customer, newest first.
pub async fn list_customers(db: &DbState) -> Result<Vec<Customer>, ApiError> {
    debug!("list_customers command");
    Ok(db.inner().customers().list().await?)
}

/// Registers a customer from the add-customer form.
///
/// ## Returns
/// * `Err` (`VALIDATION_ERROR`) - Blank name, malformed phone or email
pub async fn add_customer(db: &DbState, form: NewCustomer) -> Result<Customer, ApiError> {
    debug!("add_customer command");

    let id = Uuid::new_v4().to_string();
    let customer = form.into_customer(id, Utc::now()).map_err(CoreError::from)?;

    db.inner().customers().insert(&customer).await?;

    info!(customer_id = %customer.id, "Customer added");
    Ok(customer)
}

/// Fills the draft's customer name and phone from a registered customer.
/// The draft's `reference_by` is left as it was.
pub async fn bill_to_customer(
    db: &DbState,
    drafts: &DraftSessions,
    key: &str,
    customer_id: &str,
) -> Result<DraftView, ApiError> {
    debug!(key = %key, customer_id = %customer_id, "bill_to_customer command");

    let customer = db
        .inner()
        .customers()
        .get_by_id(customer_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Customer", customer_id))?;

    drafts
        .with_draft_mut(key, |d| {
            let reference_by = d.customer().reference_by.clone();
            d.set_customer(customer.billing_details(reference_by));
            Ok(DraftView::of(key, d))
        })
        .await
}
