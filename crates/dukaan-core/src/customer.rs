//! # Customer Registry
//!
//! The add-customer form and how a registered customer fills in a draft.
//!
//! ```text
//! NewCustomer (form) ──► into_customer ──► Customer (stored)
//!                                              │
//!                    billing_details(ref) ◄────┘
//!                            │
//!                            ▼
//!                  InvoiceDraft::set_customer
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::draft::CustomerInfo;
use crate::types::Customer;
use crate::validation::{
    validate_address, validate_customer_name, validate_email, validate_phone, ValidationResult,
};

/// Customer details as entered at the counter. Only the name is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewCustomer {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl NewCustomer {
    /// Validates the form and builds the record to store. Text is trimmed
    /// and blank optional fields become `None`.
    pub fn into_customer(
        self,
        id: String,
        created_at: DateTime<Utc>,
    ) -> ValidationResult<Customer> {
        validate_customer_name(&self.name)?;
        validate_phone(self.phone.as_deref())?;
        validate_email(self.email.as_deref())?;
        validate_address(self.address.as_deref())?;

        Ok(Customer {
            id,
            name: self.name.trim().to_string(),
            phone: trimmed(self.phone),
            email: trimmed(self.email),
            address: trimmed(self.address),
            created_at,
        })
    }
}

impl Customer {
    /// What a draft bills to. `reference_by` belongs to the invoice, not
    /// the customer, so the caller passes the draft's current value.
    pub fn billing_details(&self, reference_by: Option<String>) -> CustomerInfo {
        CustomerInfo {
            name: self.name.clone(),
            phone: self.phone.clone(),
            reference_by,
        }
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
