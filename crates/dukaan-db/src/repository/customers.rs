//! # Customer Repository
//!
//! The customer list. Rows are only ever added; invoices keep their own
//! copy of the customer's name and phone.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use dukaan_core::Customer;

const CUSTOMER_COLUMNS: &str = "id, name, phone, email, address, created_at";

/// Repository for registered customers.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Inserts a validated customer.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - ID already exists
    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (id, name, phone, email, address, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.email)
        .bind(&customer.address)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let sql = format!("SELECT {} FROM customers WHERE id = ?1", CUSTOMER_COLUMNS);
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    /// Every customer, newest first.
    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let sql = format!(
            "SELECT {} FROM customers ORDER BY created_at DESC, id",
            CUSTOMER_COLUMNS
        );
        let customers = sqlx::query_as::<_, Customer>(&sql)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = customers.len(), "Loaded customers");
        Ok(customers)
    }
}
