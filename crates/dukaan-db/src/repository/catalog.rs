//! # Catalog Repository
//!
//! Products and variants. Catalog management owns these rows; the back
//! office reads them and, through the stock ledger, decrements stock.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use dukaan_core::catalog::Catalog;
use dukaan_core::{Product, Variant};

const PRODUCT_COLUMNS: &str = "id, name, item_code, price_paise, offer_price_paise, \
     stock_quantity, is_active, created_at, updated_at";

const VARIANT_COLUMNS: &str = "id, product_id, color, size, price_paise, stock_quantity, \
     created_at, updated_at";

/// Repository for product and variant rows.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - ID already exists
    pub async fn insert_product(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, item_code, price_paise, offer_price_paise,
                stock_quantity, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.item_code)
        .bind(product.price_paise)
        .bind(product.offer_price_paise)
        .bind(product.stock_quantity)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a variant of an existing product.
    ///
    /// ## Returns
    /// * `Err(DbError::ForeignKeyViolation)` - Product doesn't exist
    pub async fn insert_variant(&self, variant: &Variant) -> DbResult<()> {
        debug!(id = %variant.id, product_id = %variant.product_id, "Inserting variant");

        sqlx::query(
            r#"
            INSERT INTO product_variants (
                id, product_id, color, size, price_paise, stock_quantity,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&variant.id)
        .bind(&variant.product_id)
        .bind(&variant.color)
        .bind(&variant.size)
        .bind(variant.price_paise)
        .bind(variant.stock_quantity)
        .bind(variant.created_at)
        .bind(variant.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_product(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    pub async fn get_variant(&self, id: &str) -> DbResult<Option<Variant>> {
        let sql = format!(
            "SELECT {} FROM product_variants WHERE id = ?1",
            VARIANT_COLUMNS
        );
        let variant = sqlx::query_as::<_, Variant>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(variant)
    }

    /// Lists products sorted by name.
    pub async fn list_products(&self, active_only: bool) -> DbResult<Vec<Product>> {
        let sql = if active_only {
            format!(
                "SELECT {} FROM products WHERE is_active = 1 ORDER BY name, id",
                PRODUCT_COLUMNS
            )
        } else {
            format!("SELECT {} FROM products ORDER BY name, id", PRODUCT_COLUMNS)
        };

        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Variants of one product, in a stable order for the variant picker.
    pub async fn variants_of(&self, product_id: &str) -> DbResult<Vec<Variant>> {
        let sql = format!(
            "SELECT {} FROM product_variants WHERE product_id = ?1 ORDER BY color, size, id",
            VARIANT_COLUMNS
        );
        let variants = sqlx::query_as::<_, Variant>(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(variants)
    }

    pub async fn list_variants(&self) -> DbResult<Vec<Variant>> {
        let sql = format!(
            "SELECT {} FROM product_variants ORDER BY product_id, color, size, id",
            VARIANT_COLUMNS
        );
        let variants = sqlx::query_as::<_, Variant>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(variants)
    }

    /// Snapshot of the whole catalog (inactive products included, since
    /// they can still appear in historical sales).
    pub async fn load_catalog(&self) -> DbResult<Catalog> {
        let products = self.list_products(false).await?;
        let variants = self.list_variants().await?;
        Ok(Catalog::new(products, variants))
    }
}
