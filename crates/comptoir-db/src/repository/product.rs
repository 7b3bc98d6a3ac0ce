//! # Product Repository
//!
//! Database operations for the catalog.
//!
//! ## Key Operations
//! - Lookups by id, one at a time or for a whole cart
//! - Active listing for the shop front
//! - Stock and availability updates
//!
//! Stock decrements for paid orders do not live here: they run inside the
//! fulfillment transaction in [`crate::repository::order`].

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use comptoir_core::Product;

const PRODUCT_COLUMNS: &str = "id, slug, name, description, price_cents, stock, is_active, created_at, updated_at";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// let product = repo.get_by_id("uuid-here").await?;
/// let lines = repo.get_many(&cart.product_ids()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found (active or not)
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its slug.
    pub async fn get_by_slug(&self, slug: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE slug = ?1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Loads every product whose id is in `ids`, in one query.
    ///
    /// Unknown ids are simply absent from the result. Order is not
    /// guaranteed; callers index by id.
    pub async fn get_many(&self, ids: &[String]) -> DbResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        debug!(count = ids.len(), "Loading products by id");

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id IN ("));
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let products = builder
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Lists active products sorted by name.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 ORDER BY name LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Counts active products.
    pub async fn count_active(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product
    /// * `Err(DbError::UniqueViolation)` - Slug already exists
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(slug = %product.slug, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, slug, name, description, price_cents, stock,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.slug)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("slug", &product.slug),
            other => other,
        })?;

        Ok(product.clone())
    }

    /// Sets the absolute stock level (restocking, inventory counts).
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn set_stock(&self, id: &str, stock: i64) -> DbResult<()> {
        debug!(id = %id, stock = %stock, "Setting stock");

        let result = sqlx::query("UPDATE products SET stock = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(stock.max(0))
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Activates or soft-deletes a product.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        debug!(id = %id, active = %active, "Setting product availability");

        let result =
            sqlx::query("UPDATE products SET is_active = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(id)
                .bind(active)
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, DbError};
    use comptoir_core::Product;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = db().await;
        let repo = db.products();

        let mut product = Product::new("mug-bleu", "Mug bleu", 1000, 5);
        product.description = Some("Grès émaillé".to_string());
        repo.insert(&product).await.unwrap();

        let loaded = repo.get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Mug bleu");
        assert_eq!(loaded.stock, 5);
        assert!(loaded.is_active);
        assert_eq!(loaded.description.as_deref(), Some("Grès émaillé"));

        let by_slug = repo.get_by_slug("mug-bleu").await.unwrap().unwrap();
        assert_eq!(by_slug.id, product.id);

        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_slug() {
        let db = db().await;
        let repo = db.products();

        repo.insert(&Product::new("mug", "Mug", 1000, 1)).await.unwrap();
        let err = repo
            .insert(&Product::new("mug", "Autre mug", 900, 1))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "slug"));
    }

    #[tokio::test]
    async fn test_get_many_skips_unknown_ids() {
        let db = db().await;
        let repo = db.products();

        let a = repo.insert(&Product::new("a", "A", 100, 1)).await.unwrap();
        let b = repo.insert(&Product::new("b", "B", 200, 1)).await.unwrap();

        let found = repo
            .get_many(&[a.id.clone(), "ghost".to_string(), b.id.clone()])
            .await
            .unwrap();
        assert_eq!(found.len(), 2);

        assert!(repo.get_many(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_active_hides_inactive() {
        let db = db().await;
        let repo = db.products();

        let a = repo.insert(&Product::new("a", "Assiette", 100, 1)).await.unwrap();
        repo.insert(&Product::new("b", "Bol", 200, 1)).await.unwrap();
        repo.set_active(&a.id, false).await.unwrap();

        let listed = repo.list_active(10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Bol");
        assert_eq!(repo.count_active().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_set_stock() {
        let db = db().await;
        let repo = db.products();

        let p = repo.insert(&Product::new("a", "A", 100, 1)).await.unwrap();
        repo.set_stock(&p.id, 12).await.unwrap();
        assert_eq!(repo.get_by_id(&p.id).await.unwrap().unwrap().stock, 12);

        let err = repo.set_stock("missing", 3).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
