//! # Catalog
//!
//! Read-only browsing of the products a visitor can buy. Inactive products
//! never show up here, whether listed or asked for by slug.

use comptoir_core::Product;
use comptoir_db::Database;
use serde::Serialize;
use tracing::debug;

use crate::error::{CheckoutError, CheckoutResult};

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 200;

/// The shop front: active products by name.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogPage {
    pub products: Vec<Product>,
    /// Active products in the whole catalog, not just this page.
    pub total: i64,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    db: Database,
}

impl Catalog {
    pub fn new(db: Database) -> Self {
        Catalog { db }
    }

    /// Up to `limit` active products sorted by name, capped at
    /// [`MAX_PAGE_SIZE`].
    pub async fn list(&self, limit: Option<u32>) -> CheckoutResult<CatalogPage> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let products = self.db.products().list_active(limit).await?;
        let total = self.db.products().count_active().await?;

        debug!(shown = products.len(), total, "Catalog listed");
        Ok(CatalogPage { products, total })
    }

    /// An active product by slug. Inactive products are reported missing.
    pub async fn product(&self, slug: &str) -> CheckoutResult<Product> {
        self.db
            .products()
            .get_by_slug(slug)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| CheckoutError::not_found("Product", slug))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::seeded;

    #[tokio::test]
    async fn test_lists_active_by_name() {
        let shop = seeded().await;
        let catalog = Catalog::new(shop.db.clone());

        let page = catalog.list(None).await.unwrap();
        let names: Vec<_> = page.products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Bordeaux Rouge", "Comté 18 mois"]);
        assert_eq!(page.total, 2);

        shop.db.products().set_active(&shop.wine.id, false).await.unwrap();
        let page = catalog.list(Some(0)).await.unwrap();
        assert_eq!(page.products.len(), 1);
        assert_eq!(page.products[0].id, shop.cheese.id);
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_product_by_slug() {
        let shop = seeded().await;
        let catalog = Catalog::new(shop.db.clone());

        assert_eq!(catalog.product("bordeaux-rouge").await.unwrap().id, shop.wine.id);
        assert!(matches!(
            catalog.product("unknown").await,
            Err(CheckoutError::NotFound(_))
        ));

        shop.db.products().set_active(&shop.wine.id, false).await.unwrap();
        assert!(matches!(
            catalog.product("bordeaux-rouge").await,
            Err(CheckoutError::NotFound(_))
        ));
    }
}
