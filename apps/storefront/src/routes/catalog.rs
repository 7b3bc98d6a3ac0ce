//! Shop front and product pages. Open to every visitor.

use axum::extract::{Path, Query, State};
use axum::Json;
use comptoir_checkout::CatalogPage;
use comptoir_core::Product;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub limit: Option<u32>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> ApiResult<Json<CatalogPage>> {
    Ok(Json(state.services.catalog.list(query.limit).await?))
}

pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.services.catalog.product(&slug).await?))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use comptoir_core::Product;

    use crate::routes::testing::{json, TestApp};

    #[tokio::test]
    async fn test_catalog_lists_active_products() {
        let mut t = TestApp::new().await;
        t.db.products()
            .insert(&Product::new("armagnac-vsop", "Armagnac VSOP", 4500, 2))
            .await
            .unwrap();
        let hidden = t
            .db
            .products()
            .insert(&Product::new("cidre-brut", "Cidre Brut", 450, 10))
            .await
            .unwrap();
        t.db.products().set_active(&hidden.id, false).await.unwrap();

        let response = t.get("/products").await;
        assert_eq!(response.status(), StatusCode::OK);
        let page = json(response).await;
        assert_eq!(page["total"], 2);
        assert_eq!(page["products"][0]["name"], "Armagnac VSOP");
        assert_eq!(page["products"][1]["name"], "Bordeaux Rouge");

        let page = json(t.get("/products?limit=1").await).await;
        assert_eq!(page["products"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_product_page() {
        let mut t = TestApp::new().await;

        let response = t.get("/products/bordeaux-rouge").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["price_cents"], 1000);

        t.db.products().set_active(&t.wine.id, false).await.unwrap();
        assert_eq!(t.get("/products/bordeaux-rouge").await.status(), StatusCode::NOT_FOUND);
        assert_eq!(t.get("/products/nothing-here").await.status(), StatusCode::NOT_FOUND);
    }
}
