//! Cart endpoints. Open to anonymous visitors.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use comptoir_checkout::SessionId;
use comptoir_core::{CartItemDetail, Money};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::AppState;

/// The cart page.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartItemDetail>,
    pub total: Money,
    pub count: i64,
    /// One message per line asking for more than is in stock.
    pub stock_issues: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddQuery {
    pub quantity: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuery {
    pub quantity: i64,
}

async fn view(state: &AppState, session: &SessionId) -> ApiResult<CartView> {
    let details = state.services.cart.get_cart_with_details(session).await?;
    Ok(CartView {
        total: details.total(),
        count: details.count(),
        stock_issues: details.stock_issues(),
        items: details.items,
    })
}

pub async fn show(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> ApiResult<Json<CartView>> {
    Ok(Json(view(&state, &session).await?))
}

/// `POST /cart/add/{id}?quantity=n`, one unit when `quantity` is absent.
pub async fn add(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Path(product_id): Path<String>,
    Query(query): Query<AddQuery>,
) -> ApiResult<Json<CartView>> {
    state
        .services
        .cart
        .add(&session, &product_id, query.quantity.unwrap_or(1))
        .await?;
    Ok(Json(view(&state, &session).await?))
}

/// `quantity <= 0` removes the line.
pub async fn update(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Path(product_id): Path<String>,
    Query(query): Query<UpdateQuery>,
) -> ApiResult<Json<CartView>> {
    state
        .services
        .cart
        .update_quantity(&session, &product_id, query.quantity)
        .await?;
    Ok(Json(view(&state, &session).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<CartView>> {
    state.services.cart.remove(&session, &product_id).await?;
    Ok(Json(view(&state, &session).await?))
}

pub async fn clear(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> ApiResult<StatusCode> {
    state.services.cart.clear(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}
