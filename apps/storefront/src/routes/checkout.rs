//! Checkout steps. Every endpoint needs a logged-in customer.
//!
//! ```text
//! GET  /checkout/address ──► POST /checkout/address/{id} ──303──►
//! GET  /checkout/carrier ──► POST /checkout/carrier/{id} ──303──►
//! GET  /checkout/summary ──► POST /checkout/pay/{method}
//! ```
//!
//! A step whose prerequisite is missing answers `303` to the step to redo.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use comptoir_checkout::{AddressPage, CarrierPage, CheckoutSummary, SessionId};
use comptoir_core::CheckoutStep;

use crate::error::{step_path, ApiResult};
use crate::routes::customer;
use crate::AppState;

pub async fn address_page(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> ApiResult<Json<AddressPage>> {
    let user = customer(&state, &session).await?;
    let page = state.services.checkout.address_page(&session, &user.id).await?;
    Ok(Json(page))
}

pub async fn select_address(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Path(address_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let user = customer(&state, &session).await?;
    let checkout = state
        .services
        .checkout
        .select_address(&session, &user.id, &address_id)
        .await?;
    Ok((
        StatusCode::SEE_OTHER,
        [(header::LOCATION, step_path(CheckoutStep::Carrier))],
        Json(checkout),
    ))
}

pub async fn carrier_page(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> ApiResult<Json<CarrierPage>> {
    let user = customer(&state, &session).await?;
    let page = state.services.checkout.carrier_page(&session, &user.id).await?;
    Ok(Json(page))
}

pub async fn select_carrier(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Path(carrier_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    customer(&state, &session).await?;
    let checkout = state
        .services
        .checkout
        .select_carrier(&session, &carrier_id)
        .await?;
    Ok((
        StatusCode::SEE_OTHER,
        [(header::LOCATION, step_path(CheckoutStep::Summary))],
        Json(checkout),
    ))
}

pub async fn summary(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> ApiResult<Json<CheckoutSummary>> {
    let user = customer(&state, &session).await?;
    let summary = state.services.checkout.summary(&session, &user.id).await?;
    Ok(Json(summary))
}
