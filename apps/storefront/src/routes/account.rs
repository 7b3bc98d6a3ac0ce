//! Registration, login, profile, address book and order history.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use comptoir_checkout::{NewAddress, PasswordChange, ProfileUpdate, Registration, SessionId};
use comptoir_core::{Address, Order, OrderDetails, User};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::routes::customer;
use crate::session::set_session_cookie;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(form): Json<Registration>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state.services.accounts.register(form).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Logs in and hands the browser the rotated session id.
pub async fn login(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Json(form): Json<LoginForm>,
) -> ApiResult<Response> {
    let (user, session) = state
        .services
        .accounts
        .login(&session, &form.email, &form.password)
        .await?;

    let mut response = Json(user).into_response();
    set_session_cookie(response.headers_mut(), &session);
    Ok(response)
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> ApiResult<StatusCode> {
    state.services.accounts.logout(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Profile
// =============================================================================

pub async fn profile(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> ApiResult<Json<User>> {
    Ok(Json(customer(&state, &session).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Json(form): Json<ProfileUpdate>,
) -> ApiResult<Json<User>> {
    let user = customer(&state, &session).await?;
    Ok(Json(
        state.services.accounts.update_profile(&user.id, form).await?,
    ))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Json(form): Json<PasswordChange>,
) -> ApiResult<StatusCode> {
    let user = customer(&state, &session).await?;
    state
        .services
        .accounts
        .change_password(&user.id, form)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Address Book
// =============================================================================

pub async fn list_addresses(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> ApiResult<Json<Vec<Address>>> {
    let user = customer(&state, &session).await?;
    Ok(Json(state.services.accounts.list_addresses(&user.id).await?))
}

pub async fn add_address(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Json(form): Json<NewAddress>,
) -> ApiResult<(StatusCode, Json<Address>)> {
    let user = customer(&state, &session).await?;
    let address = state.services.accounts.add_address(&user.id, form).await?;
    Ok((StatusCode::CREATED, Json(address)))
}

pub async fn update_address(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Path(address_id): Path<String>,
    Json(form): Json<NewAddress>,
) -> ApiResult<Json<Address>> {
    let user = customer(&state, &session).await?;
    Ok(Json(
        state
            .services
            .accounts
            .update_address(&user.id, &address_id, form)
            .await?,
    ))
}

pub async fn set_default_address(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Path(address_id): Path<String>,
) -> ApiResult<StatusCode> {
    let user = customer(&state, &session).await?;
    state
        .services
        .accounts
        .set_default_address(&user.id, &address_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_address(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Path(address_id): Path<String>,
) -> ApiResult<StatusCode> {
    let user = customer(&state, &session).await?;
    state
        .services
        .accounts
        .delete_address(&user.id, &address_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Order History
// =============================================================================

pub async fn list_orders(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> ApiResult<Json<Vec<Order>>> {
    let user = customer(&state, &session).await?;
    Ok(Json(state.services.accounts.list_orders(&user.id).await?))
}

pub async fn show_order(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Path(order_id): Path<String>,
) -> ApiResult<Json<OrderDetails>> {
    let user = customer(&state, &session).await?;
    Ok(Json(
        state.services.accounts.get_order(&user.id, &order_id).await?,
    ))
}
