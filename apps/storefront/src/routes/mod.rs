//! # Route Handlers
//!
//! One module per area. Handlers pull the visitor's [`SessionId`] out of the
//! request extensions (put there by the session layer) and hand it to a
//! service; `CheckoutError`s become [`ApiError`]s through `?`.
//!
//! [`SessionId`]: comptoir_checkout::SessionId
//! [`ApiError`]: crate::error::ApiError

pub mod account;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod health;
pub mod payment;

use comptoir_checkout::SessionId;
use comptoir_core::User;

use crate::error::ApiResult;
use crate::AppState;

/// The logged-in customer, or `401`.
pub(crate) async fn customer(state: &AppState, session: &SessionId) -> ApiResult<User> {
    Ok(state.services.accounts.require_user(session).await?)
}
