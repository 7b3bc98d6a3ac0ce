//! # API Error Type
//!
//! What an HTTP client sees when a service call doesn't succeed.
//!
//! ## Response Mapping
//! ```text
//! CheckoutError::NotFound           → 404 NOT_FOUND
//! CheckoutError::Validation         → 400 VALIDATION_ERROR
//! CheckoutError::InsufficientStock  → 409 INSUFFICIENT_STOCK (+ details)
//! CheckoutError::Conflict           → 409 CONFLICT
//! CheckoutError::Unauthorized       → 401 UNAUTHORIZED
//! CheckoutError::Redirect(step)     → 303 See Other, Location: <step page>
//! CheckoutError::Core               → 422 BUSINESS_LOGIC
//! CheckoutError::Gateway            → 502 PAYMENT_ERROR
//! CheckoutError::Db / Internal      → 500 (message not leaked)
//! ```
//!
//! ## Body
//! ```json
//! {
//!   "code": "INSUFFICIENT_STOCK",
//!   "message": "Product \"Mug\" only has 4 unit(s) in stock.",
//!   "details": ["Product \"Mug\" only has 4 unit(s) in stock."]
//! }
//! ```

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use comptoir_checkout::CheckoutError;
use comptoir_core::CheckoutStep;
use comptoir_payments::GatewayError;
use serde::Serialize;
use tracing::{error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    InsufficientStock,
    Conflict,
    Unauthorized,
    CheckoutIncomplete,
    BusinessLogic,
    PaymentError,
    DatabaseError,
    Internal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,

    pub code: ErrorCode,

    pub message: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,

    /// Page to go back to, for checkout redirects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<&'static str>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            code,
            message: message.into(),
            details: Vec::new(),
            location: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, ErrorCode::ValidationError, message)
    }

    /// A checkout prerequisite is missing; send the customer back.
    pub fn redirect(step: CheckoutStep) -> Self {
        ApiError {
            location: Some(step_path(step)),
            ..ApiError::new(
                StatusCode::SEE_OTHER,
                ErrorCode::CheckoutIncomplete,
                format!("Continue at the {} step", step),
            )
        }
    }
}

/// The storefront page for a checkout step.
pub fn step_path(step: CheckoutStep) -> &'static str {
    match step {
        CheckoutStep::Cart => "/cart",
        CheckoutStep::Address => "/checkout/address",
        CheckoutStep::NewAddress => "/account/addresses",
        CheckoutStep::Carrier => "/checkout/carrier",
        CheckoutStep::Summary => "/checkout/summary",
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::NotFound(msg) => {
                ApiError::new(StatusCode::NOT_FOUND, ErrorCode::NotFound, msg)
            }
            CheckoutError::Validation(e) => ApiError::validation(e.to_string()),
            CheckoutError::InsufficientStock(messages) => ApiError {
                message: messages.join(" "),
                details: messages,
                ..ApiError::new(StatusCode::CONFLICT, ErrorCode::InsufficientStock, "")
            },
            CheckoutError::Conflict(msg) => {
                ApiError::new(StatusCode::CONFLICT, ErrorCode::Conflict, msg)
            }
            CheckoutError::Unauthorized(msg) => {
                ApiError::new(StatusCode::UNAUTHORIZED, ErrorCode::Unauthorized, msg)
            }
            CheckoutError::Redirect(step) => ApiError::redirect(step),
            CheckoutError::Core(e) => ApiError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::BusinessLogic,
                e.to_string(),
            ),
            CheckoutError::Gateway(GatewayError::NotConfigured(method)) => ApiError::validation(
                format!("Payment method {} is not available", method),
            ),
            CheckoutError::Gateway(e) => {
                warn!(error = %e, "Payment processor error");
                ApiError::new(
                    StatusCode::BAD_GATEWAY,
                    ErrorCode::PaymentError,
                    "The payment processor could not be reached, please try again",
                )
            }
            CheckoutError::Db(e) => {
                error!(error = %e, "Database error");
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DatabaseError,
                    "A database error occurred",
                )
            }
            CheckoutError::Internal(msg) => {
                error!(error = %msg, "Internal error");
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Internal,
                    "An internal error occurred",
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        match self.location {
            Some(location) => {
                (status, [(header::LOCATION, location)], Json(self)).into_response()
            }
            None => (status, Json(self)).into_response(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_mapping() {
        let err: ApiError = CheckoutError::Redirect(CheckoutStep::Address).into();
        assert_eq!(err.status, StatusCode::SEE_OTHER);
        assert_eq!(err.location, Some("/checkout/address"));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/checkout/address"
        );
    }

    #[test]
    fn test_stock_details() {
        let err: ApiError =
            CheckoutError::InsufficientStock(vec!["A.".to_string(), "B.".to_string()]).into();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(err.details.len(), 2);

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "INSUFFICIENT_STOCK");
        assert_eq!(json["message"], "A. B.");
    }

    #[test]
    fn test_internal_message_hidden() {
        let err: ApiError = CheckoutError::Internal("secret detail".to_string()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("secret"));
    }
}
