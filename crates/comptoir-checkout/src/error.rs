//! # Checkout Errors
//!
//! Service level outcomes. Some are failures (a missing product, a broken
//! processor), others are the customer being sent back to an earlier step
//! ([`CheckoutError::Redirect`]).

use comptoir_core::{CheckoutStep, CoreError, ValidationError};
use comptoir_db::DbError;
use comptoir_payments::GatewayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Entity missing, inactive, or owned by someone else.
    #[error("{0}")]
    NotFound(String),

    /// One message per cart line that exceeds the stock on hand.
    #[error("{}", .0.join(" "))]
    InsufficientStock(Vec<String>),

    /// Prerequisites of the requested step are not met.
    #[error("Checkout is incomplete, continue at the {0} step")]
    Redirect(CheckoutStep),

    /// No authenticated user on the session, or bad credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// The request conflicts with existing data (e.g. email taken).
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Business rule violation not covered above.
    #[error(transparent)]
    Core(CoreError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CheckoutError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        CheckoutError::NotFound(format!("{} not found: {}", entity, id))
    }

    pub fn login_required() -> Self {
        CheckoutError::Unauthorized("Authentication required".to_string())
    }
}

/// Folds core rule failures into the service taxonomy.
///
/// ```text
/// CheckoutIncomplete(step)  → Redirect(step)
/// EmptyCart                 → Redirect(Cart)
/// ProductNotFound           → NotFound
/// ProductUnavailable        → NotFound
/// InsufficientStock         → InsufficientStock([message])
/// Validation                → Validation
/// other                     → Core
/// ```
impl From<CoreError> for CheckoutError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::CheckoutIncomplete(step) => CheckoutError::Redirect(step),
            CoreError::EmptyCart => CheckoutError::Redirect(CheckoutStep::Cart),
            CoreError::ProductNotFound(_) | CoreError::ProductUnavailable(_) => {
                CheckoutError::NotFound(err.to_string())
            }
            CoreError::InsufficientStock {
                ref product,
                available,
                ..
            } => CheckoutError::InsufficientStock(vec![format!(
                "Product \"{}\" only has {} unit(s) in stock.",
                product, available
            )]),
            CoreError::Validation(v) => CheckoutError::Validation(v),
            other => CheckoutError::Core(other),
        }
    }
}

pub type CheckoutResult<T> = Result<T, CheckoutError>;
