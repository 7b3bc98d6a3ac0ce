//! # Gateway Errors

use comptoir_core::PaymentMethod;
use thiserror::Error;

/// Errors raised while talking to a payment processor.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request never got an HTTP answer (DNS, TLS, timeout).
    #[error("{provider} unreachable: {message}")]
    Transport { provider: &'static str, message: String },

    /// The processor answered with a non-success status.
    #[error("{provider} error ({status}): {message}")]
    Provider {
        provider: &'static str,
        status: u16,
        message: String,
    },

    /// The processor answered 2xx with a body we could not use.
    #[error("{provider} returned an unexpected response: {message}")]
    InvalidResponse { provider: &'static str, message: String },

    /// No gateway is registered for this method.
    #[error("Payment method {0} is not available")]
    NotConfigured(PaymentMethod),

    /// The HTTP client could not be built.
    #[error("Invalid gateway configuration: {0}")]
    Configuration(String),
}

impl GatewayError {
    pub(crate) fn transport(provider: &'static str, err: reqwest::Error) -> Self {
        GatewayError::Transport {
            provider,
            message: err.to_string(),
        }
    }

    pub(crate) fn invalid(provider: &'static str, message: impl Into<String>) -> Self {
        GatewayError::InvalidResponse {
            provider,
            message: message.into(),
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
