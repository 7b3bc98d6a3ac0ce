//! # comptoir-payments: Payment Processor Adapters
//!
//! A single [`PaymentGateway`] trait with one implementation per
//! [`PaymentMethod`](comptoir_core::PaymentMethod).
//!
//! ## Redirect Flows
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Hosted Payment Flows                              │
//! │                                                                         │
//! │  Stripe (redirect-and-poll)          PayPal (create-then-capture)       │
//! │  ──────────────────────────          ────────────────────────────       │
//! │  create_payment_session              create_payment_session             │
//! │    POST /v1/checkout/sessions          POST /v1/oauth2/token            │
//! │         │                              POST /v2/checkout/orders         │
//! │         ▼                                   │                           │
//! │  customer pays on stripe.com         customer approves on paypal.com    │
//! │         │                                   │                           │
//! │         ▼ ?session_id=cs_…                  ▼ ?token=<paypal order>     │
//! │  confirm_payment                     confirm_payment                    │
//! │    GET /v1/checkout/sessions/{id}      POST /v2/checkout/orders/{id}/   │
//! │    (read only, safe to repeat)              capture                     │
//! │                                        (repeat → ORDER_ALREADY_CAPTURED │
//! │                                         → GET order, still success)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Neither adapter retries. A failed call surfaces as [`GatewayError`] and
//! the caller leaves the order pending.

pub mod error;
pub mod gateway;
pub mod paypal;
pub mod stripe;

pub use error::{GatewayError, GatewayResult};
pub use gateway::{
    ConfirmationStatus, GatewayRegistry, LineItem, PaymentConfirmation, PaymentGateway,
    PaymentSession, PaymentSessionRequest,
};
pub use paypal::{PayPalConfig, PayPalGateway, PayPalMode};
pub use stripe::{StripeConfig, StripeGateway};
