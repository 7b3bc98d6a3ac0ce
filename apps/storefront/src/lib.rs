//! # Comptoir Storefront
//!
//! HTTP surface of the shop.
//!
//! ## Routes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Catalog       GET  /products            GET  /products/{slug}         │
//! │                                                                         │
//! │  Cart          GET  /cart                POST /cart/add/{id}           │
//! │                POST /cart/update/{id}    POST /cart/remove/{id}        │
//! │                POST /cart/clear                                        │
//! │                                                                         │
//! │  Checkout      GET  /checkout/address    POST /checkout/address/{id}   │
//! │  (login)       GET  /checkout/carrier    POST /checkout/carrier/{id}   │
//! │                GET  /checkout/summary    POST /checkout/pay/{method}   │
//! │                                                                         │
//! │  Processor     GET  /checkout/success/{order_id}?session_id=…  stripe  │
//! │  returns       GET  /checkout/paypal/success/{order_id}?token=… paypal │
//! │                GET  /checkout/cancel/{order_id}                        │
//! │                                                                         │
//! │  Account       POST /account/register    POST /account/login           │
//! │                POST /account/logout      GET|PUT /account/profile      │
//! │                POST /account/password    GET|POST /account/addresses   │
//! │                PUT|DELETE /account/addresses/{id}                      │
//! │                POST /account/addresses/{id}/default                    │
//! │                GET  /account/orders      GET  /account/orders/{id}     │
//! │                                                                         │
//! │                GET  /health                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod routes;
pub mod session;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use comptoir_checkout::Services;
use comptoir_db::Database;
use comptoir_payments::{GatewayRegistry, GatewayResult, PayPalGateway, StripeGateway};
use tracing::{info, warn};

use crate::config::StorefrontConfig;

/// Shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub services: Services,
}

impl AppState {
    pub fn new(db: Database, services: Services) -> Self {
        AppState { db, services }
    }
}

/// One gateway per configured processor section.
pub fn build_gateways(config: &StorefrontConfig) -> GatewayResult<GatewayRegistry> {
    let mut registry = GatewayRegistry::new();

    if let Some(stripe) = &config.stripe {
        registry.register(Arc::new(StripeGateway::new(stripe.gateway_config())?));
        info!("Stripe payments enabled");
    }
    if let Some(paypal) = &config.paypal {
        registry.register(Arc::new(PayPalGateway::new(paypal.gateway_config())?));
        info!(mode = ?paypal.mode, "PayPal payments enabled");
    }
    if registry.methods().is_empty() {
        warn!("No payment processor configured, checkout cannot be paid");
    }

    Ok(registry)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        // catalog
        .route("/products", get(routes::catalog::list))
        .route("/products/{slug}", get(routes::catalog::show))
        // cart
        .route("/cart", get(routes::cart::show))
        .route("/cart/add/{id}", post(routes::cart::add))
        .route("/cart/update/{id}", post(routes::cart::update))
        .route("/cart/remove/{id}", post(routes::cart::remove))
        .route("/cart/clear", post(routes::cart::clear))
        // checkout steps
        .route("/checkout/address", get(routes::checkout::address_page))
        .route("/checkout/address/{id}", post(routes::checkout::select_address))
        .route("/checkout/carrier", get(routes::checkout::carrier_page))
        .route("/checkout/carrier/{id}", post(routes::checkout::select_carrier))
        .route("/checkout/summary", get(routes::checkout::summary))
        // payment
        .route("/checkout/pay/{method}", post(routes::payment::pay))
        .route("/checkout/success/{order_id}", get(routes::payment::stripe_success))
        .route(
            "/checkout/paypal/success/{order_id}",
            get(routes::payment::paypal_success),
        )
        .route("/checkout/cancel/{order_id}", get(routes::payment::cancel))
        // account
        .route("/account/register", post(routes::account::register))
        .route("/account/login", post(routes::account::login))
        .route("/account/logout", post(routes::account::logout))
        .route(
            "/account/profile",
            get(routes::account::profile).put(routes::account::update_profile),
        )
        .route("/account/password", post(routes::account::change_password))
        .route(
            "/account/addresses",
            get(routes::account::list_addresses).post(routes::account::add_address),
        )
        .route(
            "/account/addresses/{id}",
            put(routes::account::update_address)
                .delete(routes::account::delete_address),
        )
        .route(
            "/account/addresses/{id}/default",
            post(routes::account::set_default_address),
        )
        .route("/account/orders", get(routes::account::list_orders))
        .route("/account/orders/{id}", get(routes::account::show_order))
        .layer(middleware::from_fn(session::session_layer))
        .with_state(state)
}
