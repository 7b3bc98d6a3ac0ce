//! # comptoir-checkout: Cart, Checkout and Fulfillment Services
//!
//! The operations the storefront exposes, each scoped to an explicit
//! [`SessionId`].
//!
//! ## Service Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         comptoir-checkout                               │
//! │                                                                         │
//! │  CartManager ──────────► CheckoutOrchestrator ──────► PaymentFlow       │
//! │  add / update / remove   address → carrier →          start / complete  │
//! │  details / stock check   summary                      / cancel          │
//! │                                                           │             │
//! │  Catalog                                                  │             │
//! │  active products by name / by slug                        ▼             │
//! │  AccountService                                  FulfillmentFinalizer   │
//! │  login / profile / addresses / history           paid exactly once      │
//! │                                                                         │
//! │  ─────────────────────────── SessionStore ──────────────────────────── │
//! │            "cart" · "checkout" · "user" keys per SessionId              │
//! └─────────────────────────────────────────────────────────────────────────┘
//!          │                        │                         │
//!          ▼                        ▼                         ▼
//!    comptoir-core            comptoir-db              comptoir-payments
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! let services = Services::new(db, gateways, ShopSettings::default());
//! let session = SessionId::new();
//!
//! services.cart.add(&session, &product_id, 2).await?;
//! services.checkout.select_address(&session, &user.id, &address_id).await?;
//! services.checkout.select_carrier(&session, &carrier_id).await?;
//! let start = services.payments.start(&session, &user.id, PaymentMethod::Stripe, None).await?;
//! // redirect to start.redirect_url
//! ```

pub mod account;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod error;
pub mod fulfillment;
pub mod payment;
pub mod session;

#[cfg(test)]
mod testing;

pub use account::{AccountService, NewAddress, PasswordChange, ProfileUpdate, Registration};
pub use cart::CartManager;
pub use catalog::{Catalog, CatalogPage};
pub use checkout::{AddressPage, CarrierPage, CheckoutOrchestrator, CheckoutSummary};
pub use error::{CheckoutError, CheckoutResult};
pub use fulfillment::FulfillmentFinalizer;
pub use payment::{PaymentFlow, PaymentOutcome, PaymentStart};
pub use session::{SessionId, SessionStore};

use comptoir_core::{TaxRate, DEFAULT_CURRENCY};
use comptoir_db::Database;
use comptoir_payments::GatewayRegistry;

/// Shop-wide settings the services need.
#[derive(Debug, Clone)]
pub struct ShopSettings {
    /// ISO 4217 code orders are priced in.
    pub currency: String,
    /// Added on top of the subtotal. Zero for tax-inclusive catalogs.
    pub tax_rate: TaxRate,
    /// Absolute URL the processors send customers back to.
    pub public_url: String,
}

impl Default for ShopSettings {
    fn default() -> Self {
        ShopSettings {
            currency: DEFAULT_CURRENCY.to_string(),
            tax_rate: TaxRate::zero(),
            public_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Every service over one database.
#[derive(Debug, Clone)]
pub struct Services {
    pub catalog: Catalog,
    pub cart: CartManager,
    pub checkout: CheckoutOrchestrator,
    pub payments: PaymentFlow,
    pub fulfillment: FulfillmentFinalizer,
    pub accounts: AccountService,
}

impl Services {
    pub fn new(db: Database, gateways: GatewayRegistry, settings: ShopSettings) -> Self {
        Services {
            catalog: Catalog::new(db.clone()),
            cart: CartManager::new(db.clone()),
            checkout: CheckoutOrchestrator::new(db.clone(), &settings),
            fulfillment: FulfillmentFinalizer::new(db.clone()),
            accounts: AccountService::new(db.clone()),
            payments: PaymentFlow::new(db, gateways, settings),
        }
    }
}
