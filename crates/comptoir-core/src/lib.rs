//! # comptoir-core: Pure Business Logic for Comptoir
//!
//! This crate is the **heart** of the Comptoir storefront. It contains the
//! checkout rules as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Comptoir Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 apps/storefront (axum)                          │   │
//! │  │   /cart ──► /checkout/address ──► /carrier ──► /summary ──► pay │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          comptoir-checkout (CartManager, Orchestrator)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ comptoir-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌────────┐  │   │
//! │  │   │  types  │ │  money  │ │  cart   │ │ checkout │ │ order  │  │   │
//! │  │   │ Product │ │  Money  │ │CartLines│ │  State   │ │ Draft  │  │   │
//! │  │   │  Order  │ │ TaxRate │ │ Details │ │  Step    │ │ Totals │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └──────────┘ └────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 comptoir-db (Database Layer)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain entities (Product, Carrier, Address, Order, Payment, Invoice)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`cart`] - Raw cart lines and resolved cart details
//! - [`checkout`] - The checkout step state machine
//! - [`order`] - Order drafting, totals and business numbers
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use comptoir_core::money::Money;
//!
//! let wine = Money::from_cents(1000); // €10.00
//! let shipping = Money::from_cents(690); // €6.90
//!
//! let total = wine * 2i64 + shipping;
//! assert_eq!(total.to_string(), "€26.90");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod checkout;
pub mod error;
pub mod money;
pub mod order;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use comptoir_core::Money` instead of
// `use comptoir_core::money::Money`

pub use cart::{CartDetails, CartItemDetail, CartLine, CartLines};
pub use checkout::{CheckoutState, CheckoutStep};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use order::{OrderDraft, OrderTotals};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Currency used when the shop configuration does not name one.
pub const DEFAULT_CURRENCY: &str = "EUR";

/// Country stored on addresses that don't specify one.
pub const DEFAULT_COUNTRY: &str = "France";

/// Maximum distinct products allowed in a single cart
///
/// ## Business Reason
/// Prevents runaway carts and keeps payment line item lists reasonable
/// (processors cap the number of line items per session).
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single product in cart
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
pub const MAX_ITEM_QUANTITY: i64 = 999;
