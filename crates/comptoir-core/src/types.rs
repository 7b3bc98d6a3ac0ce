//! # Domain Types
//!
//! Core domain types used throughout Comptoir.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Carrier      │   │    Address      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  slug           │   │  price_cents    │   │  user_id (FK)   │       │
//! │  │  price_cents    │   │  position       │   │  street, city   │       │
//! │  │  stock          │   │  is_active      │   │  snapshot() ──┐ │       │
//! │  └─────────────────┘   └─────────────────┘   └───────────────┼─┘       │
//! │                                                              ▼         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Order       │──►│   OrderItem     │   │ AddressSnapshot │       │
//! │  │  order_number   │   │  product_name   │   │  (embedded in   │       │
//! │  │  status         │   │  unit_price     │   │   Order twice)  │       │
//! │  │  total_cents    │   │  quantity       │   └─────────────────┘       │
//! │  └───────┬─────────┘   └─────────────────┘                              │
//! │          │                                                              │
//! │          ├──► Payment  (0..1, created on confirmed capture)             │
//! │          └──► Invoice  (0..1, issued with the payment)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists: `slug`, `order_number`, `invoice_number`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 2000 bps = 20% (French standard VAT).
/// Catalog prices are tax inclusive, so the shop default is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// URL slug - business identifier.
    pub slug: String,

    /// Display name shown in the cart and frozen onto order items.
    pub name: String,

    pub description: Option<String>,

    /// Price in cents, tax inclusive.
    pub price_cents: i64,

    /// Units on hand. Never negative.
    pub stock: i64,

    /// Whether the product is sellable (soft delete).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Creates an active product with a fresh id.
    pub fn new(slug: impl Into<String>, name: impl Into<String>, price_cents: i64, stock: i64) -> Self {
        let now = Utc::now();
        Product {
            id: uuid::Uuid::new_v4().to_string(),
            slug: slug.into(),
            name: name.into(),
            description: None,
            price_cents,
            stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks if `quantity` units can be sold right now.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.is_active && self.stock >= quantity
    }
}

// =============================================================================
// Carrier
// =============================================================================

/// A shipping option with a flat price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Carrier {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Flat shipping price in cents.
    pub price_cents: i64,
    /// Human readable estimate, e.g. "48h".
    pub delivery_time: Option<String>,
    pub is_active: bool,
    /// Sort key for the carrier step (ascending, ties broken by name).
    pub position: i64,
    pub created_at: DateTime<Utc>,
}

impl Carrier {
    /// Creates an active carrier with a fresh id.
    pub fn new(name: impl Into<String>, price_cents: i64, position: i64) -> Self {
        Carrier {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            description: None,
            price_cents,
            delivery_time: None,
            is_active: true,
            position,
            created_at: Utc::now(),
        }
    }

    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Address
// =============================================================================

/// A postal address owned by one customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Address {
    pub id: String,
    pub user_id: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub street: String,
    pub street_complement: Option<String>,
    pub postal_code: String,
    pub city: String,
    pub country: String,
    /// Preselected at checkout. At most one per customer.
    #[serde(default)]
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl Address {
    /// Freezes the address for an order.
    ///
    /// Later edits or deletion of the address never touch orders that
    /// already carry a snapshot.
    pub fn snapshot(&self) -> AddressSnapshot {
        AddressSnapshot {
            full_name: self.full_name.clone(),
            phone: self.phone.clone(),
            street: self.street.clone(),
            street_complement: self.street_complement.clone(),
            postal_code: self.postal_code.clone(),
            city: self.city.clone(),
            country: self.country.clone(),
        }
    }
}

/// Immutable copy of an address, embedded in an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSnapshot {
    pub full_name: String,
    pub phone: Option<String>,
    pub street: String,
    pub street_complement: Option<String>,
    pub postal_code: String,
    pub city: String,
    pub country: String,
}

impl AddressSnapshot {
    /// Single-line rendering for logs and processor metadata.
    pub fn one_line(&self) -> String {
        let mut parts = vec![self.street.clone()];
        if let Some(complement) = self.street_complement.as_deref().filter(|c| !c.is_empty()) {
            parts.push(complement.to_string());
        }
        parts.push(format!("{} {}", self.postal_code, self.city));
        parts.push(self.country.clone());
        parts.join(", ")
    }
}

// =============================================================================
// User
// =============================================================================

/// A registered customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,
    pub email: String,
    /// Argon2 PHC string. Never serialized.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Order Status
// =============================================================================

/// The lifecycle status of an order.
///
/// ## State Machine
/// ```text
///            ┌──────────► CANCELLED
///            │ (customer)
///  PENDING ──┤
///            │ (fulfillment, exactly once)
///            └──► PAID ──► PROCESSING ──► SHIPPED ──► DELIVERED
///                   │           │
///                   └─────┬─────┘
///                         ▼
///                      REFUNDED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, waiting for payment confirmation.
    Pending,
    /// Payment confirmed, stock decremented.
    Paid,
    /// Being prepared.
    Processing,
    /// Handed to the carrier.
    Shipped,
    /// Received by the customer.
    Delivered,
    /// Abandoned before payment.
    Cancelled,
    /// Money returned after payment.
    Refunded,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Paid,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// Whether an order in this status may move to `next`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Paid)
                | (Pending, Cancelled)
                | (Paid, Processing)
                | (Paid, Refunded)
                | (Processing, Shipped)
                | (Processing, Refunded)
                | (Shipped, Delivered)
        )
    }

    /// Terminal statuses accept no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Refunded
        )
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_lowercase();
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: OrderStatus::ALL.iter().map(|s| s.as_str().to_string()).collect(),
            })
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// The external processor used to pay an order.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Hosted card checkout, confirmed by polling the session.
    Stripe,
    /// Approval redirect, confirmed by capturing the order.
    Paypal,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Stripe => "stripe",
            PaymentMethod::Paypal => "paypal",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stripe" | "card" => Ok(PaymentMethod::Stripe),
            "paypal" => Ok(PaymentMethod::Paypal),
            _ => Err(ValidationError::NotAllowed {
                field: "payment method".to_string(),
                allowed: vec!["stripe".to_string(), "paypal".to_string()],
            }),
        }
    }
}

// =============================================================================
// Payment Status
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

// =============================================================================
// Order
// =============================================================================

/// A customer order.
///
/// Totals are computed once at creation and never recomputed, even if
/// product or carrier prices change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    /// Human-facing number, `CMD-XXXXXXXXXXXXX`. Unique and immutable.
    pub order_number: String,
    pub user_id: String,
    pub status: OrderStatus,
    pub subtotal_cents: i64,
    pub shipping_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub currency: String,
    /// Carrier reference. Cleared if the carrier is later deleted.
    pub carrier_id: Option<String>,
    /// Carrier name at time of order (frozen).
    pub carrier_name: String,
    pub shipping_address: AddressSnapshot,
    pub billing_address: AddressSnapshot,
    pub customer_note: Option<String>,
    /// Checkout session or PayPal order opened for this order. Only that
    /// reference may confirm its payment.
    pub provider_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn shipping(&self) -> Money {
        Money::from_cents(self.shipping_cents)
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    /// Checks ownership before showing or mutating an order for a customer.
    #[inline]
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

// =============================================================================
// Order Item
// =============================================================================

/// A line of an order.
/// Uses snapshot pattern to freeze product data at time of order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    /// Catalog reference. Cleared if the product is later deleted.
    pub product_id: Option<String>,
    /// Product name at time of order (frozen).
    pub product_name: String,
    /// Unit price in cents at time of order (frozen).
    pub unit_price_cents: i64,
    pub quantity: i64,
    /// unit_price × quantity, stored.
    pub total_cents: i64,
}

impl OrderItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Payment
// =============================================================================

/// A confirmed payment. At most one per order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: String,
    pub order_id: String,
    pub method: PaymentMethod,
    /// Processor side reference (payment intent id, capture id).
    pub transaction_id: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// Invoice issued when an order is paid. At most one per order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Invoice {
    pub id: String,
    pub order_id: String,
    /// `FAC-YYYY-XXXXXXXXXXXXX`. Unique.
    pub invoice_number: String,
    pub invoice_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Order Details
// =============================================================================

/// An order together with everything hanging off it, as shown to the customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payment: Option<Payment>,
    pub invoice: Option<Invoice>,
}

// =============================================================================
// Unit Tests
// =============================================================================
