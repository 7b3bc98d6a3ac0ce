//! # Order Drafting
//!
//! Turns a priced cart, a carrier and an address into a pending order.
//!
//! ## Snapshot Pattern
//! ```text
//! CartItemDetail { product: {name, price}, quantity }
//!      │
//!      ▼  frozen
//! OrderItem { product_name, unit_price_cents, quantity, total_cents }
//!
//! Carrier { name, price }      ──► Order.carrier_name, Order.shipping_cents
//! Address { street, city, .. } ──► Order.shipping_address (AddressSnapshot)
//!                              ──► Order.billing_address  (same snapshot)
//! ```
//!
//! Nothing in an order points back at mutable catalog data for its amounts.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cart::CartDetails;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Address, Carrier, Order, OrderItem, OrderStatus, TaxRate};

/// Length of the random part of order and invoice numbers.
const NUMBER_SUFFIX_LEN: usize = 13;

// =============================================================================
// Business Numbers
// =============================================================================

fn random_suffix() -> String {
    Uuid::new_v4()
        .simple()
        .to_string()
        .to_uppercase()
        .chars()
        .take(NUMBER_SUFFIX_LEN)
        .collect()
}

/// Generates an order number: `CMD-` followed by 13 upper-case hex digits.
///
/// ## Example
/// ```rust
/// use comptoir_core::order::generate_order_number;
///
/// let number = generate_order_number();
/// assert!(number.starts_with("CMD-"));
/// assert_eq!(number.len(), 17);
/// ```
pub fn generate_order_number() -> String {
    format!("CMD-{}", random_suffix())
}

/// Generates an invoice number: `FAC-<year>-` followed by 13 upper-case hex digits.
pub fn generate_invoice_number(issued_at: DateTime<Utc>) -> String {
    format!("FAC-{}-{}", issued_at.year(), random_suffix())
}

// =============================================================================
// Order Totals
// =============================================================================

/// Amounts of an order, computed once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    /// Σ line totals.
    pub subtotal: Money,
    /// Carrier flat price.
    pub shipping: Money,
    /// Tax on the subtotal (zero with tax-inclusive catalog prices).
    pub tax: Money,
    /// subtotal + shipping + tax.
    pub total: Money,
}

impl OrderTotals {
    pub fn compute(subtotal: Money, shipping: Money, tax_rate: TaxRate) -> Self {
        let tax = subtotal.calculate_tax(tax_rate);
        OrderTotals {
            subtotal,
            shipping,
            tax,
            total: subtotal + shipping + tax,
        }
    }
}

// =============================================================================
// Order Draft
// =============================================================================

/// A pending order with its items, ready to be inserted in one transaction.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderDraft {
    /// Builds a pending order from the current cart and checkout selection.
    ///
    /// ## Errors
    /// - `CoreError::EmptyCart` when the cart has no sellable line
    pub fn build(
        user_id: &str,
        cart: &CartDetails,
        carrier: &Carrier,
        address: &Address,
        tax_rate: TaxRate,
        currency: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        if cart.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        let order_id = Uuid::new_v4().to_string();

        let items: Vec<OrderItem> = cart
            .items
            .iter()
            .map(|detail| OrderItem {
                id: Uuid::new_v4().to_string(),
                order_id: order_id.clone(),
                product_id: Some(detail.product.id.clone()),
                product_name: detail.product.name.clone(),
                unit_price_cents: detail.product.price_cents,
                quantity: detail.quantity,
                total_cents: detail.line_total.cents(),
            })
            .collect();

        let subtotal: Money = items.iter().map(|i| i.total()).sum();
        let totals = OrderTotals::compute(subtotal, carrier.price(), tax_rate);
        let snapshot = address.snapshot();

        let order = Order {
            id: order_id,
            order_number: generate_order_number(),
            user_id: user_id.to_string(),
            status: OrderStatus::Pending,
            subtotal_cents: totals.subtotal.cents(),
            shipping_cents: totals.shipping.cents(),
            tax_cents: totals.tax.cents(),
            total_cents: totals.total.cents(),
            currency: currency.to_string(),
            carrier_id: Some(carrier.id.clone()),
            carrier_name: carrier.name.clone(),
            billing_address: snapshot.clone(),
            shipping_address: snapshot,
            customer_note: None,
            provider_session_id: None,
            created_at: now,
            updated_at: now,
            paid_at: None,
            shipped_at: None,
            delivered_at: None,
        };

        Ok(OrderDraft { order, items })
    }

    /// Attaches a free-text note from the customer.
    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.order.customer_note = note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        self
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartItemDetail;
    use crate::types::Product;

    fn product(id: &str, price_cents: i64) -> Product {
        Product {
            id: id.to_string(),
            slug: id.to_string(),
            name: format!("Wine {}", id),
            description: None,
            price_cents,
            stock: 50,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn carrier() -> Carrier {
        Carrier {
            id: "car-colissimo".to_string(),
            name: "Colissimo".to_string(),
            description: None,
            price_cents: 690,
            delivery_time: Some("48h".to_string()),
            is_active: true,
            position: 1,
            created_at: Utc::now(),
        }
    }

    fn address() -> Address {
        Address {
            id: "addr-1".to_string(),
            user_id: "user-1".to_string(),
            full_name: "Camille Martin".to_string(),
            phone: None,
            street: "12 rue des Vignes".to_string(),
            street_complement: Some("Bât. B".to_string()),
            postal_code: "33000".to_string(),
            city: "Bordeaux".to_string(),
            country: "France".to_string(),
            is_default: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_total_is_items_plus_carrier() {
        let cart = CartDetails {
            items: vec![CartItemDetail::new(product("A", 1000), 2)],
        };

        let draft = OrderDraft::build(
            "user-1",
            &cart,
            &carrier(),
            &address(),
            TaxRate::zero(),
            "EUR",
            Utc::now(),
        )
        .unwrap();

        assert_eq!(draft.order.subtotal_cents, 2000);
        assert_eq!(draft.order.shipping_cents, 690);
        assert_eq!(draft.order.total_cents, 2690);
        assert_eq!(draft.order.total().to_string(), "€26.90");
        assert_eq!(draft.order.status, OrderStatus::Pending);
        assert_eq!(draft.order.carrier_name, "Colissimo");
    }

    #[test]
    fn test_items_are_snapshots() {
        let cart = CartDetails {
            items: vec![
                CartItemDetail::new(product("A", 1000), 2),
                CartItemDetail::new(product("B", 1550), 1),
            ],
        };

        let draft = OrderDraft::build(
            "user-1",
            &cart,
            &carrier(),
            &address(),
            TaxRate::zero(),
            "EUR",
            Utc::now(),
        )
        .unwrap();

        assert_eq!(draft.items.len(), 2);
        assert!(draft.items.iter().all(|i| i.order_id == draft.order.id));
        assert_eq!(draft.items[0].product_name, "Wine A");
        assert_eq!(draft.items[0].total_cents, 2000);
        assert_eq!(draft.items[1].unit_price_cents, 1550);
        assert_eq!(draft.order.billing_address, draft.order.shipping_address);
        assert_eq!(draft.order.shipping_address.city, "Bordeaux");
    }

    #[test]
    fn test_tax_is_added_on_subtotal() {
        let totals = OrderTotals::compute(
            Money::from_cents(2000),
            Money::from_cents(690),
            TaxRate::from_bps(2000),
        );
        assert_eq!(totals.tax.cents(), 400);
        assert_eq!(totals.total.cents(), 3090);
    }

    #[test]
    fn test_empty_cart_is_refused() {
        let err = OrderDraft::build(
            "user-1",
            &CartDetails::default(),
            &carrier(),
            &address(),
            TaxRate::zero(),
            "EUR",
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::EmptyCart));
    }

    #[test]
    fn test_business_number_formats() {
        let order_number = generate_order_number();
        assert!(order_number.starts_with("CMD-"));
        assert!(order_number[4..]
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));

        let issued = chrono::TimeZone::with_ymd_and_hms(&Utc, 2025, 12, 5, 10, 0, 0).unwrap();
        let invoice_number = generate_invoice_number(issued);
        assert!(invoice_number.starts_with("FAC-2025-"));
        assert_eq!(invoice_number.len(), "FAC-2025-".len() + 13);

        assert_ne!(generate_order_number(), generate_order_number());
    }

    #[test]
    fn test_blank_note_is_dropped() {
        let cart = CartDetails {
            items: vec![CartItemDetail::new(product("A", 1000), 1)],
        };
        let draft = OrderDraft::build(
            "user-1",
            &cart,
            &carrier(),
            &address(),
            TaxRate::zero(),
            "EUR",
            Utc::now(),
        )
        .unwrap();

        assert!(draft.clone().with_note(Some("   ".to_string())).order.customer_note.is_none());
        assert_eq!(
            draft.with_note(Some(" leave at door ".to_string())).order.customer_note.as_deref(),
            Some("leave at door")
        );
    }
}
