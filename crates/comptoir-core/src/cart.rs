//! # Cart
//!
//! The raw cart held in a visitor session, and its resolution against the
//! catalog.
//!
//! ## Two Views of a Cart
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CartLines (stored under the "cart" session key)                        │
//! │  ──────────────────────────────────────────────                         │
//! │  [ { product_id: "p-1", quantity: 2 },                                  │
//! │    { product_id: "p-7", quantity: 1 } ]                                 │
//! │         │                                                               │
//! │         │  resolve against catalog (drop missing / inactive)            │
//! │         ▼                                                               │
//! │  CartDetails (never stored)                                             │
//! │  ───────────────────────────                                            │
//! │  [ { product: Product{..}, quantity: 2, line_total: €20.00 },           │
//! │    ... ]                                                                │
//! │  total = Σ price × qty     count = Σ qty                                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Prices are never stored in the session. Every read prices the cart at the
//! current catalog price.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::Product;
use crate::validation::validate_quantity;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Cart Lines
// =============================================================================

/// One product in the cart with its requested quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub quantity: i64,
}

/// The raw cart: product id to quantity, in insertion order.
///
/// ## Invariants
/// - Lines are unique by `product_id` (adding the same product increases quantity)
/// - Quantity is always > 0 (setting a quantity ≤ 0 removes the line)
/// - At most `MAX_CART_ITEMS` lines, each at most `MAX_ITEM_QUANTITY`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartLines {
    lines: Vec<CartLine>,
}

impl CartLines {
    /// Creates an empty cart.
    pub fn new() -> Self {
        CartLines { lines: Vec::new() }
    }

    /// Adds `quantity` units of a product, creating the line if absent.
    ///
    /// ## Returns
    /// The line's quantity after the add.
    pub fn add(&mut self, product_id: &str, quantity: i64) -> CoreResult<i64> {
        validate_quantity(quantity)?;

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            let new_qty = line.quantity + quantity;
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: new_qty,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            line.quantity = new_qty;
            return Ok(new_qty);
        }

        if self.lines.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        self.lines.push(CartLine {
            product_id: product_id.to_string(),
            quantity,
        });
        Ok(quantity)
    }

    /// Sets the quantity of a line.
    ///
    /// ## Behavior
    /// - quantity ≤ 0: removes the line
    /// - product not in cart: no-op
    ///
    /// ## Returns
    /// `true` if the cart changed.
    pub fn set_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<bool> {
        if quantity <= 0 {
            return Ok(self.remove(product_id));
        }

        if quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }

        match self.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => {
                let changed = line.quantity != quantity;
                line.quantity = quantity;
                Ok(changed)
            }
            None => Ok(false),
        }
    }

    /// Removes a line. Returns `true` if it was present.
    pub fn remove(&mut self, product_id: &str) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        self.lines.len() != before
    }

    /// Removes every line whose product id is in `product_ids`.
    pub fn remove_all<'a>(&mut self, product_ids: impl IntoIterator<Item = &'a str>) -> usize {
        let doomed: Vec<&str> = product_ids.into_iter().collect();
        let before = self.lines.len();
        self.lines.retain(|l| !doomed.contains(&l.product_id.as_str()));
        before - self.lines.len()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Quantity of a product, 0 if absent.
    pub fn quantity_of(&self, product_id: &str) -> i64 {
        self.lines
            .iter()
            .find(|l| l.product_id == product_id)
            .map(|l| l.quantity)
            .unwrap_or(0)
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn product_ids(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|l| l.product_id.as_str())
    }

    /// Number of distinct products.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of all quantities (the header badge count).
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

// =============================================================================
// Cart Details
// =============================================================================

/// A cart line resolved against the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItemDetail {
    pub product: Product,
    pub quantity: i64,
    pub line_total: Money,
}

impl CartItemDetail {
    pub fn new(product: Product, quantity: i64) -> Self {
        let line_total = product.price().multiply_quantity(quantity);
        CartItemDetail {
            product,
            quantity,
            line_total,
        }
    }

    /// Stock message for this line, if the quantity exceeds what's on hand.
    ///
    /// ## Format
    /// `Product "<name>" only has <stock> unit(s) in stock.`
    pub fn stock_issue(&self) -> Option<String> {
        if self.quantity > self.product.stock {
            Some(format!(
                "Product \"{}\" only has {} unit(s) in stock.",
                self.product.name, self.product.stock
            ))
        } else {
            None
        }
    }
}

/// The priced cart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartDetails {
    pub items: Vec<CartItemDetail>,
}

impl CartDetails {
    /// Resolves raw lines against loaded products.
    ///
    /// `lookup` returns the product for an id, or `None` when it is missing.
    /// Lines whose product is missing or inactive are left out and their ids
    /// returned in the second tuple element so the caller can drop them from
    /// the stored cart.
    pub fn resolve<F>(lines: &CartLines, mut lookup: F) -> (CartDetails, Vec<String>)
    where
        F: FnMut(&str) -> Option<Product>,
    {
        let mut items = Vec::with_capacity(lines.len());
        let mut dropped = Vec::new();

        for line in lines.lines() {
            match lookup(&line.product_id) {
                Some(product) if product.is_active => {
                    items.push(CartItemDetail::new(product, line.quantity));
                }
                _ => dropped.push(line.product_id.clone()),
            }
        }

        (CartDetails { items }, dropped)
    }

    /// Σ price × quantity.
    pub fn total(&self) -> Money {
        self.items.iter().map(|i| i.line_total).sum()
    }

    /// Σ quantity.
    pub fn count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// One message per line whose quantity exceeds current stock.
    pub fn stock_issues(&self) -> Vec<String> {
        self.items.iter().filter_map(|i| i.stock_issue()).collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_product(id: &str, price_cents: i64, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            slug: format!("product-{}", id),
            name: format!("Product {}", id),
            description: None,
            price_cents,
            stock,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_add_increments_existing_line() {
        let mut cart = CartLines::new();

        assert_eq!(cart.add("A", 2).unwrap(), 2);
        assert_eq!(cart.add("A", 3).unwrap(), 5);

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity_of("A"), 5);
    }

    #[test]
    fn test_add_rejects_non_positive_quantity() {
        let mut cart = CartLines::new();
        assert!(cart.add("A", 0).is_err());
        assert!(cart.add("A", -2).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_caps_quantity() {
        let mut cart = CartLines::new();
        cart.add("A", MAX_ITEM_QUANTITY).unwrap();

        let err = cart.add("A", 1).unwrap_err();
        assert!(matches!(err, CoreError::QuantityTooLarge { .. }));
        assert_eq!(cart.quantity_of("A"), MAX_ITEM_QUANTITY);
    }

    #[test]
    fn test_add_caps_distinct_products() {
        let mut cart = CartLines::new();
        for i in 0..MAX_CART_ITEMS {
            cart.add(&format!("p-{}", i), 1).unwrap();
        }

        let err = cart.add("one-too-many", 1).unwrap_err();
        assert!(matches!(err, CoreError::CartTooLarge { .. }));
        // Existing lines can still grow
        assert!(cart.add("p-0", 1).is_ok());
    }

    #[test]
    fn test_set_quantity_zero_or_negative_removes() {
        let mut cart = CartLines::new();
        cart.add("A", 2).unwrap();
        cart.add("B", 1).unwrap();

        assert!(cart.set_quantity("A", 0).unwrap());
        assert!(cart.set_quantity("B", -4).unwrap());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_on_missing_line_is_noop() {
        let mut cart = CartLines::new();
        cart.add("A", 2).unwrap();

        assert!(!cart.set_quantity("Z", 3).unwrap());
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity_of("Z"), 0);
    }

    #[test]
    fn test_no_line_ever_below_one() {
        let mut cart = CartLines::new();
        cart.add("A", 3).unwrap();
        cart.set_quantity("A", 1).unwrap();
        cart.add("B", 2).unwrap();
        cart.set_quantity("B", 0).unwrap();
        cart.remove("C");

        assert!(cart.lines().iter().all(|l| l.quantity > 0));
    }

    #[test]
    fn test_session_json_shape() {
        let mut cart = CartLines::new();
        cart.add("A", 2).unwrap();

        let json = serde_json::to_string(&cart).unwrap();
        assert_eq!(json, r#"[{"product_id":"A","quantity":2}]"#);

        let back: CartLines = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cart);
    }

    #[test]
    fn test_resolve_drops_missing_and_inactive() {
        let mut cart = CartLines::new();
        cart.add("A", 2).unwrap();
        cart.add("gone", 1).unwrap();
        cart.add("off", 1).unwrap();

        let (details, dropped) = CartDetails::resolve(&cart, |id| match id {
            "A" => Some(test_product("A", 1000, 10)),
            "off" => {
                let mut p = test_product("off", 500, 10);
                p.is_active = false;
                Some(p)
            }
            _ => None,
        });

        assert_eq!(details.items.len(), 1);
        assert_eq!(dropped, vec!["gone".to_string(), "off".to_string()]);
        assert_eq!(details.total().cents(), 2000);
        assert_eq!(details.count(), 2);
    }

    #[test]
    fn test_stock_issue_message() {
        let detail = CartItemDetail::new(
            Product {
                name: "B".to_string(),
                ..test_product("B", 1000, 4)
            },
            10,
        );

        assert_eq!(
            detail.stock_issue().as_deref(),
            Some("Product \"B\" only has 4 unit(s) in stock.")
        );

        let fine = CartItemDetail::new(test_product("C", 1000, 4), 4);
        assert!(fine.stock_issue().is_none());
    }
}
