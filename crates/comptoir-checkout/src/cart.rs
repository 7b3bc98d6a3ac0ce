//! # Cart Manager
//!
//! Session-backed shopping cart. The session only stores
//! `product_id → quantity`; prices, names and stock are read from the
//! catalog every time the cart is shown, so they are never stale.
//!
//! ## Lifecycle
//! ```text
//! add / update / remove / clear
//!        │
//!        ▼
//!  CartLines (session "cart" key, one UPSERT per operation)
//!        │
//!        ▼ get_cart_with_details
//!  CartDetails  ── lines whose product vanished are dropped and persisted
//! ```

use std::collections::HashMap;

use comptoir_core::validation::validate_quantity;
use comptoir_core::{CartDetails, CartLines, CoreError, Money};
use comptoir_db::Database;
use tracing::{debug, info};

use crate::error::{CheckoutError, CheckoutResult};
use crate::session::{SessionId, SessionStore};

#[derive(Debug, Clone)]
pub struct CartManager {
    db: Database,
    sessions: SessionStore,
}

impl CartManager {
    pub fn new(db: Database) -> Self {
        let sessions = SessionStore::new(db.clone());
        CartManager { db, sessions }
    }

    /// Adds `quantity` units of a product.
    ///
    /// ## Errors
    /// - `Validation` for a non-positive quantity
    /// - `NotFound` for an unknown or withdrawn product
    /// - `InsufficientStock` when the resulting line exceeds stock
    pub async fn add(
        &self,
        session: &SessionId,
        product_id: &str,
        quantity: i64,
    ) -> CheckoutResult<CartLines> {
        validate_quantity(quantity)?;

        let product = self
            .db
            .products()
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| CheckoutError::not_found("Product", product_id))?;

        if !product.is_active {
            return Err(CoreError::ProductUnavailable(product.name).into());
        }

        let mut cart = self.sessions.cart(session).await?;
        let requested = cart.quantity_of(product_id) + quantity;
        if !product.can_sell(requested) {
            return Err(CoreError::InsufficientStock {
                product: product.name,
                available: product.stock,
                requested,
            }
            .into());
        }

        let line_quantity = cart.add(product_id, quantity)?;
        self.sessions.save_cart(session, &cart).await?;

        debug!(session = %session, product_id = %product_id, quantity = line_quantity, "Cart line added");
        Ok(cart)
    }

    /// Sets the quantity of a line already in the cart.
    ///
    /// A quantity of zero or less removes the line. Updating a product that
    /// isn't in the cart changes nothing.
    pub async fn update_quantity(
        &self,
        session: &SessionId,
        product_id: &str,
        quantity: i64,
    ) -> CheckoutResult<CartLines> {
        let mut cart = self.sessions.cart(session).await?;

        if quantity <= 0 {
            if cart.remove(product_id) {
                self.sessions.save_cart(session, &cart).await?;
            }
            return Ok(cart);
        }

        if cart.quantity_of(product_id) == 0 {
            return Ok(cart);
        }

        if let Some(product) = self.db.products().get_by_id(product_id).await? {
            if product.stock < quantity {
                return Err(CoreError::InsufficientStock {
                    product: product.name,
                    available: product.stock,
                    requested: quantity,
                }
                .into());
            }
        }

        if cart.set_quantity(product_id, quantity)? {
            self.sessions.save_cart(session, &cart).await?;
        }
        Ok(cart)
    }

    pub async fn remove(&self, session: &SessionId, product_id: &str) -> CheckoutResult<CartLines> {
        let mut cart = self.sessions.cart(session).await?;
        if cart.remove(product_id) {
            self.sessions.save_cart(session, &cart).await?;
        }
        Ok(cart)
    }

    pub async fn clear(&self, session: &SessionId) -> CheckoutResult<()> {
        self.sessions.save_cart(session, &CartLines::new()).await
    }

    /// The raw lines, without touching the catalog.
    pub async fn get_cart(&self, session: &SessionId) -> CheckoutResult<CartLines> {
        self.sessions.cart(session).await
    }

    /// Resolves the cart against the catalog.
    ///
    /// Lines whose product was deleted or deactivated are left out, and the
    /// stored cart is rewritten without them.
    pub async fn get_cart_with_details(&self, session: &SessionId) -> CheckoutResult<CartDetails> {
        let mut cart = self.sessions.cart(session).await?;
        if cart.is_empty() {
            return Ok(CartDetails::default());
        }

        let ids: Vec<String> = cart.product_ids().map(str::to_string).collect();
        let mut products: HashMap<String, _> = self
            .db
            .products()
            .get_many(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        let (details, dropped) = CartDetails::resolve(&cart, |id| products.remove(id));

        if !dropped.is_empty() {
            cart.remove_all(dropped.iter().map(String::as_str));
            self.sessions.save_cart(session, &cart).await?;
            info!(session = %session, dropped = ?dropped, "Dropped unavailable products from cart");
        }

        Ok(details)
    }

    /// Σ price × quantity over sellable lines.
    pub async fn get_total(&self, session: &SessionId) -> CheckoutResult<Money> {
        Ok(self.get_cart_with_details(session).await?.total())
    }

    /// Σ quantities, for the header badge.
    pub async fn get_count(&self, session: &SessionId) -> CheckoutResult<i64> {
        Ok(self.get_cart_with_details(session).await?.count())
    }

    pub async fn is_empty(&self, session: &SessionId) -> CheckoutResult<bool> {
        Ok(self.sessions.cart(session).await?.is_empty())
    }

    /// One message per line whose quantity exceeds current stock.
    pub async fn validate_stock(&self, session: &SessionId) -> CheckoutResult<Vec<String>> {
        Ok(self.get_cart_with_details(session).await?.stock_issues())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seeded, TestShop};

    async fn setup() -> (TestShop, CartManager, SessionId) {
        let shop = seeded().await;
        let cart = CartManager::new(shop.db.clone());
        (shop, cart, SessionId::new())
    }

    #[tokio::test]
    async fn test_add_accumulates() {
        let (shop, cart, session) = setup().await;

        cart.add(&session, &shop.wine.id, 1).await.unwrap();
        let lines = cart.add(&session, &shop.wine.id, 2).await.unwrap();

        assert_eq!(lines.quantity_of(&shop.wine.id), 3);
        assert_eq!(cart.get_count(&session).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_add_rejects_bad_input() {
        let (shop, cart, session) = setup().await;

        assert!(matches!(
            cart.add(&session, &shop.wine.id, 0).await,
            Err(CheckoutError::Validation(_))
        ));
        assert!(matches!(
            cart.add(&session, "ghost", 1).await,
            Err(CheckoutError::NotFound(_))
        ));
        assert!(matches!(
            cart.add(&session, &shop.wine.id, shop.wine.stock + 1).await,
            Err(CheckoutError::InsufficientStock(_))
        ));

        shop.db.products().set_active(&shop.wine.id, false).await.unwrap();
        let err = cart.add(&session, &shop.wine.id, 1).await.unwrap_err();
        assert!(err.to_string().contains("no longer available"));

        assert!(cart.is_empty(&session).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_quantity() {
        let (shop, cart, session) = setup().await;
        cart.add(&session, &shop.wine.id, 2).await.unwrap();

        let lines = cart.update_quantity(&session, &shop.wine.id, 5).await.unwrap();
        assert_eq!(lines.quantity_of(&shop.wine.id), 5);

        // not in cart: no-op
        let lines = cart.update_quantity(&session, &shop.cheese.id, 3).await.unwrap();
        assert_eq!(lines.quantity_of(&shop.cheese.id), 0);

        // over stock: refused, cart unchanged
        assert!(cart
            .update_quantity(&session, &shop.wine.id, shop.wine.stock + 1)
            .await
            .is_err());
        assert_eq!(cart.get_cart(&session).await.unwrap().quantity_of(&shop.wine.id), 5);

        let lines = cart.update_quantity(&session, &shop.wine.id, 0).await.unwrap();
        assert!(lines.is_empty());
        assert!(cart.get_cart(&session).await.unwrap().lines().iter().all(|l| l.quantity > 0));
    }

    #[tokio::test]
    async fn test_total_and_clear() {
        let (shop, cart, session) = setup().await;
        cart.add(&session, &shop.wine.id, 2).await.unwrap();
        cart.add(&session, &shop.cheese.id, 1).await.unwrap();

        let expected = shop.wine.price().multiply_quantity(2) + shop.cheese.price();
        assert_eq!(cart.get_total(&session).await.unwrap(), expected);

        cart.remove(&session, &shop.cheese.id).await.unwrap();
        assert_eq!(cart.get_cart(&session).await.unwrap().len(), 1);

        cart.clear(&session).await.unwrap();
        assert!(cart.is_empty(&session).await.unwrap());
    }

    #[tokio::test]
    async fn test_details_drop_withdrawn_products() {
        let (shop, cart, session) = setup().await;
        cart.add(&session, &shop.wine.id, 1).await.unwrap();
        cart.add(&session, &shop.cheese.id, 1).await.unwrap();

        shop.db.products().set_active(&shop.cheese.id, false).await.unwrap();

        let details = cart.get_cart_with_details(&session).await.unwrap();
        assert_eq!(details.items.len(), 1);
        assert_eq!(details.items[0].product.id, shop.wine.id);

        // removal was persisted
        let lines = cart.get_cart(&session).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines.quantity_of(&shop.cheese.id), 0);
    }

    #[tokio::test]
    async fn test_validate_stock_names_product_and_stock() {
        let (shop, cart, session) = setup().await;
        cart.add(&session, &shop.cheese.id, 4).await.unwrap();
        cart.update_quantity(&session, &shop.cheese.id, 4).await.unwrap();

        // stock drops after the line was added
        shop.db.products().set_stock(&shop.cheese.id, 4).await.unwrap();
        assert!(cart.validate_stock(&session).await.unwrap().is_empty());

        shop.db.products().set_stock(&shop.cheese.id, 3).await.unwrap();
        let issues = cart.validate_stock(&session).await.unwrap();
        assert_eq!(
            issues,
            vec![format!("Product \"{}\" only has 3 unit(s) in stock.", shop.cheese.name)]
        );
    }

    #[tokio::test]
    async fn test_ten_requested_four_available() {
        let (shop, cart, session) = setup().await;
        shop.db.products().set_stock(&shop.cheese.id, 10).await.unwrap();
        cart.add(&session, &shop.cheese.id, 10).await.unwrap();
        shop.db.products().set_stock(&shop.cheese.id, 4).await.unwrap();

        let issues = cart.validate_stock(&session).await.unwrap();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains(&shop.cheese.name));
        assert!(issues[0].contains('4'));
    }
}
