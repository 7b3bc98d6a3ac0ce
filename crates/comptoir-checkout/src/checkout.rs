//! # Checkout Orchestrator
//!
//! Drives the three checkout steps and keeps the [`CheckoutState`] of a
//! visitor in the session under the `checkout` key.
//!
//! ## Steps
//! ```text
//!   cart ──► address ──► carrier ──► summary ──► payment
//!             │  ▲         │  ▲        │
//!             │  └─Redirect┘  └Redirect┘
//!             ▼
//!        new address (when the customer has none)
//! ```
//!
//! Every call re-checks its prerequisites against storage: the cart must
//! still have lines, the address must still belong to the customer, the
//! carrier must still be active. A missing prerequisite comes back as
//! [`CheckoutError::Redirect`] naming the step to go back to.

use comptoir_core::order::OrderTotals;
use comptoir_core::{Address, CartDetails, Carrier, CheckoutState, CheckoutStep, TaxRate};
use comptoir_db::Database;
use serde::Serialize;
use tracing::{debug, info};

use crate::cart::CartManager;
use crate::error::{CheckoutError, CheckoutResult};
use crate::session::{SessionId, SessionStore};
use crate::ShopSettings;

// =============================================================================
// Views
// =============================================================================

/// Data for the address step.
#[derive(Debug, Clone, Serialize)]
pub struct AddressPage {
    pub addresses: Vec<Address>,
    pub selected_address_id: Option<String>,
}

/// Data for the carrier step.
#[derive(Debug, Clone, Serialize)]
pub struct CarrierPage {
    pub carriers: Vec<Carrier>,
    pub address: Address,
    pub selected_carrier_id: Option<String>,
}

/// The last page before payment, with fresh prices and stock.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSummary {
    pub cart: CartDetails,
    pub address: Address,
    pub carrier: Carrier,
    pub totals: OrderTotals,
    pub currency: String,
}

// =============================================================================
// Orchestrator
// =============================================================================

#[derive(Debug, Clone)]
pub struct CheckoutOrchestrator {
    db: Database,
    sessions: SessionStore,
    cart: CartManager,
    tax_rate: TaxRate,
    currency: String,
}

impl CheckoutOrchestrator {
    pub fn new(db: Database, settings: &ShopSettings) -> Self {
        CheckoutOrchestrator {
            sessions: SessionStore::new(db.clone()),
            cart: CartManager::new(db.clone()),
            db,
            tax_rate: settings.tax_rate,
            currency: settings.currency.clone(),
        }
    }

    /// The stored state, `Empty` when the visitor hasn't started.
    pub async fn state(&self, session: &SessionId) -> CheckoutResult<CheckoutState> {
        self.sessions.checkout(session).await
    }

    async fn require_cart(&self, session: &SessionId) -> CheckoutResult<()> {
        if self.cart.is_empty(session).await? {
            return Err(CheckoutError::Redirect(CheckoutStep::Cart));
        }
        Ok(())
    }

    async fn active_carrier(&self, carrier_id: &str) -> CheckoutResult<Carrier> {
        self.db
            .carriers()
            .get_by_id(carrier_id)
            .await?
            .filter(|c| c.is_active)
            .ok_or_else(|| CheckoutError::not_found("Carrier", carrier_id))
    }

    /// Step 1 view: the customer's addresses.
    pub async fn address_page(
        &self,
        session: &SessionId,
        user_id: &str,
    ) -> CheckoutResult<AddressPage> {
        self.require_cart(session).await?;

        let addresses = self.db.addresses().list_by_user(user_id).await?;
        if addresses.is_empty() {
            return Err(CheckoutError::Redirect(CheckoutStep::NewAddress));
        }

        let state = self.sessions.checkout(session).await?;
        Ok(AddressPage {
            addresses,
            selected_address_id: state.address_id().map(str::to_string),
        })
    }

    /// Step 1: records the shipping address.
    ///
    /// A carrier chosen earlier is kept; the summary has to be shown again.
    pub async fn select_address(
        &self,
        session: &SessionId,
        user_id: &str,
        address_id: &str,
    ) -> CheckoutResult<CheckoutState> {
        self.require_cart(session).await?;

        let address = self
            .db
            .addresses()
            .get_for_user(address_id, user_id)
            .await?
            .ok_or_else(|| CheckoutError::not_found("Address", address_id))?;

        let state = self.sessions.checkout(session).await?.with_address(address.id);
        self.sessions.save_checkout(session, &state).await?;

        debug!(session = %session, address_id = %address_id, "Address selected");
        Ok(state)
    }

    /// Step 2 view: active carriers and the chosen address.
    pub async fn carrier_page(
        &self,
        session: &SessionId,
        user_id: &str,
    ) -> CheckoutResult<CarrierPage> {
        self.require_cart(session).await?;

        let state = self.sessions.checkout(session).await?;
        let address_id = state
            .address_id()
            .ok_or(CheckoutError::Redirect(CheckoutStep::Address))?;

        let address = match self.db.addresses().get_for_user(address_id, user_id).await? {
            Some(address) => address,
            None => {
                self.sessions.save_checkout(session, &CheckoutState::Empty).await?;
                return Err(CheckoutError::Redirect(CheckoutStep::Address));
            }
        };

        Ok(CarrierPage {
            carriers: self.db.carriers().list_active().await?,
            address,
            selected_carrier_id: state.carrier_id().map(str::to_string),
        })
    }

    /// Step 2: records the carrier. Needs an address first.
    pub async fn select_carrier(
        &self,
        session: &SessionId,
        carrier_id: &str,
    ) -> CheckoutResult<CheckoutState> {
        self.require_cart(session).await?;

        let state = self.sessions.checkout(session).await?;
        if state.address_id().is_none() {
            return Err(CheckoutError::Redirect(CheckoutStep::Address));
        }

        let carrier = self.active_carrier(carrier_id).await?;
        let state = state.with_carrier(carrier.id)?;
        self.sessions.save_checkout(session, &state).await?;

        debug!(session = %session, carrier_id = %carrier_id, "Carrier selected");
        Ok(state)
    }

    /// Step 3: prices the order and marks the checkout ready for payment.
    ///
    /// ## Errors
    /// - `Redirect(Cart)` when the cart is empty
    /// - `Redirect(Address | Carrier)` when a selection is missing or has
    ///   gone stale (the stale part is forgotten)
    /// - `InsufficientStock` with one message per short line
    pub async fn summary(
        &self,
        session: &SessionId,
        user_id: &str,
    ) -> CheckoutResult<CheckoutSummary> {
        let cart = self.cart.get_cart_with_details(session).await?;
        if cart.is_empty() {
            return Err(CheckoutError::Redirect(CheckoutStep::Cart));
        }

        let state = self.sessions.checkout(session).await?;
        let (address_id, carrier_id) = state.selection()?;

        let Some(address) = self.db.addresses().get_for_user(address_id, user_id).await? else {
            self.sessions.save_checkout(session, &CheckoutState::Empty).await?;
            return Err(CheckoutError::Redirect(CheckoutStep::Address));
        };

        let carrier = match self.active_carrier(carrier_id).await {
            Ok(carrier) => carrier,
            Err(CheckoutError::NotFound(_)) => {
                let state = CheckoutState::Empty.with_address(address.id);
                self.sessions.save_checkout(session, &state).await?;
                return Err(CheckoutError::Redirect(CheckoutStep::Carrier));
            }
            Err(e) => return Err(e),
        };

        let issues = cart.stock_issues();
        if !issues.is_empty() {
            return Err(CheckoutError::InsufficientStock(issues));
        }

        let totals = OrderTotals::compute(cart.total(), carrier.price(), self.tax_rate);

        let state = state.clone().mark_ready()?;
        self.sessions.save_checkout(session, &state).await?;

        info!(session = %session, total = %totals.total, "Checkout ready for payment");
        Ok(CheckoutSummary {
            cart,
            address,
            carrier,
            totals,
            currency: self.currency.clone(),
        })
    }

    /// True iff both an address and a carrier are selected.
    pub async fn is_complete(&self, session: &SessionId) -> CheckoutResult<bool> {
        Ok(self.sessions.checkout(session).await?.is_complete())
    }

    /// Forgets both selections.
    pub async fn clear(&self, session: &SessionId) -> CheckoutResult<()> {
        self.sessions.save_checkout(session, &CheckoutState::Empty).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
