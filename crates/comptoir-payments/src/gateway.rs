//! # Payment Gateway Trait
//!
//! The seam between checkout and the processors. Checkout builds a
//! [`PaymentSessionRequest`], picks a gateway from the [`GatewayRegistry`]
//! by [`PaymentMethod`], redirects the customer, and later asks the same
//! gateway to confirm.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use comptoir_core::{Money, PaymentMethod};
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, GatewayResult};

// =============================================================================
// Request / Response Types
// =============================================================================

/// One line shown on the processor's hosted page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub description: Option<String>,
    pub unit_amount: Money,
    pub quantity: i64,
}

impl LineItem {
    pub fn total(&self) -> Money {
        self.unit_amount.multiply_quantity(self.quantity)
    }
}

/// Everything a processor needs to open a hosted payment page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSessionRequest {
    /// Our order id, echoed back to us as processor metadata.
    pub order_id: String,
    pub line_items: Vec<LineItem>,
    /// Amount to charge. Equals the order total.
    pub amount: Money,
    /// ISO 4217, upper case.
    pub currency: String,
    /// Where the processor sends the customer after paying.
    pub return_url: String,
    /// Where the processor sends the customer after giving up.
    pub cancel_url: String,
    pub customer_email: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl PaymentSessionRequest {
    /// Σ line totals. Equals `amount` when every charge is listed as a line.
    pub fn items_total(&self) -> Money {
        self.line_items.iter().map(LineItem::total).sum()
    }
}

/// A hosted payment page, ready for redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSession {
    pub redirect_url: String,
    /// Stripe checkout session id or PayPal order id.
    pub provider_session_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationStatus {
    /// Money captured.
    Paid,
    /// Not paid yet (customer still on the page, async method, review).
    Pending,
    /// The processor reports a definitive failure.
    Failed,
}

/// What the processor says about a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub status: ConfirmationStatus,
    /// Payment intent id or PayPal capture id, when known.
    pub provider_transaction_id: Option<String>,
    pub confirmed_amount: Option<Money>,
    pub currency: Option<String>,
    /// The order id the processor echoes back from the session request.
    pub order_reference: Option<String>,
}

impl PaymentConfirmation {
    pub fn is_paid(&self) -> bool {
        self.status == ConfirmationStatus::Paid
    }

    /// False when the processor names a different order.
    ///
    /// A confirmation without a reference matches nothing but the caller's
    /// own bookkeeping, so it is accepted here.
    pub fn references(&self, order_id: &str) -> bool {
        self.order_reference
            .as_deref()
            .map_or(true, |reference| reference == order_id)
    }
}

// =============================================================================
// Trait
// =============================================================================

/// A redirect-based payment processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn method(&self) -> PaymentMethod;

    /// Opens a hosted payment page for the request.
    async fn create_payment_session(
        &self,
        request: &PaymentSessionRequest,
    ) -> GatewayResult<PaymentSession>;

    /// Reports (and for capture-style processors, performs) the payment
    /// behind `provider_ref`. Calling it twice for a paid reference still
    /// reports `Paid`.
    async fn confirm_payment(&self, provider_ref: &str) -> GatewayResult<PaymentConfirmation>;
}

// =============================================================================
// Registry
// =============================================================================

/// Gateways by payment method.
#[derive(Clone, Default)]
pub struct GatewayRegistry {
    gateways: HashMap<PaymentMethod, Arc<dyn PaymentGateway>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a gateway under its own method, replacing any previous one.
    pub fn register(&mut self, gateway: Arc<dyn PaymentGateway>) {
        self.gateways.insert(gateway.method(), gateway);
    }

    pub fn with(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.register(gateway);
        self
    }

    pub fn get(&self, method: PaymentMethod) -> GatewayResult<Arc<dyn PaymentGateway>> {
        self.gateways
            .get(&method)
            .cloned()
            .ok_or(GatewayError::NotConfigured(method))
    }

    /// Methods the shop can currently offer.
    pub fn methods(&self) -> Vec<PaymentMethod> {
        let mut methods: Vec<_> = self.gateways.keys().copied().collect();
        methods.sort_by_key(|m| m.as_str());
        methods
    }
}

impl std::fmt::Debug for GatewayRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayRegistry")
            .field("methods", &self.methods())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fake(PaymentMethod);

    #[async_trait]
    impl PaymentGateway for Fake {
        fn method(&self) -> PaymentMethod {
            self.0
        }

        async fn create_payment_session(
            &self,
            request: &PaymentSessionRequest,
        ) -> GatewayResult<PaymentSession> {
            Ok(PaymentSession {
                redirect_url: request.return_url.clone(),
                provider_session_id: "fake".to_string(),
            })
        }

        async fn confirm_payment(&self, _provider_ref: &str) -> GatewayResult<PaymentConfirmation> {
            Ok(PaymentConfirmation {
                status: ConfirmationStatus::Paid,
                provider_transaction_id: None,
                confirmed_amount: None,
                currency: None,
                order_reference: None,
            })
        }
    }

    #[test]
    fn test_registry_lookup() {
        let registry = GatewayRegistry::new().with(Arc::new(Fake(PaymentMethod::Paypal)));

        assert!(registry.get(PaymentMethod::Paypal).is_ok());
        assert!(matches!(
            registry.get(PaymentMethod::Stripe),
            Err(GatewayError::NotConfigured(PaymentMethod::Stripe))
        ));
        assert_eq!(registry.methods(), vec![PaymentMethod::Paypal]);
    }

    #[test]
    fn test_items_total() {
        let request = PaymentSessionRequest {
            order_id: "o".to_string(),
            line_items: vec![
                LineItem {
                    name: "Mug".to_string(),
                    description: None,
                    unit_amount: Money::from_cents(1000),
                    quantity: 2,
                },
                LineItem {
                    name: "Delivery - Colissimo".to_string(),
                    description: Some("48h".to_string()),
                    unit_amount: Money::from_cents(690),
                    quantity: 1,
                },
            ],
            amount: Money::from_cents(2690),
            currency: "EUR".to_string(),
            return_url: "http://shop/ok".to_string(),
            cancel_url: "http://shop/ko".to_string(),
            customer_email: None,
            metadata: BTreeMap::new(),
        };

        assert_eq!(request.items_total(), Money::from_cents(2690));
    }

    #[test]
    fn test_order_reference() {
        let mut confirmation = PaymentConfirmation {
            status: ConfirmationStatus::Paid,
            provider_transaction_id: Some("pi_1".to_string()),
            confirmed_amount: None,
            currency: None,
            order_reference: Some("order-1".to_string()),
        };
        assert!(confirmation.references("order-1"));
        assert!(!confirmation.references("order-2"));

        confirmation.order_reference = None;
        assert!(confirmation.references("order-2"));
    }
}
