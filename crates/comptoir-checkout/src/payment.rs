//! # Payment Flow
//!
//! Creates the pending order, sends the customer to the processor and
//! handles the processor's return.
//!
//! ## Round Trip
//! ```text
//! start(method)
//!   ├─ summary (cart, address, carrier, stock re-checked)
//!   ├─ INSERT order + items (Pending, address snapshots)
//!   ├─ gateway.create_payment_session ──► redirect_url
//!   └─ order.provider_session_id = session id     │
//!                                                 │
//!                     customer pays on the processor's page
//!                                                 │
//! complete(order_id, provider_ref) ◄──────────────┘
//!   ├─ order not Pending           → AlreadyProcessed (gateway not called)
//!   ├─ provider_ref ≠ stored id    → Conflict (gateway not called)
//!   ├─ gateway.confirm_payment
//!   │     ├─ names another order   → Conflict, order untouched
//!   │     ├─ amount mismatch       → Conflict, order untouched
//!   │     ├─ Paid                  → FulfillmentFinalizer::finalize
//!   │     ├─ Pending               → PaymentPending, order untouched
//!   │     └─ Failed                → order Cancelled, PaymentFailed
//! ```
//!
//! A processor session pays exactly the order it was opened for: replaying
//! a paid session id against another order is refused before and after the
//! processor is asked.

use std::collections::BTreeMap;

use chrono::Utc;
use comptoir_core::{Invoice, Money, Order, OrderDraft, OrderItem, Payment, PaymentMethod};
use comptoir_db::{Database, FinalizeOutcome};
use comptoir_payments::{
    ConfirmationStatus, GatewayRegistry, LineItem, PaymentSessionRequest,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::checkout::CheckoutOrchestrator;
use crate::error::{CheckoutError, CheckoutResult};
use crate::fulfillment::FulfillmentFinalizer;
use crate::session::SessionId;
use crate::ShopSettings;

/// A pending order and where to send the customer to pay it.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentStart {
    pub order: Order,
    pub redirect_url: String,
    pub provider_session_id: String,
}

/// What came of a processor callback.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PaymentOutcome {
    /// This callback paid the order.
    Paid {
        order: Order,
        payment: Payment,
        invoice: Invoice,
    },
    /// The order had already left `Pending`.
    AlreadyProcessed { order: Order },
    /// The processor hasn't captured the money (yet).
    PaymentPending {
        order: Order,
        status: ConfirmationStatus,
    },
    /// The processor gave up on the payment (expired, declined, voided);
    /// the order is now cancelled.
    PaymentFailed { order: Order },
}

impl PaymentOutcome {
    pub fn order(&self) -> &Order {
        match self {
            PaymentOutcome::Paid { order, .. }
            | PaymentOutcome::AlreadyProcessed { order }
            | PaymentOutcome::PaymentPending { order, .. }
            | PaymentOutcome::PaymentFailed { order } => order,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaymentFlow {
    db: Database,
    gateways: GatewayRegistry,
    checkout: CheckoutOrchestrator,
    finalizer: FulfillmentFinalizer,
    settings: ShopSettings,
}

impl PaymentFlow {
    pub fn new(db: Database, gateways: GatewayRegistry, settings: ShopSettings) -> Self {
        PaymentFlow {
            checkout: CheckoutOrchestrator::new(db.clone(), &settings),
            finalizer: FulfillmentFinalizer::new(db.clone()),
            db,
            gateways,
            settings,
        }
    }

    /// Methods customers can pay with.
    pub fn methods(&self) -> Vec<PaymentMethod> {
        self.gateways.methods()
    }

    /// Creates a pending order from the checkout and opens a payment page.
    ///
    /// When the processor refuses, the order stays `Pending` and the error
    /// is returned; the customer can try again with a fresh order.
    pub async fn start(
        &self,
        session: &SessionId,
        user_id: &str,
        method: PaymentMethod,
        note: Option<String>,
    ) -> CheckoutResult<PaymentStart> {
        let gateway = self.gateways.get(method)?;
        let summary = self.checkout.summary(session, user_id).await?;

        let draft = OrderDraft::build(
            user_id,
            &summary.cart,
            &summary.carrier,
            &summary.address,
            self.settings.tax_rate,
            &self.settings.currency,
            Utc::now(),
        )?
        .with_note(note);
        let order = self.db.orders().insert_draft(&draft).await?;

        let customer_email = self.db.users().get_by_id(user_id).await?.map(|u| u.email);
        let request = session_request(
            &order,
            &draft.items,
            summary.carrier.delivery_time.clone(),
            method,
            &self.settings.public_url,
            customer_email,
        );

        let session_page = match gateway.create_payment_session(&request).await {
            Ok(page) => page,
            Err(e) => {
                warn!(order_number = %order.order_number, method = %method, error = %e, "Payment session creation failed");
                return Err(e.into());
            }
        };

        let mut order = order;
        self.db
            .orders()
            .set_provider_session(&order.id, &session_page.provider_session_id, Utc::now())
            .await?;
        order.provider_session_id = Some(session_page.provider_session_id.clone());

        info!(
            order_number = %order.order_number,
            method = %method,
            total = %order.total(),
            "Payment started"
        );
        Ok(PaymentStart {
            order,
            redirect_url: session_page.redirect_url,
            provider_session_id: session_page.provider_session_id,
        })
    }

    /// Handles the processor's return for an order of `user_id`.
    pub async fn complete(
        &self,
        session: &SessionId,
        user_id: &str,
        order_id: &str,
        method: PaymentMethod,
        provider_ref: &str,
    ) -> CheckoutResult<PaymentOutcome> {
        let order = self.owned_order(user_id, order_id).await?;
        if !order.is_pending() {
            return Ok(PaymentOutcome::AlreadyProcessed { order });
        }

        if order.provider_session_id.as_deref() != Some(provider_ref) {
            warn!(
                order_number = %order.order_number,
                provider_ref = %provider_ref,
                "Refusing a processor reference not opened for this order"
            );
            return Err(CheckoutError::Conflict(format!(
                "Payment reference {} does not belong to order {}",
                provider_ref, order.order_number
            )));
        }

        let gateway = self.gateways.get(method)?;
        let confirmation = gateway.confirm_payment(provider_ref).await?;

        if !confirmation.references(&order.id) {
            warn!(
                order_number = %order.order_number,
                reference = ?confirmation.order_reference,
                "Refusing payment confirmation for another order"
            );
            return Err(CheckoutError::Conflict(format!(
                "Payment {} was made for another order",
                provider_ref
            )));
        }

        match confirmation.status {
            ConfirmationStatus::Paid => {}
            ConfirmationStatus::Pending => {
                info!(order_number = %order.order_number, "Payment not captured yet");
                return Ok(PaymentOutcome::PaymentPending {
                    order,
                    status: confirmation.status,
                });
            }
            ConfirmationStatus::Failed => {
                let cancelled = self.db.orders().cancel_pending(&order.id, Utc::now()).await?;
                let order = self.owned_order(user_id, order_id).await?;
                if !cancelled {
                    return Ok(PaymentOutcome::AlreadyProcessed { order });
                }
                info!(order_number = %order.order_number, "Payment failed, order cancelled");
                return Ok(PaymentOutcome::PaymentFailed { order });
            }
        }

        if let Some(amount) = confirmation.confirmed_amount {
            if amount != order.total() {
                warn!(
                    order_number = %order.order_number,
                    expected = %order.total(),
                    confirmed = %amount,
                    "Refusing payment confirmation with a different amount"
                );
                return Err(CheckoutError::Conflict(format!(
                    "Payment amount {} does not match order total {}",
                    amount,
                    order.total()
                )));
            }
        }

        match self
            .finalizer
            .finalize(session, &order.id, method, &confirmation)
            .await?
        {
            FinalizeOutcome::Finalized {
                order,
                payment,
                invoice,
            } => Ok(PaymentOutcome::Paid {
                order,
                payment,
                invoice,
            }),
            FinalizeOutcome::AlreadyProcessed(_) => Ok(PaymentOutcome::AlreadyProcessed {
                order: self.owned_order(user_id, order_id).await?,
            }),
        }
    }

    /// The customer gave up on the processor's page.
    ///
    /// Only a pending order is cancelled; any other order is returned as is.
    pub async fn cancel(&self, user_id: &str, order_id: &str) -> CheckoutResult<Order> {
        let order = self.owned_order(user_id, order_id).await?;
        if self.db.orders().cancel_pending(&order.id, Utc::now()).await? {
            info!(order_number = %order.order_number, "Order cancelled");
            return self.owned_order(user_id, order_id).await;
        }
        Ok(order)
    }

    async fn owned_order(&self, user_id: &str, order_id: &str) -> CheckoutResult<Order> {
        self.db
            .orders()
            .get_by_id(order_id)
            .await?
            .filter(|o| o.is_owned_by(user_id))
            .ok_or_else(|| CheckoutError::not_found("Order", order_id))
    }
}

/// Where the processor sends the customer back.
///
/// PayPal appends `token`, Stripe gets its `session_id` placeholder from the
/// adapter, so each method has its own success path.
pub fn return_urls(public_url: &str, method: PaymentMethod, order_id: &str) -> (String, String) {
    let base = public_url.trim_end_matches('/');
    let success = match method {
        PaymentMethod::Stripe => format!("{}/checkout/success/{}", base, order_id),
        PaymentMethod::Paypal => format!("{}/checkout/paypal/success/{}", base, order_id),
    };
    (success, format!("{}/checkout/cancel/{}", base, order_id))
}

/// The hosted page request for an order: one line per item, then delivery
/// and tax lines, so the lines always add up to the order total.
fn session_request(
    order: &Order,
    items: &[OrderItem],
    delivery_time: Option<String>,
    method: PaymentMethod,
    public_url: &str,
    customer_email: Option<String>,
) -> PaymentSessionRequest {
    let mut line_items: Vec<LineItem> = items
        .iter()
        .map(|item| LineItem {
            name: item.product_name.clone(),
            description: None,
            unit_amount: item.unit_price(),
            quantity: item.quantity,
        })
        .collect();

    line_items.push(LineItem {
        name: format!("Delivery - {}", order.carrier_name),
        description: delivery_time,
        unit_amount: order.shipping(),
        quantity: 1,
    });

    if order.tax_cents > 0 {
        line_items.push(LineItem {
            name: "Tax".to_string(),
            description: None,
            unit_amount: Money::from_cents(order.tax_cents),
            quantity: 1,
        });
    }

    let (return_url, cancel_url) = return_urls(public_url, method, &order.id);

    let mut metadata = BTreeMap::new();
    metadata.insert("order_id".to_string(), order.id.clone());
    metadata.insert("order_number".to_string(), order.order_number.clone());
    metadata.insert("user_id".to_string(), order.user_id.clone());

    PaymentSessionRequest {
        order_id: order.id.clone(),
        line_items,
        amount: order.total(),
        currency: order.currency.clone(),
        return_url,
        cancel_url,
        customer_email,
        metadata,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
