//! # Order Fulfillment Finalizer
//!
//! Turns a confirmed payment into a paid order, exactly once.
//!
//! ## Finalize
//! ```text
//! ┌──────────────────────── one transaction ────────────────────────┐
//! │ UPDATE orders SET status='paid' WHERE id=? AND status='pending' │
//! │        │ 0 rows → AlreadyProcessed (rollback, nothing written)  │
//! │        ▼                                                        │
//! │ INSERT payment ──► stock = MAX(0, stock - qty) ──► INSERT invoice│
//! └─────────────────────────────────────────────────────────────────┘
//!          │ commit
//!          ▼
//!   clear session cart + checkout
//! ```
//!
//! A failure anywhere inside the transaction leaves the order `Pending`,
//! so the callback can simply be retried.

use chrono::Utc;
use comptoir_core::order::generate_invoice_number;
use comptoir_core::{CoreError, Invoice, Order, OrderStatus, Payment, PaymentMethod, PaymentStatus};
use comptoir_db::{Database, FinalizeOutcome};
use comptoir_payments::PaymentConfirmation;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{CheckoutError, CheckoutResult};
use crate::session::{SessionId, SessionStore};

#[derive(Debug, Clone)]
pub struct FulfillmentFinalizer {
    db: Database,
    sessions: SessionStore,
}

impl FulfillmentFinalizer {
    pub fn new(db: Database) -> Self {
        let sessions = SessionStore::new(db.clone());
        FulfillmentFinalizer { db, sessions }
    }

    /// Records a confirmed payment for a pending order.
    ///
    /// Safe to call any number of times for the same order: only the first
    /// call writes a payment, decrements stock and issues an invoice.
    /// Later calls return `AlreadyProcessed` with the current status.
    pub async fn finalize(
        &self,
        session: &SessionId,
        order_id: &str,
        method: PaymentMethod,
        confirmation: &PaymentConfirmation,
    ) -> CheckoutResult<FinalizeOutcome> {
        if !confirmation.is_paid() {
            return Err(CheckoutError::Conflict(format!(
                "Payment for order {} is not confirmed",
                order_id
            )));
        }

        let order = self
            .db
            .orders()
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| CheckoutError::not_found("Order", order_id))?;

        let now = Utc::now();
        let payment = payment_record(&order, method, confirmation, now);
        let invoice = Invoice {
            id: Uuid::new_v4().to_string(),
            order_id: order.id.clone(),
            invoice_number: generate_invoice_number(now),
            invoice_date: now,
            created_at: now,
        };

        let outcome = self
            .db
            .orders()
            .finalize_paid(&order.id, &payment, &invoice, now)
            .await?;

        match &outcome {
            FinalizeOutcome::Finalized { order, invoice, .. } => {
                self.sessions.clear_purchase(session).await?;
                info!(
                    order_number = %order.order_number,
                    invoice_number = %invoice.invoice_number,
                    method = %method,
                    "Order paid"
                );
            }
            FinalizeOutcome::AlreadyProcessed(status) => {
                info!(order_id = %order_id, status = %status, "Payment callback for processed order ignored");
            }
        }

        Ok(outcome)
    }

    /// Moves an order along its back-office lifecycle.
    ///
    /// `Paid` is reserved to [`finalize`](Self::finalize) and `Cancelled` to
    /// the customer cancel path.
    pub async fn transition(&self, order_id: &str, to: OrderStatus) -> CheckoutResult<Order> {
        let order = self
            .db
            .orders()
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| CheckoutError::not_found("Order", order_id))?;

        let allowed = !matches!(to, OrderStatus::Paid | OrderStatus::Cancelled)
            && order.status.can_transition_to(to);
        if !allowed {
            return Err(CoreError::InvalidStatusTransition {
                order_id: order.id,
                from: order.status,
                to,
            }
            .into());
        }

        let moved = self
            .db
            .orders()
            .transition(&order.id, order.status, to, Utc::now())
            .await?;
        if !moved {
            return Err(CheckoutError::Conflict(format!(
                "Order {} changed status concurrently",
                order.order_number
            )));
        }

        info!(order_number = %order.order_number, from = %order.status, to = %to, "Order status changed");
        self.db
            .orders()
            .get_by_id(&order.id)
            .await?
            .ok_or_else(|| CheckoutError::not_found("Order", order_id))
    }
}

/// The payment row for a confirmation.
///
/// The processor's amount and currency are recorded when it reports them,
/// otherwise the order's.
fn payment_record(
    order: &Order,
    method: PaymentMethod,
    confirmation: &PaymentConfirmation,
    now: chrono::DateTime<Utc>,
) -> Payment {
    let amount = confirmation.confirmed_amount.unwrap_or_else(|| order.total());
    if amount != order.total() {
        warn!(
            order_id = %order.id,
            expected = %order.total(),
            confirmed = %amount,
            "Confirmed amount differs from order total"
        );
    }

    Payment {
        id: Uuid::new_v4().to_string(),
        order_id: order.id.clone(),
        method,
        transaction_id: confirmation.provider_transaction_id.clone(),
        amount_cents: amount.cents(),
        currency: confirmation
            .currency
            .clone()
            .unwrap_or_else(|| order.currency.clone()),
        status: PaymentStatus::Completed,
        paid_at: Some(now),
        created_at: now,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
