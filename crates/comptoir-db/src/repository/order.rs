//! # Order Repository
//!
//! Orders, their items, and the payment and invoice that close them.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. DRAFT                                                              │
//! │     └── insert_draft() → Order { status: Pending } + items (one tx)    │
//! │                                                                         │
//! │  2a. PAY (exactly once)                                                │
//! │     └── finalize_paid() ── one transaction ─────────────────────┐      │
//! │         ├── UPDATE orders ... WHERE id = ? AND status='pending' │      │
//! │         │     0 rows? → rollback, AlreadyProcessed(status)      │      │
//! │         ├── INSERT payments                                     │      │
//! │         ├── UPDATE products SET stock = MAX(0, stock - qty)     │      │
//! │         └── INSERT invoices                                     │      │
//! │                                                          commit ┘      │
//! │                                                                         │
//! │  2b. CANCEL                                                            │
//! │     └── cancel_pending() → Order { status: Cancelled }                 │
//! │                                                                         │
//! │  3. SHIP / DELIVER / REFUND                                            │
//! │     └── transition(from, to)                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The conditional update on `status = 'pending'` is the only guard that
//! makes fulfillment idempotent: two concurrent confirmations of the same
//! order race on it and exactly one wins.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use comptoir_core::{
    AddressSnapshot, Invoice, Order, OrderDetails, OrderDraft, OrderItem, OrderStatus, Payment,
};

const ITEM_COLUMNS: &str =
    "id, order_id, product_id, product_name, unit_price_cents, quantity, total_cents";
const PAYMENT_COLUMNS: &str =
    "id, order_id, method, transaction_id, amount_cents, currency, status, paid_at, created_at";
const INVOICE_COLUMNS: &str = "id, order_id, invoice_number, invoice_date, created_at";

// =============================================================================
// Row Mapping
// =============================================================================

/// Flat `orders` row. The two address snapshots are stored as prefixed
/// column groups and folded back into [`AddressSnapshot`] values.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    order_number: String,
    user_id: String,
    status: OrderStatus,
    subtotal_cents: i64,
    shipping_cents: i64,
    tax_cents: i64,
    total_cents: i64,
    currency: String,
    carrier_id: Option<String>,
    carrier_name: String,
    shipping_full_name: String,
    shipping_phone: Option<String>,
    shipping_street: String,
    shipping_street_complement: Option<String>,
    shipping_postal_code: String,
    shipping_city: String,
    shipping_country: String,
    billing_full_name: String,
    billing_phone: Option<String>,
    billing_street: String,
    billing_street_complement: Option<String>,
    billing_postal_code: String,
    billing_city: String,
    billing_country: String,
    customer_note: Option<String>,
    provider_session_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
    shipped_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Order {
            id: row.id,
            order_number: row.order_number,
            user_id: row.user_id,
            status: row.status,
            subtotal_cents: row.subtotal_cents,
            shipping_cents: row.shipping_cents,
            tax_cents: row.tax_cents,
            total_cents: row.total_cents,
            currency: row.currency,
            carrier_id: row.carrier_id,
            carrier_name: row.carrier_name,
            shipping_address: AddressSnapshot {
                full_name: row.shipping_full_name,
                phone: row.shipping_phone,
                street: row.shipping_street,
                street_complement: row.shipping_street_complement,
                postal_code: row.shipping_postal_code,
                city: row.shipping_city,
                country: row.shipping_country,
            },
            billing_address: AddressSnapshot {
                full_name: row.billing_full_name,
                phone: row.billing_phone,
                street: row.billing_street,
                street_complement: row.billing_street_complement,
                postal_code: row.billing_postal_code,
                city: row.billing_city,
                country: row.billing_country,
            },
            customer_note: row.customer_note,
            provider_session_id: row.provider_session_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            paid_at: row.paid_at,
            shipped_at: row.shipped_at,
            delivered_at: row.delivered_at,
        }
    }
}

// =============================================================================
// Finalize Outcome
// =============================================================================

/// Result of [`OrderRepository::finalize_paid`].
#[derive(Debug, Clone)]
pub enum FinalizeOutcome {
    /// This call moved the order to `Paid` and wrote payment and invoice.
    Finalized {
        order: Order,
        payment: Payment,
        invoice: Invoice,
    },
    /// The order had already left `Pending`; nothing was written.
    AlreadyProcessed(OrderStatus),
}

impl FinalizeOutcome {
    pub fn is_finalized(&self) -> bool {
        matches!(self, FinalizeOutcome::Finalized { .. })
    }
}

/// Stock shortfall noticed while decrementing a paid order.
#[derive(Debug, sqlx::FromRow)]
struct Shortfall {
    id: String,
    stock: i64,
    needed: i64,
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Inserts a pending order and all its items atomically.
    pub async fn insert_draft(&self, draft: &OrderDraft) -> DbResult<Order> {
        let order = &draft.order;
        debug!(
            id = %order.id,
            order_number = %order.order_number,
            items = draft.items.len(),
            "Inserting order draft"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, user_id, status,
                subtotal_cents, shipping_cents, tax_cents, total_cents, currency,
                carrier_id, carrier_name,
                shipping_full_name, shipping_phone, shipping_street, shipping_street_complement,
                shipping_postal_code, shipping_city, shipping_country,
                billing_full_name, billing_phone, billing_street, billing_street_complement,
                billing_postal_code, billing_city, billing_country,
                customer_note, created_at, updated_at, paid_at, shipped_at, delivered_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8, ?9,
                ?10, ?11,
                ?12, ?13, ?14, ?15,
                ?16, ?17, ?18,
                ?19, ?20, ?21, ?22,
                ?23, ?24, ?25,
                ?26, ?27, ?28, ?29, ?30, ?31
            )
            "#,
        )
        .bind(&order.id)
        .bind(&order.order_number)
        .bind(&order.user_id)
        .bind(order.status)
        .bind(order.subtotal_cents)
        .bind(order.shipping_cents)
        .bind(order.tax_cents)
        .bind(order.total_cents)
        .bind(&order.currency)
        .bind(&order.carrier_id)
        .bind(&order.carrier_name)
        .bind(&order.shipping_address.full_name)
        .bind(&order.shipping_address.phone)
        .bind(&order.shipping_address.street)
        .bind(&order.shipping_address.street_complement)
        .bind(&order.shipping_address.postal_code)
        .bind(&order.shipping_address.city)
        .bind(&order.shipping_address.country)
        .bind(&order.billing_address.full_name)
        .bind(&order.billing_address.phone)
        .bind(&order.billing_address.street)
        .bind(&order.billing_address.street_complement)
        .bind(&order.billing_address.postal_code)
        .bind(&order.billing_address.city)
        .bind(&order.billing_address.country)
        .bind(&order.customer_note)
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.paid_at)
        .bind(order.shipped_at)
        .bind(order.delivered_at)
        .execute(&mut *tx)
        .await?;

        for item in &draft.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, product_id, product_name,
                    unit_price_cents, quantity, total_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&item.id)
            .bind(&item.order_id)
            .bind(&item.product_id)
            .bind(&item.product_name)
            .bind(item.unit_price_cents)
            .bind(item.quantity)
            .bind(item.total_cents)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(order.clone())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Order::from))
    }

    /// Orders of a customer, newest first.
    pub async fn list_by_user(&self, user_id: &str) -> DbResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            "SELECT * FROM orders WHERE user_id = ?1 ORDER BY created_at DESC, order_number DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    pub async fn get_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ?1 ORDER BY rowid"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    pub async fn get_payment(&self, order_id: &str) -> DbResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = ?1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    /// Number of payment rows for an order. Never more than one.
    pub async fn count_payments(&self, order_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE order_id = ?1")
            .bind(order_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    pub async fn get_invoice(&self, order_id: &str) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE order_id = ?1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }

    /// Loads an order with items, payment and invoice.
    pub async fn get_details(&self, id: &str) -> DbResult<Option<OrderDetails>> {
        let Some(order) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        let items = self.get_items(id).await?;
        let payment = self.get_payment(id).await?;
        let invoice = self.get_invoice(id).await?;

        Ok(Some(OrderDetails {
            order,
            items,
            payment,
            invoice,
        }))
    }

    /// Cancels an order that is still pending.
    ///
    /// Returns `false` when the order is missing or already past `Pending`;
    /// a paid order is never cancelled by this path.
    pub async fn cancel_pending(&self, id: &str, now: DateTime<Utc>) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = 'cancelled',
                updated_at = ?2
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(id = %id, cancelled = result.rows_affected() > 0, "Cancel pending order");
        Ok(result.rows_affected() > 0)
    }

    /// Records the processor session opened for a pending order.
    ///
    /// Returns `false` when the order is no longer pending.
    pub async fn set_provider_session(
        &self,
        id: &str,
        provider_session_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET
                provider_session_id = ?2,
                updated_at = ?3
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(provider_session_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(id = %id, provider_session_id = %provider_session_id, "Provider session recorded");
        Ok(result.rows_affected() > 0)
    }

    /// Moves an order from `from` to `to`, recording shipment and delivery
    /// timestamps.
    ///
    /// The caller validates the transition; this only applies it if the
    /// order is still in `from`. Returns `false` otherwise.
    pub async fn transition(
        &self,
        id: &str,
        from: OrderStatus,
        to: OrderStatus,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = ?3,
                updated_at = ?4,
                shipped_at = CASE WHEN ?3 = 'shipped' THEN ?4 ELSE shipped_at END,
                delivered_at = CASE WHEN ?3 = 'delivered' THEN ?4 ELSE delivered_at END
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Marks a pending order paid, records its payment, decrements stock
    /// and issues its invoice, all in one transaction.
    ///
    /// ## Returns
    /// * `Finalized` - This call did the work
    /// * `AlreadyProcessed(status)` - The order was not pending; no write
    /// * `Err(DbError::NotFound)` - No such order
    ///
    /// Stock is decremented best-effort: a product that cannot cover the
    /// ordered quantity is floored at zero and logged, never fails the
    /// payment that already happened.
    pub async fn finalize_paid(
        &self,
        order_id: &str,
        payment: &Payment,
        invoice: &Invoice,
        now: DateTime<Utc>,
    ) -> DbResult<FinalizeOutcome> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = 'paid',
                paid_at = ?2,
                updated_at = ?2
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(order_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let status: Option<OrderStatus> =
                sqlx::query_scalar("SELECT status FROM orders WHERE id = ?1")
                    .bind(order_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            tx.rollback().await?;

            return match status {
                Some(status) => {
                    debug!(order_id = %order_id, status = %status, "Order already processed");
                    Ok(FinalizeOutcome::AlreadyProcessed(status))
                }
                None => Err(DbError::not_found("Order", order_id)),
            };
        }

        insert_payment(&mut tx, payment).await?;
        decrement_stock(&mut tx, order_id, now).await?;
        insert_invoice(&mut tx, invoice).await?;

        let row = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = ?1")
            .bind(order_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            order_id = %order_id,
            invoice_number = %invoice.invoice_number,
            "Order finalized"
        );

        Ok(FinalizeOutcome::Finalized {
            order: row.into(),
            payment: payment.clone(),
            invoice: invoice.clone(),
        })
    }
}

// =============================================================================
// Transaction Steps
// =============================================================================

async fn insert_payment(tx: &mut Transaction<'_, Sqlite>, payment: &Payment) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO payments (
            id, order_id, method, transaction_id, amount_cents,
            currency, status, paid_at, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.order_id)
    .bind(payment.method)
    .bind(&payment.transaction_id)
    .bind(payment.amount_cents)
    .bind(&payment.currency)
    .bind(payment.status)
    .bind(payment.paid_at)
    .bind(payment.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn decrement_stock(
    tx: &mut Transaction<'_, Sqlite>,
    order_id: &str,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let shortfalls = sqlx::query_as::<_, Shortfall>(
        r#"
        SELECT p.id AS id, p.stock AS stock, SUM(oi.quantity) AS needed
        FROM order_items oi
        INNER JOIN products p ON p.id = oi.product_id
        WHERE oi.order_id = ?1
        GROUP BY p.id, p.stock
        HAVING SUM(oi.quantity) > p.stock
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut **tx)
    .await?;

    for shortfall in &shortfalls {
        warn!(
            order_id = %order_id,
            product_id = %shortfall.id,
            stock = shortfall.stock,
            needed = shortfall.needed,
            "Stock shortfall on paid order, flooring at zero"
        );
    }

    sqlx::query(
        r#"
        UPDATE products SET
            stock = MAX(0, stock - (
                SELECT COALESCE(SUM(oi.quantity), 0)
                FROM order_items oi
                WHERE oi.order_id = ?1 AND oi.product_id = products.id
            )),
            updated_at = ?2
        WHERE id IN (
            SELECT product_id FROM order_items
            WHERE order_id = ?1 AND product_id IS NOT NULL
        )
        "#,
    )
    .bind(order_id)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn insert_invoice(tx: &mut Transaction<'_, Sqlite>, invoice: &Invoice) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO invoices (id, order_id, invoice_number, invoice_date, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&invoice.id)
    .bind(&invoice.order_id)
    .bind(&invoice.invoice_number)
    .bind(invoice.invoice_date)
    .bind(invoice.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use comptoir_core::order::generate_invoice_number;
    use comptoir_core::{
        Address, CartDetails, CartItemDetail, Carrier, PaymentMethod, PaymentStatus, Product,
        TaxRate, User,
    };

    struct Fixture {
        db: Database,
        user: User,
        carrier: Carrier,
        address: Address,
    }

    async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = db
            .users()
            .insert(&User {
                id: uuid::Uuid::new_v4().to_string(),
                email: "camille@example.com".to_string(),
                password_hash: "hash".to_string(),
                first_name: "Camille".to_string(),
                last_name: "Martin".to_string(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        let carrier = db.carriers().insert(&Carrier::new("Colissimo", 690, 1)).await.unwrap();
        let address = db
            .addresses()
            .insert(&Address {
                id: uuid::Uuid::new_v4().to_string(),
                user_id: user.id.clone(),
                full_name: "Camille Martin".to_string(),
                phone: None,
                street: "12 rue des Vignes".to_string(),
                street_complement: None,
                postal_code: "33000".to_string(),
                city: "Bordeaux".to_string(),
                country: "France".to_string(),
                is_default: false,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        Fixture {
            db,
            user,
            carrier,
            address,
        }
    }

    async fn pending_order(f: &Fixture, lines: &[(&Product, i64)]) -> Order {
        let cart = CartDetails {
            items: lines
                .iter()
                .map(|(p, q)| CartItemDetail::new((*p).clone(), *q))
                .collect(),
        };
        let draft = OrderDraft::build(
            &f.user.id,
            &cart,
            &f.carrier,
            &f.address,
            TaxRate::zero(),
            "EUR",
            Utc::now(),
        )
        .unwrap();
        f.db.orders().insert_draft(&draft).await.unwrap()
    }

    fn payment_for(order: &Order) -> Payment {
        Payment {
            id: uuid::Uuid::new_v4().to_string(),
            order_id: order.id.clone(),
            method: PaymentMethod::Stripe,
            transaction_id: Some("pi_123".to_string()),
            amount_cents: order.total_cents,
            currency: order.currency.clone(),
            status: PaymentStatus::Completed,
            paid_at: Some(Utc::now()),
            created_at: Utc::now(),
        }
    }

    fn invoice_for(order: &Order) -> Invoice {
        let now = Utc::now();
        Invoice {
            id: uuid::Uuid::new_v4().to_string(),
            order_id: order.id.clone(),
            invoice_number: generate_invoice_number(now),
            invoice_date: now,
            created_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_draft_round_trips_snapshot() {
        let f = fixture().await;
        let mug = f.db.products().insert(&Product::new("mug", "Mug", 1000, 5)).await.unwrap();
        let order = pending_order(&f, &[(&mug, 2)]).await;

        let details = f.db.orders().get_details(&order.id).await.unwrap().unwrap();
        assert_eq!(details.order.status, OrderStatus::Pending);
        assert_eq!(details.order.total_cents, 2690);
        assert_eq!(details.order.shipping_address.city, "Bordeaux");
        assert_eq!(details.order.billing_address, details.order.shipping_address);
        assert_eq!(details.items.len(), 1);
        assert_eq!(details.items[0].product_name, "Mug");
        assert!(details.payment.is_none());
        assert!(details.invoice.is_none());

        // Deleting the address leaves the order untouched.
        f.db.addresses().delete_for_user(&f.address.id, &f.user.id).await.unwrap();
        let reloaded = f.db.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(reloaded.shipping_address.street, "12 rue des Vignes");
    }

    #[tokio::test]
    async fn test_finalize_paid_once() {
        let f = fixture().await;
        let mug = f.db.products().insert(&Product::new("mug", "Mug", 1000, 5)).await.unwrap();
        let order = pending_order(&f, &[(&mug, 3)]).await;

        let first = f
            .db
            .orders()
            .finalize_paid(&order.id, &payment_for(&order), &invoice_for(&order), Utc::now())
            .await
            .unwrap();
        assert!(first.is_finalized());

        let second = f
            .db
            .orders()
            .finalize_paid(&order.id, &payment_for(&order), &invoice_for(&order), Utc::now())
            .await
            .unwrap();
        assert!(matches!(second, FinalizeOutcome::AlreadyProcessed(OrderStatus::Paid)));

        let stock = f.db.products().get_by_id(&mug.id).await.unwrap().unwrap().stock;
        assert_eq!(stock, 2);
        assert_eq!(f.db.orders().count_payments(&order.id).await.unwrap(), 1);

        let details = f.db.orders().get_details(&order.id).await.unwrap().unwrap();
        assert_eq!(details.order.status, OrderStatus::Paid);
        assert!(details.order.paid_at.is_some());
        assert!(details.invoice.unwrap().invoice_number.starts_with("FAC-"));
    }

    #[tokio::test]
    async fn test_finalize_floors_stock_at_zero() {
        let f = fixture().await;
        let mug = f.db.products().insert(&Product::new("mug", "Mug", 1000, 5)).await.unwrap();
        let order = pending_order(&f, &[(&mug, 4)]).await;

        // Someone else bought most of the stock in the meantime.
        f.db.products().set_stock(&mug.id, 1).await.unwrap();

        let outcome = f
            .db
            .orders()
            .finalize_paid(&order.id, &payment_for(&order), &invoice_for(&order), Utc::now())
            .await
            .unwrap();
        assert!(outcome.is_finalized());

        let stock = f.db.products().get_by_id(&mug.id).await.unwrap().unwrap().stock;
        assert_eq!(stock, 0);
    }

    #[tokio::test]
    async fn test_finalize_unknown_order() {
        let f = fixture().await;
        let mug = f.db.products().insert(&Product::new("mug", "Mug", 1000, 5)).await.unwrap();
        let order = pending_order(&f, &[(&mug, 1)]).await;

        let err = f
            .db
            .orders()
            .finalize_paid("ghost", &payment_for(&order), &invoice_for(&order), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_cancel_and_transitions() {
        let f = fixture().await;
        let mug = f.db.products().insert(&Product::new("mug", "Mug", 1000, 5)).await.unwrap();

        let cancelled = pending_order(&f, &[(&mug, 1)]).await;
        assert!(f.db.orders().cancel_pending(&cancelled.id, Utc::now()).await.unwrap());
        assert!(!f.db.orders().cancel_pending(&cancelled.id, Utc::now()).await.unwrap());

        let paid = pending_order(&f, &[(&mug, 1)]).await;
        f.db.orders()
            .finalize_paid(&paid.id, &payment_for(&paid), &invoice_for(&paid), Utc::now())
            .await
            .unwrap();
        assert!(!f.db.orders().cancel_pending(&paid.id, Utc::now()).await.unwrap());

        let orders = f.db.orders();
        assert!(orders
            .transition(&paid.id, OrderStatus::Paid, OrderStatus::Processing, Utc::now())
            .await
            .unwrap());
        assert!(!orders
            .transition(&paid.id, OrderStatus::Paid, OrderStatus::Processing, Utc::now())
            .await
            .unwrap());
        assert!(orders
            .transition(&paid.id, OrderStatus::Processing, OrderStatus::Shipped, Utc::now())
            .await
            .unwrap());

        let shipped = orders.get_by_id(&paid.id).await.unwrap().unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);
        assert!(shipped.shipped_at.is_some());
        assert!(shipped.delivered_at.is_none());

        let listed = orders.list_by_user(&f.user.id).await.unwrap();
        assert_eq!(listed.len(), 2);
    }

    #[tokio::test]
    async fn test_provider_session_only_on_pending() {
        let f = fixture().await;
        let mug = f.db.products().insert(&Product::new("mug", "Mug", 1000, 5)).await.unwrap();
        let order = pending_order(&f, &[(&mug, 1)]).await;
        assert!(order.provider_session_id.is_none());

        let orders = f.db.orders();
        assert!(orders.set_provider_session(&order.id, "cs_1", Utc::now()).await.unwrap());
        let stored = orders.get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.provider_session_id.as_deref(), Some("cs_1"));

        orders.cancel_pending(&order.id, Utc::now()).await.unwrap();
        assert!(!orders.set_provider_session(&order.id, "cs_2", Utc::now()).await.unwrap());
        let stored = orders.get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.provider_session_id.as_deref(), Some("cs_1"));
    }
}
