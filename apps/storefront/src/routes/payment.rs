//! # Payment Endpoints
//!
//! ```text
//! POST /checkout/pay/stripe ─► 303 checkout.stripe.com ─► GET /checkout/success/{order}?session_id=cs_…
//! POST /checkout/pay/paypal ─► 303 paypal.com/approve  ─► GET /checkout/paypal/success/{order}?token=…
//!                                                  └────► GET /checkout/cancel/{order}
//! ```
//!
//! Success callbacks can arrive more than once (reloads, back button). Only
//! the first one that sees the money captured pays the order; the others
//! answer with the order as it stands. A session the processor gave up on
//! answers `402` with the order cancelled.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use comptoir_checkout::{PaymentOutcome, SessionId};
use comptoir_core::{Order, PaymentMethod};
use serde::Deserialize;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::routes::customer;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PayQuery {
    /// Free text for the shop, kept on the order.
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StripeReturn {
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PayPalReturn {
    pub token: Option<String>,
}

/// Creates the order and sends the customer to the processor.
pub async fn pay(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Path(method): Path<String>,
    Query(query): Query<PayQuery>,
) -> ApiResult<impl IntoResponse> {
    let method: PaymentMethod = method
        .parse()
        .map_err(|e: comptoir_core::ValidationError| ApiError::validation(e.to_string()))?;
    let user = customer(&state, &session).await?;

    let start = state
        .services
        .payments
        .start(&session, &user.id, method, query.note)
        .await?;

    Ok((
        StatusCode::SEE_OTHER,
        [(header::LOCATION, start.redirect_url.clone())],
        Json(start),
    ))
}

pub async fn stripe_success(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Path(order_id): Path<String>,
    Query(query): Query<StripeReturn>,
) -> ApiResult<impl IntoResponse> {
    let session_id = query
        .session_id
        .ok_or_else(|| ApiError::validation("Missing session_id"))?;
    complete(&state, &session, &order_id, PaymentMethod::Stripe, &session_id).await
}

pub async fn paypal_success(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Path(order_id): Path<String>,
    Query(query): Query<PayPalReturn>,
) -> ApiResult<impl IntoResponse> {
    let token = query
        .token
        .ok_or_else(|| ApiError::validation("Missing token"))?;
    complete(&state, &session, &order_id, PaymentMethod::Paypal, &token).await
}

async fn complete(
    state: &AppState,
    session: &SessionId,
    order_id: &str,
    method: PaymentMethod,
    provider_ref: &str,
) -> ApiResult<(StatusCode, Json<PaymentOutcome>)> {
    let user = customer(state, session).await?;
    let outcome = state
        .services
        .payments
        .complete(session, &user.id, order_id, method, provider_ref)
        .await?;

    let status = match &outcome {
        PaymentOutcome::Paid { .. } | PaymentOutcome::AlreadyProcessed { .. } => StatusCode::OK,
        PaymentOutcome::PaymentPending { .. } => StatusCode::ACCEPTED,
        PaymentOutcome::PaymentFailed { .. } => StatusCode::PAYMENT_REQUIRED,
    };
    Ok((status, Json(outcome)))
}

/// The customer backed out of the processor's page.
pub async fn cancel(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Path(order_id): Path<String>,
) -> ApiResult<Json<Order>> {
    let user = customer(&state, &session).await?;
    let order = state.services.payments.cancel(&user.id, &order_id).await?;
    info!(order_number = %order.order_number, status = %order.status, "Customer returned from payment page");
    Ok(Json(order))
}

#[cfg(test)]
mod tests {
    use axum::http::{header, StatusCode};
    use comptoir_payments::ConfirmationStatus;

    use crate::routes::testing::{json, TestApp};

    /// Signs in and walks the checkout up to the summary with two bottles.
    async fn ready(t: &mut TestApp) {
        let address_id = t.sign_in().await;
        let wine = t.wine.id.clone();
        let carrier = t.carrier.id.clone();
        t.post(&format!("/cart/add/{}?quantity=2", wine)).await;
        t.post(&format!("/checkout/address/{}", address_id)).await;
        t.post(&format!("/checkout/carrier/{}", carrier)).await;
        t.get("/checkout/summary").await;
    }

    #[tokio::test]
    async fn test_pay_and_return() {
        let mut t = TestApp::new().await;
        ready(&mut t).await;

        let response = t.post("/checkout/pay/stripe?note=Leave%20at%20the%20door").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let start = json(response).await;
        let order_id = start["order"]["id"].as_str().unwrap().to_string();
        assert_eq!(location, format!("https://pay.example/{}", order_id));
        assert_eq!(start["order"]["status"], "pending");
        assert_eq!(start["order"]["customer_note"], "Leave at the door");

        let request = t.gateway.requests.lock().unwrap()[0].clone();
        assert_eq!(request.amount.cents(), 2690);

        let uri = format!("/checkout/success/{}?session_id=cs_test_1", order_id);
        let response = t.get(&uri).await;
        assert_eq!(response.status(), StatusCode::OK);
        let outcome = json(response).await;
        assert_eq!(outcome["outcome"], "paid");
        assert_eq!(outcome["order"]["status"], "paid");

        let stock = t.db.products().get_by_id(&t.wine.id).await.unwrap().unwrap().stock;
        assert_eq!(stock, 3);
        assert_eq!(json(t.get("/cart").await).await["count"], 0);

        // reload of the success page
        let outcome = json(t.get(&uri).await).await;
        assert_eq!(outcome["outcome"], "already_processed");
        assert_eq!(t.db.orders().count_payments(&order_id).await.unwrap(), 1);
        let stock = t.db.products().get_by_id(&t.wine.id).await.unwrap().unwrap().stock;
        assert_eq!(stock, 3);
    }

    #[tokio::test]
    async fn test_unpaid_return_keeps_order_pending() {
        let mut t = TestApp::new().await;
        ready(&mut t).await;
        *t.gateway.status.lock().unwrap() = ConfirmationStatus::Pending;

        let start = json(t.post("/checkout/pay/stripe").await).await;
        let order_id = start["order"]["id"].as_str().unwrap().to_string();

        let response = t
            .get(&format!("/checkout/success/{}?session_id=cs_test_1", order_id))
            .await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let outcome = json(response).await;
        assert_eq!(outcome["outcome"], "payment_pending");
        assert_eq!(outcome["order"]["status"], "pending");
        assert_eq!(json(t.get("/cart").await).await["count"], 2);
    }

    #[tokio::test]
    async fn test_failed_return_cancels_order() {
        let mut t = TestApp::new().await;
        ready(&mut t).await;
        *t.gateway.status.lock().unwrap() = ConfirmationStatus::Failed;

        let start = json(t.post("/checkout/pay/stripe").await).await;
        let order_id = start["order"]["id"].as_str().unwrap().to_string();

        let response = t
            .get(&format!("/checkout/success/{}?session_id=cs_test_1", order_id))
            .await;
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
        let outcome = json(response).await;
        assert_eq!(outcome["outcome"], "payment_failed");
        assert_eq!(outcome["order"]["status"], "cancelled");
        assert_eq!(json(t.get("/cart").await).await["count"], 2);
    }

    #[tokio::test]
    async fn test_foreign_session_reference_refused() {
        let mut t = TestApp::new().await;
        ready(&mut t).await;

        let start = json(t.post("/checkout/pay/stripe").await).await;
        let order_id = start["order"]["id"].as_str().unwrap().to_string();

        let response = t
            .get(&format!("/checkout/success/{}?session_id=cs_someone_else", order_id))
            .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let order = t.db.orders().get_by_id(&order_id).await.unwrap().unwrap();
        assert!(order.is_pending());
    }

    #[tokio::test]
    async fn test_cancel() {
        let mut t = TestApp::new().await;
        ready(&mut t).await;

        let start = json(t.post("/checkout/pay/stripe").await).await;
        let order_id = start["order"]["id"].as_str().unwrap().to_string();

        let order = json(t.get(&format!("/checkout/cancel/{}", order_id)).await).await;
        assert_eq!(order["status"], "cancelled");
    }

    #[tokio::test]
    async fn test_unknown_or_unconfigured_method() {
        let mut t = TestApp::new().await;
        ready(&mut t).await;

        let response = t.post("/checkout/pay/bitcoin").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = t.post("/checkout/pay/paypal").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let orders = json(t.get("/account/orders").await).await;
        assert!(orders.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_provider_reference() {
        let mut t = TestApp::new().await;
        ready(&mut t).await;
        let response = t.get("/checkout/paypal/success/some-order").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
