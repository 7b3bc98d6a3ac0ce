//! # Stripe Checkout Adapter
//!
//! Hosted Checkout Sessions, confirmed by reading the session back
//! (redirect-and-poll). Reading is side-effect free, so confirming the same
//! session twice is harmless.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use comptoir_core::{Money, PaymentMethod};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{
    ConfirmationStatus, PaymentConfirmation, PaymentGateway, PaymentSession,
    PaymentSessionRequest,
};

const PROVIDER: &str = "Stripe";

/// Placeholder Stripe substitutes with the checkout session id.
const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

// =============================================================================
// Configuration
// =============================================================================

/// Stripe configuration
#[derive(Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub publishable_key: Option<String>,
    /// API root, overridable for tests.
    pub base_url: String,
    /// Hosted page language, e.g. "fr".
    pub locale: Option<String>,
    pub timeout: Duration,
}

impl StripeConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        StripeConfig {
            secret_key: secret_key.into(),
            publishable_key: None,
            base_url: "https://api.stripe.com".to_string(),
            locale: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("locale", &self.locale)
            .finish()
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct CheckoutSessionResponse {
    id: String,
    url: Option<String>,
    /// `paid`, `unpaid` or `no_payment_required`.
    payment_status: Option<String>,
    /// `open`, `complete` or `expired`.
    status: Option<String>,
    payment_intent: Option<String>,
    amount_total: Option<i64>,
    currency: Option<String>,
    client_reference_id: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

impl CheckoutSessionResponse {
    /// The order id sent at creation, read back from either field.
    fn order_reference(&mut self) -> Option<String> {
        self.client_reference_id
            .take()
            .or_else(|| self.metadata.remove("order_id"))
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error.message)
        .unwrap_or_else(|| body.to_string())
}

// =============================================================================
// Gateway
// =============================================================================

/// Stripe payment processor
#[derive(Debug, Clone)]
pub struct StripeGateway {
    config: StripeConfig,
    client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> GatewayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Configuration(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Form fields for `POST /v1/checkout/sessions`.
    fn session_form(&self, request: &PaymentSessionRequest) -> Vec<(String, String)> {
        let separator = if request.return_url.contains('?') { '&' } else { '?' };
        let success_url = format!(
            "{}{}session_id={}",
            request.return_url, separator, SESSION_ID_PLACEHOLDER
        );
        let currency = request.currency.to_lowercase();

        let mut params: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("success_url".to_string(), success_url),
            ("cancel_url".to_string(), request.cancel_url.clone()),
            ("client_reference_id".to_string(), request.order_id.clone()),
            ("metadata[order_id]".to_string(), request.order_id.clone()),
        ];

        for (key, value) in &request.metadata {
            params.push((format!("metadata[{}]", key), value.clone()));
        }

        if let Some(email) = &request.customer_email {
            params.push(("customer_email".to_string(), email.clone()));
        }

        if let Some(locale) = &self.config.locale {
            params.push(("locale".to_string(), locale.clone()));
        }

        for (i, item) in request.line_items.iter().enumerate() {
            let prefix = format!("line_items[{}]", i);
            params.push((format!("{prefix}[price_data][currency]"), currency.clone()));
            params.push((format!("{prefix}[price_data][product_data][name]"), item.name.clone()));
            if let Some(description) = item.description.as_deref().filter(|d| !d.is_empty()) {
                params.push((
                    format!("{prefix}[price_data][product_data][description]"),
                    description.to_string(),
                ));
            }
            params.push((
                format!("{prefix}[price_data][unit_amount]"),
                item.unit_amount.cents().to_string(),
            ));
            params.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
        }

        params
    }

    async fn read_session(&self, response: reqwest::Response) -> GatewayResult<CheckoutSessionResponse> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            warn!("Stripe API error: {}", error_text);
            return Err(GatewayError::Provider {
                provider: PROVIDER,
                status,
                message: error_message(&error_text),
            });
        }

        response.json().await.map_err(|e| {
            GatewayError::invalid(PROVIDER, format!("Failed to parse Stripe response: {}", e))
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Stripe
    }

    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    async fn create_payment_session(
        &self,
        request: &PaymentSessionRequest,
    ) -> GatewayResult<PaymentSession> {
        let params = self.session_form(request);

        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.config.base_url))
            .basic_auth(&self.config.secret_key, Some(""))
            .form(&params)
            .send()
            .await
            .map_err(|e| GatewayError::transport(PROVIDER, e))?;

        let session = self.read_session(response).await?;
        let redirect_url = session
            .url
            .ok_or_else(|| GatewayError::invalid(PROVIDER, "checkout session has no url"))?;

        info!("Checkout session created: {}", session.id);
        Ok(PaymentSession {
            redirect_url,
            provider_session_id: session.id,
        })
    }

    #[instrument(skip(self))]
    async fn confirm_payment(&self, provider_ref: &str) -> GatewayResult<PaymentConfirmation> {
        let response = self
            .client
            .get(format!(
                "{}/v1/checkout/sessions/{}",
                self.config.base_url, provider_ref
            ))
            .basic_auth(&self.config.secret_key, Some(""))
            .send()
            .await
            .map_err(|e| GatewayError::transport(PROVIDER, e))?;

        let mut session = self.read_session(response).await?;

        let status = match (session.payment_status.as_deref(), session.status.as_deref()) {
            (Some("paid"), _) => ConfirmationStatus::Paid,
            (_, Some("expired")) => ConfirmationStatus::Failed,
            _ => ConfirmationStatus::Pending,
        };

        info!(session_id = %session.id, status = ?status, "Checkout session read");
        Ok(PaymentConfirmation {
            status,
            order_reference: session.order_reference(),
            provider_transaction_id: session.payment_intent,
            confirmed_amount: session.amount_total.map(Money::from_cents),
            currency: session.currency.map(|c| c.to_uppercase()),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::LineItem;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(server: &MockServer) -> StripeGateway {
        StripeGateway::new(StripeConfig::new("sk_test_123").base_url(server.uri())).unwrap()
    }

    fn request() -> PaymentSessionRequest {
        PaymentSessionRequest {
            order_id: "order-1".to_string(),
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
            return_url: "http://shop.test/checkout/success/order-1".to_string(),
            cancel_url: "http://shop.test/checkout/cancel/order-1".to_string(),
            customer_email: Some("camille@example.com".to_string()),
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn test_session_form() {
        let gateway = StripeGateway::new(StripeConfig::new("sk")).unwrap();
        let form = gateway.session_form(&request());
        let get = |key: &str| {
            form.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(
            get("success_url"),
            Some("http://shop.test/checkout/success/order-1?session_id={CHECKOUT_SESSION_ID}")
        );
        assert_eq!(get("line_items[0][price_data][currency]"), Some("eur"));
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("1000"));
        assert_eq!(get("line_items[0][quantity]"), Some("2"));
        assert_eq!(get("line_items[0][price_data][product_data][description]"), None);
        assert_eq!(
            get("line_items[1][price_data][product_data][name]"),
            Some("Delivery - Colissimo")
        );
        assert_eq!(get("metadata[order_id]"), Some("order-1"));
        assert_eq!(get("customer_email"), Some("camille@example.com"));
    }

    #[tokio::test]
    async fn test_create_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .and(header("authorization", "Basic c2tfdGVzdF8xMjM6"))
            .and(body_string_contains("mode=payment"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_test_1",
                "url": "https://checkout.stripe.com/c/pay/cs_test_1",
                "payment_status": "unpaid",
                "status": "open"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = gateway(&server).create_payment_session(&request()).await.unwrap();
        assert_eq!(session.provider_session_id, "cs_test_1");
        assert_eq!(session.redirect_url, "https://checkout.stripe.com/c/pay/cs_test_1");
    }

    #[tokio::test]
    async fn test_create_session_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "message": "Invalid currency: zzz" }
            })))
            .mount(&server)
            .await;

        let err = gateway(&server).create_payment_session(&request()).await.unwrap_err();
        match err {
            GatewayError::Provider { status, message, .. } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid currency: zzz");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_confirm_paid_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/cs_test_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_test_1",
                "url": null,
                "payment_status": "paid",
                "status": "complete",
                "payment_intent": "pi_123",
                "amount_total": 2690,
                "currency": "eur",
                "client_reference_id": "order-1"
            })))
            .mount(&server)
            .await;

        let gateway = gateway(&server);
        let confirmation = gateway.confirm_payment("cs_test_1").await.unwrap();
        assert!(confirmation.is_paid());
        assert_eq!(confirmation.provider_transaction_id.as_deref(), Some("pi_123"));
        assert_eq!(confirmation.confirmed_amount, Some(Money::from_cents(2690)));
        assert_eq!(confirmation.currency.as_deref(), Some("EUR"));
        assert_eq!(confirmation.order_reference.as_deref(), Some("order-1"));

        // Reading again reports the same thing.
        assert!(gateway.confirm_payment("cs_test_1").await.unwrap().is_paid());
    }

    #[tokio::test]
    async fn test_confirm_unpaid_and_expired() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/cs_open"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_open", "payment_status": "unpaid", "status": "open",
                "metadata": { "order_id": "order-7" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/cs_gone"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_gone", "payment_status": "unpaid", "status": "expired"
            })))
            .mount(&server)
            .await;

        let gateway = gateway(&server);
        let open = gateway.confirm_payment("cs_open").await.unwrap();
        assert_eq!(open.status, ConfirmationStatus::Pending);
        assert_eq!(open.order_reference.as_deref(), Some("order-7"));
        assert_eq!(
            gateway.confirm_payment("cs_gone").await.unwrap().status,
            ConfirmationStatus::Failed
        );
    }
}
