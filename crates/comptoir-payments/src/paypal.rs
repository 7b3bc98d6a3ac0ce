//! # PayPal Orders Adapter
//!
//! Orders v2 with intent `CAPTURE`: we create a PayPal order, the customer
//! approves it on paypal.com, and confirmation captures it.
//!
//! ## Repeated Capture
//! ```text
//! confirm_payment(id)
//!    │
//!    ▼
//! POST /v2/checkout/orders/{id}/capture
//!    ├── 201 COMPLETED ─────────────────────────────► Paid
//!    ├── 422 ORDER_ALREADY_CAPTURED
//!    │      └── GET /v2/checkout/orders/{id} ───────► Paid (same capture id)
//!    └── other error ───────────────────────────────► GatewayError
//! ```
//!
//! A browser refresh on the return URL therefore never turns a successful
//! payment into an error.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use comptoir_core::{Money, PaymentMethod};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{
    ConfirmationStatus, PaymentConfirmation, PaymentGateway, PaymentSession,
    PaymentSessionRequest,
};

const PROVIDER: &str = "PayPal";
const ALREADY_CAPTURED: &str = "ORDER_ALREADY_CAPTURED";

// =============================================================================
// Configuration
// =============================================================================

/// Which PayPal environment to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayPalMode {
    #[default]
    Sandbox,
    Live,
}

impl PayPalMode {
    pub fn api_base(&self) -> &'static str {
        match self {
            PayPalMode::Sandbox => "https://api-m.sandbox.paypal.com",
            PayPalMode::Live => "https://api-m.paypal.com",
        }
    }
}

impl fmt::Display for PayPalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayPalMode::Sandbox => write!(f, "sandbox"),
            PayPalMode::Live => write!(f, "live"),
        }
    }
}

impl FromStr for PayPalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sandbox" => Ok(PayPalMode::Sandbox),
            "live" | "production" => Ok(PayPalMode::Live),
            _ => Err(format!("Unknown PayPal mode: {}", s)),
        }
    }
}

#[derive(Clone)]
pub struct PayPalConfig {
    pub client_id: String,
    pub client_secret: String,
    pub mode: PayPalMode,
    /// Overrides the mode's API root (tests).
    pub base_url: Option<String>,
    /// Shop name shown on the approval page.
    pub brand_name: Option<String>,
    /// e.g. "fr-FR".
    pub locale: Option<String>,
    pub timeout: Duration,
}

impl PayPalConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>, mode: PayPalMode) -> Self {
        PayPalConfig {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            mode,
            base_url: None,
            brand_name: None,
            locale: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    fn api_base(&self) -> &str {
        self.base_url.as_deref().unwrap_or_else(|| self.mode.api_base())
    }
}

impl fmt::Debug for PayPalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayPalConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("mode", &self.mode)
            .field("base_url", &self.base_url)
            .finish()
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
    rel: String,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    status: String,
    #[serde(default)]
    links: Vec<Link>,
    #[serde(default)]
    purchase_units: Vec<PurchaseUnit>,
}

#[derive(Debug, Deserialize)]
struct PurchaseUnit {
    custom_id: Option<String>,
    reference_id: Option<String>,
    payments: Option<PurchasePayments>,
}

#[derive(Debug, Deserialize)]
struct PurchasePayments {
    #[serde(default)]
    captures: Vec<Capture>,
}

#[derive(Debug, Deserialize)]
struct Capture {
    id: String,
    status: Option<String>,
    amount: Option<Amount>,
}

#[derive(Debug, Deserialize)]
struct Amount {
    currency_code: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: Option<String>,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    issue: String,
    description: Option<String>,
}

impl ErrorResponse {
    fn has_issue(&self, issue: &str) -> bool {
        self.details.iter().any(|d| d.issue == issue)
    }

    fn summary(&self) -> String {
        match self.details.first() {
            Some(detail) => match &detail.description {
                Some(description) => format!("{}: {}", detail.issue, description),
                None => detail.issue.clone(),
            },
            None => self.message.clone().unwrap_or_default(),
        }
    }
}

impl OrderResponse {
    fn approve_url(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|l| l.rel == "approve" || l.rel == "payer-action")
            .map(|l| l.href.as_str())
    }

    fn first_capture(&self) -> Option<&Capture> {
        self.purchase_units
            .iter()
            .filter_map(|u| u.payments.as_ref())
            .flat_map(|p| p.captures.iter())
            .next()
    }

    /// Our order id, as sent in `custom_id` when the order was created.
    fn order_reference(&self) -> Option<String> {
        self.purchase_units
            .first()
            .and_then(|u| u.custom_id.clone().or_else(|| u.reference_id.clone()))
    }

    fn into_confirmation(self) -> PaymentConfirmation {
        let capture = self.first_capture();
        let capture_status = capture.and_then(|c| c.status.as_deref());

        let status = match (self.status.as_str(), capture_status) {
            ("COMPLETED", None | Some("COMPLETED")) => ConfirmationStatus::Paid,
            (_, Some("DECLINED" | "FAILED")) | ("VOIDED", _) => ConfirmationStatus::Failed,
            _ => ConfirmationStatus::Pending,
        };

        PaymentConfirmation {
            status,
            provider_transaction_id: capture.map(|c| c.id.clone()),
            confirmed_amount: capture
                .and_then(|c| c.amount.as_ref())
                .and_then(|a| Money::parse_decimal(&a.value)),
            currency: capture
                .and_then(|c| c.amount.as_ref())
                .map(|a| a.currency_code.clone()),
            order_reference: self.order_reference(),
        }
    }
}

// =============================================================================
// Gateway
// =============================================================================

#[derive(Debug, Clone)]
pub struct PayPalGateway {
    config: PayPalConfig,
    client: reqwest::Client,
}

impl PayPalGateway {
    pub fn new(config: PayPalConfig) -> GatewayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Configuration(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// OAuth2 client-credentials token.
    async fn access_token(&self) -> GatewayResult<String> {
        let response = self
            .client
            .post(format!("{}/v1/oauth2/token", self.config.api_base()))
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| GatewayError::transport(PROVIDER, e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            warn!("PayPal authentication failed: {}", error_text);
            return Err(GatewayError::Provider {
                provider: PROVIDER,
                status,
                message: "authentication failed".to_string(),
            });
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            GatewayError::invalid(PROVIDER, format!("Failed to parse token response: {}", e))
        })?;

        Ok(token.access_token)
    }

    /// Body for `POST /v2/checkout/orders`.
    fn order_body(&self, request: &PaymentSessionRequest) -> serde_json::Value {
        let currency = request.currency.to_uppercase();

        let items: Vec<serde_json::Value> = request
            .line_items
            .iter()
            .map(|item| {
                json!({
                    "name": item.name,
                    "description": item.description.clone().unwrap_or_default(),
                    "unit_amount": {
                        "currency_code": currency,
                        "value": item.unit_amount.to_decimal_string(),
                    },
                    "quantity": item.quantity.to_string(),
                })
            })
            .collect();

        let mut application_context = json!({
            "return_url": request.return_url,
            "cancel_url": request.cancel_url,
            "landing_page": "BILLING",
            "shipping_preference": "NO_SHIPPING",
            "user_action": "PAY_NOW",
        });
        if let Some(brand) = &self.config.brand_name {
            application_context["brand_name"] = json!(brand);
        }
        if let Some(locale) = &self.config.locale {
            application_context["locale"] = json!(locale);
        }

        json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "reference_id": request.order_id,
                "custom_id": request.order_id,
                "amount": {
                    "currency_code": currency,
                    "value": request.amount.to_decimal_string(),
                    // delivery and tax travel as items, so they sum to the amount
                    "breakdown": {
                        "item_total": {
                            "currency_code": currency,
                            "value": request.items_total().to_decimal_string(),
                        },
                    },
                },
                "items": items,
            }],
            "application_context": application_context,
        })
    }

    async fn get_order(&self, token: &str, paypal_order_id: &str) -> GatewayResult<OrderResponse> {
        let response = self
            .client
            .get(format!(
                "{}/v2/checkout/orders/{}",
                self.config.api_base(),
                paypal_order_id
            ))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| GatewayError::transport(PROVIDER, e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            warn!("PayPal order lookup failed: {}", error_text);
            return Err(provider_error(status, &error_text));
        }

        response.json().await.map_err(|e| {
            GatewayError::invalid(PROVIDER, format!("Failed to parse order: {}", e))
        })
    }
}

fn provider_error(status: u16, body: &str) -> GatewayError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.summary())
        .unwrap_or_else(|_| body.to_string());

    GatewayError::Provider {
        provider: PROVIDER,
        status,
        message,
    }
}

#[async_trait]
impl PaymentGateway for PayPalGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Paypal
    }

    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    async fn create_payment_session(
        &self,
        request: &PaymentSessionRequest,
    ) -> GatewayResult<PaymentSession> {
        let token = self.access_token().await?;

        let response = self
            .client
            .post(format!("{}/v2/checkout/orders", self.config.api_base()))
            .bearer_auth(&token)
            .header("Prefer", "return=representation")
            .json(&self.order_body(request))
            .send()
            .await
            .map_err(|e| GatewayError::transport(PROVIDER, e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            warn!("PayPal API error: {}", error_text);
            return Err(provider_error(status, &error_text));
        }

        let order: OrderResponse = response.json().await.map_err(|e| {
            GatewayError::invalid(PROVIDER, format!("Failed to parse order: {}", e))
        })?;

        let redirect_url = order
            .approve_url()
            .ok_or_else(|| GatewayError::invalid(PROVIDER, "order has no approve link"))?
            .to_string();

        info!("PayPal order created: {}", order.id);
        Ok(PaymentSession {
            redirect_url,
            provider_session_id: order.id,
        })
    }

    #[instrument(skip(self))]
    async fn confirm_payment(&self, provider_ref: &str) -> GatewayResult<PaymentConfirmation> {
        let token = self.access_token().await?;

        let response = self
            .client
            .post(format!(
                "{}/v2/checkout/orders/{}/capture",
                self.config.api_base(),
                provider_ref
            ))
            .bearer_auth(&token)
            .header("Prefer", "return=representation")
            .json(&json!({}))
            .send()
            .await
            .map_err(|e| GatewayError::transport(PROVIDER, e))?;

        if response.status().is_success() {
            let order: OrderResponse = response.json().await.map_err(|e| {
                GatewayError::invalid(PROVIDER, format!("Failed to parse capture: {}", e))
            })?;
            info!(paypal_order = %order.id, status = %order.status, "PayPal order captured");
            return Ok(order.into_confirmation());
        }

        let status = response.status().as_u16();
        let error_text = response.text().await.unwrap_or_default();

        let already_captured = serde_json::from_str::<ErrorResponse>(&error_text)
            .map(|e| e.has_issue(ALREADY_CAPTURED))
            .unwrap_or(false);

        if already_captured {
            debug!(paypal_order = %provider_ref, "Order already captured, reading it back");
            let order = self.get_order(&token, provider_ref).await?;
            return Ok(order.into_confirmation());
        }

        warn!("PayPal capture failed: {}", error_text);
        Err(provider_error(status, &error_text))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
