//! Shared fixtures for the service tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use comptoir_core::{Address, Carrier, Money, PaymentMethod, Product, User};
use comptoir_db::{Database, DbConfig};
use comptoir_payments::{
    ConfirmationStatus, GatewayError, GatewayResult, PaymentConfirmation, PaymentGateway,
    PaymentSession, PaymentSessionRequest,
};
use uuid::Uuid;

pub struct TestShop {
    pub db: Database,
    /// €10.00, 5 in stock.
    pub wine: Product,
    /// €8.50, 20 in stock.
    pub cheese: Product,
    /// €6.90, "48h".
    pub carrier: Carrier,
    pub user: User,
    pub address: Address,
}

pub fn user(email: &str) -> User {
    User {
        id: Uuid::new_v4().to_string(),
        email: email.to_string(),
        password_hash: "$argon2id$v=19$stub".to_string(),
        first_name: "Camille".to_string(),
        last_name: "Martin".to_string(),
        created_at: Utc::now(),
    }
}

pub fn address(user_id: &str) -> Address {
    Address {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        full_name: "Camille Martin".to_string(),
        phone: None,
        street: "12 rue des Vignes".to_string(),
        street_complement: None,
        postal_code: "33000".to_string(),
        city: "Bordeaux".to_string(),
        country: "France".to_string(),
        is_default: false,
        created_at: Utc::now(),
    }
}

pub async fn seeded() -> TestShop {
    seeded_on(DbConfig::in_memory()).await
}

/// Same shop on a caller-chosen database (file-backed, pooled).
pub async fn seeded_on(config: DbConfig) -> TestShop {
    let db = Database::new(config).await.unwrap();

    let wine = db
        .products()
        .insert(&Product::new("bordeaux-rouge", "Bordeaux Rouge", 1000, 5))
        .await
        .unwrap();
    let cheese = db
        .products()
        .insert(&Product::new("comte-18-mois", "Comté 18 mois", 850, 20))
        .await
        .unwrap();

    let mut carrier = Carrier::new("Colissimo", 690, 1);
    carrier.delivery_time = Some("48h".to_string());
    let carrier = db.carriers().insert(&carrier).await.unwrap();

    let user = db.users().insert(&user("camille@example.com")).await.unwrap();
    let address = db.addresses().insert(&address(&user.id)).await.unwrap();

    TestShop {
        db,
        wine,
        cheese,
        carrier,
        user,
        address,
    }
}

/// In-process gateway that records requests and answers from a script.
pub struct FakeGateway {
    method: PaymentMethod,
    pub status: Mutex<ConfirmationStatus>,
    pub amount: Mutex<Option<Money>>,
    pub fail_create: bool,
    pub requests: Mutex<Vec<PaymentSessionRequest>>,
    pub confirms: Mutex<Vec<String>>,
}

impl FakeGateway {
    pub fn new(method: PaymentMethod) -> Arc<Self> {
        Arc::new(FakeGateway {
            method,
            status: Mutex::new(ConfirmationStatus::Paid),
            amount: Mutex::new(None),
            fail_create: false,
            requests: Mutex::new(Vec::new()),
            confirms: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(method: PaymentMethod) -> Arc<Self> {
        Arc::new(FakeGateway {
            method,
            status: Mutex::new(ConfirmationStatus::Paid),
            amount: Mutex::new(None),
            fail_create: true,
            requests: Mutex::new(Vec::new()),
            confirms: Mutex::new(Vec::new()),
        })
    }

    pub fn confirm_count(&self) -> usize {
        self.confirms.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    fn method(&self) -> PaymentMethod {
        self.method
    }

    async fn create_payment_session(
        &self,
        request: &PaymentSessionRequest,
    ) -> GatewayResult<PaymentSession> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail_create {
            return Err(GatewayError::Provider {
                provider: "fake",
                status: 502,
                message: "processor down".to_string(),
            });
        }
        Ok(PaymentSession {
            redirect_url: format!("https://pay.example/{}", request.order_id),
            provider_session_id: format!("sess_{}", request.order_id),
        })
    }

    async fn confirm_payment(&self, provider_ref: &str) -> GatewayResult<PaymentConfirmation> {
        self.confirms.lock().unwrap().push(provider_ref.to_string());
        Ok(PaymentConfirmation {
            status: *self.status.lock().unwrap(),
            provider_transaction_id: Some(format!("txn_{}", provider_ref)),
            confirmed_amount: *self.amount.lock().unwrap(),
            currency: Some("EUR".to_string()),
            order_reference: provider_ref.strip_prefix("sess_").map(str::to_string),
        })
    }
}
