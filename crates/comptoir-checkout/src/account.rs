//! # Customer Accounts
//!
//! Registration and login, profile and password changes, the address book
//! used by the checkout, and the order history.
//!
//! Login rotates the visitor session: the cart moves to a fresh id and the
//! id the visitor arrived with is dropped.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use comptoir_core::validation::{
    validate_email, validate_optional, validate_password, validate_postal_code, validate_required,
};
use comptoir_core::{Address, Order, OrderDetails, User, DEFAULT_COUNTRY};
use comptoir_db::{Database, DbError};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{CheckoutError, CheckoutResult};
use crate::session::{SessionId, SessionStore};

const NAME_MAX: usize = 100;

/// Registration form.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Profile edit form.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdate {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

/// Address book entry form.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAddress {
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub street: String,
    #[serde(default)]
    pub street_complement: Option<String>,
    pub postal_code: String,
    pub city: String,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AccountService {
    db: Database,
    sessions: SessionStore,
}

impl AccountService {
    pub fn new(db: Database) -> Self {
        let sessions = SessionStore::new(db.clone());
        AccountService { db, sessions }
    }

    // =========================================================================
    // Identity
    // =========================================================================

    pub async fn register(&self, form: Registration) -> CheckoutResult<User> {
        let email = validate_email(&form.email)?;
        validate_password(&form.password)?;
        let first_name = validate_required("first_name", &form.first_name, NAME_MAX)?;
        let last_name = validate_required("last_name", &form.last_name, NAME_MAX)?;

        if self.db.users().get_by_email(&email).await?.is_some() {
            return Err(email_taken(&email));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            email,
            password_hash: hash_password(&form.password)?,
            first_name,
            last_name,
            created_at: Utc::now(),
        };

        let user = self.db.users().insert(&user).await.map_err(|e| match e {
            DbError::UniqueViolation { .. } => email_taken(&user.email),
            other => CheckoutError::Db(other),
        })?;

        info!(user_id = %user.id, "Customer registered");
        Ok(user)
    }

    /// Checks credentials and returns the user with the session id to use
    /// from now on.
    ///
    /// The cart and checkout survive the login under the new id; the id
    /// passed in is forgotten.
    pub async fn login(
        &self,
        session: &SessionId,
        email: &str,
        password: &str,
    ) -> CheckoutResult<(User, SessionId)> {
        let rejected = || CheckoutError::Unauthorized("Invalid email or password".to_string());

        let email = validate_email(email).map_err(|_| rejected())?;
        let user = self
            .db
            .users()
            .get_by_email(&email)
            .await?
            .ok_or_else(rejected)?;

        if !verify_password(password, &user.password_hash) {
            debug!(user_id = %user.id, "Rejected login");
            return Err(rejected());
        }

        let session = self.sessions.rotate(session, &user.id).await?;
        info!(user_id = %user.id, "Customer logged in");
        Ok((user, session))
    }

    /// Forgets the visitor entirely: user binding, cart and checkout.
    pub async fn logout(&self, session: &SessionId) -> CheckoutResult<()> {
        self.sessions.destroy(session).await
    }

    pub async fn current_user(&self, session: &SessionId) -> CheckoutResult<Option<User>> {
        match self.sessions.user_id(session).await? {
            Some(user_id) => Ok(self.db.users().get_by_id(&user_id).await?),
            None => Ok(None),
        }
    }

    /// The logged in user, or `Unauthorized`.
    pub async fn require_user(&self, session: &SessionId) -> CheckoutResult<User> {
        self.current_user(session)
            .await?
            .ok_or_else(CheckoutError::login_required)
    }

    // =========================================================================
    // Profile
    // =========================================================================

    pub async fn update_profile(&self, user_id: &str, form: ProfileUpdate) -> CheckoutResult<User> {
        let mut user = self.user(user_id).await?;
        user.email = validate_email(&form.email)?;
        user.first_name = validate_required("first_name", &form.first_name, NAME_MAX)?;
        user.last_name = validate_required("last_name", &form.last_name, NAME_MAX)?;

        self.db.users().update_profile(&user).await.map_err(|e| match e {
            DbError::UniqueViolation { .. } => email_taken(&user.email),
            other => CheckoutError::Db(other),
        })?;

        info!(user_id = %user.id, "Profile updated");
        Ok(user)
    }

    /// Replaces the password after checking the current one.
    pub async fn change_password(&self, user_id: &str, form: PasswordChange) -> CheckoutResult<()> {
        let user = self.user(user_id).await?;
        if !verify_password(&form.current_password, &user.password_hash) {
            debug!(user_id = %user.id, "Rejected password change");
            return Err(CheckoutError::Unauthorized(
                "Current password is incorrect".to_string(),
            ));
        }
        validate_password(&form.new_password)?;

        let hash = hash_password(&form.new_password)?;
        self.db.users().set_password_hash(&user.id, &hash).await?;
        info!(user_id = %user.id, "Password changed");
        Ok(())
    }

    async fn user(&self, user_id: &str) -> CheckoutResult<User> {
        self.db
            .users()
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| CheckoutError::not_found("User", user_id))
    }

    // =========================================================================
    // Address Book
    // =========================================================================

    /// Adds an address. The first address of a user becomes the default.
    pub async fn add_address(&self, user_id: &str, form: NewAddress) -> CheckoutResult<Address> {
        let is_first = self.db.addresses().list_by_user(user_id).await?.is_empty();

        let address = Address {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            is_default: is_first,
            created_at: Utc::now(),
            ..validated_address(form)?
        };

        Ok(self.db.addresses().insert(&address).await?)
    }

    /// Rewrites an owned address. Orders placed with it keep their snapshot.
    pub async fn update_address(
        &self,
        user_id: &str,
        address_id: &str,
        form: NewAddress,
    ) -> CheckoutResult<Address> {
        let current = self
            .db
            .addresses()
            .get_for_user(address_id, user_id)
            .await?
            .ok_or_else(|| CheckoutError::not_found("Address", address_id))?;

        let address = Address {
            id: current.id,
            user_id: current.user_id,
            is_default: current.is_default,
            created_at: current.created_at,
            ..validated_address(form)?
        };

        if !self.db.addresses().update_for_user(&address).await? {
            return Err(CheckoutError::not_found("Address", address_id));
        }
        Ok(address)
    }

    pub async fn set_default_address(&self, user_id: &str, address_id: &str) -> CheckoutResult<()> {
        if !self.db.addresses().set_default_for_user(address_id, user_id).await? {
            return Err(CheckoutError::not_found("Address", address_id));
        }
        Ok(())
    }

    pub async fn list_addresses(&self, user_id: &str) -> CheckoutResult<Vec<Address>> {
        Ok(self.db.addresses().list_by_user(user_id).await?)
    }

    /// Deletes an address of the user. Past orders keep their snapshot.
    pub async fn delete_address(&self, user_id: &str, address_id: &str) -> CheckoutResult<()> {
        if !self.db.addresses().delete_for_user(address_id, user_id).await? {
            return Err(CheckoutError::not_found("Address", address_id));
        }
        Ok(())
    }

    // =========================================================================
    // Order History
    // =========================================================================

    /// Newest first.
    pub async fn list_orders(&self, user_id: &str) -> CheckoutResult<Vec<Order>> {
        Ok(self.db.orders().list_by_user(user_id).await?)
    }

    pub async fn get_order(&self, user_id: &str, order_id: &str) -> CheckoutResult<OrderDetails> {
        self.db
            .orders()
            .get_details(order_id)
            .await?
            .filter(|d| d.order.is_owned_by(user_id))
            .ok_or_else(|| CheckoutError::not_found("Order", order_id))
    }
}

/// The form's fields, validated. Identity fields are left blank for the
/// caller to fill.
fn validated_address(form: NewAddress) -> CheckoutResult<Address> {
    let country = match form.country.as_deref() {
        Some(country) if !country.trim().is_empty() => {
            validate_required("country", country, NAME_MAX)?
        }
        _ => DEFAULT_COUNTRY.to_string(),
    };

    Ok(Address {
        id: String::new(),
        user_id: String::new(),
        full_name: validate_required("full_name", &form.full_name, NAME_MAX)?,
        phone: validate_optional("phone", form.phone.as_deref(), 30)?,
        street: validate_required("street", &form.street, 255)?,
        street_complement: validate_optional(
            "street_complement",
            form.street_complement.as_deref(),
            255,
        )?,
        postal_code: validate_postal_code(&form.postal_code)?,
        city: validate_required("city", &form.city, NAME_MAX)?,
        country,
        is_default: false,
        created_at: Utc::now(),
    })
}

fn email_taken(email: &str) -> CheckoutError {
    CheckoutError::Conflict(format!("An account already exists for {}", email))
}

fn hash_password(password: &str) -> CheckoutResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CheckoutError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartManager;
    use crate::testing::seeded;

    fn registration(email: &str) -> Registration {
        Registration {
            email: email.to_string(),
            password: "correct horse".to_string(),
            first_name: "Lou".to_string(),
            last_name: "Bernard".to_string(),
        }
    }

    fn new_address() -> NewAddress {
        NewAddress {
            full_name: "Lou Bernard".to_string(),
            phone: None,
            street: "3 place du Marché".to_string(),
            street_complement: Some("  ".to_string()),
            postal_code: "69002".to_string(),
            city: "Lyon".to_string(),
            country: None,
        }
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let shop = seeded().await;
        let accounts = AccountService::new(shop.db.clone());
        let session = SessionId::new();

        let user = accounts.register(registration("Lou@Example.com")).await.unwrap();
        assert_eq!(user.email, "lou@example.com");
        assert!(user.password_hash.starts_with("$argon2"));

        assert!(matches!(
            accounts.register(registration("lou@example.com")).await,
            Err(CheckoutError::Conflict(_))
        ));

        assert!(matches!(
            accounts.login(&session, "lou@example.com", "wrong password").await,
            Err(CheckoutError::Unauthorized(_))
        ));
        assert!(accounts.current_user(&session).await.unwrap().is_none());

        let (logged_in, rotated) = accounts
            .login(&session, "lou@example.com", "correct horse")
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);
        assert_ne!(rotated, session);
        assert_eq!(accounts.require_user(&rotated).await.unwrap().id, user.id);
        assert!(accounts.current_user(&session).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_carries_cart_to_new_session() {
        let shop = seeded().await;
        let accounts = AccountService::new(shop.db.clone());
        let cart = CartManager::new(shop.db.clone());
        let visitor = SessionId::new();

        accounts.register(registration("lou@example.com")).await.unwrap();
        cart.add(&visitor, &shop.wine.id, 2).await.unwrap();

        let (_, session) = accounts
            .login(&visitor, "lou@example.com", "correct horse")
            .await
            .unwrap();
        assert!(cart.is_empty(&visitor).await.unwrap());
        assert!(!cart.is_empty(&session).await.unwrap());
    }

    #[tokio::test]
    async fn test_register_validates() {
        let shop = seeded().await;
        let accounts = AccountService::new(shop.db.clone());

        let mut short = registration("a@example.com");
        short.password = "short".to_string();
        assert!(matches!(
            accounts.register(short).await,
            Err(CheckoutError::Validation(_))
        ));
        assert!(matches!(
            accounts.register(registration("not-an-email")).await,
            Err(CheckoutError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_logout_forgets_session() {
        let shop = seeded().await;
        let accounts = AccountService::new(shop.db.clone());
        let cart = CartManager::new(shop.db.clone());
        let session = SessionId::new();

        accounts.register(registration("lou@example.com")).await.unwrap();
        let (_, session) = accounts
            .login(&session, "lou@example.com", "correct horse")
            .await
            .unwrap();
        cart.add(&session, &shop.wine.id, 1).await.unwrap();

        accounts.logout(&session).await.unwrap();
        assert!(matches!(
            accounts.require_user(&session).await,
            Err(CheckoutError::Unauthorized(_))
        ));
        assert!(cart.is_empty(&session).await.unwrap());
    }

    #[tokio::test]
    async fn test_address_book() {
        let shop = seeded().await;
        let accounts = AccountService::new(shop.db.clone());

        let address = accounts.add_address(&shop.user.id, new_address()).await.unwrap();
        assert_eq!(address.country, "France");
        assert_eq!(address.street_complement, None);
        assert_eq!(accounts.list_addresses(&shop.user.id).await.unwrap().len(), 2);

        assert!(matches!(
            accounts.delete_address("someone-else", &address.id).await,
            Err(CheckoutError::NotFound(_))
        ));
        accounts.delete_address(&shop.user.id, &address.id).await.unwrap();
        assert_eq!(accounts.list_addresses(&shop.user.id).await.unwrap().len(), 1);

        let mut bad = new_address();
        bad.postal_code = "!!".to_string();
        assert!(accounts.add_address(&shop.user.id, bad).await.is_err());
    }

    #[tokio::test]
    async fn test_edit_and_default_address() {
        let shop = seeded().await;
        let accounts = AccountService::new(shop.db.clone());
        let user = accounts.register(registration("lou@example.com")).await.unwrap();

        let home = accounts.add_address(&user.id, new_address()).await.unwrap();
        let work = accounts.add_address(&user.id, new_address()).await.unwrap();
        assert!(home.is_default);
        assert!(!work.is_default);

        let mut moved = new_address();
        moved.city = "Villeurbanne".to_string();
        moved.postal_code = "69100".to_string();
        let updated = accounts.update_address(&user.id, &work.id, moved.clone()).await.unwrap();
        assert_eq!(updated.city, "Villeurbanne");
        assert_eq!(updated.created_at, work.created_at);
        assert!(matches!(
            accounts.update_address(&shop.user.id, &work.id, moved).await,
            Err(CheckoutError::NotFound(_))
        ));

        accounts.set_default_address(&user.id, &work.id).await.unwrap();
        let listed = accounts.list_addresses(&user.id).await.unwrap();
        assert_eq!(listed[0].id, work.id);
        assert_eq!(listed.iter().filter(|a| a.is_default).count(), 1);
        assert!(matches!(
            accounts.set_default_address(&shop.user.id, &home.id).await,
            Err(CheckoutError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_profile() {
        let shop = seeded().await;
        let accounts = AccountService::new(shop.db.clone());
        let user = accounts.register(registration("lou@example.com")).await.unwrap();

        let updated = accounts
            .update_profile(
                &user.id,
                ProfileUpdate {
                    email: " Lou.Bernard@Example.com ".to_string(),
                    first_name: "Louise".to_string(),
                    last_name: "Bernard".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.email, "lou.bernard@example.com");
        assert_eq!(updated.first_name, "Louise");

        let taken = ProfileUpdate {
            email: shop.user.email.clone(),
            first_name: "Louise".to_string(),
            last_name: "Bernard".to_string(),
        };
        assert!(matches!(
            accounts.update_profile(&user.id, taken).await,
            Err(CheckoutError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_change_password() {
        let shop = seeded().await;
        let accounts = AccountService::new(shop.db.clone());
        let user = accounts.register(registration("lou@example.com")).await.unwrap();

        let wrong = PasswordChange {
            current_password: "not it".to_string(),
            new_password: "battery staple".to_string(),
        };
        assert!(matches!(
            accounts.change_password(&user.id, wrong).await,
            Err(CheckoutError::Unauthorized(_))
        ));

        let too_short = PasswordChange {
            current_password: "correct horse".to_string(),
            new_password: "short".to_string(),
        };
        assert!(matches!(
            accounts.change_password(&user.id, too_short).await,
            Err(CheckoutError::Validation(_))
        ));

        let change = PasswordChange {
            current_password: "correct horse".to_string(),
            new_password: "battery staple".to_string(),
        };
        accounts.change_password(&user.id, change).await.unwrap();

        let session = SessionId::new();
        assert!(accounts.login(&session, "lou@example.com", "correct horse").await.is_err());
        assert!(accounts.login(&session, "lou@example.com", "battery staple").await.is_ok());
    }

    #[tokio::test]
    async fn test_foreign_order_hidden() {
        let shop = seeded().await;
        let accounts = AccountService::new(shop.db.clone());

        assert!(accounts.list_orders(&shop.user.id).await.unwrap().is_empty());
        assert!(matches!(
            accounts.get_order(&shop.user.id, "missing").await,
            Err(CheckoutError::NotFound(_))
        ));
    }
}
