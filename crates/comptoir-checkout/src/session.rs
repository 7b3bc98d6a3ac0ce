//! # Visitor Sessions
//!
//! Every service call names the visitor explicitly with a [`SessionId`];
//! nothing reads an ambient "current request". The storefront turns its
//! cookie into a `SessionId` and passes it down.
//!
//! [`SessionStore`] wraps the session repository with the typed values the
//! services keep there.

use std::fmt;

use comptoir_core::{CartLines, CheckoutState};
use comptoir_db::{Database, CART_KEY, CHECKOUT_KEY, USER_KEY};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::{CheckoutError, CheckoutResult};

/// Opaque visitor identifier (UUID v4 string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Issues a fresh identifier.
    pub fn new() -> Self {
        SessionId(Uuid::new_v4().to_string())
    }

    /// Accepts a client supplied identifier only if it is a UUID.
    ///
    /// Anything else is treated as "no session" so a client can't pick
    /// arbitrary keys.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim())
            .ok()
            .map(|uuid| SessionId(uuid.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Typed access to the session keys.
///
/// A stored value that no longer decodes is logged and treated as absent,
/// so a bad cookie can never lock a visitor out of the shop.
#[derive(Debug, Clone)]
pub struct SessionStore {
    db: Database,
}

impl SessionStore {
    pub fn new(db: Database) -> Self {
        SessionStore { db }
    }

    async fn load<T: DeserializeOwned + Default>(
        &self,
        session: &SessionId,
        key: &str,
    ) -> CheckoutResult<T> {
        match self.db.sessions().get_json::<T>(session.as_str(), key).await {
            Ok(value) => Ok(value.unwrap_or_default()),
            Err(comptoir_db::DbError::Serialization(reason)) => {
                warn!(session = %session, key = %key, reason = %reason, "Discarding unreadable session value");
                Ok(T::default())
            }
            Err(e) => Err(CheckoutError::Db(e)),
        }
    }

    pub async fn cart(&self, session: &SessionId) -> CheckoutResult<CartLines> {
        self.load(session, CART_KEY).await
    }

    pub async fn save_cart(&self, session: &SessionId, cart: &CartLines) -> CheckoutResult<()> {
        if cart.is_empty() {
            self.db.sessions().delete(session.as_str(), CART_KEY).await?;
        } else {
            self.db.sessions().put_json(session.as_str(), CART_KEY, cart).await?;
        }
        Ok(())
    }

    pub async fn checkout(&self, session: &SessionId) -> CheckoutResult<CheckoutState> {
        self.load(session, CHECKOUT_KEY).await
    }

    pub async fn save_checkout(
        &self,
        session: &SessionId,
        state: &CheckoutState,
    ) -> CheckoutResult<()> {
        if *state == CheckoutState::Empty {
            self.db.sessions().delete(session.as_str(), CHECKOUT_KEY).await?;
        } else {
            self.db
                .sessions()
                .put_json(session.as_str(), CHECKOUT_KEY, state)
                .await?;
        }
        Ok(())
    }

    /// Empties cart and checkout together (after payment).
    pub async fn clear_purchase(&self, session: &SessionId) -> CheckoutResult<()> {
        self.db
            .sessions()
            .delete_keys(session.as_str(), &[CART_KEY, CHECKOUT_KEY])
            .await?;
        Ok(())
    }

    /// The authenticated user bound to this session, if any.
    pub async fn user_id(&self, session: &SessionId) -> CheckoutResult<Option<String>> {
        self.load::<Option<String>>(session, USER_KEY).await
    }

    pub async fn bind_user(&self, session: &SessionId, user_id: &str) -> CheckoutResult<()> {
        self.db
            .sessions()
            .put_json(session.as_str(), USER_KEY, user_id)
            .await?;
        Ok(())
    }

    /// Moves the cart and checkout to a fresh id bound to `user_id`.
    ///
    /// The old id stops meaning anything, so a session id planted before
    /// login never becomes an authenticated one.
    pub async fn rotate(&self, old: &SessionId, user_id: &str) -> CheckoutResult<SessionId> {
        let fresh = SessionId::new();
        self.db
            .sessions()
            .migrate(old.as_str(), fresh.as_str(), &[CART_KEY, CHECKOUT_KEY])
            .await?;
        self.bind_user(&fresh, user_id).await?;
        Ok(fresh)
    }

    /// Forgets the user and everything else about the visitor.
    pub async fn destroy(&self, session: &SessionId) -> CheckoutResult<()> {
        self.db.sessions().destroy(session.as_str()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comptoir_db::DbConfig;

    #[test]
    fn test_parse_rejects_non_uuid() {
        assert!(SessionId::parse("not-a-uuid").is_none());
        assert!(SessionId::parse("../../etc").is_none());

        let id = SessionId::new();
        assert_eq!(SessionId::parse(id.as_str()), Some(id));
    }

    #[tokio::test]
    async fn test_corrupt_cart_reads_as_empty() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let session = SessionId::new();
        db.sessions()
            .put_json(session.as_str(), CART_KEY, &"garbage")
            .await
            .unwrap();

        let store = SessionStore::new(db);
        assert!(store.cart(&session).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_user_binding() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = SessionStore::new(db);
        let session = SessionId::new();

        assert_eq!(store.user_id(&session).await.unwrap(), None);
        store.bind_user(&session, "user-1").await.unwrap();
        assert_eq!(store.user_id(&session).await.unwrap().as_deref(), Some("user-1"));

        store.destroy(&session).await.unwrap();
        assert_eq!(store.user_id(&session).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rotate_keeps_cart_and_forgets_old_id() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = SessionStore::new(db);
        let old = SessionId::new();
        let mut cart = CartLines::new();
        cart.add("p-1", 2).unwrap();
        store.save_cart(&old, &cart).await.unwrap();

        let fresh = store.rotate(&old, "user-1").await.unwrap();
        assert_ne!(fresh, old);
        assert_eq!(store.user_id(&fresh).await.unwrap().as_deref(), Some("user-1"));
        assert_eq!(store.cart(&fresh).await.unwrap().quantity_of("p-1"), 2);

        assert_eq!(store.user_id(&old).await.unwrap(), None);
        assert!(store.cart(&old).await.unwrap().is_empty());
    }
}
