//! # Address Repository
//!
//! The customer address book. Every read that serves a customer goes
//! through an owner-scoped query so one user can never select another
//! user's address.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use comptoir_core::Address;

const ADDRESS_COLUMNS: &str = "id, user_id, full_name, phone, street, street_complement, postal_code, city, country, is_default, created_at";

#[derive(Debug, Clone)]
pub struct AddressRepository {
    pool: SqlitePool,
}

impl AddressRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AddressRepository { pool }
    }

    /// All addresses of a user: the default one first, then oldest first.
    pub async fn list_by_user(&self, user_id: &str) -> DbResult<Vec<Address>> {
        let addresses = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE user_id = ?1 \
             ORDER BY is_default DESC, created_at, id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(addresses)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Address>> {
        let address = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(address)
    }

    /// Gets an address only if it belongs to `user_id`.
    ///
    /// A foreign address is reported as absent, same as a missing one.
    pub async fn get_for_user(&self, id: &str, user_id: &str) -> DbResult<Option<Address>> {
        let address = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = ?1 AND user_id = ?2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(address)
    }

    pub async fn insert(&self, address: &Address) -> DbResult<Address> {
        debug!(user_id = %address.user_id, "Inserting address");

        sqlx::query(
            r#"
            INSERT INTO addresses (
                id, user_id, full_name, phone, street, street_complement,
                postal_code, city, country, is_default, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&address.id)
        .bind(&address.user_id)
        .bind(&address.full_name)
        .bind(&address.phone)
        .bind(&address.street)
        .bind(&address.street_complement)
        .bind(&address.postal_code)
        .bind(&address.city)
        .bind(&address.country)
        .bind(address.is_default)
        .bind(address.created_at)
        .execute(&self.pool)
        .await?;

        Ok(address.clone())
    }

    /// Rewrites the postal fields of an owned address.
    ///
    /// The default flag and creation time are left alone. Returns `false`
    /// when the address is missing or belongs to someone else.
    pub async fn update_for_user(&self, address: &Address) -> DbResult<bool> {
        debug!(id = %address.id, "Updating address");

        let result = sqlx::query(
            r#"
            UPDATE addresses SET
                full_name = ?3,
                phone = ?4,
                street = ?5,
                street_complement = ?6,
                postal_code = ?7,
                city = ?8,
                country = ?9
            WHERE id = ?1 AND user_id = ?2
            "#,
        )
        .bind(&address.id)
        .bind(&address.user_id)
        .bind(&address.full_name)
        .bind(&address.phone)
        .bind(&address.street)
        .bind(&address.street_complement)
        .bind(&address.postal_code)
        .bind(&address.city)
        .bind(&address.country)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Makes an owned address the user's only default.
    pub async fn set_default_for_user(&self, id: &str, user_id: &str) -> DbResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE addresses SET is_default = 0 WHERE user_id = ?1 AND id != ?2")
            .bind(user_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result =
            sqlx::query("UPDATE addresses SET is_default = 1 WHERE id = ?1 AND user_id = ?2")
                .bind(id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        debug!(id = %id, user_id = %user_id, "Default address set");
        Ok(true)
    }

    /// Deletes an owned address. Returns `false` when nothing matched.
    ///
    /// Orders keep their own snapshot, so this never alters order history.
    pub async fn delete_for_user(&self, id: &str, user_id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM addresses WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use comptoir_core::{Address, User};

    use crate::{Database, DbConfig};

    async fn user(db: &Database, email: &str) -> User {
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            first_name: "Camille".to_string(),
            last_name: "Martin".to_string(),
            created_at: Utc::now(),
        };
        db.users().insert(&user).await.unwrap()
    }

    fn address(user_id: &str) -> Address {
        Address {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            full_name: "Camille Martin".to_string(),
            phone: None,
            street: "12 rue des Vignes".to_string(),
            street_complement: Some("Bât. B".to_string()),
            postal_code: "33000".to_string(),
            city: "Bordeaux".to_string(),
            country: "France".to_string(),
            is_default: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_owner_scoping() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let owner = user(&db, "owner@example.com").await;
        let other = user(&db, "other@example.com").await;

        let addr = db.addresses().insert(&address(&owner.id)).await.unwrap();

        assert!(db.addresses().get_for_user(&addr.id, &owner.id).await.unwrap().is_some());
        assert!(db.addresses().get_for_user(&addr.id, &other.id).await.unwrap().is_none());
        assert_eq!(db.addresses().list_by_user(&owner.id).await.unwrap().len(), 1);
        assert!(db.addresses().list_by_user(&other.id).await.unwrap().is_empty());

        assert!(!db.addresses().delete_for_user(&addr.id, &other.id).await.unwrap());
        assert!(db.addresses().delete_for_user(&addr.id, &owner.id).await.unwrap());
        assert!(db.addresses().get_by_id(&addr.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_and_default() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let owner = user(&db, "owner@example.com").await;
        let other = user(&db, "other@example.com").await;

        let first = db.addresses().insert(&address(&owner.id)).await.unwrap();
        let second = db.addresses().insert(&address(&owner.id)).await.unwrap();

        let mut moved = second.clone();
        moved.city = "Lyon".to_string();
        moved.postal_code = "69002".to_string();
        assert!(db.addresses().update_for_user(&moved).await.unwrap());
        moved.user_id = other.id.clone();
        assert!(!db.addresses().update_for_user(&moved).await.unwrap());

        let stored = db.addresses().get_by_id(&second.id).await.unwrap().unwrap();
        assert_eq!(stored.city, "Lyon");
        assert_eq!(stored.user_id, owner.id);

        assert!(db.addresses().set_default_for_user(&first.id, &owner.id).await.unwrap());
        assert!(db.addresses().set_default_for_user(&second.id, &owner.id).await.unwrap());
        assert!(!db.addresses().set_default_for_user(&first.id, &other.id).await.unwrap());

        let listed = db.addresses().list_by_user(&owner.id).await.unwrap();
        assert_eq!(listed[0].id, second.id);
        assert!(listed[0].is_default);
        assert!(!listed[1].is_default);
    }
}
