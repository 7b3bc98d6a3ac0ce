//! # Carrier Repository
//!
//! Shipping options offered at the carrier step.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use comptoir_core::Carrier;

const CARRIER_COLUMNS: &str =
    "id, name, description, price_cents, delivery_time, is_active, position, created_at";

#[derive(Debug, Clone)]
pub struct CarrierRepository {
    pool: SqlitePool,
}

impl CarrierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CarrierRepository { pool }
    }

    /// Active carriers in display order: `position` ascending, then name.
    pub async fn list_active(&self) -> DbResult<Vec<Carrier>> {
        let carriers = sqlx::query_as::<_, Carrier>(&format!(
            "SELECT {CARRIER_COLUMNS} FROM carriers WHERE is_active = 1 ORDER BY position, name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(carriers)
    }

    /// Gets a carrier by id, whether active or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Carrier>> {
        let carrier = sqlx::query_as::<_, Carrier>(&format!(
            "SELECT {CARRIER_COLUMNS} FROM carriers WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(carrier)
    }

    pub async fn insert(&self, carrier: &Carrier) -> DbResult<Carrier> {
        debug!(name = %carrier.name, "Inserting carrier");

        sqlx::query(
            r#"
            INSERT INTO carriers (
                id, name, description, price_cents, delivery_time,
                is_active, position, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&carrier.id)
        .bind(&carrier.name)
        .bind(&carrier.description)
        .bind(carrier.price_cents)
        .bind(&carrier.delivery_time)
        .bind(carrier.is_active)
        .bind(carrier.position)
        .bind(carrier.created_at)
        .execute(&self.pool)
        .await?;

        Ok(carrier.clone())
    }

    /// Enables or disables a carrier.
    ///
    /// A disabled carrier disappears from the carrier step; a checkout that
    /// already picked it is sent back to choose again.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE carriers SET is_active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Carrier", id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};
    use comptoir_core::Carrier;

    #[tokio::test]
    async fn test_list_active_ordering() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.carriers();

        repo.insert(&Carrier::new("Chronopost", 1290, 2)).await.unwrap();
        repo.insert(&Carrier::new("Colissimo", 690, 1)).await.unwrap();
        repo.insert(&Carrier::new("Am Relais", 490, 2)).await.unwrap();
        let hidden = repo.insert(&Carrier::new("Coursier", 2500, 0)).await.unwrap();
        repo.set_active(&hidden.id, false).await.unwrap();

        let names: Vec<String> = repo
            .list_active()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Colissimo", "Am Relais", "Chronopost"]);

        // Inactive carriers stay readable by id for existing orders.
        let loaded = repo.get_by_id(&hidden.id).await.unwrap().unwrap();
        assert!(!loaded.is_active);
    }
}
