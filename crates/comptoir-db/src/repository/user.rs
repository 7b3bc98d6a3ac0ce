//! # User Repository
//!
//! Customer accounts. Emails are stored lowercased by the caller and are
//! unique.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use comptoir_core::User;

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, created_at";

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Inserts a new account.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - Email already registered
    pub async fn insert(&self, user: &User) -> DbResult<User> {
        debug!(id = %user.id, "Inserting user");

        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, first_name, last_name, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("email", &user.email),
            other => other,
        })?;

        Ok(user.clone())
    }

    /// Rewrites email and names.
    ///
    /// ## Returns
    /// * `Ok(false)` - No such user
    /// * `Err(DbError::UniqueViolation)` - Email taken by another account
    pub async fn update_profile(&self, user: &User) -> DbResult<bool> {
        debug!(id = %user.id, "Updating profile");

        let result = sqlx::query(
            "UPDATE users SET email = ?2, first_name = ?3, last_name = ?4 WHERE id = ?1",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("email", &user.email),
            other => other,
        })?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn set_password_hash(&self, id: &str, password_hash: &str) -> DbResult<bool> {
        let result = sqlx::query("UPDATE users SET password_hash = ?2 WHERE id = ?1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
