use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{StoreError, UserStore};
use crate::auth::repo_types::{NewUser, User};

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, password_hash, verified, user_type, last_login_at, created_at
            FROM users
            WHERE lower(email COLLATE "C") = lower($1 COLLATE "C")
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, password_hash, verified, user_type, last_login_at, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, name, password_hash, verified, user_type, last_login_at, created_at
            "#,
        )
        .bind(&new.email)
        .bind(&new.name)
        .bind(&new.password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e {
            // users_email_lower_idx
            sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::Duplicate,
            other => StoreError::Database(other),
        })
    }

    async fn touch_last_login(&self, id: Uuid, at: OffsetDateTime) -> Result<(), StoreError> {
        sqlx::query(r#"UPDATE users SET last_login_at = $2 WHERE id = $1"#)
            .bind(id)
            .bind(at)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
