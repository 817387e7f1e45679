use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};

pub mod memory;
pub mod pg;

pub use memory::MemoryUserStore;
pub use pg::PgUserStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Another user already holds this email (compared case-insensitively).
    #[error("email already exists")]
    Duplicate,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Persistence for user accounts.
///
/// Email lookups are exact matches ignoring ASCII case; non-ASCII characters
/// must match exactly so every store folds the same way regardless of database
/// collation. The email is stored as submitted.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    /// Inserts a user with `verified = false` and the default type.
    async fn create(&self, new: NewUser) -> Result<User, StoreError>;
    async fn touch_last_login(&self, id: Uuid, at: OffsetDateTime) -> Result<(), StoreError>;
}
