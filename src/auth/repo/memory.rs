use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{StoreError, UserStore};
use crate::auth::repo_types::{NewUser, User};

/// Process-local store with the same matching and uniqueness rules as Postgres.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

// ASCII-only folding, matching `lower(email COLLATE "C")` in Postgres
fn same_email(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

impl MemoryUserStore {
    /// Stands in for the email confirmation flow. Returns false if no user matched.
    pub async fn set_verified(&self, email: &str, verified: bool) -> bool {
        let mut users = self.users.write().await;
        match users.values_mut().find(|u| same_email(&u.email, email)) {
            Some(u) => {
                u.verified = verified;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| same_email(&u.email, email)).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| same_email(&u.email, &new.email)) {
            return Err(StoreError::Duplicate);
        }
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            name: new.name,
            password_hash: new.password_hash,
            verified: false,
            user_type: "user".into(),
            last_login_at: None,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn touch_last_login(&self, id: Uuid, at: OffsetDateTime) -> Result<(), StoreError> {
        if let Some(u) = self.users.write().await.get_mut(&id) {
            u.last_login_at = Some(at);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            name: "Ann".into(),
            password_hash: "$argon2id$fake".into(),
        }
    }

    #[tokio::test]
    async fn create_applies_defaults_and_keeps_email_as_given() {
        let store = MemoryUserStore::default();
        let user = store.create(new_user("Ann@Example.com")).await.unwrap();
        assert_eq!(user.email, "Ann@Example.com");
        assert!(!user.verified);
        assert_eq!(user.user_type, "user");
        assert!(user.last_login_at.is_none());
    }

    #[tokio::test]
    async fn find_by_email_ignores_case_but_not_content() {
        let store = MemoryUserStore::default();
        let created = store.create(new_user("Ann@Example.com")).await.unwrap();

        let found = store.find_by_email("ann@example.COM").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);

        assert!(store.find_by_email("ann@example.co").await.unwrap().is_none());
        assert!(store.find_by_email("xann@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn non_ascii_letters_are_compared_exactly() {
        let store = MemoryUserStore::default();
        store.create(new_user("Élodie@x.com")).await.unwrap();

        assert!(store.find_by_email("élodie@x.com").await.unwrap().is_none());
        assert!(store.find_by_email("Élodie@X.COM").await.unwrap().is_some());
        assert!(store.create(new_user("élodie@x.com")).await.is_ok());
    }

    #[tokio::test]
    async fn create_rejects_case_insensitive_duplicate() {
        let store = MemoryUserStore::default();
        store.create(new_user("a@x.com")).await.unwrap();
        let err = store.create(new_user("A@X.COM")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
    }

    #[tokio::test]
    async fn set_verified_and_touch_last_login() {
        let store = MemoryUserStore::default();
        let user = store.create(new_user("a@x.com")).await.unwrap();

        assert!(store.set_verified("A@x.com", true).await);
        assert!(!store.set_verified("nobody@x.com", true).await);

        let at = OffsetDateTime::now_utc();
        store.touch_last_login(user.id, at).await.unwrap();

        let reloaded = store.find_by_id(user.id).await.unwrap().unwrap();
        assert!(reloaded.verified);
        assert_eq!(reloaded.last_login_at, Some(at));
    }
}
