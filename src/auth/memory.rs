use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repo::{StoreError, UserStore};
use super::repo_types::User;

/// In-process user store used by tests in place of Postgres.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    /// Drops a user, standing in for an out-of-band deletion.
    pub async fn remove(&self, id: Uuid) -> Option<User> {
        self.users.write().await.remove(&id)
    }

    pub async fn count_by_email(&self, email: &str) -> usize {
        self.users
            .read()
            .await
            .values()
            .filter(|u| u.email == email)
            .count()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == email) {
            return Err(StoreError::DuplicateEmail);
        }
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_find() {
        let store = MemoryUserStore::default();
        let user = store.create_user("alice", "a@b.com", "hash").await.unwrap();

        let by_email = store.find_by_email("a@b.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        let by_id = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "alice");
        assert!(store.find_by_email("x@y.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryUserStore::default();
        store.create_user("alice", "a@b.com", "h1").await.unwrap();
        let err = store.create_user("bob", "a@b.com", "h2").await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
        assert_eq!(store.count_by_email("a@b.com").await, 1);
    }

    #[tokio::test]
    async fn removed_user_is_gone() {
        let store = MemoryUserStore::default();
        let user = store.create_user("alice", "a@b.com", "h").await.unwrap();
        assert!(store.remove(user.id).await.is_some());
        assert!(store.find_by_id(user.id).await.unwrap().is_none());
    }
}
