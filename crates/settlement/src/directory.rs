//! User existence and role checks.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::UserId;
use tokio::sync::RwLock;

/// Answers "does this user exist" and "is this user an administrator".
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn exists(&self, user_id: UserId) -> bool;

    async fn is_admin(&self, user_id: UserId) -> bool;
}

/// In-memory directory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<HashMap<UserId, bool>>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user_id: UserId) {
        self.users.write().await.insert(user_id, false);
    }

    pub async fn add_admin(&self, user_id: UserId) {
        self.users.write().await.insert(user_id, true);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn exists(&self, user_id: UserId) -> bool {
        self.users.read().await.contains_key(&user_id)
    }

    async fn is_admin(&self, user_id: UserId) -> bool {
        self.users.read().await.get(&user_id).copied().unwrap_or(false)
    }
}
