//! Display names keyed by user id. Entries never expire.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::domain::UserId;

#[derive(Debug, Default)]
pub struct DisplayNameCache {
    names: RwLock<HashMap<UserId, String>>,
}

impl DisplayNameCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user_id: &UserId) -> Option<String> {
        self.names.read().await.get(user_id).cloned()
    }

    pub async fn set(&self, user_id: UserId, display_name: String) {
        self.names.write().await.insert(user_id, display_name);
    }

    pub async fn contains(&self, user_id: &UserId) -> bool {
        self.names.read().await.contains_key(user_id)
    }

    pub async fn len(&self) -> usize {
        self.names.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.names.read().await.is_empty()
    }
}
