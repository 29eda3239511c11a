//! UseCase: 表示名の解決
//!
//! エンベロープに含まれる表示名を優先し、無ければキャッシュ、
//! それでも無ければ外部の ID サービスに問い合わせる。
//! 問い合わせの失敗は呼び出し側に伝えず "Unknown" を返す。

use std::sync::Arc;

use crate::{
    domain::{IdentityProvider, UNKNOWN_DISPLAY_NAME, UserId},
    infrastructure::cache::DisplayNameCache,
};

/// 表示名解決のユースケース
pub struct DisplayNameResolver {
    cache: Arc<DisplayNameCache>,
    provider: Arc<dyn IdentityProvider>,
}

impl DisplayNameResolver {
    pub fn new(cache: Arc<DisplayNameCache>, provider: Arc<dyn IdentityProvider>) -> Self {
        Self { cache, provider }
    }

    /// Cache a supplied name, or fall back to the cached one. Never calls out.
    pub async fn remember(&self, user_id: &UserId, supplied: Option<&str>) -> Option<String> {
        if let Some(name) = supplied.filter(|name| !name.trim().is_empty()) {
            self.cache.set(user_id.clone(), name.to_string()).await;
            return Some(name.to_string());
        }
        self.cache.get(user_id).await
    }

    /// Resolve a display name, asking the identity provider on a cache miss.
    pub async fn resolve(&self, user_id: &UserId, supplied: Option<&str>) -> String {
        if let Some(name) = self.remember(user_id, supplied).await {
            return name;
        }

        match self.provider.display_name(user_id).await {
            Ok(Some(name)) => {
                tracing::info!(user_id = %user_id, display_name = %name, "Display name resolved");
                self.cache.set(user_id.clone(), name.clone()).await;
                name
            }
            Ok(None) => {
                tracing::warn!(user_id = %user_id, "User not found by identity provider");
                UNKNOWN_DISPLAY_NAME.to_string()
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Display name lookup failed");
                UNKNOWN_DISPLAY_NAME.to_string()
            }
        }
    }
}
