//! UseCase: ユーザーの参加
//!
//! 送信元の接続をそのユーザーの extension 接続として登録し、表示名を解決して
//! ゲームに参加を通知する。

use std::sync::Arc;

use crate::domain::{Action, BusError, Connection, ConnectionRegistry, UserId};

use super::{display_name::DisplayNameResolver, message_bus::MessageBus};

/// 参加のユースケース
pub struct JoinUseCase {
    registry: Arc<dyn ConnectionRegistry>,
    bus: Arc<MessageBus>,
    resolver: Arc<DisplayNameResolver>,
}

impl JoinUseCase {
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        bus: Arc<MessageBus>,
        resolver: Arc<DisplayNameResolver>,
    ) -> Self {
        Self {
            registry,
            bus,
            resolver,
        }
    }

    pub async fn execute(
        &self,
        connection: &Arc<Connection>,
        user_id: &UserId,
        display_name: Option<&str>,
    ) -> Result<(), BusError> {
        self.registry
            .register_extension(user_id.clone(), Arc::clone(connection))
            .await;

        let display_name = self.resolver.resolve(user_id, display_name).await;
        tracing::info!(user_id = %user_id, display_name = %display_name, "User joined");

        self.bus
            .send_to_game(user_id, Some(&display_name), Action::Join.as_str(), None)
            .await?;
        Ok(())
    }
}
