//! UseCase: ステータス・売買系アクションのゲームへの転送
//!
//! `str, agi, vit, luc, equip, buy, sell, shop` を (user, display_name, action, data)
//! としてゲームに転送する。`shop` は送信元をそのユーザーの extension 接続として
//! 登録し直し、ゲームからの後続のショップ情報が届くようにする。

use std::sync::Arc;

use serde_json::Value;

use crate::domain::{Action, BusError, Connection, ConnectionRegistry, UserId};

use super::{display_name::DisplayNameResolver, message_bus::MessageBus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardOutcome {
    Forwarded,
    /// Not one of the game actions.
    Rejected,
}

/// アクション転送のユースケース
pub struct ForwardActionUseCase {
    registry: Arc<dyn ConnectionRegistry>,
    bus: Arc<MessageBus>,
    resolver: Arc<DisplayNameResolver>,
}

impl ForwardActionUseCase {
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
        action: Action,
        display_name: Option<&str>,
        data: Option<Value>,
    ) -> Result<ForwardOutcome, BusError> {
        if !action.is_game_action() {
            tracing::warn!(user_id = %user_id, action = %action, "Action is not forwardable");
            return Ok(ForwardOutcome::Rejected);
        }

        if action == Action::Shop {
            self.registry
                .register_extension(user_id.clone(), Arc::clone(connection))
                .await;
        }

        let display_name = self.resolver.remember(user_id, display_name).await;
        let delivered = self
            .bus
            .send_to_game(user_id, display_name.as_deref(), action.as_str(), data)
            .await?;
        if delivered {
            tracing::info!(user_id = %user_id, action = %action, "Action forwarded to game");
        } else {
            tracing::warn!(user_id = %user_id, action = %action, "Action dropped, no game connected");
        }
        Ok(ForwardOutcome::Forwarded)
    }
}
