//! UseCase: 商人（storekeeper）情報の要求
//!
//! 当日分の商品レコードがキャッシュにあればそのまま返す。無ければゲームに
//! 要求を転送し、送信者には「現在商人はいない」旨を返す。

use std::sync::Arc;

use serde_json::json;

use crate::{
    domain::{Action, BusError, Connection, OutboundEnvelope, UserId},
    infrastructure::cache::MerchandiseCache,
};

use super::message_bus::MessageBus;

pub const NO_STOREKEEPER_MESSAGE: &str = "No storekeepers available right now";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorekeeperReply {
    /// Served from today's cached record.
    Cached,
    /// Request forwarded to the game, fallback sent to the requester.
    Requested,
}

/// 商人情報要求のユースケース
pub struct StorekeeperUseCase {
    bus: Arc<MessageBus>,
    merchandise: Arc<MerchandiseCache>,
}

impl StorekeeperUseCase {
    pub fn new(bus: Arc<MessageBus>, merchandise: Arc<MerchandiseCache>) -> Self {
        Self { bus, merchandise }
    }

    pub async fn execute(
        &self,
        connection: &Connection,
        user_id: &UserId,
        display_name: Option<&str>,
    ) -> Result<StorekeeperReply, BusError> {
        let action = Action::Storekeeper.as_str();
        let display_name = self.bus.display_name_for(user_id, display_name).await;

        if let Some(record) = self.merchandise.get().await {
            tracing::info!(user_id = %user_id, "Serving storekeeper from cache");
            let reply = OutboundEnvelope::new(user_id, display_name, action, Some(record));
            self.bus.send(connection, &reply)?;
            return Ok(StorekeeperReply::Cached);
        }

        tracing::info!(user_id = %user_id, "Storekeeper cache empty, asking the game");
        self.bus
            .send_to_game(user_id, Some(&display_name), action, None)
            .await?;
        let reply = OutboundEnvelope::new(
            user_id,
            display_name,
            action,
            Some(json!({ "error": NO_STOREKEEPER_MESSAGE })),
        );
        self.bus.send(connection, &reply)?;
        Ok(StorekeeperReply::Requested)
    }
}
