//! UseCase: 送信経路
//!
//! クライアントへの書き込みはすべてここを通る。送信前にエンベロープを検証し、
//! 宛先はレジストリから引く。宛先が閉じていれば何もしない（再送もキューも無い）。

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use serde_json::Value;

use crate::{
    domain::{
        BusError, Connection, ConnectionRegistry, OutboundEnvelope, UNKNOWN_DISPLAY_NAME, UserId,
    },
    infrastructure::cache::DisplayNameCache,
};

/// 送信のユースケース
pub struct MessageBus {
    registry: Arc<dyn ConnectionRegistry>,
    display_names: Arc<DisplayNameCache>,
}

impl MessageBus {
    pub fn new(registry: Arc<dyn ConnectionRegistry>, display_names: Arc<DisplayNameCache>) -> Self {
        Self {
            registry,
            display_names,
        }
    }

    /// Validate `envelope` and write it to `connection` if the transport is open.
    pub fn send(&self, connection: &Connection, envelope: &OutboundEnvelope) -> Result<(), BusError> {
        let text = Self::serialize(envelope)?;
        Self::write(connection, text);
        Ok(())
    }

    /// Returns `false` when no game is registered.
    pub async fn send_to_game(
        &self,
        user_id: &UserId,
        display_name: Option<&str>,
        action: &str,
        data: Option<Value>,
    ) -> Result<bool, BusError> {
        let Some(game) = self.registry.game().await else {
            tracing::debug!(user_id = %user_id, action, "No game connection registered");
            return Ok(false);
        };
        let envelope = self.envelope(user_id, display_name, action, data).await;
        self.send(&game, &envelope)?;
        Ok(true)
    }

    /// Returns `false` when `user_id` has no extension connection.
    pub async fn send_to_user(
        &self,
        user_id: &UserId,
        display_name: Option<&str>,
        action: &str,
        data: Option<Value>,
    ) -> Result<bool, BusError> {
        let Some(connection) = self.registry.lookup_extension(user_id).await else {
            tracing::debug!(user_id = %user_id, action, "No extension connection for user");
            return Ok(false);
        };
        let envelope = self.envelope(user_id, display_name, action, data).await;
        self.send(&connection, &envelope)?;
        Ok(true)
    }

    /// Send the same envelope to every extension connection.
    ///
    /// Returns the number of connections written to.
    pub async fn broadcast_to_extensions(
        &self,
        user_id: &UserId,
        display_name: Option<&str>,
        action: &str,
        data: Option<Value>,
    ) -> Result<usize, BusError> {
        let envelope = self.envelope(user_id, display_name, action, data).await;
        let text = Self::serialize(&envelope)?;
        let delivered = AtomicUsize::new(0);
        self.registry
            .for_each_extension(&|_, connection| {
                if Self::write(connection, text.clone()) {
                    delivered.fetch_add(1, Ordering::Relaxed);
                }
            })
            .await;
        Ok(delivered.into_inner())
    }

    /// Caller-supplied name, else the cached one, else `"Unknown"`.
    pub async fn display_name_for(&self, user_id: &UserId, supplied: Option<&str>) -> String {
        if let Some(name) = supplied.filter(|name| !name.trim().is_empty()) {
            return name.to_string();
        }
        self.display_names
            .get(user_id)
            .await
            .unwrap_or_else(|| UNKNOWN_DISPLAY_NAME.to_string())
    }

    async fn envelope(
        &self,
        user_id: &UserId,
        display_name: Option<&str>,
        action: &str,
        data: Option<Value>,
    ) -> OutboundEnvelope {
        let display_name = self.display_name_for(user_id, display_name).await;
        OutboundEnvelope::new(user_id, display_name, action, data)
    }

    fn serialize(envelope: &OutboundEnvelope) -> Result<String, BusError> {
        if envelope.user.id.is_empty() {
            return Err(BusError::EmptyField("user.id"));
        }
        if envelope.action.is_empty() {
            return Err(BusError::EmptyField("action"));
        }
        Ok(serde_json::to_string(envelope)?)
    }

    fn write(connection: &Connection, text: String) -> bool {
        if !connection.is_open() {
            tracing::debug!(connection_id = %connection.id(), "Skipping write to closed connection");
            return false;
        }
        match connection.send_text(text) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(connection_id = %connection.id(), error = %e, "Write failed");
                false
            }
        }
    }
}
