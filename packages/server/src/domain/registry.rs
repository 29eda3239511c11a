//! Connection registry interface.
//!
//! The registry keeps non-owning handles to live connections: at most one
//! game connection, at most one extension connection per user, plus every
//! attached transport so the heartbeat can reach connections that never
//! registered.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::{
    connection::{Connection, ConnectionId},
    value_object::UserId,
};

/// Role a connection currently plays, as seen by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisteredRole {
    Game,
    Extension,
    Viewer,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionSnapshot {
    #[serde(skip)]
    pub connection_id: ConnectionId,
    pub role: RegisteredRole,
    pub user_id: Option<UserId>,
    pub alive: bool,
}

#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// Track a freshly accepted transport.
    async fn attach(&self, connection: Arc<Connection>);

    /// Take the game slot. A previous occupant is displaced but not closed.
    async fn register_game(&self, connection: Arc<Connection>);

    /// Bind `user_id` to `connection`, terminating a different previous binding.
    async fn register_extension(&self, user_id: UserId, connection: Arc<Connection>);

    /// Remove `connection` from the game slot, or else from the first
    /// extension entry holding it. Unknown connections are ignored.
    async fn unregister(&self, connection: &Connection);

    async fn game(&self) -> Option<Arc<Connection>>;

    async fn lookup_extension(&self, user_id: &UserId) -> Option<Arc<Connection>>;

    /// Apply `f` to every registered extension connection.
    ///
    /// `f` runs with the registry locked and must not call back into it.
    async fn for_each_extension(
        &self,
        f: &(dyn for<'a> Fn(&'a UserId, &'a Arc<Connection>) + Send + Sync),
    );

    /// Every attached connection, registered or not.
    async fn connections(&self) -> Vec<Arc<Connection>>;

    async fn list_active(&self) -> Vec<ConnectionSnapshot>;

    /// Returns `true` exactly once per registry, for the heartbeat that owns it.
    fn try_claim_heartbeat(&self) -> bool;
}
