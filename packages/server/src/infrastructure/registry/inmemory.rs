//! In-memory connection registry.
//!
//! All state sits behind one mutex so that "replace the extension binding and
//! terminate the previous connection" is never observed half-done.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    Connection, ConnectionId, ConnectionRegistry, ConnectionSnapshot, RegisteredRole, Role,
    UserId,
};

#[derive(Default)]
struct RegistryState {
    game: Option<Arc<Connection>>,
    /// Kept in insertion order; a replaced binding keeps its position.
    extensions: Vec<(UserId, Arc<Connection>)>,
    attached: HashMap<ConnectionId, Arc<Connection>>,
}

#[derive(Default)]
pub struct InMemoryConnectionRegistry {
    state: Mutex<RegistryState>,
    heartbeat_claimed: AtomicBool,
}

impl InMemoryConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionRegistry for InMemoryConnectionRegistry {
    async fn attach(&self, connection: Arc<Connection>) {
        let mut state = self.state.lock().await;
        state.attached.insert(connection.id(), connection);
    }

    async fn register_game(&self, connection: Arc<Connection>) {
        let mut state = self.state.lock().await;
        if let Some(previous) = state.game.as_ref()
            && previous.id() != connection.id()
        {
            tracing::warn!(
                previous = %previous.id(),
                connection_id = %connection.id(),
                "Game connection replaced"
            );
        }
        state.attached.insert(connection.id(), connection.clone());
        state.game = Some(connection);
        tracing::info!("Game connection registered");
    }

    async fn register_extension(&self, user_id: UserId, connection: Arc<Connection>) {
        let mut state = self.state.lock().await;
        state.attached.insert(connection.id(), connection.clone());

        let position = state.extensions.iter().position(|(id, _)| *id == user_id);
        match position {
            Some(index) => {
                let existing = &mut state.extensions[index].1;
                if existing.id() == connection.id() {
                    tracing::debug!(user_id = %user_id, "Extension connection already registered");
                    return;
                }
                tracing::info!(
                    user_id = %user_id,
                    previous = %existing.id(),
                    connection_id = %connection.id(),
                    "Replacing extension connection"
                );
                existing.terminate();
                *existing = connection;
            }
            None => {
                tracing::info!(user_id = %user_id, "Extension connection registered");
                state.extensions.push((user_id, connection));
            }
        }
    }

    async fn unregister(&self, connection: &Connection) {
        let mut state = self.state.lock().await;
        state.attached.remove(&connection.id());

        if state
            .game
            .as_ref()
            .is_some_and(|game| game.id() == connection.id())
        {
            state.game = None;
            tracing::info!("Game connection unregistered");
            return;
        }

        if let Some(position) = state
            .extensions
            .iter()
            .position(|(_, existing)| existing.id() == connection.id())
        {
            let (user_id, _) = state.extensions.remove(position);
            tracing::info!(user_id = %user_id, "Extension connection unregistered");
        }
    }

    async fn game(&self) -> Option<Arc<Connection>> {
        self.state.lock().await.game.clone()
    }

    async fn lookup_extension(&self, user_id: &UserId) -> Option<Arc<Connection>> {
        let state = self.state.lock().await;
        state
            .extensions
            .iter()
            .find(|(id, _)| id == user_id)
            .map(|(_, connection)| connection.clone())
    }

    async fn for_each_extension(
        &self,
        f: &(dyn for<'a> Fn(&'a UserId, &'a Arc<Connection>) + Send + Sync),
    ) {
        let state = self.state.lock().await;
        for (user_id, connection) in &state.extensions {
            f(user_id, connection);
        }
    }

    async fn connections(&self) -> Vec<Arc<Connection>> {
        self.state.lock().await.attached.values().cloned().collect()
    }

    async fn list_active(&self) -> Vec<ConnectionSnapshot> {
        let (game, extensions, attached) = {
            let state = self.state.lock().await;
            (
                state.game.clone(),
                state.extensions.clone(),
                state.attached.values().cloned().collect::<Vec<_>>(),
            )
        };

        let mut snapshots = Vec::with_capacity(attached.len());
        for connection in attached {
            let (role, user_id) = if game.as_ref().is_some_and(|g| g.id() == connection.id()) {
                (RegisteredRole::Game, None)
            } else if let Some((user_id, _)) = extensions
                .iter()
                .find(|(_, existing)| existing.id() == connection.id())
            {
                (RegisteredRole::Extension, Some(user_id.clone()))
            } else {
                let meta = connection.meta().await;
                let role = match meta.role {
                    Some(Role::Viewer) => RegisteredRole::Viewer,
                    _ => RegisteredRole::Unknown,
                };
                (role, meta.user_id)
            };

            snapshots.push(ConnectionSnapshot {
                connection_id: connection.id(),
                role,
                user_id,
                alive: connection.is_alive() && connection.is_open(),
            });
        }

        snapshots.sort_by(|a, b| {
            (a.role, &a.user_id, a.connection_id).cmp(&(b.role, &b.user_id, b.connection_id))
        });
        snapshots
    }

    fn try_claim_heartbeat(&self) -> bool {
        !self.heartbeat_claimed.swap(true, Ordering::AcqRel)
    }
}
