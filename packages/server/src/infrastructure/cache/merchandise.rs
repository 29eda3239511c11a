//! Single-slot cache for the storekeeper merchandise record.
//!
//! A record is served only during the local calendar day it was stored in.
//! The game pushes a fresh record whenever asked; the midnight task drops the
//! stale one so the next request goes back to the game.

use std::{sync::Arc, time::Duration};

use chrono::FixedOffset;
use serde_json::Value;
use survivors_shared::time::{Clock, local_date, millis_until_next_midnight};
use tokio::{sync::RwLock, sync::watch, task::JoinHandle};

#[derive(Debug, Clone)]
struct CachedRecord {
    record: Value,
    stored_at: i64,
}

pub struct MerchandiseCache {
    slot: RwLock<Option<CachedRecord>>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
}

impl MerchandiseCache {
    pub fn new(clock: Arc<dyn Clock>, offset: FixedOffset) -> Self {
        Self {
            slot: RwLock::new(None),
            clock,
            offset,
        }
    }

    /// The cached record, if it was stored today.
    pub async fn get(&self) -> Option<Value> {
        let slot = self.slot.read().await;
        let cached = slot.as_ref()?;
        let now = self.clock.now_millis();
        let today = local_date(now, self.offset);
        if today.is_some() && today == local_date(cached.stored_at, self.offset) {
            Some(cached.record.clone())
        } else {
            None
        }
    }

    pub async fn set(&self, record: Value) {
        let stored_at = self.clock.now_millis();
        *self.slot.write().await = Some(CachedRecord { record, stored_at });
    }

    pub async fn clear(&self) {
        *self.slot.write().await = None;
    }

    /// Clear the cache at every local midnight until `shutdown` flips to `true`.
    pub fn spawn_midnight_reset(self: &Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let wait = millis_until_next_midnight(cache.clock.now_millis(), cache.offset);
                let wait = Duration::from_millis(u64::try_from(wait).unwrap_or(1));
                tracing::info!(
                    seconds = wait.as_secs(),
                    "Next storekeeper cache reset scheduled"
                );

                tokio::select! {
                    _ = tokio::time::sleep(wait) => {
                        cache.clear().await;
                        tracing::info!("Midnight reached, storekeeper cache cleared");
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("Storekeeper cache reset task stopped");
        })
    }
}
