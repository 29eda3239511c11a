//! UseCase: 送信者ごとのレート制限
//!
//! ユーザー ID ごとに 1 秒の固定ウィンドウでメッセージ数を数える。
//! `game` と、ユーザー ID を持たない `viewer` は制限の対象外。
//! ID を特定できない送信者は拒否する。

use std::{collections::HashMap, sync::Arc};

use survivors_shared::time::Clock;
use tokio::sync::Mutex;

use crate::domain::{Role, UserId};

pub const WINDOW_MILLIS: i64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RateLimitRecord {
    window_start: i64,
    count: u32,
}

/// レート制限のユースケース
pub struct RateLimiter {
    limit: u32,
    clock: Arc<dyn Clock>,
    records: Mutex<HashMap<UserId, RateLimitRecord>>,
}

impl RateLimiter {
    pub fn new(limit: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            limit,
            clock,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// `true` when the message may pass.
    pub async fn check(&self, role: Option<&Role>, user_id: Option<&UserId>) -> bool {
        let user_id = match (role, user_id) {
            (Some(Role::Game), _) | (Some(Role::Viewer), None) => return true,
            (_, None) => return false,
            (_, Some(user_id)) => user_id,
        };

        let now = self.clock.now_millis();
        let mut records = self.records.lock().await;
        match records.get_mut(user_id) {
            None => {
                records.insert(
                    user_id.clone(),
                    RateLimitRecord {
                        window_start: now,
                        count: 1,
                    },
                );
                true
            }
            Some(record) if now - record.window_start < WINDOW_MILLIS => {
                record.count = record.count.saturating_add(1);
                record.count <= self.limit
            }
            Some(record) => {
                record.window_start = now;
                record.count = 1;
                true
            }
        }
    }

    /// Drop records whose window ended more than one window ago.
    ///
    /// Returns how many were removed.
    pub async fn prune_stale(&self) -> usize {
        let now = self.clock.now_millis();
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|_, record| now - record.window_start < 2 * WINDOW_MILLIS);
        before - records.len()
    }

    pub async fn tracked_senders(&self) -> usize {
        self.records.lock().await.len()
    }
}
