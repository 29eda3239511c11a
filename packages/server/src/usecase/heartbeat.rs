//! UseCase: 接続の生存確認
//!
//! 一定間隔で全接続を確認する。前回の probe に応答していない接続は切断して
//! レジストリから外し、それ以外は生存フラグを下ろして probe を送る。
//! 各周期の最後にレート制限の古い記録を掃除する。

use std::{sync::Arc, time::Duration};

use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};

use crate::domain::ConnectionRegistry;

use super::rate_limiter::RateLimiter;

/// Result of one heartbeat pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeartbeatReport {
    pub probed: usize,
    pub terminated: usize,
    pub pruned: usize,
}

/// 生存確認のユースケース
pub struct HeartbeatMonitor {
    registry: Arc<dyn ConnectionRegistry>,
    rate_limiter: Arc<RateLimiter>,
    interval: Duration,
}

impl HeartbeatMonitor {
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        rate_limiter: Arc<RateLimiter>,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            rate_limiter,
            interval,
        }
    }

    /// Spawn the periodic task. Only the first call per registry starts one;
    /// later calls return `None`.
    pub fn start(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> Option<JoinHandle<()>> {
        if !self.registry.try_claim_heartbeat() {
            tracing::debug!("Heartbeat already running for this registry");
            return None;
        }

        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + self.interval;
            let mut ticker = tokio::time::interval_at(start, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(interval_secs = self.interval.as_secs_f64(), "Heartbeat started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = self.tick().await;
                        tracing::debug!(
                            probed = report.probed,
                            terminated = report.terminated,
                            pruned = report.pruned,
                            "Heartbeat tick"
                        );
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("Heartbeat stopped");
        });
        Some(handle)
    }

    /// Run one pass over every attached connection.
    pub async fn tick(&self) -> HeartbeatReport {
        let mut report = HeartbeatReport::default();

        for connection in self.registry.connections().await {
            if !connection.is_alive() {
                connection.terminate();
                self.registry.unregister(&connection).await;
                report.terminated += 1;
                tracing::warn!(connection_id = %connection.id(), "Connection closed by heartbeat timeout");
                continue;
            }

            match connection.probe() {
                Ok(()) => report.probed += 1,
                Err(e) => {
                    tracing::debug!(connection_id = %connection.id(), error = %e, "Probe failed");
                }
            }
        }

        report.pruned = self.rate_limiter.prune_stale().await;
        report
    }
}
