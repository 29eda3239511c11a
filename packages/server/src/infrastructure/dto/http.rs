//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

use crate::domain::{ConnectionSnapshot, RegisteredRole};

/// `GET /health` response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthDto {
    pub status: String,
    /// RFC 3339 time the report was produced.
    pub timestamp: String,
    /// Number of attached transports.
    pub connections: usize,
    pub games: usize,
    pub extensions: usize,
    pub uptime_secs: u64,
    pub version: String,
}

impl HealthDto {
    pub fn from_snapshots(
        snapshots: &[ConnectionSnapshot],
        timestamp: String,
        uptime_secs: u64,
    ) -> Self {
        let count = |role: RegisteredRole| snapshots.iter().filter(|s| s.role == role).count();
        Self {
            status: "healthy".to_string(),
            timestamp,
            connections: snapshots.len(),
            games: count(RegisteredRole::Game),
            extensions: count(RegisteredRole::Extension),
            uptime_secs,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// `GET /` response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfoDto {
    pub name: String,
    pub version: String,
    pub websocket: String,
    pub health: String,
}

impl Default for ServiceInfoDto {
    fn default() -> Self {
        Self {
            name: "survivors-relay".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            websocket: "/ws".to_string(),
            health: "/health".to_string(),
        }
    }
}
