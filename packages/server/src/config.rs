//! Runtime settings of the relay.

use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_RATE_LIMIT_PER_SECOND: u32 = 5;
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 10 * 1024;
/// The merchandise cache rolls over at midnight in UTC-3.
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = -3;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub heartbeat_interval: Duration,
    pub rate_limit_per_second: u32,
    pub max_message_size: usize,
    pub twitch_client_id: Option<String>,
    /// Doubles as the HS256 secret extension tokens are signed with.
    pub twitch_client_secret: Option<String>,
    pub utc_offset_hours: i32,
}

impl RelayConfig {
    pub fn jwt_secret(&self) -> Option<&[u8]> {
        self.twitch_client_secret
            .as_deref()
            .filter(|secret| !secret.is_empty())
            .map(str::as_bytes)
    }

    /// Both Twitch credentials, when configured.
    pub fn twitch_credentials(&self) -> Option<(&str, &str)> {
        match (
            self.twitch_client_id.as_deref(),
            self.twitch_client_secret.as_deref(),
        ) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Some((id, secret)),
            _ => None,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_INTERVAL_SECS),
            rate_limit_per_second: DEFAULT_RATE_LIMIT_PER_SECOND,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            twitch_client_id: None,
            twitch_client_secret: None,
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
        }
    }
}
