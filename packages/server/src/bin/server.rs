//! Real-time relay for the game, its extension clients and viewers.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin survivors-server
//! cargo run --bin survivors-server -- --host 127.0.0.1 --port 3000
//! TWITCH_CLIENT_ID=... TWITCH_CLIENT_SECRET=... cargo run --bin survivors-server
//! ```

use std::{sync::Arc, time::Duration};

use clap::Parser;
use survivors_server::{
    config::{
        DEFAULT_HEARTBEAT_INTERVAL_SECS, DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_PORT,
        DEFAULT_RATE_LIMIT_PER_SECOND, DEFAULT_UTC_OFFSET_HOURS, RelayConfig,
    },
    domain::IdentityProvider,
    infrastructure::identity::{NoopIdentityProvider, twitch::TwitchIdentityProvider},
    ui::Server,
};
use survivors_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "survivors-server")]
#[command(about = "Relay between the game, extension clients and viewers", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Seconds between liveness probes
    #[arg(long, env = "HEARTBEAT_INTERVAL_SECS", default_value_t = DEFAULT_HEARTBEAT_INTERVAL_SECS)]
    heartbeat_interval_secs: u64,

    /// Messages per second allowed for each user
    #[arg(long, env = "RATE_LIMIT_PER_SECOND", default_value_t = DEFAULT_RATE_LIMIT_PER_SECOND)]
    rate_limit_per_second: u32,

    /// Largest accepted WebSocket message, in bytes
    #[arg(long, env = "MAX_MESSAGE_SIZE", default_value_t = DEFAULT_MAX_MESSAGE_SIZE)]
    max_message_size: usize,

    /// Twitch application client id, used for display-name lookups
    #[arg(long, env = "TWITCH_CLIENT_ID")]
    twitch_client_id: Option<String>,

    /// Twitch application secret; also signs extension tokens
    #[arg(long, env = "TWITCH_CLIENT_SECRET", hide_env_values = true)]
    twitch_client_secret: Option<String>,

    /// UTC offset, in hours, of the storekeeper's day
    #[arg(long, env = "UTC_OFFSET_HOURS", default_value_t = DEFAULT_UTC_OFFSET_HOURS, allow_hyphen_values = true)]
    utc_offset_hours: i32,
}

impl From<Args> for RelayConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            heartbeat_interval: Duration::from_secs(args.heartbeat_interval_secs.max(1)),
            rate_limit_per_second: args.rate_limit_per_second,
            max_message_size: args.max_message_size,
            twitch_client_id: args.twitch_client_id,
            twitch_client_secret: args.twitch_client_secret,
            utc_offset_hours: args.utc_offset_hours,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let config = RelayConfig::from(Args::parse());

    let identity: Arc<dyn IdentityProvider> = match config.twitch_credentials() {
        Some((client_id, client_secret)) => {
            tracing::info!("Display names resolved through Twitch");
            Arc::new(TwitchIdentityProvider::new(
                client_id.to_string(),
                client_secret.to_string(),
            ))
        }
        None => {
            tracing::warn!("Twitch credentials missing, display names fall back to \"Unknown\"");
            Arc::new(NoopIdentityProvider)
        }
    };

    let server = Server::from_config(config, identity);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
