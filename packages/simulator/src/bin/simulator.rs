//! Simulated clients for the survivors relay.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin survivors-simulator -- game
//! cargo run --bin survivors-simulator -- extension --user-id 42 --display-name Alice --secret test-secret
//! cargo run --bin survivors-simulator -- viewer --user-id v1
//! ```

use std::time::Duration;

use clap::{Parser, Subcommand};
use survivors_shared::logger::setup_logger;
use survivors_simulator::{
    extension::{ExtensionIdentity, run_extension_session},
    game::run_game_session,
    runner::run_with_reconnect,
    viewer::run_viewer_session,
};

#[derive(Parser, Debug)]
#[command(name = "survivors-simulator")]
#[command(about = "Play the game, an extension or a viewer against a running relay", long_about = None)]
struct Args {
    /// WebSocket URL of the relay
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080/ws", global = true)]
    url: String,

    #[command(subcommand)]
    role: RoleCommand,
}

#[derive(Subcommand, Debug)]
enum RoleCommand {
    /// Register as the game and answer forwarded actions
    Game,
    /// Join as a user and send typed actions
    Extension {
        #[arg(long)]
        user_id: String,

        #[arg(long, default_value = "Simulated")]
        display_name: String,

        /// Secret the relay verifies extension tokens with
        #[arg(long, env = "TWITCH_CLIENT_SECRET", hide_env_values = true)]
        secret: String,
    },
    /// Poll the storekeeper as a viewer
    Viewer {
        #[arg(long, default_value = "viewer")]
        user_id: String,

        /// Seconds between storekeeper requests
        #[arg(long, default_value_t = 10)]
        interval_secs: u64,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    let url = args.url;

    let result = match args.role {
        RoleCommand::Game => run_with_reconnect("game", || run_game_session(&url)).await,
        RoleCommand::Extension {
            user_id,
            display_name,
            secret,
        } => {
            let identity = ExtensionIdentity {
                user_id,
                display_name,
                secret,
            };
            run_with_reconnect("extension", || run_extension_session(&url, &identity)).await
        }
        RoleCommand::Viewer {
            user_id,
            interval_secs,
        } => {
            let interval = Duration::from_secs(interval_secs.max(1));
            run_with_reconnect("viewer", || run_viewer_session(&url, &user_id, interval)).await
        }
    };

    if let Err(e) = result {
        tracing::error!("Simulator error: {}", e);
        std::process::exit(1);
    }
}
