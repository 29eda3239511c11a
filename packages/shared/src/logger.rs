//! Logging setup for the relay binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified default log level.
///
/// Both the library crates (`survivors_server`, `survivors_shared`) and the
/// running binary log at `default_log_level`. The `RUST_LOG` environment
/// variable overrides the whole filter.
///
/// # Examples
///
/// ```no_run
/// use survivors_shared::logger::setup_logger;
///
/// setup_logger("survivors_server", "info");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    let binary_target = binary_name.replace('-', "_");
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "survivors_server={level},survivors_shared={level},{binary}={level},tower_http=info",
                    level = default_log_level,
                    binary = binary_target,
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
