//! Session execution with reconnection support.

use std::{future::Future, time::Duration};

use crate::error::SimulatorError;

const MAX_RECONNECT_ATTEMPTS: u32 = 5;
const RECONNECT_INTERVAL_SECS: u64 = 5;

/// How a session ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The user asked to quit.
    UserExit,
    /// The relay closed the socket.
    ConnectionLost,
}

/// Run `session` until the user quits, reconnecting up to five times.
pub async fn run_with_reconnect<F, Fut>(label: &str, mut session: F) -> Result<(), SimulatorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<SessionEnd, SimulatorError>>,
{
    let mut reconnect_count = 0;

    loop {
        tracing::info!(
            "Connecting as {} (attempt {}/{})",
            label,
            reconnect_count + 1,
            MAX_RECONNECT_ATTEMPTS
        );

        match session().await {
            Ok(SessionEnd::UserExit) => {
                tracing::info!("Session ended normally");
                return Ok(());
            }
            Ok(SessionEnd::ConnectionLost) => {
                tracing::warn!("Connection closed by the relay");
            }
            Err(e) => {
                tracing::warn!("Connection lost: {}", e);
            }
        }

        reconnect_count += 1;
        if reconnect_count >= MAX_RECONNECT_ATTEMPTS {
            return Err(SimulatorError::Connection(format!(
                "gave up after {} attempts",
                MAX_RECONNECT_ATTEMPTS
            )));
        }

        tracing::info!(
            "Reconnecting in {} seconds... (attempt {}/{})",
            RECONNECT_INTERVAL_SECS,
            reconnect_count + 1,
            MAX_RECONNECT_ATTEMPTS
        );
        tokio::time::sleep(Duration::from_secs(RECONNECT_INTERVAL_SECS)).await;
    }
}
