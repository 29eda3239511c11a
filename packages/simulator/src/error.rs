//! Error types for the simulators.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimulatorError {
    /// Could not reach the relay, or the socket broke.
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Failed to sign token: {0}")]
    Token(String),

    /// A typed command could not be understood.
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for SimulatorError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Connection(e.to_string())
    }
}
