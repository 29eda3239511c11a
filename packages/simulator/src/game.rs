//! Simulated game: registers with the relay and answers forwarded actions.

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use crate::{
    error::SimulatorError,
    protocol::{game_handshake, game_reply},
    runner::SessionEnd,
};

/// Run one game session until the relay closes the socket.
pub async fn run_game_session(url: &str) -> Result<SessionEnd, SimulatorError> {
    let (ws_stream, _) = connect_async(url).await?;
    let (mut write, mut read) = ws_stream.split();

    write
        .send(Message::Text(game_handshake().to_string().into()))
        .await?;
    tracing::info!("Game registered with the relay");

    while let Some(message) = read.next().await {
        let text = match message? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let forwarded: Value = match serde_json::from_str(text.as_str()) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Ignoring non-JSON frame: {}", e);
                continue;
            }
        };
        tracing::info!(
            user_id = %forwarded["user"]["id"],
            action = %forwarded["action"],
            "Game received"
        );

        if let Some(reply) = game_reply(&forwarded) {
            write.send(Message::Text(reply.to_string().into())).await?;
            tracing::info!("Game replied: {}", reply);
        }
    }

    Ok(SessionEnd::ConnectionLost)
}
