//! Simulated viewer: periodically asks for the storekeeper and prints replies.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use crate::{
    error::SimulatorError, protocol::viewer_storekeeper_request, runner::SessionEnd,
    ui::print_received,
};

pub async fn run_viewer_session(
    url: &str,
    user_id: &str,
    interval: Duration,
) -> Result<SessionEnd, SimulatorError> {
    let (ws_stream, _) = connect_async(url).await?;
    let (mut write, mut read) = ws_stream.split();
    tracing::info!("Viewer {} connected", user_id);

    let request = viewer_storekeeper_request(user_id).to_string();
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                write.send(Message::Text(request.clone().into())).await?;
                tracing::debug!("Storekeeper requested");
            }
            message = read.next() => {
                let Some(message) = message else {
                    return Ok(SessionEnd::ConnectionLost);
                };
                match message? {
                    Message::Text(text) => match serde_json::from_str::<Value>(text.as_str()) {
                        Ok(value) => print_received(user_id, &value),
                        Err(_) => println!("\n[{}] <- {}", user_id, text),
                    },
                    Message::Close(_) => return Ok(SessionEnd::ConnectionLost),
                    _ => {}
                }
            }
            _ = tokio::signal::ctrl_c() => {
                return Ok(SessionEnd::UserExit);
            }
        }
    }
}
