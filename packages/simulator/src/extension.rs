//! Simulated extension: signs a token, joins, then sends typed actions.

use futures_util::{SinkExt, StreamExt};
use rustyline::{DefaultEditor, error::ReadlineError};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use crate::{
    error::SimulatorError,
    protocol::{extension_envelope, extension_token, parse_command},
    runner::SessionEnd,
    ui::{print_received, redisplay_prompt},
};

/// Identity the simulated extension acts for.
#[derive(Debug, Clone)]
pub struct ExtensionIdentity {
    pub user_id: String,
    pub display_name: String,
    pub secret: String,
}

/// Run one extension session.
///
/// Each typed line is `<action> [json data]`; `quit` ends the session.
pub async fn run_extension_session(
    url: &str,
    identity: &ExtensionIdentity,
) -> Result<SessionEnd, SimulatorError> {
    let token = extension_token(&identity.secret, &identity.user_id)?;
    let (ws_stream, _) = connect_async(url).await?;
    let (mut write, mut read) = ws_stream.split();

    let join = extension_envelope(
        &token,
        &identity.user_id,
        &identity.display_name,
        "join",
        None,
    );
    write.send(Message::Text(join.to_string().into())).await?;
    tracing::info!("Joined as {} ({})", identity.display_name, identity.user_id);
    println!(
        "\nYou are '{}'. Type `<action> [json]` (e.g. `str`, `buy {{\"item\":\"Potion\"}}`), or `quit`.\n",
        identity.display_name
    );

    // Spawn a task to handle incoming messages
    let label = identity.user_id.clone();
    let mut read_task = tokio::spawn(async move {
        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    match serde_json::from_str::<Value>(text.as_str()) {
                        Ok(value) => print_received(&label, &value),
                        Err(_) => println!("\n[{}] <- {}", label, text),
                    }
                    redisplay_prompt(&label);
                }
                Ok(Message::Close(_)) => {
                    tracing::info!("Relay closed the connection");
                    break;
                }
                Err(e) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    // Create channel for rustyline input
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();

    // Spawn a blocking thread for rustyline (synchronous readline)
    let prompt = format!("{}> ", identity.user_id);
    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    // Spawn a task to turn typed commands into envelopes
    let user_id = identity.user_id.clone();
    let display_name = identity.display_name.clone();
    let mut write_task = tokio::spawn(async move {
        while let Some(line) = input_rx.recv().await {
            if line == "quit" {
                return Ok(());
            }
            let (action, data) = match parse_command(&line) {
                Ok(command) => command,
                Err(e) => {
                    println!("{}", e);
                    redisplay_prompt(&user_id);
                    continue;
                }
            };
            let envelope = extension_envelope(&token, &user_id, &display_name, &action, data);
            write
                .send(Message::Text(envelope.to_string().into()))
                .await
                .map_err(SimulatorError::from)?;
        }
        Ok::<(), SimulatorError>(())
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut read_task => {
            write_task.abort();
            Ok(SessionEnd::ConnectionLost)
        }
        write_result = &mut write_task => {
            read_task.abort();
            match write_result {
                Ok(Ok(())) => Ok(SessionEnd::UserExit),
                Ok(Err(e)) => Err(e),
                Err(e) => Err(SimulatorError::Connection(e.to_string())),
            }
        }
    }
}
