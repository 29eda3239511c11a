//! Envelopes the simulated clients send, and the game's scripted replies.

use chrono::Utc;
use serde_json::{Value, json};
use survivors_server::{domain::GameEvent, infrastructure::auth::issue_token};

use crate::error::SimulatorError;

/// Lifetime of a simulated extension token.
pub const TOKEN_TTL_SECS: i64 = 3600;

pub fn game_handshake() -> Value {
    json!({"role": "game"})
}

/// Sign an extension token for `user_id` valid for one hour.
pub fn extension_token(secret: &str, user_id: &str) -> Result<String, SimulatorError> {
    let now = Utc::now().timestamp();
    issue_token(secret.as_bytes(), user_id, now, now + TOKEN_TTL_SECS)
        .map_err(|e| SimulatorError::Token(e.to_string()))
}

pub fn extension_envelope(
    token: &str,
    user_id: &str,
    display_name: &str,
    action: &str,
    data: Option<Value>,
) -> Value {
    json!({
        "role": "extension",
        "token": token,
        "user": {"id": user_id, "display_name": display_name},
        "action": action,
        "data": data,
    })
}

pub fn viewer_storekeeper_request(user_id: &str) -> Value {
    json!({"role": "viewer", "user": {"id": user_id}, "action": "storekeeper"})
}

/// Split a typed line into an action and optional JSON data,
/// e.g. `buy {"item":"Potion"}`.
pub fn parse_command(line: &str) -> Result<(String, Option<Value>), SimulatorError> {
    let line = line.trim();
    let (action, rest) = match line.split_once(char::is_whitespace) {
        Some((action, rest)) => (action, rest.trim()),
        None => (line, ""),
    };
    if action.is_empty() {
        return Err(SimulatorError::InvalidCommand("empty command".to_string()));
    }
    if rest.is_empty() {
        return Ok((action.to_string(), None));
    }
    let data = serde_json::from_str(rest)
        .map_err(|e| SimulatorError::InvalidCommand(format!("data is not JSON: {}", e)))?;
    Ok((action.to_string(), Some(data)))
}

/// Sample merchandise record pushed by the simulated game.
pub fn sample_merchandise() -> Value {
    json!({
        "name": "Seksal",
        "phrases": ["Welcome, traveller!", "Only the finest wares."],
        "common_items": [
            {"id": 1, "name": "Potion", "price": 10},
            {"id": 2, "name": "Iron Sword", "price": 50}
        ]
    })
}

/// What the simulated game answers to an envelope the relay forwarded to it.
pub fn game_reply(forwarded: &Value) -> Option<Value> {
    let user = forwarded.get("user")?;
    let action = forwarded.get("action")?.as_str()?;
    let data = forwarded.get("data").cloned().unwrap_or(Value::Null);

    if action == "storekeeper" {
        return Some(sample_merchandise());
    }

    let (event, payload) = match action {
        "join" => (GameEvent::Joined, json!({"hp": 100, "level": 1})),
        "str" | "agi" | "vit" | "luc" => (
            GameEvent::StatusIncreased,
            json!({"stat": action, "points": data}),
        ),
        "equip" => (GameEvent::Equipped, json!({"item": data})),
        "buy" => (GameEvent::Buyed, json!({"item": data})),
        "sell" => (GameEvent::Sold, json!({"item": data})),
        "shop" => (GameEvent::ShopOpened, json!({"items": ["Potion", "Iron Sword"]})),
        _ => return None,
    };

    Some(json!({
        "role": "game",
        "user": user,
        "event": event.code(),
        "data": payload,
    }))
}
