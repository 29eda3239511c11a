//! Terminal helpers.

use std::io::Write;

use serde_json::Value;

/// Redisplay the prompt after printing a message
pub fn redisplay_prompt(label: &str) {
    print!("{}> ", label);
    std::io::stdout().flush().ok();
}

/// Print a received envelope on its own line.
pub fn print_received(label: &str, message: &Value) {
    let action = message
        .get("action")
        .and_then(Value::as_str)
        .unwrap_or("-");
    let data = message.get("data").cloned().unwrap_or(Value::Null);
    println!("\n[{}] <- {} {}", label, action, data);
}
