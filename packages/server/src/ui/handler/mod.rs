//! Request handlers.

pub mod http;
pub mod websocket;

pub use http::{health_check, not_found, service_info};
pub use websocket::websocket_handler;
