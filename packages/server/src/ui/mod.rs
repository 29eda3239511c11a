//! UI layer: the axum server that exposes the relay.

pub mod handler;
pub mod server;
pub mod signal;
pub mod state;

pub use server::Server;
