//! Real-time relay between a game process, per-viewer extension clients and
//! anonymous viewers.
//!
//! Inbound frames go through the [`usecase::EnvelopeRouter`], which applies
//! the trust gate and the per-sender rate limiter before dispatching an action.
//! Every outbound write goes through the [`usecase::MessageBus`].

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
