//! Simulated clients for exercising a running relay by hand.

pub mod error;
pub mod extension;
pub mod game;
pub mod protocol;
pub mod runner;
pub mod ui;
pub mod viewer;
