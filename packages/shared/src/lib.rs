//! Utilities shared by the relay server and the simulator.

pub mod logger;
pub mod time;
