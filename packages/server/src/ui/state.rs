//! Shared application state.

use std::sync::Arc;

use chrono::FixedOffset;
use survivors_shared::time::Clock;

use crate::{domain::ConnectionRegistry, usecase::EnvelopeRouter};

pub struct AppState {
    /// Entry point for every inbound frame.
    pub router: Arc<EnvelopeRouter>,
    pub registry: Arc<dyn ConnectionRegistry>,
    pub clock: Arc<dyn Clock>,
    /// Unix millis at server start.
    pub started_at: i64,
    /// Offset used when reporting timestamps.
    pub offset: FixedOffset,
    pub max_message_size: usize,
}
