//! Identity providers.

pub mod twitch;

use async_trait::async_trait;

use crate::domain::{IdentityError, IdentityProvider, UserId};

pub use twitch::TwitchIdentityProvider;

/// Provider used when no platform credentials are configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopIdentityProvider;

#[async_trait]
impl IdentityProvider for NoopIdentityProvider {
    async fn display_name(&self, _user_id: &UserId) -> Result<Option<String>, IdentityError> {
        Err(IdentityError::NotConfigured)
    }
}
