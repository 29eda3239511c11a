//! Display-name lookup for numeric platform user ids.

use async_trait::async_trait;

use super::{error::IdentityError, value_object::UserId};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` means the platform does not know the user.
    async fn display_name(&self, user_id: &UserId) -> Result<Option<String>, IdentityError>;
}
