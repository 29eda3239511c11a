//! Value objects shared across the relay.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Display name used whenever a user's name cannot be resolved.
pub const UNKNOWN_DISPLAY_NAME: &str = "Unknown";

/// User id stamped on replies to requests that carried none.
pub const ANONYMOUS_USER_ID: &str = "anonymous";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("user id must not be empty")]
    EmptyUserId,
}

/// Identifier of a viewer, as issued by the streaming platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::EmptyUserId);
        }
        Ok(Self(value))
    }

    /// Stand-in for an anonymous viewer.
    pub fn anonymous() -> Self {
        Self(ANONYMOUS_USER_ID.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for UserId {
    type Error = ValueObjectError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value.to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role claimed by the sender of an inbound envelope.
///
/// Any string other than the three known roles is kept verbatim in
/// [`Role::Other`] and is treated like `extension` by the trust gate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Game,
    Extension,
    Viewer,
    Other(String),
}

impl Role {
    pub fn parse(value: &str) -> Self {
        match value {
            "game" => Self::Game,
            "extension" => Self::Extension,
            "viewer" => Self::Viewer,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Game => "game",
            Self::Extension => "extension",
            Self::Viewer => "viewer",
            Self::Other(value) => value,
        }
    }

    /// Roles admitted by the trust gate without a token.
    pub fn is_trusted_without_token(&self) -> bool {
        matches!(self, Self::Game | Self::Viewer)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
