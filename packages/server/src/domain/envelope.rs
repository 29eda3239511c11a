//! Wire envelopes exchanged with clients.

use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::{Map, Value};

use super::{
    error::EnvelopeError,
    value_object::{Role, UserId},
};

/// Fields that identify a storekeeper merchandise record pushed by the game.
pub const MERCHANDISE_FIELDS: [&str; 3] = ["name", "phrases", "common_items"];

/// A raw frame as received from the transport.
#[derive(Debug, Clone, Copy)]
pub enum InboundFrame<'a> {
    Text(&'a str),
    Binary(&'a [u8]),
}

impl<'a> InboundFrame<'a> {
    pub fn decode_text(self) -> Result<&'a str, EnvelopeError> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Binary(bytes) => Ok(std::str::from_utf8(bytes)?),
        }
    }
}

/// Parse `text` as a JSON object.
pub fn parse_object(text: &str) -> Result<Map<String, Value>, EnvelopeError> {
    let value: Value = serde_json::from_str(text).map_err(EnvelopeError::Malformed)?;
    match value {
        Value::Object(object) => Ok(object),
        Value::Null => Err(EnvelopeError::NotAnObject("null")),
        Value::Array(_) => Err(EnvelopeError::NotAnObject("array")),
        Value::Bool(_) => Err(EnvelopeError::NotAnObject("boolean")),
        Value::Number(_) => Err(EnvelopeError::NotAnObject("number")),
        Value::String(_) => Err(EnvelopeError::NotAnObject("string")),
    }
}

pub fn is_merchandise_record(object: &Map<String, Value>) -> bool {
    MERCHANDISE_FIELDS
        .iter()
        .all(|field| object.contains_key(*field))
}

/// User reference carried by an inbound envelope.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserRef {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(id)) => Ok(Some(id)),
        Some(Value::Number(id)) => Ok(Some(id.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "user.id must be a string or a number, got {other}"
        ))),
    }
}

/// Envelope received from any client.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InboundEnvelope {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<UserRef>,
    /// Kept untyped so a non-string action is reported as unknown rather
    /// than failing the whole envelope.
    #[serde(default)]
    pub action: Option<Value>,
    #[serde(default)]
    pub event: Option<Value>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl InboundEnvelope {
    pub fn from_object(object: Map<String, Value>) -> Result<Self, EnvelopeError> {
        serde_json::from_value(Value::Object(object)).map_err(EnvelopeError::InvalidFields)
    }

    pub fn role(&self) -> Option<Role> {
        self.role.as_deref().map(Role::parse)
    }

    pub fn has_user(&self) -> bool {
        self.user.is_some()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user
            .as_ref()
            .and_then(|user| user.id.clone())
            .and_then(|id| UserId::new(id).ok())
    }

    pub fn display_name(&self) -> Option<&str> {
        self.user
            .as_ref()
            .and_then(|user| user.display_name.as_deref())
            .filter(|name| !name.trim().is_empty())
    }

    pub fn action_name(&self) -> Option<&str> {
        self.action
            .as_ref()
            .and_then(Value::as_str)
            .filter(|action| !action.is_empty())
    }

    /// `true` when `action` is present but is not a string.
    pub fn has_non_string_action(&self) -> bool {
        self.action
            .as_ref()
            .is_some_and(|action| !action.is_null() && !action.is_string())
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|token| !token.is_empty())
    }

    /// Integer event code, if the envelope carries one.
    pub fn event_code(&self) -> Option<u64> {
        self.event.as_ref().and_then(Value::as_u64)
    }
}

/// User block of an outbound envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundUser {
    pub id: String,
    pub display_name: String,
}

/// Canonical envelope written by the message bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEnvelope {
    pub user: OutboundUser,
    pub action: String,
    pub data: Option<Value>,
}

impl OutboundEnvelope {
    pub fn new(
        user_id: &UserId,
        display_name: impl Into<String>,
        action: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        Self {
            user: OutboundUser {
                id: user_id.as_str().to_string(),
                display_name: display_name.into(),
            },
            action: action.into(),
            data,
        }
    }
}
