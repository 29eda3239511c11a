//! Domain layer: entities, value objects and the interfaces the relay needs
//! from its collaborators.

pub mod action;
pub mod auth;
pub mod connection;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod registry;
pub mod value_object;

pub use action::{Action, GameEvent};
pub use auth::{AuthClaim, TokenVerifier};
pub use connection::{Connection, ConnectionId, ConnectionMeta, OutboundFrame, OutboundReceiver};
pub use envelope::{InboundEnvelope, InboundFrame, OutboundEnvelope, OutboundUser, UserRef};
pub use error::{BusError, ConnectionClosed, EnvelopeError, IdentityError, TrustError};
pub use identity::IdentityProvider;
pub use registry::{ConnectionRegistry, ConnectionSnapshot, RegisteredRole};
pub use value_object::{ANONYMOUS_USER_ID, Role, UNKNOWN_DISPLAY_NAME, UserId, ValueObjectError};
