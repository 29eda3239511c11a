//! Error types of the relay core.

use thiserror::Error;

/// Why an inbound frame could not be turned into an envelope.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("frame is not valid UTF-8 text: {0}")]
    InvalidTransportPayload(#[from] std::str::Utf8Error),

    #[error("frame is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("envelope must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("envelope fields have unexpected types: {0}")]
    InvalidFields(#[source] serde_json::Error),
}

/// Rejection reasons of the trust gate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrustError {
    #[error("token is required for role '{0}'")]
    MissingToken(String),

    #[error("user.id is required for role '{0}'")]
    MissingUserId(String),

    #[error("token has expired")]
    Expired,

    #[error("token is invalid: {0}")]
    InvalidToken(String),

    #[error("token subject '{subject}' does not match user.id '{user_id}'")]
    SubjectMismatch { subject: String, user_id: String },
}

/// Outbound envelope failed validation before being written.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("outbound envelope has an empty {0}")]
    EmptyField(&'static str),

    #[error("failed to serialize outbound envelope: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity request failed: {0}")]
    Request(String),

    #[error("identity service answered with status {0}")]
    Status(u16),

    #[error("identity provider is not configured")]
    NotConfigured,
}

/// The transport behind a connection is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("connection is closed")]
pub struct ConnectionClosed;
