//! Token claims and the verifier interface used by the trust gate.

use serde::{Deserialize, Serialize};

use super::error::TrustError;

/// Signature-verified payload of an extension token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthClaim {
    #[serde(rename = "sub")]
    pub subject: String,
    #[serde(rename = "iat", default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<i64>,
    #[serde(rename = "exp")]
    pub expires_at: i64,
}

/// Verifies a signed token and returns its claim.
///
/// Implementations must reject bad signatures, malformed tokens and expired
/// tokens. Matching the subject against the envelope is the caller's job.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<AuthClaim, TrustError>;
}
