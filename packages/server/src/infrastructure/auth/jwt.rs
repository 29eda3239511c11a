//! HS256 JSON Web Token verification for extension clients.
//!
//! Tokens are signed with the shared extension secret and carry `sub`
//! (the user id), `iat` and `exp`.

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};

use crate::domain::{AuthClaim, TokenVerifier, TrustError};

pub struct JwtTokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtTokenVerifier {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl TokenVerifier for JwtTokenVerifier {
    fn verify(&self, token: &str) -> Result<AuthClaim, TrustError> {
        decode::<AuthClaim>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TrustError::Expired,
                _ => TrustError::InvalidToken(e.to_string()),
            })
    }
}

/// Verifier used when no secret is configured: every token is rejected.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledTokenVerifier;

impl TokenVerifier for DisabledTokenVerifier {
    fn verify(&self, _token: &str) -> Result<AuthClaim, TrustError> {
        Err(TrustError::InvalidToken(
            "no extension secret configured".to_string(),
        ))
    }
}

/// Sign a token for `subject`. Timestamps are Unix seconds.
pub fn issue_token(
    secret: &[u8],
    subject: &str,
    issued_at: i64,
    expires_at: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claim = AuthClaim {
        subject: subject.to_string(),
        issued_at: Some(issued_at),
        expires_at,
    };
    encode(&Header::default(), &claim, &EncodingKey::from_secret(secret))
}
