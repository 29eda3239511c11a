//! Token verification.

pub mod jwt;

pub use jwt::{DisabledTokenVerifier, JwtTokenVerifier, issue_token};
