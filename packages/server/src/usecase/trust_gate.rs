//! UseCase: 受信エンベロープの信頼判定
//!
//! `game` と `viewer` はトークン無しで通す。それ以外のロール（未指定を含む）は
//! 署名付きトークンと `user.id` の両方を要求し、トークンの subject が
//! `user.id` と一致した場合のみ通す。

use std::sync::Arc;

use crate::domain::{AuthClaim, InboundEnvelope, TokenVerifier, TrustError};

/// 信頼判定のユースケース
pub struct TrustGate {
    verifier: Arc<dyn TokenVerifier>,
}

impl TrustGate {
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { verifier }
    }

    /// Admit or reject `envelope`.
    ///
    /// Returns the verified claim when a token was required, `None` for the
    /// roles that need no token.
    pub fn evaluate(&self, envelope: &InboundEnvelope) -> Result<Option<AuthClaim>, TrustError> {
        let role = envelope.role();
        if role.as_ref().is_some_and(|role| role.is_trusted_without_token()) {
            return Ok(None);
        }

        let role_name = role
            .as_ref()
            .map(|role| role.as_str().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let token = envelope
            .token()
            .ok_or_else(|| TrustError::MissingToken(role_name.clone()))?;
        let user_id = envelope
            .user_id()
            .ok_or(TrustError::MissingUserId(role_name))?;

        let claim = self.verifier.verify(token)?;
        if claim.subject != user_id.as_str() {
            return Err(TrustError::SubjectMismatch {
                subject: claim.subject,
                user_id: user_id.into_string(),
            });
        }

        Ok(Some(claim))
    }
}
