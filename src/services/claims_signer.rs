use std::sync::Arc;

use crate::error::{Result, SsoError};
use crate::models::claims::Claims;
use crate::services::signer::Signer;

/// Produces the two in-payload signatures of a token.
///
/// - the user signs address, refId, scope and timestamp
/// - the broker signs the email it verified
#[derive(Clone)]
pub struct ClaimsSigner {
    signer: Arc<dyn Signer>,
}

impl ClaimsSigner {
    pub fn new(signer: Arc<dyn Signer>) -> Self {
        Self { signer }
    }

    pub fn sign_as_user(&self, private_key: &str, claims: Claims) -> Result<Claims> {
        let mut claims = claims;
        let message = claims.message_signed_by_user();
        let signature = self.signer.sign(private_key, &message)?;
        let timestamp = claims.user_signature_timestamp();

        claims.set_user_signature(&signature, timestamp)
    }

    /// Fails with `MissingField("email")` when there is nothing to attest.
    pub fn sign_as_broker(&self, private_key: &str, claims: Claims) -> Result<Claims> {
        let mut claims = claims;
        let message = claims.message_signed_by_silkey();
        if message.is_empty() {
            return Err(SsoError::MissingField("email"));
        }
        let signature = self.signer.sign(private_key, &message)?;
        let timestamp = claims.silkey_signature_timestamp();

        claims.set_silkey_signature(&signature, timestamp)
    }
}
