use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Result, SsoError};
use crate::models::settings::{SSO_REQUIRED, SSO_SIGNATURE, SSO_TIMESTAMP};
use crate::models::sso_params::SsoParams;
use crate::services::hex_codec::{current_timestamp, timestamp_valid};
use crate::services::message::build_message;
use crate::services::signer::Signer;

/// Builds the signed parameter set a website embeds in its redirect to the broker.
#[derive(Clone)]
pub struct SsoRequestBuilder {
    signer: Arc<dyn Signer>,
}

impl std::fmt::Debug for SsoRequestBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SsoRequestBuilder").finish_non_exhaustive()
    }
}

impl SsoRequestBuilder {
    pub fn new(signer: Arc<dyn Signer>) -> Self {
        Self { signer }
    }

    /// Signs `params` with the website owner's key.
    ///
    /// - `ssoTimestamp` is stamped with the current time when absent or not a timestamp.
    /// - `ssoRedirectUrl` and `ssoCancelUrl` must be present.
    ///
    /// Returns every parameter plus `ssoSignature`.
    pub fn generate(&self, private_key: &str, params: SsoParams) -> Result<SsoParams> {
        if private_key.trim().is_empty() {
            return Err(SsoError::MissingField("private_key"));
        }

        let mut params = params;
        let stamped = params
            .get_str(SSO_TIMESTAMP)
            .is_some_and(|raw| timestamp_valid(&raw));
        if !stamped {
            params.insert(SSO_TIMESTAMP, Value::from(current_timestamp()));
        }

        // The signature itself is produced below.
        if let Some(missing) = SSO_REQUIRED
            .iter()
            .copied()
            .filter(|k| *k != SSO_SIGNATURE)
            .find(|k| !params.is_present(k))
        {
            warn!(missing = %missing, "cannot sign SSO request");
            return Err(SsoError::MissingField(missing));
        }

        let message = build_message(&params);
        let signature = self.signer.sign(private_key, &message)?;
        debug!(message = %message, "signed SSO request");

        params.insert(SSO_SIGNATURE, signature);
        params.validate()?;

        Ok(params)
    }
}
