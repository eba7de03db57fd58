/*
 * Responsibility
 * - Canonical "key=value" message a website signs for an SSO request
 *
 * Only `sso`-prefixed keys take part, the signature key never does, and nil values are
 * skipped entirely (an empty string is kept and renders as `key=`).
 */
use crate::models::settings::{MESSAGE_TO_SIGN_GLUE, SSO_PREFIX, SSO_SIGNATURE};
use crate::models::sso_params::{SsoParams, render_value};

pub fn build_message(params: &SsoParams) -> String {
    params
        .iter()
        .filter(|(key, _)| key.starts_with(SSO_PREFIX) && *key != SSO_SIGNATURE)
        .filter_map(|(key, value)| render_value(value).map(|v| format!("{}={}", key, v)))
        .collect::<Vec<_>>()
        .join(MESSAGE_TO_SIGN_GLUE)
}
