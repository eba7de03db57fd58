//! Protocol constants shared by websites, the broker and relying parties.

/// Every SSO request key carries this prefix; other keys are never signed.
pub const SSO_PREFIX: &str = "sso";

pub const SSO_SIGNATURE: &str = "ssoSignature";
pub const SSO_REDIRECT_URL: &str = "ssoRedirectUrl";
pub const SSO_CANCEL_URL: &str = "ssoCancelUrl";
pub const SSO_TIMESTAMP: &str = "ssoTimestamp";
pub const SSO_REF_ID: &str = "ssoRefId";
pub const SSO_SCOPE: &str = "ssoScope";
pub const SSO_REDIRECT_METHOD: &str = "ssoRedirectMethod";

pub const SSO_REQUIRED: [&str; 4] = [SSO_SIGNATURE, SSO_REDIRECT_URL, SSO_CANCEL_URL, SSO_TIMESTAMP];
pub const SSO_OPTIONAL: [&str; 3] = [SSO_REF_ID, SSO_SCOPE, SSO_REDIRECT_METHOD];

pub const MESSAGE_TO_SIGN_GLUE: &str = "::";
pub const SCOPE_DIVIDER: &str = ",";

/// Address-only scope.
pub const SCOPE_ID: &str = "id";
pub const SCOPE_EMAIL: &str = "email";

/// Version of the user message layout (address, refId, scope, timestamp).
pub const USER_MESSAGE_VERSION: u8 = 2;

/// Claim fields a token must carry for the given scope tag, or `None` for an unknown tag.
pub fn required_fields_for_scope(scope: &str) -> Option<&'static [&'static str]> {
    match scope {
        SCOPE_ID => Some(&["address"]),
        SCOPE_EMAIL => Some(&["address", "email"]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_table() {
        assert_eq!(required_fields_for_scope("id"), Some(&["address"][..]));
        assert_eq!(required_fields_for_scope("email"), Some(&["address", "email"][..]));
        assert_eq!(required_fields_for_scope("Email"), None);
        assert_eq!(required_fields_for_scope(""), None);
    }

    #[test]
    fn request_keys_share_the_prefix() {
        for key in SSO_REQUIRED.iter().chain(SSO_OPTIONAL.iter()) {
            assert!(key.starts_with(SSO_PREFIX), "{key}");
        }
    }
}
