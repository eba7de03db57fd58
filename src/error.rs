/*
 * Responsibility
 * - Error kinds shared by the claims model, the request builder and the verifier
 * - Setter/builder failures surface as `Err(SsoError)`; the verifier wraps them in `Verdict::Reject`
 */
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SsoError>;

/// Which party a signature check was about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signatory {
    User,
    Broker,
    Website,
}

impl std::fmt::Display for Signatory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signatory::User => f.write_str("user"),
            Signatory::Broker => f.write_str("broker"),
            Signatory::Website => f.write_str("website"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SsoError {
    #[error("`{0}` is required but missing")]
    MissingField(&'static str),

    #[error("`{0}` is not an ethereum address")]
    InvalidAddress(String),

    #[error("invalid {field}: `{value}`")]
    InvalidSignature { field: &'static str, value: String },

    #[error("empty {0}")]
    MissingTimestamp(&'static str),

    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("token expired, expected age {max_age}s but got {age}s")]
    TokenExpired { age: i64, max_age: i64 },

    #[error("token max age must not be negative, got {0}")]
    InvalidMaxAge(i64),

    #[error("{signatory} signature mismatch: expected {expected}, recovered {recovered}")]
    SignatureMismatch {
        signatory: Signatory,
        expected: String,
        recovered: String,
    },

    #[error("scope `{0}` is not supported")]
    UnsupportedScope(String),

    #[error("scope is empty")]
    EmptyScope,

    #[error("invalid private key")]
    InvalidPrivateKey,

    #[error("signer error: {0}")]
    Signer(String),

    #[error("registry error: {0}")]
    Registry(String),
}

impl SsoError {
    pub(crate) fn invalid_signature(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidSignature {
            field,
            value: value.into(),
        }
    }
}
