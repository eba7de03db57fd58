//! Token verification.
//!
//! A token is accepted only after every state below passes, in this order; the first failure
//! rejects:
//!
//! 1. decode the payload (the envelope signature is ignored)
//! 2. token age
//! 3. user signature over address/refId/scope/timestamp
//! 4. broker signature over the email (skipped for address-only tokens)
//! 5. website signature over the original SSO request
//! 6. fields required by each scope tag
//!
//! `verify` is total: every failure, including collaborator errors, becomes `Verdict::Reject`.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Result, Signatory, SsoError};
use crate::models::claims::Claims;
use crate::models::settings::{SCOPE_DIVIDER, required_fields_for_scope};
use crate::models::sso_params::SsoParams;
use crate::services::hex_codec::current_timestamp;
use crate::services::jwt::TokenCodec;
use crate::services::message::build_message;
use crate::services::signer::Signer;

/// Above this many seconds the configured max age is considered too lax.
const RECOMMENDED_MAX_AGE_SECONDS: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept(Claims),
    Reject(SsoError),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accept(_))
    }

    pub fn claims(&self) -> Option<&Claims> {
        match self {
            Verdict::Accept(claims) => Some(claims),
            Verdict::Reject(_) => None,
        }
    }

    pub fn into_claims(self) -> Option<Claims> {
        match self {
            Verdict::Accept(claims) => Some(claims),
            Verdict::Reject(_) => None,
        }
    }

    pub fn reason(&self) -> Option<&SsoError> {
        match self {
            Verdict::Accept(_) => None,
            Verdict::Reject(reason) => Some(reason),
        }
    }
}

/// Outcome of the broker signature state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerCheck {
    /// Recovered signer matches the pinned broker address.
    Verified,
    /// Signature recovered but no broker address was supplied to compare against.
    Unpinned,
    /// Address-only token: neither email nor broker signature present.
    NotApplicable,
}

/// Everything a relying party knows when a token comes back.
#[derive(Debug, Clone, Copy)]
pub struct VerifyRequest<'a> {
    pub token: &'a str,
    /// The SSO request parameters the website originally signed.
    pub sso_params: &'a SsoParams,
    pub website_address: &'a str,
    /// Broker address from the registry. `None` keeps verification in a weaker, unpinned mode.
    pub broker_address: Option<&'a str>,
    /// `0` disables the age check.
    pub max_age_seconds: i64,
}

#[derive(Clone)]
pub struct Verifier {
    signer: Arc<dyn Signer>,
    codec: Arc<dyn TokenCodec>,
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier").finish_non_exhaustive()
    }
}

impl Verifier {
    pub fn new(signer: Arc<dyn Signer>, codec: Arc<dyn TokenCodec>) -> Self {
        Self { signer, codec }
    }

    pub fn verify(&self, request: &VerifyRequest<'_>) -> Verdict {
        let now = i64::try_from(current_timestamp()).unwrap_or(i64::MAX);
        self.verify_at(request, now)
    }

    /// Same as `verify` with an explicit clock (unix seconds).
    pub fn verify_at(&self, request: &VerifyRequest<'_>, now: i64) -> Verdict {
        match self.run(request, now) {
            Ok(claims) => {
                debug!(address = ?claims.address(), scope = %claims.scope(), "token accepted");
                Verdict::Accept(claims)
            }
            Err(reason) => {
                warn!(reason = %reason, "token rejected");
                Verdict::Reject(reason)
            }
        }
    }

    fn run(&self, request: &VerifyRequest<'_>, now: i64) -> Result<Claims> {
        let payload = self.codec.decode(request.token)?;
        let claims = Claims::from_untyped_map(&payload);

        check_age(&claims, request.max_age_seconds, now)?;
        self.check_user_signature(&claims)?;
        self.check_broker_signature(&claims, request.broker_address)?;
        self.check_website_signature(request.sso_params, request.website_address)?;
        require_fields_for_scope(&claims)?;

        Ok(claims)
    }

    pub fn check_user_signature(&self, claims: &Claims) -> Result<()> {
        let address = claims
            .field("address")
            .ok_or(SsoError::MissingField("address"))?;
        let signature = claims
            .field("userSignature")
            .ok_or(SsoError::MissingField("userSignature"))?;
        if claims.user_signature_timestamp().is_none() {
            return Err(SsoError::MissingField("userSignatureTimestamp"));
        }

        // Timestamp is set, so building the message does not stamp anything.
        let message = claims.clone().message_signed_by_user();
        let recovered = self.signer.recover(&message, signature)?;

        expect_signer(Signatory::User, address, recovered)
    }

    pub fn check_broker_signature(
        &self,
        claims: &Claims,
        broker_address: Option<&str>,
    ) -> Result<BrokerCheck> {
        let email = claims.field("email");
        let signature = claims.field("silkeySignature");

        let signature = match (email, signature) {
            (None, None) => return Ok(BrokerCheck::NotApplicable),
            (Some(_), None) => return Err(SsoError::MissingField("silkeySignature")),
            (None, Some(_)) => return Err(SsoError::MissingField("email")),
            (Some(_), Some(signature)) => signature,
        };

        if claims.silkey_signature_timestamp().is_none() {
            return Err(SsoError::MissingField("silkeySignatureTimestamp"));
        }

        let message = claims.clone().message_signed_by_silkey();
        let recovered = self.signer.recover(&message, signature)?;

        let Some(broker_address) = broker_address.filter(|a| !a.trim().is_empty()) else {
            warn!(
                recovered = ?recovered,
                "verifying without a broker address: the email signature is not pinned to a known key, \
                 turn on full verification by passing the registry address"
            );
            return Ok(BrokerCheck::Unpinned);
        };

        expect_signer(Signatory::Broker, broker_address, recovered)?;
        Ok(BrokerCheck::Verified)
    }

    pub fn check_website_signature(
        &self,
        sso_params: &SsoParams,
        website_address: &str,
    ) -> Result<()> {
        let signature = sso_params
            .signature()
            .ok_or(SsoError::MissingField("ssoSignature"))?;

        let message = build_message(sso_params);
        let recovered = self.signer.recover(&message, &signature)?;

        expect_signer(Signatory::Website, website_address, recovered)
    }
}

/// Age state.
///
/// - `max_age == 0`: not enforced (logged)
/// - `max_age < 0`: misconfiguration, rejected
/// - otherwise `now - userSignatureTimestamp` must be `<= max_age`
pub fn check_age(claims: &Claims, max_age: i64, now: i64) -> Result<()> {
    if max_age == 0 {
        warn!(
            max_age,
            "token age will not be verified, set an expiration time between 5s and 60s"
        );
        return Ok(());
    }

    if max_age < 0 {
        warn!(max_age, "negative token max age, refusing every token");
        return Err(SsoError::InvalidMaxAge(max_age));
    }

    if max_age > RECOMMENDED_MAX_AGE_SECONDS {
        warn!(
            max_age,
            "token expiration time is long, 5s to 30s is recommended"
        );
    }

    let issued = claims
        .user_signature_timestamp()
        .ok_or(SsoError::MissingField("userSignatureTimestamp"))?;
    let age = now.saturating_sub(i64::try_from(issued).unwrap_or(i64::MAX));

    // Accepted, a clock skewed ahead is not an expiry.
    if age < 0 {
        warn!(issued, now, "user signature timestamp is in the future");
    }

    if age > max_age {
        return Err(SsoError::TokenExpired { age, max_age });
    }

    Ok(())
}

/// Scope state: every tag must be known and its required claims non-empty.
pub fn require_fields_for_scope(claims: &Claims) -> Result<()> {
    let scope = claims.scope();
    let tags: Vec<&str> = scope
        .split(SCOPE_DIVIDER)
        .filter(|tag| !tag.is_empty())
        .collect();

    if tags.is_empty() {
        return Err(SsoError::EmptyScope);
    }

    for tag in tags {
        let required =
            required_fields_for_scope(tag).ok_or_else(|| SsoError::UnsupportedScope(tag.into()))?;

        if let Some(missing) = required.iter().copied().find(|f| claims.field(f).is_none()) {
            debug!(scope = %tag, field = %missing, "field required for scope is empty");
            return Err(SsoError::MissingField(missing));
        }
    }

    Ok(())
}

fn expect_signer(signatory: Signatory, expected: &str, recovered: Option<String>) -> Result<()> {
    match recovered {
        Some(recovered) if recovered.eq_ignore_ascii_case(expected.trim()) => Ok(()),
        recovered => Err(SsoError::SignatureMismatch {
            signatory,
            expected: expected.to_string(),
            recovered: recovered.unwrap_or_else(|| "nothing".to_string()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::claims_signer::ClaimsSigner;
    use crate::services::jwt::JwtTokenCodec;
    use crate::services::signer::EthSigner;

    const USER_KEY: &str = "0x2c06e0037dacc4a831049ce0770f5f6f788827659a5842ed96d34c0631d5f6de";
    const USER_ADDRESS: &str = "0xDBF03b99664deb3C73045ac8933A6db89fefFf5F";
    const WEB_ADDRESS: &str = "0x1dca9FEB4F78C2E693cd87B01824428338d0F4E9";

    fn verifier() -> Verifier {
        Verifier::new(Arc::new(EthSigner::new()), Arc::new(JwtTokenCodec::new()))
    }

    fn claims_signer() -> ClaimsSigner {
        ClaimsSigner::new(Arc::new(EthSigner::new()))
    }

    // Signed by WEB_ADDRESS.
    fn callback_params(with_signature: bool) -> SsoParams {
        let signature = if with_signature {
            concat!(
                "0xbbdd34bc1c2be717a70a89046924fd871b3de6ce5a975297146cd9b07728f1a1",
                "34f0c30cb9e801e451a38d9a626da0f61ef3450ed2e403fb572c2fa7d9920a3b1b"
            )
        } else {
            ""
        };

        SsoParams::new()
            .with("ssoTimestamp", 1_607_793_281u64)
            .with("ssoRedirectUrl", "https://silkey.io/")
            .with("ssoCancelUrl", "https://silkey.io/fail")
            .with("ssoScope", "id")
            .with("ssoRefId", "123")
            .with("ssoSignature", signature)
    }

    #[test]
    fn website_signature_from_fixture() {
        let v = verifier();
        assert!(v.check_website_signature(&callback_params(true), WEB_ADDRESS).is_ok());
        assert!(
            v.check_website_signature(&callback_params(true), &WEB_ADDRESS.to_lowercase())
                .is_ok()
        );
        assert_eq!(
            v.check_website_signature(&callback_params(false), WEB_ADDRESS)
                .unwrap_err(),
            SsoError::MissingField("ssoSignature")
        );
        assert!(matches!(
            v.check_website_signature(&callback_params(true), USER_ADDRESS),
            Err(SsoError::SignatureMismatch {
                signatory: Signatory::Website,
                ..
            })
        ));
    }

    #[test]
    fn website_signature_breaks_when_params_change() {
        let tampered = callback_params(true).with("ssoScope", "email");
        assert!(matches!(
            verifier().check_website_signature(&tampered, WEB_ADDRESS),
            Err(SsoError::SignatureMismatch { .. })
        ));
    }

    #[test]
    fn user_signature_requirements() {
        let v = verifier();
        assert_eq!(
            v.check_user_signature(&Claims::new()).unwrap_err(),
            SsoError::MissingField("address")
        );

        let unsigned = Claims::new().set_address(USER_ADDRESS).unwrap();
        assert_eq!(
            v.check_user_signature(&unsigned).unwrap_err(),
            SsoError::MissingField("userSignature")
        );
    }

    #[test]
    fn user_signature_valid_and_tampered() {
        let claims = Claims::new()
            .set_address(USER_ADDRESS)
            .unwrap()
            .set_email("a@c")
            .set_scope("email")
            .set_user_signature_timestamp(123);
        let signed = claims_signer().sign_as_user(USER_KEY, claims).unwrap();

        assert!(verifier().check_user_signature(&signed).is_ok());

        // Same signature presented with a different timestamp.
        let signature = signed.user_signature().unwrap().to_string();
        let moved = signed.set_user_signature(&signature, Some(122)).unwrap();
        assert!(matches!(
            verifier().check_user_signature(&moved),
            Err(SsoError::SignatureMismatch {
                signatory: Signatory::User,
                ..
            })
        ));
    }

    #[test]
    fn broker_signature_states() {
        let v = verifier();
        assert_eq!(
            v.check_broker_signature(&Claims::new(), None).unwrap(),
            BrokerCheck::NotApplicable
        );
        assert_eq!(
            v.check_broker_signature(&Claims::new().set_email("a"), None)
                .unwrap_err(),
            SsoError::MissingField("silkeySignature")
        );

        let sig = format!("0x{}", "2".repeat(130));
        let sig_only = Claims::new().set_silkey_signature(&sig, Some(1)).unwrap();
        assert_eq!(
            v.check_broker_signature(&sig_only, None).unwrap_err(),
            SsoError::MissingField("email")
        );

        let signed = claims_signer()
            .sign_as_broker(
                USER_KEY,
                Claims::new()
                    .set_email("aliasId@privaterelay")
                    .set_silkey_signature_timestamp(1_605_290_733),
            )
            .unwrap();

        assert_eq!(
            v.check_broker_signature(&signed, None).unwrap(),
            BrokerCheck::Unpinned
        );
        assert_eq!(
            v.check_broker_signature(&signed, Some(USER_ADDRESS)).unwrap(),
            BrokerCheck::Verified
        );
        assert!(matches!(
            v.check_broker_signature(&signed, Some(format!("0x{}", "1".repeat(40)).as_str())),
            Err(SsoError::SignatureMismatch {
                signatory: Signatory::Broker,
                ..
            })
        ));
    }

    #[test]
    fn age_boundaries() {
        let claims = Claims::new().set_user_signature_timestamp(1_000);

        assert!(check_age(&claims, 30, 1_030).is_ok());
        assert_eq!(
            check_age(&claims, 30, 1_031).unwrap_err(),
            SsoError::TokenExpired {
                age: 31,
                max_age: 30
            }
        );
        assert!(check_age(&claims, 0, 99_999).is_ok());
        assert_eq!(
            check_age(&claims, -1, 1_000).unwrap_err(),
            SsoError::InvalidMaxAge(-1)
        );
        assert_eq!(
            check_age(&Claims::new(), 30, 1_000).unwrap_err(),
            SsoError::MissingField("userSignatureTimestamp")
        );
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn logged<T>(f: impl FnOnce() -> T) -> (T, String) {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();

        let out = tracing::subscriber::with_default(subscriber, f);
        let text = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        (out, text)
    }

    #[test]
    fn lax_max_age_is_a_warning() {
        let claims = Claims::new().set_user_signature_timestamp(1_000);

        let (result, log) = logged(|| check_age(&claims, 300, 1_010));
        assert!(result.is_ok());
        assert!(log.contains("WARN"), "{log}");
        assert!(log.contains("expiration time is long"), "{log}");

        let (_, log) = logged(|| check_age(&claims, 30, 1_010));
        assert!(!log.contains("WARN"), "{log}");
    }

    #[test]
    fn future_timestamp_passes_with_a_warning() {
        let claims = Claims::new().set_user_signature_timestamp(2_000);

        let (result, log) = logged(|| check_age(&claims, 30, 1_000));
        assert!(result.is_ok());
        assert!(log.contains("WARN"), "{log}");
        assert!(log.contains("in the future"), "{log}");
    }

    fn with_scope(scope: &str) -> Claims {
        Claims::from_untyped_map(
            serde_json::json!({ "scope": scope, "address": "1", "email": "e" })
                .as_object()
                .unwrap(),
        )
    }

    #[test]
    fn scope_requirements_accept() {
        for scope in ["id", ",id,", "email", "email,id", ",id,email,"] {
            assert!(require_fields_for_scope(&with_scope(scope)).is_ok(), "{scope}");
        }
        let address_only = Claims::new()
            .set_scope("id")
            .set_address(USER_ADDRESS)
            .unwrap();
        assert!(require_fields_for_scope(&address_only).is_ok());
    }

    #[test]
    fn scope_requirements_reject() {
        assert_eq!(
            require_fields_for_scope(&Claims::new()).unwrap_err(),
            SsoError::EmptyScope
        );
        assert_eq!(
            require_fields_for_scope(&Claims::new().set_scope(",,")).unwrap_err(),
            SsoError::EmptyScope
        );
        assert_eq!(
            require_fields_for_scope(&Claims::new().set_scope("?")).unwrap_err(),
            SsoError::UnsupportedScope("?".into())
        );
        assert_eq!(
            require_fields_for_scope(&Claims::new().set_scope("id")).unwrap_err(),
            SsoError::MissingField("address")
        );

        let no_email = Claims::new()
            .set_scope("email")
            .set_address(USER_ADDRESS)
            .unwrap();
        assert_eq!(
            require_fields_for_scope(&no_email).unwrap_err(),
            SsoError::MissingField("email")
        );
    }

    #[test]
    fn garbage_token_is_rejected_not_raised() {
        let params = callback_params(true);
        let request = VerifyRequest {
            token: "not-a-token",
            sso_params: &params,
            website_address: WEB_ADDRESS,
            broker_address: None,
            max_age_seconds: 30,
        };

        let verdict = verifier().verify(&request);
        assert!(!verdict.is_accepted());
        assert!(matches!(verdict.reason(), Some(SsoError::MalformedToken(_))));
        assert_eq!(verdict.into_claims(), None);
    }
}
