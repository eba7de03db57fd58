//! Typed token payload and the canonical messages each signer signs.
//!
//! Values are built through consuming setters (`set_*` takes `self` and hands it back), so a
//! `Claims` is never mutated behind the caller's back. The one exception is timestamp stamping:
//! building a message for an unset timestamp records the current time first, exactly once.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::error::{Result, SsoError};
use crate::models::settings::{SCOPE_DIVIDER, SCOPE_ID};
use crate::services::hex_codec::{
    address_valid, current_timestamp, hex_encode_utf8, int_to_hex, remove_0x, signature_valid,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Claims {
    address: Option<String>,
    email: Option<String>,
    scope: BTreeSet<String>,
    ref_id: Option<String>,
    user_signature: Option<String>,
    user_signature_timestamp: Option<u64>,
    silkey_signature: Option<String>,
    silkey_signature_timestamp: Option<u64>,
}

impl Claims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Imports a decoded (not yet verified) token payload.
    ///
    /// Wire keys are camelCase; snake_case spellings are accepted too. Unknown keys are ignored
    /// and nothing is validated here, that is the verifier's job.
    pub fn from_untyped_map(map: &Map<String, Value>) -> Self {
        let mut claims = Self::default();

        for (key, value) in map {
            match key.as_str() {
                "address" => claims.address = string_value(value),
                "email" => claims.email = string_value(value),
                "refId" | "ref_id" => claims.ref_id = string_value(value),
                "userSignature" | "user_signature" => claims.user_signature = string_value(value),
                "userSignatureTimestamp" | "user_signature_timestamp" => {
                    claims.user_signature_timestamp = timestamp_value(value)
                }
                "silkeySignature" | "silkey_signature" => {
                    claims.silkey_signature = string_value(value)
                }
                "silkeySignatureTimestamp" | "silkey_signature_timestamp" => {
                    claims.silkey_signature_timestamp = timestamp_value(value)
                }
                "scope" => {
                    let raw: Vec<String> = match value {
                        Value::Array(items) => items.iter().filter_map(string_value).collect(),
                        other => string_value(other).into_iter().collect(),
                    };
                    for tag in raw.iter().flat_map(|s| s.split(SCOPE_DIVIDER)) {
                        claims = claims.set_scope(tag.trim());
                    }
                }
                _ => {}
            }
        }

        claims
    }

    /// camelCase wire form, the shape the broker puts into the token payload.
    pub fn to_untyped_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        let text = |v: &Option<String>| Value::String(v.clone().unwrap_or_default());
        let number = |v: Option<u64>| v.map(Value::from).unwrap_or(Value::Null);

        map.insert("scope".into(), Value::String(self.scope()));
        map.insert("address".into(), text(&self.address));
        map.insert("email".into(), text(&self.email));
        map.insert("refId".into(), text(&self.ref_id));
        map.insert("userSignature".into(), text(&self.user_signature));
        map.insert(
            "userSignatureTimestamp".into(),
            number(self.user_signature_timestamp),
        );
        map.insert("silkeySignature".into(), text(&self.silkey_signature));
        map.insert(
            "silkeySignatureTimestamp".into(),
            number(self.silkey_signature_timestamp),
        );
        map
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn ref_id(&self) -> Option<&str> {
        self.ref_id.as_deref()
    }

    pub fn user_signature(&self) -> Option<&str> {
        self.user_signature.as_deref()
    }

    pub fn user_signature_timestamp(&self) -> Option<u64> {
        self.user_signature_timestamp
    }

    pub fn silkey_signature(&self) -> Option<&str> {
        self.silkey_signature.as_deref()
    }

    pub fn silkey_signature_timestamp(&self) -> Option<u64> {
        self.silkey_signature_timestamp
    }

    /// Canonical scope: tags sorted ascending, joined with `,`.
    pub fn scope(&self) -> String {
        self.scope
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(SCOPE_DIVIDER)
    }

    pub fn scope_tags(&self) -> impl Iterator<Item = &str> {
        self.scope.iter().map(String::as_str)
    }

    /// Looks up a claim by its wire name, treating empty values as absent.
    pub fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "address" => self.address(),
            "email" => self.email(),
            "refId" => self.ref_id(),
            "userSignature" => self.user_signature(),
            "silkeySignature" => self.silkey_signature(),
            _ => None,
        };
        value.filter(|v| !v.is_empty())
    }

    pub fn set_scope(mut self, scope: &str) -> Self {
        if scope.trim().is_empty() {
            return self;
        }
        self.scope.insert(scope.to_string());
        self
    }

    pub fn set_address(mut self, address: &str) -> Result<Self> {
        if !address_valid(address) {
            return Err(SsoError::InvalidAddress(address.to_string()));
        }
        self.address = Some(address.to_string());
        Ok(self)
    }

    pub fn set_email(mut self, email: &str) -> Self {
        self.email = non_empty(email);
        self
    }

    pub fn set_ref_id(mut self, ref_id: &str) -> Self {
        self.ref_id = non_empty(ref_id);
        self
    }

    pub fn set_user_signature(mut self, signature: &str, timestamp: Option<u64>) -> Result<Self> {
        if !signature_valid(signature) {
            return Err(SsoError::invalid_signature("user signature", signature));
        }
        let timestamp = timestamp.ok_or(SsoError::MissingTimestamp("user signature timestamp"))?;

        self.user_signature = Some(signature.to_string());
        self.user_signature_timestamp = Some(timestamp);
        Ok(self)
    }

    pub fn set_silkey_signature(mut self, signature: &str, timestamp: Option<u64>) -> Result<Self> {
        if !signature_valid(signature) {
            return Err(SsoError::invalid_signature("silkey signature", signature));
        }
        let timestamp =
            timestamp.ok_or(SsoError::MissingTimestamp("silkey signature timestamp"))?;

        self.silkey_signature = Some(signature.to_string());
        self.silkey_signature_timestamp = Some(timestamp);
        Ok(self)
    }

    /// Sets the user timestamp without a signature (the signer stamps before signing).
    pub fn set_user_signature_timestamp(mut self, timestamp: u64) -> Self {
        self.user_signature_timestamp = Some(timestamp);
        self
    }

    pub fn set_silkey_signature_timestamp(mut self, timestamp: u64) -> Self {
        self.silkey_signature_timestamp = Some(timestamp);
        self
    }

    /// Message the user signs:
    /// hex("address") ‖ address ‖ hex("refId") ‖ hex(refId) ‖ hex("scope") ‖ hex(scope)
    /// ‖ hex("userSignatureTimestamp") ‖ intToHex(timestamp)
    ///
    /// Stamps `userSignatureTimestamp` with the current time when it is unset.
    pub fn message_signed_by_user(&mut self) -> String {
        let timestamp = *self
            .user_signature_timestamp
            .get_or_insert_with(current_timestamp);

        let address = self
            .address
            .as_deref()
            .map(|a| remove_0x(a).to_lowercase())
            .unwrap_or_default();

        let mut msg = String::new();
        msg.push_str(&hex_encode_utf8("address"));
        msg.push_str(&address);
        msg.push_str(&hex_encode_utf8("refId"));
        msg.push_str(&hex_encode_utf8(self.ref_id.as_deref().unwrap_or("")));
        msg.push_str(&hex_encode_utf8("scope"));
        msg.push_str(&hex_encode_utf8(&self.scope()));
        msg.push_str(&hex_encode_utf8("userSignatureTimestamp"));
        msg.push_str(&int_to_hex(timestamp));
        msg
    }

    /// Message the broker signs to attest the email:
    /// hex("email") ‖ hex(email) ‖ hex("silkeySignatureTimestamp") ‖ intToHex(timestamp)
    ///
    /// Empty when there is no email (no broker signature is expected then). Stamps
    /// `silkeySignatureTimestamp` with the current time when it is unset.
    pub fn message_signed_by_silkey(&mut self) -> String {
        let Some(email) = self.email.as_deref().filter(|e| !e.is_empty()) else {
            return String::new();
        };

        let timestamp = *self
            .silkey_signature_timestamp
            .get_or_insert_with(current_timestamp);

        let mut msg = String::new();
        msg.push_str(&hex_encode_utf8("email"));
        msg.push_str(&hex_encode_utf8(email));
        msg.push_str(&hex_encode_utf8("silkeySignatureTimestamp"));
        msg.push_str(&int_to_hex(timestamp));
        msg
    }

    /// Shape validation the broker runs before issuing a token.
    pub fn validate(&self) -> Result<&Self> {
        let address = self.address.as_deref().unwrap_or("");
        if !address_valid(address) {
            return Err(SsoError::InvalidAddress(address.to_string()));
        }

        let user_signature = self.user_signature.as_deref().unwrap_or("");
        if !signature_valid(user_signature) {
            return Err(SsoError::invalid_signature("user signature", user_signature));
        }

        if self.user_signature_timestamp.is_none() {
            return Err(SsoError::MissingField("userSignatureTimestamp"));
        }

        let scope = self.scope();
        if scope.is_empty() || scope == SCOPE_ID {
            return Ok(self);
        }

        if self.field("email").is_none() {
            return Err(SsoError::MissingField("email"));
        }

        let silkey_signature = self.silkey_signature.as_deref().unwrap_or("");
        if !signature_valid(silkey_signature) {
            return Err(SsoError::invalid_signature("silkey signature", silkey_signature));
        }

        if self.silkey_signature_timestamp.is_none() {
            return Err(SsoError::MissingField("silkeySignatureTimestamp"));
        }

        Ok(self)
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn string_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// Numbers or numeric strings; anything else (null, "", negative) is "unset".
fn timestamp_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}
