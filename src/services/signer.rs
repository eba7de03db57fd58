//! Ethereum `personal_sign` signatures over canonical messages.
//!
//! The protocol signs the canonical message text (itself a hex string) the way wallets do:
//! keccak256("\x19Ethereum Signed Message:\n" ‖ len ‖ message), secp256k1 recoverable
//! signature, serialized as 65 bytes `r ‖ s ‖ v` with `v` in {27, 28}.

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use sha3::{Digest, Keccak256};
use tracing::debug;

use crate::error::{Result, SsoError};
use crate::services::hex_codec::{add_0x, private_key_valid, remove_0x, signature_valid};

/// Sign/recover capability used by the request builder and the verifier.
pub trait Signer: Send + Sync {
    /// Returns a `0x`-prefixed 65-byte signature.
    fn sign(&self, private_key: &str, message: &str) -> Result<String>;

    /// Recovers the signer's address.
    ///
    /// - `Ok(Some(addr))`: recovered
    /// - `Ok(None)`: the signature does not correspond to any key for this message
    /// - `Err(_)`: the signature is not even shaped like one
    fn recover(&self, message: &str, signature: &str) -> Result<Option<String>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EthSigner;

impl EthSigner {
    pub fn new() -> Self {
        Self
    }

    /// EIP-55 address controlled by `private_key`.
    pub fn address_of(&self, private_key: &str) -> Result<String> {
        let key = signing_key(private_key)?;
        Ok(address_from_key(key.verifying_key()))
    }
}

impl Signer for EthSigner {
    fn sign(&self, private_key: &str, message: &str) -> Result<String> {
        let key = signing_key(private_key)?;
        let digest = personal_message_hash(message);

        let (signature, recovery_id) = key.sign_prehash_recoverable(&digest).map_err(|e| {
            debug!(error = %e, "failed to sign message");
            SsoError::Signer(e.to_string())
        })?;

        let mut bytes = Vec::with_capacity(65);
        bytes.extend_from_slice(&signature.to_bytes());
        bytes.push(27 + recovery_id.to_byte());

        Ok(add_0x(&hex::encode(bytes)))
    }

    fn recover(&self, message: &str, signature: &str) -> Result<Option<String>> {
        if !signature_valid(signature) {
            return Err(SsoError::invalid_signature("signature", signature));
        }
        let bytes = hex::decode(remove_0x(signature))
            .map_err(|_| SsoError::invalid_signature("signature", signature))?;

        let v = match bytes[64] {
            v @ 27..=28 => v - 27,
            v @ 0..=1 => v,
            other => {
                debug!(v = other, "unsupported recovery id");
                return Ok(None);
            }
        };
        let Some(recovery_id) = RecoveryId::from_byte(v) else {
            return Ok(None);
        };
        let Ok(sig) = Signature::from_slice(&bytes[..64]) else {
            return Ok(None);
        };

        let digest = personal_message_hash(message);
        match VerifyingKey::recover_from_prehash(&digest, &sig, recovery_id) {
            Ok(key) => Ok(Some(address_from_key(&key))),
            Err(e) => {
                debug!(error = %e, "signature is not recoverable");
                Ok(None)
            }
        }
    }
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&hasher.finalize());
    hash
}

fn personal_message_hash(message: &str) -> [u8; 32] {
    let mut data = format!("\x19Ethereum Signed Message:\n{}", message.len()).into_bytes();
    data.extend_from_slice(message.as_bytes());
    keccak256(&data)
}

fn signing_key(private_key: &str) -> Result<SigningKey> {
    if !private_key_valid(private_key) {
        return Err(SsoError::InvalidPrivateKey);
    }
    let bytes = hex::decode(remove_0x(private_key)).map_err(|_| SsoError::InvalidPrivateKey)?;
    SigningKey::from_slice(&bytes).map_err(|_| SsoError::InvalidPrivateKey)
}

fn address_from_key(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    // Skip the 0x04 prefix, keep the last 20 bytes of the hash.
    let hash = keccak256(&point.as_bytes()[1..]);
    to_checksum(&hex::encode(&hash[12..]))
}

/// EIP-55 mixed-case rendering of a lowercase 40-digit address.
fn to_checksum(lower: &str) -> String {
    let hash = hex::encode(keccak256(lower.as_bytes()));

    let mixed: String = lower
        .chars()
        .zip(hash.chars())
        .map(|(c, h)| {
            if c.is_ascii_alphabetic() && h.to_digit(16).unwrap_or(0) >= 8 {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect();

    add_0x(&mixed)
}
