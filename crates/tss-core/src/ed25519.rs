//! Baseline single-key Ed25519 signer: one wallet, one opaque secret, no
//! threshold machinery. Exists as the simpler operational mode alongside
//! the Feldman VSS / threshold-ECDSA core.

use crate::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::OsRng;
use serde_json::Value;
use share_store::{single_mode_key, ShareStore};
use tracing::instrument;
use zeroize::Zeroize;

/// Generates and uses per-wallet Ed25519 keys. Holds no state of its own —
/// the secret lives only in the store and is materialized for the
/// duration of a single call.
pub struct Ed25519Signer<S> {
    store: S,
}

impl<S: ShareStore> Ed25519Signer<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Generate a fresh keypair for `wallet_id`, persist the secret (base64
    /// of the 64-byte signing key, per the documented share layout), and
    /// return the public key.
    #[instrument(skip(self), fields(wallet_id))]
    pub fn generate(&self, wallet_id: &str) -> Result<VerifyingKey> {
        let signing_key = SigningKey::generate(&mut OsRng);
        let public_key = signing_key.verifying_key();

        let mut secret_bytes = signing_key.to_keypair_bytes();
        let encoded = STANDARD.encode(secret_bytes);
        secret_bytes.zeroize();

        self.store.put(&single_mode_key(wallet_id), &encoded)?;
        Ok(public_key)
    }

    /// Sign raw `message` bytes with `wallet_id`'s secret. The secret is
    /// decoded, used, and zeroized before returning on every path,
    /// including the error paths.
    #[instrument(skip(self, message), fields(wallet_id))]
    pub fn sign(&self, wallet_id: &str, message: &[u8]) -> Result<[u8; 64]> {
        let mut secret_bytes = self.load_secret_bytes(wallet_id)?;
        let signing_key_result = SigningKey::from_keypair_bytes(&secret_bytes)
            .map_err(|e| Error::CryptoFailure(format!("stored Ed25519 secret is malformed: {e}")));
        secret_bytes.zeroize();

        let signing_key = signing_key_result?;
        let signature = signing_key.sign(message);
        Ok(signature.to_bytes())
    }

    /// Sign the UTF-8 bytes of `payload`'s canonical JSON serialization
    /// (object keys sorted, no extraneous whitespace — see the documented
    /// wire format), so a downstream verifier that re-serializes the same
    /// value gets byte-identical input.
    #[instrument(skip(self, payload), fields(wallet_id))]
    pub fn sign_payload(&self, wallet_id: &str, payload: &Value) -> Result<[u8; 64]> {
        self.sign(wallet_id, &canonical_json_bytes(payload))
    }

    /// Fetch `wallet_id`'s public key by reconstructing it from the stored
    /// secret. Ed25519 doesn't separately store the public half since it's
    /// cheap to rederive and that's one fewer place a secret's presence
    /// could be inferred from.
    #[instrument(skip(self), fields(wallet_id))]
    pub fn public_key(&self, wallet_id: &str) -> Result<VerifyingKey> {
        let mut secret_bytes = self.load_secret_bytes(wallet_id)?;
        let result = SigningKey::from_keypair_bytes(&secret_bytes)
            .map(|sk| sk.verifying_key())
            .map_err(|e| Error::CryptoFailure(format!("stored Ed25519 secret is malformed: {e}")));
        secret_bytes.zeroize();
        result
    }

    fn load_secret_bytes(&self, wallet_id: &str) -> Result<[u8; 64]> {
        let encoded = self.store.get(&single_mode_key(wallet_id))?;
        let decoded = STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| Error::CryptoFailure(format!("stored Ed25519 secret is not valid base64: {e}")))?;
        decoded
            .try_into()
            .map_err(|_| Error::CryptoFailure("stored Ed25519 secret is not 64 bytes".into()))
    }
}

/// Verify a signature produced by [`Ed25519Signer::sign`] (or
/// `sign_payload`, against the same canonicalized bytes). Exposed as a free
/// function since verification needs no secret and no store.
pub fn verify(public_key: &VerifyingKey, message: &[u8], signature: &[u8; 64]) -> bool {
    let signature = Signature::from_bytes(signature);
    public_key.verify(message, &signature).is_ok()
}

/// UTF-8 bytes of `value`'s canonical JSON serialization (object keys
/// sorted recursively), the documented wire form both the Ed25519 and
/// threshold-mode order-signing routes hash or sign directly.
pub fn canonical_json_bytes(value: &Value) -> Vec<u8> {
    serde_json::to_vec(&canonicalize_json(value)).expect("canonicalized JSON always serializes")
}

/// Recursively sort object keys so two equal JSON values always serialize
/// to the same bytes, independent of the order fields were inserted in.
fn canonicalize_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: Vec<(&String, &Value)> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            let mut out = serde_json::Map::new();
            for (k, v) in sorted {
                out.insert(k.clone(), canonicalize_json(v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize_json).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use share_store::MemoryShareStore;

    fn signer() -> Ed25519Signer<MemoryShareStore> {
        Ed25519Signer::new(MemoryShareStore::new())
    }

    #[test]
    fn generate_then_sign_then_verify_round_trips() {
        let s = signer();
        let pubkey = s.generate("w1").unwrap();
        let sig = s.sign("w1", b"hello").unwrap();
        assert_eq!(sig.len(), 64);
        assert!(verify(&pubkey, b"hello", &sig));
        assert!(!verify(&pubkey, b"goodbye", &sig));
    }

    #[test]
    fn public_key_matches_generated_key() {
        let s = signer();
        let pubkey = s.generate("w2").unwrap();
        assert_eq!(s.public_key("w2").unwrap().to_bytes(), pubkey.to_bytes());
    }

    #[test]
    fn repeated_generate_for_same_wallet_is_conflict() {
        let s = signer();
        s.generate("w3").unwrap();
        assert!(matches!(s.generate("w3").unwrap_err(), Error::Conflict(_)));
    }

    #[test]
    fn sign_for_unknown_wallet_is_not_found() {
        let s = signer();
        assert!(matches!(s.sign("nope", b"msg").unwrap_err(), Error::NotFound(_)));
    }

    #[test]
    fn sign_payload_is_independent_of_key_insertion_order() {
        let s = signer();
        let pubkey = s.generate("w4").unwrap();
        let a = json!({"price": 100, "side": "buy", "size": 5});
        let b = json!({"size": 5, "side": "buy", "price": 100});
        let sig_a = s.sign_payload("w4", &a).unwrap();
        let sig_b = s.sign_payload("w4", &b).unwrap();
        assert_eq!(sig_a, sig_b);

        let canonical_bytes = serde_json::to_vec(&canonicalize_json(&a)).unwrap();
        assert!(verify(&pubkey, &canonical_bytes, &sig_a));
    }
}
