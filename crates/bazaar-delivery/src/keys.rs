//! Ed25519 wallet keys.
//!
//! A network address is the base64url (no padding) encoding of the 32-byte
//! verifying key, so a signature can be checked against the claimed sender
//! without any key lookup. Signatures are base64url-encoded as well.

use base64::Engine as _;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::OsRng;

use crate::error::SigningError;

const B64: base64::engine::GeneralPurpose = base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// One signing key and the address it signs for.
pub struct WalletKeyPair {
    address: String,
    signing_key: SigningKey,
}

impl WalletKeyPair {
    /// Generate a brand-new random key pair.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    /// Reconstruct a key pair from its 32-byte seed.
    pub fn from_seed(seed: &[u8]) -> Result<Self, SigningError> {
        let bytes: [u8; 32] = seed
            .try_into()
            .map_err(|_| SigningError::KeyLoad("seed must be exactly 32 bytes".into()))?;
        Ok(Self::from_signing_key(SigningKey::from_bytes(&bytes)))
    }

    /// Reconstruct a key pair from the hex seed stored in `identities`.
    pub fn from_seed_hex(seed_hex: &str) -> Result<Self, SigningError> {
        let seed = hex::decode(seed_hex).map_err(|e| SigningError::KeyLoad(e.to_string()))?;
        Self::from_seed(&seed)
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = B64.encode(signing_key.verifying_key().as_bytes());
        Self { address, signing_key }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Hex-encoded seed for persistence.
    pub fn seed_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// Sign arbitrary bytes and return the base64url-encoded signature.
    pub fn sign_bytes(&self, bytes: &[u8]) -> String {
        B64.encode(self.signing_key.sign(bytes).to_bytes())
    }
}

impl std::fmt::Debug for WalletKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletKeyPair").field("address", &self.address).finish_non_exhaustive()
    }
}

/// Verify an Ed25519 signature against the address that claims to have made it.
///
/// Any decoding problem (address not a key, signature of the wrong length) is a
/// failed verification, not an error.
pub fn verify_signature(address: &str, signature: &str, message: &[u8]) -> bool {
    let Ok(key_bytes) = B64.decode(address) else { return false };
    let Ok(sig_bytes) = B64.decode(signature) else { return false };
    let Ok(key_bytes) = <[u8; 32]>::try_from(key_bytes.as_slice()) else { return false };
    let Ok(sig_bytes) = <[u8; 64]>::try_from(sig_bytes.as_slice()) else { return false };
    let Ok(verifying_key) = VerifyingKey::from_bytes(&key_bytes) else { return false };

    let signature = ed25519_dalek::Signature::from_bytes(&sig_bytes);
    verifying_key.verify(message, &signature).is_ok()
}
