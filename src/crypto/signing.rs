//! # Digital Signatures Module
//!
//! Ed25519 over a SHA-256 digest of the canonical bytes.
//!
//! ## Signature Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         SIGNING FLOW                                    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  canonical bytes ──► SHA-256 ──► 32-byte digest ──► Ed25519 sign       │
//! │                                                        │                │
//! │                                                        ▼                │
//! │                                              64-byte detached sig       │
//! │                                                                         │
//! │  Verification recomputes the digest and checks it with the claimed     │
//! │  sender's Ed25519 public key. Any malformed input yields `false`.      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The digest step makes signing cost and signature input size independent
//! of the envelope size.

use ed25519_dalek::{Signature as Ed25519Signature, Signer, VerifyingKey};
use sha2::{Digest, Sha256};

use crate::crypto::SigningKeyPair;
use crate::error::{Error, Result};

/// Size of an Ed25519 signature in bytes
pub const SIGNATURE_SIZE: usize = 64;

/// An Ed25519 digital signature
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature(pub [u8; SIGNATURE_SIZE]);

impl Signature {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; SIGNATURE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice (must be exactly 64 bytes)
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        let bytes: [u8; SIGNATURE_SIZE] =
            slice.try_into().map_err(|_| Error::InvalidSignatureLength {
                expected: SIGNATURE_SIZE,
                actual: slice.len(),
            })?;
        Ok(Self(bytes))
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_SIZE] {
        &self.0
    }

    /// Encode as lowercase hex
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// SHA-256 of the message, the value actually signed
pub fn digest(message: &[u8]) -> [u8; 32] {
    Sha256::digest(message).into()
}

/// Sign `message` (canonical bytes) with Ed25519 over its SHA-256 digest
pub fn sign(keypair: &SigningKeyPair, message: &[u8]) -> Signature {
    let sig = keypair.signing_key().sign(&digest(message));
    Signature(sig.to_bytes())
}

/// Verify a signature produced by [`sign`]
///
/// Returns `false` for a bad signature and for an unusable public key alike;
/// this never errors.
pub fn verify(public_key: &[u8; 32], message: &[u8], signature: &Signature) -> bool {
    let verifying_key = match VerifyingKey::from_bytes(public_key) {
        Ok(key) => key,
        Err(_) => {
            tracing::debug!("verification rejected: public key is not a curve point");
            return false;
        }
    };

    let sig = Ed25519Signature::from_bytes(&signature.0);
    match verifying_key.verify_strict(&digest(message), &sig) {
        Ok(()) => true,
        Err(_) => {
            tracing::debug!("verification rejected: signature does not match");
            false
        }
    }
}

/// [`verify`] over raw slices; wrong lengths yield `false`
pub fn verify_slices(public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
    let Ok(public_key) = <[u8; 32]>::try_from(public_key) else {
        tracing::debug!(len = public_key.len(), "verification rejected: bad key length");
        return false;
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        tracing::debug!(len = signature.len(), "verification rejected: bad signature length");
        return false;
    };
    verify(&public_key, message, &signature)
}

// ============================================================================
// TESTS
// ============================================================================
