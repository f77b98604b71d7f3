//! # Key Management
//!
//! Raw keypair types for the two independent key families.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          KEY TYPES                                      │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  SigningKeyPair (Ed25519)          EncryptionKeyPair (X25519)           │
//! │  ─────────────────────────         ──────────────────────────           │
//! │  • Signs envelopes                 • ECDH with ephemeral keys           │
//! │  • Public half = durable address   • Public half published for senders │
//! │  • 32-byte seed, zeroized on drop  • 32-byte scalar, zeroized on drop  │
//! │                                                                         │
//! │  The two are generated independently. There is no conversion path     │
//! │  from one curve form to the other anywhere in this crate.              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::ZeroizeOnDrop;

use crate::crypto::PUBLIC_KEY_SIZE;
use crate::error::{Error, Result};

/// Ed25519 signing keypair
#[derive(ZeroizeOnDrop)]
pub struct SigningKeyPair {
    #[zeroize(skip)] // ed25519_dalek::SigningKey handles its own zeroization
    secret: SigningKey,
}

impl SigningKeyPair {
    /// Generate a new random signing keypair
    pub fn generate() -> Self {
        let secret = SigningKey::generate(&mut OsRng);
        Self { secret }
    }

    /// Create from a 32-byte Ed25519 seed
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self {
            secret: SigningKey::from_bytes(bytes),
        }
    }

    /// Create from a slice, rejecting anything that is not 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let seed = key_from_slice(bytes, "ed25519 private")?;
        Ok(Self::from_bytes(&seed))
    }

    /// Get the secret seed bytes (for backup/storage)
    ///
    /// ## Security Warning
    ///
    /// Only use this for secure storage. Never log or transmit these bytes.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }

    /// Get the public key bytes
    pub fn public_bytes(&self) -> [u8; 32] {
        self.secret.verifying_key().to_bytes()
    }

    /// Get the verifying key for signature verification
    pub fn verifying_key(&self) -> VerifyingKey {
        self.secret.verifying_key()
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.secret
    }
}

/// X25519 encryption keypair for key exchange
#[derive(ZeroizeOnDrop)]
pub struct EncryptionKeyPair {
    #[zeroize(skip)] // x25519_dalek handles its own zeroization
    secret: StaticSecret,
    #[zeroize(skip)]
    public: X25519PublicKey,
}

impl EncryptionKeyPair {
    /// Generate a new random encryption keypair
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = X25519PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Create from a 32-byte X25519 scalar
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        let secret = StaticSecret::from(*bytes);
        let public = X25519PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Create from a slice, rejecting anything that is not 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let scalar = key_from_slice(bytes, "x25519 private")?;
        Ok(Self::from_bytes(&scalar))
    }

    /// Get the secret key bytes (for backup/storage)
    ///
    /// ## Security Warning
    ///
    /// Only use this for secure storage. Never log or transmit these bytes.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }

    /// Get the public key bytes
    pub fn public_bytes(&self) -> [u8; 32] {
        self.public.to_bytes()
    }

    pub(crate) fn static_secret(&self) -> &StaticSecret {
        &self.secret
    }
}

/// Copy a 32-byte key out of a slice, or fail with a typed length error
///
/// `what` names the key in the error ("x25519 public", "ed25519 private", ...).
pub fn key_from_slice(bytes: &[u8], what: &'static str) -> Result<[u8; PUBLIC_KEY_SIZE]> {
    bytes.try_into().map_err(|_| Error::InvalidKeyLength {
        what,
        expected: PUBLIC_KEY_SIZE,
        actual: bytes.len(),
    })
}

/// Fingerprint of an X25519 public key: lowercase hex of its SHA-256
///
/// Used as the key of an envelope's `recipientKeys` map.
pub fn fingerprint(public_key: &[u8; 32]) -> String {
    hex::encode(Sha256::digest(public_key))
}

// ============================================================================
// TESTS
// ============================================================================
