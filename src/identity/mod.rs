//! # Identity Module
//!
//! A subject's two independent keypairs, and the public half counterparties
//! address envelopes to.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      DUAL-KEY IDENTITY                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   DualKeyIdentity (private, owned by the subject)                      │
//! │   ├── identity:   SigningKeyPair     (Ed25519)  ── signs envelopes     │
//! │   └── encryption: EncryptionKeyPair  (X25519)   ── opens envelopes     │
//! │                                                                         │
//! │   PublicIdentity (shared freely)                                       │
//! │   ├── signing_public_key     → did:key address                         │
//! │   └── encryption_public_key  → what senders encrypt to                 │
//! │                                                                         │
//! │   The encryption key is never computed from the identity key.          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A `DualKeyIdentity` is an ordinary value handed to each envelope call.
//! There is no process-wide key state.

pub mod derived;
pub mod did;

pub use derived::{DerivationProof, DerivedKey, MAX_PATH_LEN};
pub use did::{Did, DID_KEY_PREFIX};

use serde::{Deserialize, Serialize};
use zeroize::ZeroizeOnDrop;

use crate::crypto::{fingerprint, sign, EncryptionKeyPair, Signature, SigningKeyPair};
use crate::error::Result;

/// One subject's signing and encryption keypairs
///
/// ## Security
///
/// - Contains private keys; zeroized when dropped
/// - Deliberately not `Clone`
#[derive(ZeroizeOnDrop)]
pub struct DualKeyIdentity {
    #[zeroize(skip)]
    identity: SigningKeyPair,
    #[zeroize(skip)]
    encryption: EncryptionKeyPair,
}

impl DualKeyIdentity {
    /// Generate both keypairs independently from the OS generator
    pub fn generate() -> Self {
        let identity = Self {
            identity: SigningKeyPair::generate(),
            encryption: EncryptionKeyPair::generate(),
        };
        tracing::debug!(did = %identity.did(), "generated dual-key identity");
        identity
    }

    /// Load from the two raw private keys held by a keystore
    pub fn from_secret_bytes(signing_seed: &[u8; 32], encryption_scalar: &[u8; 32]) -> Self {
        Self {
            identity: SigningKeyPair::from_bytes(signing_seed),
            encryption: EncryptionKeyPair::from_bytes(encryption_scalar),
        }
    }

    /// Load from raw slices, validating that both are exactly 32 bytes
    pub fn from_secret_slices(signing_seed: &[u8], encryption_scalar: &[u8]) -> Result<Self> {
        Ok(Self {
            identity: SigningKeyPair::from_slice(signing_seed)?,
            encryption: EncryptionKeyPair::from_slice(encryption_scalar)?,
        })
    }

    /// The Ed25519 keypair
    pub fn signing(&self) -> &SigningKeyPair {
        &self.identity
    }

    /// The X25519 keypair
    pub fn encryption(&self) -> &EncryptionKeyPair {
        &self.encryption
    }

    /// Ed25519 public key (the durable address)
    pub fn signing_public_key(&self) -> [u8; 32] {
        self.identity.public_bytes()
    }

    /// X25519 public key
    pub fn encryption_public_key(&self) -> [u8; 32] {
        self.encryption.public_bytes()
    }

    /// Fingerprint under which this identity appears in `recipientKeys`
    pub fn encryption_fingerprint(&self) -> String {
        fingerprint(&self.encryption.public_bytes())
    }

    /// `did:key` address of the signing key
    pub fn did(&self) -> Did {
        Did::from_public_key(&self.identity.public_bytes())
    }

    /// The shareable half
    pub fn public_identity(&self) -> PublicIdentity {
        PublicIdentity {
            signing_public_key: self.identity.public_bytes(),
            encryption_public_key: self.encryption.public_bytes(),
        }
    }

    /// Sign arbitrary canonical bytes with the identity key
    pub fn sign(&self, message: &[u8]) -> Signature {
        sign(&self.identity, message)
    }

    /// Derive a child signing key bound to this identity under `path`
    pub fn derive(&self, path: &str) -> Result<DerivedKey> {
        DerivedKey::derive(&self.identity, path)
    }
}

impl std::fmt::Debug for DualKeyIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DualKeyIdentity")
            .field("did", &self.did().to_string())
            .field("encryption_fingerprint", &self.encryption_fingerprint())
            .finish_non_exhaustive()
    }
}

/// Public keys of a subject, safe to publish
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct PublicIdentity {
    /// Ed25519 public key for signature verification (32 bytes)
    #[serde(with = "key_str")]
    pub signing_public_key: [u8; 32],

    /// X25519 public key for encryption (32 bytes)
    #[serde(with = "key_str")]
    pub encryption_public_key: [u8; 32],
}

impl PublicIdentity {
    /// Create from raw bytes
    pub fn new(signing_public_key: [u8; 32], encryption_public_key: [u8; 32]) -> Self {
        Self {
            signing_public_key,
            encryption_public_key,
        }
    }

    /// Create from strings in either hex or base64
    pub fn from_encoded(signing: &str, encryption: &str) -> Result<Self> {
        Ok(Self {
            signing_public_key: crate::format::decode_public_key(signing, "signingPublicKey")?,
            encryption_public_key: crate::format::decode_public_key(
                encryption,
                "encryptionPublicKey",
            )?,
        })
    }

    /// `did:key` address
    pub fn did(&self) -> Did {
        Did::from_public_key(&self.signing_public_key)
    }

    /// Fingerprint of the encryption key
    pub fn encryption_fingerprint(&self) -> String {
        fingerprint(&self.encryption_public_key)
    }

    /// Verify that a message was signed by this identity
    pub fn verify_signature(&self, message: &[u8], signature: &Signature) -> bool {
        crate::crypto::verify(&self.signing_public_key, message, signature)
    }
}

/// Serde helper: hex on output, hex or base64 on input
mod key_str {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        crate::format::decode_public_key(&s, "publicKey").map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

    #[test]
    fn test_generate_keys_independent() {
        let id = DualKeyIdentity::generate();
        assert_ne!(id.signing_public_key(), id.encryption_public_key());
        assert_ne!(id.signing().secret_bytes(), id.encryption().secret_bytes());
    }

    #[test]
    fn test_load_from_secret_bytes() {
        let original = DualKeyIdentity::generate();
        let restored = DualKeyIdentity::from_secret_bytes(
            &original.signing().secret_bytes(),
            &original.encryption().secret_bytes(),
        );
        assert_eq!(original.public_identity(), restored.public_identity());
        assert_eq!(original.did(), restored.did());
    }

    #[test]
    fn test_load_rejects_short_keys() {
        assert!(DualKeyIdentity::from_secret_slices(&[1u8; 32], &[2u8; 30]).is_err());
        assert!(DualKeyIdentity::from_secret_slices(&[1u8; 10], &[2u8; 32]).is_err());
        assert!(DualKeyIdentity::from_secret_slices(&[1u8; 32], &[2u8; 32]).is_ok());
    }

    #[test]
    fn test_same_signing_seed_different_encryption_key() {
        // Sharing the signing seed says nothing about the encryption key
        let a = DualKeyIdentity::from_secret_bytes(&[1u8; 32], &[2u8; 32]);
        let b = DualKeyIdentity::from_secret_bytes(&[1u8; 32], &[3u8; 32]);
        assert_eq!(a.signing_public_key(), b.signing_public_key());
        assert_ne!(a.encryption_public_key(), b.encryption_public_key());
    }

    #[test]
    fn test_public_identity_json() {
        let id = DualKeyIdentity::generate();
        let public = id.public_identity();

        let json = serde_json::to_string(&public).unwrap();
        assert!(json.contains("signingPublicKey"));
        let restored: PublicIdentity = serde_json::from_str(&json).unwrap();
        assert_eq!(public, restored);
    }

    #[test]
    fn test_public_identity_accepts_base64() {
        let id = DualKeyIdentity::generate();
        let public = PublicIdentity::from_encoded(
            &BASE64.encode(id.signing_public_key()),
            &hex::encode(id.encryption_public_key()),
        )
        .unwrap();
        assert_eq!(public, id.public_identity());
    }

    #[test]
    fn test_sign_and_verify_through_public_identity() {
        let id = DualKeyIdentity::generate();
        let sig = id.sign(b"payload");
        assert!(id.public_identity().verify_signature(b"payload", &sig));
        assert!(!id.public_identity().verify_signature(b"other", &sig));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let id = DualKeyIdentity::generate();
        let dbg = format!("{:?}", id);
        assert!(dbg.contains("did:key:z"));
        assert!(!dbg.contains(&hex::encode(id.signing().secret_bytes())));
    }
}
