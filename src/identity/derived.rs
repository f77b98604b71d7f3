//! # Derived Keys
//!
//! Child signing keys bound to a root identity by a derivation path (for
//! example a time epoch), with a proof anyone can check offline.
//!
//! ```text
//! root seed ──HKDF(info = "umbra-derived-key-v1" || path)──► child seed
//!                                                               │
//!                                                               ▼
//!                                                       child Ed25519 key
//!
//! proof = { rootPublicKey, derivedPublicKey, path,
//!           signature = root.sign(canonical{derivedPublicKey, path, rootPublicKey}) }
//! ```
//!
//! Verifying a proof needs only the proof itself: it checks the root's
//! signature over the binding. Re-deriving the child requires the root seed,
//! which never leaves the subject.

use serde::{Deserialize, Serialize};
use serde_json::json;
use zeroize::Zeroizing;

use crate::canonical::canonicalize;
use crate::crypto::kdf::derive_child_seed;
use crate::crypto::{sign, verify, Signature, SigningKeyPair};
use crate::error::{Error, Result};
use crate::format;

/// Longest accepted derivation path, in bytes
pub const MAX_PATH_LEN: usize = 256;

/// A derived keypair and the proof linking it to its root
pub struct DerivedKey {
    keypair: SigningKeyPair,
    proof: DerivationProof,
}

impl DerivedKey {
    pub(crate) fn derive(root: &SigningKeyPair, path: &str) -> Result<Self> {
        validate_path(path)?;

        let root_seed = Zeroizing::new(root.secret_bytes());
        let seed = derive_child_seed(&root_seed, path)?;
        let keypair = SigningKeyPair::from_bytes(&seed);

        let root_public_key = root.public_bytes();
        let derived_public_key = keypair.public_bytes();
        let binding = binding_bytes(&root_public_key, &derived_public_key, path);

        tracing::debug!(path, "derived child signing key");

        Ok(Self {
            proof: DerivationProof {
                root_public_key,
                derived_public_key,
                path: path.to_string(),
                signature: sign(root, &binding),
            },
            keypair,
        })
    }

    /// The derived keypair
    pub fn keypair(&self) -> &SigningKeyPair {
        &self.keypair
    }

    /// The derived public key
    pub fn public_key(&self) -> [u8; 32] {
        self.keypair.public_bytes()
    }

    /// Proof of derivation
    pub fn proof(&self) -> &DerivationProof {
        &self.proof
    }
}

/// Signed statement that `derived_public_key` belongs to `root_public_key`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivationProof {
    /// Root identity key
    #[serde(with = "key32")]
    pub root_public_key: [u8; 32],
    /// Child key
    #[serde(with = "key32")]
    pub derived_public_key: [u8; 32],
    /// Derivation path
    pub path: String,
    /// Root signature over the canonical binding
    #[serde(with = "sig64")]
    pub signature: Signature,
}

impl DerivationProof {
    /// Check the root's signature over the binding
    pub fn verify(&self) -> bool {
        if validate_path(&self.path).is_err() {
            return false;
        }
        let binding = binding_bytes(&self.root_public_key, &self.derived_public_key, &self.path);
        verify(&self.root_public_key, &binding, &self.signature)
    }
}

fn validate_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(Error::InvalidDerivationPath("path is empty".into()));
    }
    if path.len() > MAX_PATH_LEN {
        return Err(Error::InvalidDerivationPath(format!(
            "path is {} bytes (max {})",
            path.len(),
            MAX_PATH_LEN
        )));
    }
    Ok(())
}

fn binding_bytes(root: &[u8; 32], derived: &[u8; 32], path: &str) -> Vec<u8> {
    canonicalize(&json!({
        "derivedPublicKey": format::encode_hex(derived),
        "path": path,
        "rootPublicKey": format::encode_hex(root),
    }))
}

mod key32 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(d)?;
        crate::format::decode_public_key(&s, "publicKey").map_err(serde::de::Error::custom)
    }
}

mod sig64 {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::crypto::Signature;

    pub fn serialize<S: Serializer>(sig: &Signature, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&sig.to_hex())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Signature, D::Error> {
        let s = String::deserialize(d)?;
        crate::format::decode_signature(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::DualKeyIdentity;

    #[test]
    fn test_derive_and_verify() {
        let root = DualKeyIdentity::generate();
        let child = root.derive("epoch/2026-10").unwrap();

        assert_ne!(child.public_key(), root.signing_public_key());
        assert_eq!(child.proof().root_public_key, root.signing_public_key());
        assert!(child.proof().verify());
    }

    #[test]
    fn test_derivation_deterministic() {
        let root = DualKeyIdentity::generate();
        let a = root.derive("epoch/1").unwrap();
        let b = root.derive("epoch/1").unwrap();
        let c = root.derive("epoch/2").unwrap();
        assert_eq!(a.public_key(), b.public_key());
        assert_ne!(a.public_key(), c.public_key());
    }

    #[test]
    fn test_child_keypair_comes_from_root_seed() {
        let root = SigningKeyPair::from_bytes(&[4u8; 32]);
        let child = DerivedKey::derive(&root, "epoch/3").unwrap();

        let seed = derive_child_seed(&[4u8; 32], "epoch/3").unwrap();
        assert_eq!(child.public_key(), SigningKeyPair::from_bytes(&seed).public_bytes());
        assert_eq!(child.keypair().public_bytes(), child.public_key());
    }

    #[test]
    fn test_tampered_proof_fails() {
        let root = DualKeyIdentity::generate();
        let child = root.derive("epoch/1").unwrap();

        let mut wrong_path = child.proof().clone();
        wrong_path.path = "epoch/2".into();
        assert!(!wrong_path.verify());

        let mut wrong_key = child.proof().clone();
        wrong_key.derived_public_key[0] ^= 1;
        assert!(!wrong_key.verify());

        let other_root = DualKeyIdentity::generate();
        let mut wrong_root = child.proof().clone();
        wrong_root.root_public_key = other_root.signing_public_key();
        assert!(!wrong_root.verify());
    }

    #[test]
    fn test_invalid_paths() {
        let root = DualKeyIdentity::generate();
        assert!(matches!(root.derive(""), Err(Error::InvalidDerivationPath(_))));
        assert!(root.derive(&"x".repeat(MAX_PATH_LEN + 1)).is_err());
        assert!(root.derive(&"x".repeat(MAX_PATH_LEN)).is_ok());
    }

    #[test]
    fn test_proof_json_round_trip() {
        let root = DualKeyIdentity::generate();
        let proof = root.derive("device/phone").unwrap().proof().clone();

        let json = serde_json::to_string(&proof).unwrap();
        let restored: DerivationProof = serde_json::from_str(&json).unwrap();
        assert_eq!(proof, restored);
        assert!(restored.verify());
    }
}
