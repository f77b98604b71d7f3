//! `did:key` addresses for Ed25519 identity keys.
//!
//! ```text
//! did:key:z + base58btc( 0xed 0x01 || ed25519_public_key )
//!          │             └──┬────┘
//!          │                └── multicodec varint for Ed25519 public keys
//!          └── multibase prefix for base58btc
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The DID method prefix for did:key
pub const DID_KEY_PREFIX: &str = "did:key:";

/// Multicodec prefix for Ed25519 public keys (0xed01 in varint encoding)
const ED25519_MULTICODEC_PREFIX: [u8; 2] = [0xed, 0x01];

/// A subject's durable address, derived from its Ed25519 public key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did {
    value: String,
    public_key: [u8; 32],
}

impl Did {
    /// Create a DID from an Ed25519 public key
    pub fn from_public_key(public_key: &[u8; 32]) -> Self {
        let mut multicodec_key = Vec::with_capacity(34);
        multicodec_key.extend_from_slice(&ED25519_MULTICODEC_PREFIX);
        multicodec_key.extend_from_slice(public_key);

        let value = format!(
            "{}z{}",
            DID_KEY_PREFIX,
            bs58::encode(&multicodec_key).into_string()
        );

        Self {
            value,
            public_key: *public_key,
        }
    }

    /// Parse and validate a DID string
    pub fn parse(did_string: &str) -> Result<Self> {
        let identifier = did_string.strip_prefix(DID_KEY_PREFIX).ok_or_else(|| {
            Error::InvalidDid(format!("DID must start with '{}'", DID_KEY_PREFIX))
        })?;

        let encoded = identifier
            .strip_prefix('z')
            .ok_or_else(|| Error::InvalidDid("identifier must be base58btc ('z')".into()))?;

        let decoded = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| Error::InvalidDid(format!("Invalid base58btc encoding: {}", e)))?;

        let key = decoded
            .strip_prefix(&ED25519_MULTICODEC_PREFIX[..])
            .ok_or_else(|| Error::InvalidDid("not an Ed25519 multicodec key".into()))?;

        let public_key: [u8; 32] = key.try_into().map_err(|_| {
            Error::InvalidDid(format!("expected 32-byte key, got {}", key.len()))
        })?;

        Ok(Self {
            value: did_string.to_string(),
            public_key,
        })
    }

    /// The Ed25519 public key this DID encodes
    pub fn public_key(&self) -> [u8; 32] {
        self.public_key
    }

    /// Get the full DID string
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl std::fmt::Display for Did {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

impl std::str::FromStr for Did {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Did {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<Did> for String {
    fn from(did: Did) -> Self {
        did.value
    }
}
