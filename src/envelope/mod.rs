//! # Envelope Module
//!
//! The signed, encrypted record exchanged between subjects.
//!
//! ## Envelope Structure
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            ENVELOPE                                     │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Addressing      id, version, fromPublicKey, toPublicKeys,             │
//! │                  ccPublicKeys?, timestamp, expiresAt?                  │
//! │                                                                         │
//! │  Payload         payloadType, encryptedPayload, payloadSize            │
//! │                                                                         │
//! │  Key material    EXACTLY ONE OF                                        │
//! │                  ├── ephemeralPublicKey         (single recipient)     │
//! │                  └── recipientKeys {fp → wrap}  (multi recipient)      │
//! │                  nonce                                                  │
//! │                                                                         │
//! │  signature       Ed25519 over SHA-256(canonical(signable view))        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Signable View
//!
//! The signature covers a fixed projection of the body, rebuilt from decoded
//! bytes with canonical spellings (keys lowercase hex, blobs base64). The
//! projection is listed field by field in [`EnvelopeBody::signable_view`], so
//! a producer that spelled its keys in base64 still verifies, and a future
//! optional field does not change what older readers sign.
//!
//! An [`Envelope`] is immutable once signed. Build a new body and sign it
//! again to change anything.

mod crypto;
mod wire;

pub use crypto::{EncryptedPayload, EnvelopeCrypto, SealRequest};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::canonical::canonicalize;
use crate::crypto::{Nonce, Signature, KEY_SIZE, TAG_SIZE};
use crate::error::{Error, Result};
use crate::format;

/// Current envelope protocol version
pub const ENVELOPE_PROTOCOL_VERSION: u32 = 1;

/// Size of a wrapped content key: the 32-byte key plus the AEAD tag
pub const WRAPPED_KEY_SIZE: usize = KEY_SIZE + TAG_SIZE;

/// Longest accepted payload type tag
pub const MAX_PAYLOAD_TYPE_LEN: usize = 64;

// ============================================================================
// PAYLOAD TYPE
// ============================================================================

/// What kind of content the envelope carries
///
/// Known kinds have their own variant. Any other lowercase tag
/// (`[a-z][a-z0-9._-]*`) round-trips through [`PayloadType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PayloadType {
    /// Direct chat message
    Chat,
    /// Long-form mail
    Mail,
    /// Public or group post
    Post,
    /// Delivery or read receipt
    Receipt,
    /// Reaction to another envelope
    Reaction,
    /// Call signalling
    Call,
    /// Any other tag
    Other(String),
}

impl PayloadType {
    /// Wire tag
    pub fn as_str(&self) -> &str {
        match self {
            Self::Chat => "chat",
            Self::Mail => "mail",
            Self::Post => "post",
            Self::Receipt => "receipt",
            Self::Reaction => "reaction",
            Self::Call => "call",
            Self::Other(tag) => tag,
        }
    }

    /// Parse a wire tag
    pub fn parse(tag: &str) -> Result<Self> {
        Ok(match tag {
            "chat" => Self::Chat,
            "mail" => Self::Mail,
            "post" => Self::Post,
            "receipt" => Self::Receipt,
            "reaction" => Self::Reaction,
            "call" => Self::Call,
            other => {
                validate_tag(other)?;
                Self::Other(other.to_string())
            }
        })
    }
}

fn validate_tag(tag: &str) -> Result<()> {
    let mut bytes = tag.bytes();
    let starts_with_letter = matches!(bytes.next(), Some(b'a'..=b'z'));
    let rest_ok = bytes.all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'.' | b'_' | b'-'));

    if !starts_with_letter || !rest_ok || tag.len() > MAX_PAYLOAD_TYPE_LEN {
        return Err(Error::InvalidPayloadType(tag.to_string()));
    }
    Ok(())
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayloadType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for PayloadType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PayloadType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Self::parse(&tag).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// KEY MATERIAL
// ============================================================================

/// One recipient's copy of the content key, sealed to that recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedKey {
    /// Fresh X25519 public key for this wrap
    pub ephemeral_public_key: [u8; 32],
    /// AEAD nonce for this wrap
    pub nonce: Nonce,
    /// Content key ciphertext + tag ([`WRAPPED_KEY_SIZE`] bytes)
    pub encrypted_key: Vec<u8>,
}

impl WrappedKey {
    fn signable_view(&self) -> Value {
        json!({
            "encryptedKey": format::encode_base64(&self.encrypted_key),
            "ephemeralPublicKey": format::encode_hex(&self.ephemeral_public_key),
            "nonce": format::encode_base64(self.nonce.as_bytes()),
        })
    }
}

/// How the payload key reaches the recipients
///
/// Modelled as an enum so an envelope is always exactly one of the two modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMaterial {
    /// Payload encrypted directly under a key agreed with one recipient
    Single {
        /// Sender's ephemeral X25519 public key
        ephemeral_public_key: [u8; 32],
    },
    /// Payload encrypted under a random content key, wrapped per recipient
    Multi {
        /// Recipient X25519 fingerprint → wrapped content key
        recipient_keys: BTreeMap<String, WrappedKey>,
    },
}

impl KeyMaterial {
    /// True for the multi-recipient mode
    pub fn is_multi_recipient(&self) -> bool {
        matches!(self, Self::Multi { .. })
    }

    /// Ephemeral public key, single-recipient mode only
    pub fn ephemeral_public_key(&self) -> Option<&[u8; 32]> {
        match self {
            Self::Single {
                ephemeral_public_key,
            } => Some(ephemeral_public_key),
            Self::Multi { .. } => None,
        }
    }

    /// Wrapped keys, multi-recipient mode only
    pub fn recipient_keys(&self) -> Option<&BTreeMap<String, WrappedKey>> {
        match self {
            Self::Single { .. } => None,
            Self::Multi { recipient_keys } => Some(recipient_keys),
        }
    }
}

// ============================================================================
// ENVELOPE BODY
// ============================================================================

/// Every envelope field except the signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeBody {
    /// Unique envelope ID
    pub id: String,
    /// Protocol version
    pub version: u32,
    /// Sender's Ed25519 public key
    pub from_public_key: [u8; 32],
    /// Primary recipients' Ed25519 public keys, in order
    pub to_public_keys: Vec<[u8; 32]>,
    /// Secondary recipients' Ed25519 public keys
    pub cc_public_keys: Option<Vec<[u8; 32]>>,
    /// Content kind
    pub payload_type: PayloadType,
    /// AEAD ciphertext + tag
    pub encrypted_payload: Vec<u8>,
    /// Declared plaintext length. Advisory unless strict checking is enabled.
    pub payload_size: u64,
    /// Single- or multi-recipient key material
    pub key_material: KeyMaterial,
    /// Payload AEAD nonce
    pub nonce: Nonce,
    /// Creation time (Unix milliseconds)
    pub timestamp: i64,
    /// Expiry (Unix milliseconds)
    pub expires_at: Option<i64>,
}

impl EnvelopeBody {
    /// Structural checks that need no key material
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::MissingField("id"));
        }
        if self.version != ENVELOPE_PROTOCOL_VERSION {
            return Err(Error::UnsupportedVersion(self.version));
        }
        if self.to_public_keys.is_empty() {
            return Err(Error::EmptyRecipients);
        }

        let mut seen = BTreeSet::new();
        let cc = self.cc_public_keys.iter().flatten();
        for key in self.to_public_keys.iter().chain(cc) {
            if !seen.insert(key) {
                return Err(Error::DuplicateRecipient(format::encode_hex(key)));
            }
        }

        if self.encrypted_payload.len() < TAG_SIZE {
            return Err(Error::CiphertextTooShort(self.encrypted_payload.len()));
        }

        if let KeyMaterial::Multi { recipient_keys } = &self.key_material {
            if recipient_keys.is_empty() {
                return Err(Error::InvalidKeyMaterial("recipientKeys is empty"));
            }
            for wrapped in recipient_keys.values() {
                if wrapped.encrypted_key.len() != WRAPPED_KEY_SIZE {
                    return Err(Error::InvalidKeyLength {
                        what: "wrapped content",
                        expected: WRAPPED_KEY_SIZE,
                        actual: wrapped.encrypted_key.len(),
                    });
                }
            }
        }

        Ok(())
    }

    /// The fixed projection covered by the signature
    pub fn signable_view(&self) -> Value {
        let mut view = Map::new();

        view.insert("version".into(), json!(self.version));
        view.insert("id".into(), json!(self.id));
        view.insert(
            "fromPublicKey".into(),
            json!(format::encode_hex(&self.from_public_key)),
        );
        view.insert("toPublicKeys".into(), hex_list(&self.to_public_keys));
        if let Some(cc) = &self.cc_public_keys {
            view.insert("ccPublicKeys".into(), hex_list(cc));
        }
        view.insert("payloadType".into(), json!(self.payload_type.as_str()));
        view.insert(
            "encryptedPayload".into(),
            json!(format::encode_base64(&self.encrypted_payload)),
        );
        view.insert("payloadSize".into(), json!(self.payload_size));

        match &self.key_material {
            KeyMaterial::Single {
                ephemeral_public_key,
            } => {
                view.insert(
                    "ephemeralPublicKey".into(),
                    json!(format::encode_hex(ephemeral_public_key)),
                );
            }
            KeyMaterial::Multi { recipient_keys } => {
                let wraps: Map<String, Value> = recipient_keys
                    .iter()
                    .map(|(fp, wrapped)| (fp.clone(), wrapped.signable_view()))
                    .collect();
                view.insert("recipientKeys".into(), Value::Object(wraps));
            }
        }

        view.insert(
            "nonce".into(),
            json!(format::encode_base64(self.nonce.as_bytes())),
        );
        view.insert("timestamp".into(), json!(self.timestamp));
        if let Some(expires_at) = self.expires_at {
            view.insert("expiresAt".into(), json!(expires_at));
        }

        Value::Object(view)
    }

    /// Canonical bytes of [`signable_view`](Self::signable_view)
    pub fn signable_bytes(&self) -> Vec<u8> {
        canonicalize(&self.signable_view())
    }

    /// True once `now` is past `expires_at`
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at
            .map(|expires_at| crate::time::is_past(expires_at, now))
            .unwrap_or(false)
    }
}

fn hex_list(keys: &[[u8; 32]]) -> Value {
    Value::Array(
        keys.iter()
            .map(|k| Value::String(format::encode_hex(k)))
            .collect(),
    )
}

// ============================================================================
// ENVELOPE
// ============================================================================

/// A signed envelope
///
/// Serializes to the camelCase JSON wire form. Keys and the signature are
/// written as lowercase hex, blobs and nonces as base64. On input, every key
/// and the signature may be either hex or base64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    body: EnvelopeBody,
    signature: Signature,
}

impl Envelope {
    /// Pair a body with a signature
    ///
    /// Nothing is checked here; [`EnvelopeCrypto::verify`] decides whether
    /// the pair is genuine.
    pub fn from_parts(body: EnvelopeBody, signature: Signature) -> Self {
        Self { body, signature }
    }

    /// Split into body and signature
    pub fn into_parts(self) -> (EnvelopeBody, Signature) {
        (self.body, self.signature)
    }

    /// The signed fields
    pub fn body(&self) -> &EnvelopeBody {
        &self.body
    }

    /// Detached Ed25519 signature
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Envelope ID
    pub fn id(&self) -> &str {
        &self.body.id
    }

    /// True for the multi-recipient mode
    pub fn is_multi_recipient(&self) -> bool {
        self.body.key_material.is_multi_recipient()
    }

    /// Canonical bytes the signature covers
    pub fn signable_bytes(&self) -> Vec<u8> {
        self.body.signable_bytes()
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&wire::WireEnvelope::from_envelope(self))?)
    }

    /// Deserialize from JSON, decoding and validating every field
    pub fn from_json(json: &str) -> Result<Self> {
        let wire: wire::WireEnvelope =
            serde_json::from_str(json).map_err(|e| Error::InvalidEnvelope(e.to_string()))?;
        wire.into_envelope()
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        wire::WireEnvelope::from_envelope(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        wire::WireEnvelope::deserialize(deserializer)?
            .into_envelope()
            .map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// TESTS
// ============================================================================
