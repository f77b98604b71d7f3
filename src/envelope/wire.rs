//! JSON wire form of an [`Envelope`].
//!
//! Every byte field travels as a string. Decoding goes through
//! [`crate::format`], so keys and the signature may arrive as hex or base64.
//! Integers written as integral floats (`5.0`) by other producers are
//! accepted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Number;

use super::{Envelope, EnvelopeBody, KeyMaterial, PayloadType, WrappedKey};
use crate::error::{Error, Result};
use crate::format;

/// Largest magnitude at which every integer is exactly representable in f64
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WireEnvelope {
    id: String,
    version: Number,
    from_public_key: String,
    to_public_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cc_public_keys: Option<Vec<String>>,
    payload_type: String,
    encrypted_payload: String,
    payload_size: Number,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ephemeral_public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    recipient_keys: Option<BTreeMap<String, WireWrappedKey>>,
    nonce: String,
    timestamp: Number,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<Number>,
    signature: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireWrappedKey {
    ephemeral_public_key: String,
    nonce: String,
    encrypted_key: String,
}

impl WireEnvelope {
    pub(super) fn from_envelope(envelope: &Envelope) -> Self {
        let body = envelope.body();

        let (ephemeral_public_key, recipient_keys) = match &body.key_material {
            KeyMaterial::Single {
                ephemeral_public_key,
            } => (Some(format::encode_hex(ephemeral_public_key)), None),
            KeyMaterial::Multi { recipient_keys } => {
                let wraps = recipient_keys
                    .iter()
                    .map(|(fp, wrapped)| (fp.clone(), WireWrappedKey::from_wrapped(wrapped)))
                    .collect();
                (None, Some(wraps))
            }
        };

        Self {
            id: body.id.clone(),
            version: body.version.into(),
            from_public_key: format::encode_hex(&body.from_public_key),
            to_public_keys: hex_keys(&body.to_public_keys),
            cc_public_keys: body.cc_public_keys.as_deref().map(hex_keys),
            payload_type: body.payload_type.as_str().to_string(),
            encrypted_payload: format::encode_base64(&body.encrypted_payload),
            payload_size: body.payload_size.into(),
            ephemeral_public_key,
            recipient_keys,
            nonce: format::encode_base64(body.nonce.as_bytes()),
            timestamp: body.timestamp.into(),
            expires_at: body.expires_at.map(Number::from),
            signature: envelope.signature().to_hex(),
        }
    }

    pub(super) fn into_envelope(self) -> Result<Envelope> {
        let version = u32::try_from(integer(&self.version, "version")?)
            .map_err(|_| Error::InvalidEnvelope("version out of range".into()))?;
        let payload_size = match self.payload_size.as_u64() {
            Some(size) => size,
            None => u64::try_from(integer(&self.payload_size, "payloadSize")?)
                .map_err(|_| Error::InvalidEnvelope("payloadSize is negative".into()))?,
        };

        let key_material = match (self.ephemeral_public_key, self.recipient_keys) {
            (Some(ephemeral), None) => KeyMaterial::Single {
                ephemeral_public_key: format::decode_public_key(&ephemeral, "ephemeralPublicKey")?,
            },
            (None, Some(wraps)) => KeyMaterial::Multi {
                recipient_keys: wraps
                    .into_iter()
                    .map(|(fp, wrapped)| Ok((fp, wrapped.into_wrapped()?)))
                    .collect::<Result<_>>()?,
            },
            (Some(_), Some(_)) => {
                return Err(Error::InvalidKeyMaterial(
                    "both ephemeralPublicKey and recipientKeys are present",
                ))
            }
            (None, None) => {
                return Err(Error::InvalidKeyMaterial(
                    "neither ephemeralPublicKey nor recipientKeys is present",
                ))
            }
        };

        let body = EnvelopeBody {
            id: self.id,
            version,
            from_public_key: format::decode_public_key(&self.from_public_key, "fromPublicKey")?,
            to_public_keys: decode_keys(&self.to_public_keys, "toPublicKeys")?,
            cc_public_keys: self
                .cc_public_keys
                .map(|keys| decode_keys(&keys, "ccPublicKeys"))
                .transpose()?,
            payload_type: PayloadType::parse(&self.payload_type)?,
            encrypted_payload: format::decode_blob(&self.encrypted_payload, "encryptedPayload")?,
            payload_size,
            key_material,
            nonce: format::decode_nonce(&self.nonce, "nonce")?,
            timestamp: integer(&self.timestamp, "timestamp")?,
            expires_at: self
                .expires_at
                .map(|n| integer(&n, "expiresAt"))
                .transpose()?,
        };
        body.validate()?;

        let signature = format::decode_signature(&self.signature)?;
        Ok(Envelope::from_parts(body, signature))
    }
}

impl WireWrappedKey {
    fn from_wrapped(wrapped: &WrappedKey) -> Self {
        Self {
            ephemeral_public_key: format::encode_hex(&wrapped.ephemeral_public_key),
            nonce: format::encode_base64(wrapped.nonce.as_bytes()),
            encrypted_key: format::encode_base64(&wrapped.encrypted_key),
        }
    }

    fn into_wrapped(self) -> Result<WrappedKey> {
        Ok(WrappedKey {
            ephemeral_public_key: format::decode_public_key(
                &self.ephemeral_public_key,
                "recipientKeys.ephemeralPublicKey",
            )?,
            nonce: format::decode_nonce(&self.nonce, "recipientKeys.nonce")?,
            encrypted_key: format::decode_blob(&self.encrypted_key, "recipientKeys.encryptedKey")?,
        })
    }
}

fn hex_keys(keys: &[[u8; 32]]) -> Vec<String> {
    keys.iter().map(|k| format::encode_hex(k)).collect()
}

fn decode_keys(keys: &[String], field: &'static str) -> Result<Vec<[u8; 32]>> {
    keys.iter()
        .map(|k| format::decode_public_key(k, field))
        .collect()
}

/// Read an integer that may have been written as an integral float
fn integer(n: &Number, field: &str) -> Result<i64> {
    if let Some(v) = n.as_i64() {
        return Ok(v);
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => Ok(f as i64),
        _ => Err(Error::InvalidEnvelope(format!("{} is not an integer: {}", field, n))),
    }
}
