//! # Envelope Crypto
//!
//! Encrypts payloads for one or many recipients and signs the result.
//!
//! ## Single Recipient
//!
//! ```text
//! ephemeral ──X25519──► recipient.encryption_public_key
//!                │
//!                ▼
//!   HKDF(info = "umbra-envelope-payload-v1" || eph_pub || rcpt_pub)
//!                │
//!                ▼
//!   ChaCha20-Poly1305(plaintext) ──► encryptedPayload, nonce, ephemeralPublicKey
//! ```
//!
//! ## Multiple Recipients
//!
//! ```text
//! content_key = random 32 bytes
//! encryptedPayload = ChaCha20-Poly1305(content_key, plaintext)      (once)
//!
//! for each recipient:
//!   recipientKeys[fingerprint] = single-recipient seal of content_key
//!                                under "umbra-envelope-key-wrap-v1"
//! ```
//!
//! One symmetric pass over the payload, one X25519 exchange per recipient.
//!
//! ## Failures
//!
//! Every cryptographic failure reaches the caller as a bare
//! [`Error::DecryptionFailed`], [`Error::VerificationFailed`] or
//! [`Error::NotARecipient`]. The detailed reason goes to `tracing`.

use std::collections::BTreeMap;

use uuid::Uuid;
use zeroize::Zeroizing;

use super::{
    Envelope, EnvelopeBody, KeyMaterial, PayloadType, WrappedKey, ENVELOPE_PROTOCOL_VERSION,
    WRAPPED_KEY_SIZE,
};
use crate::config::EnvelopeConfig;
use crate::crypto::kdf::domain;
use crate::crypto::{
    aead, derive_key, fingerprint, shared_secret, verify, EncryptionKeyPair, Ephemeral, Nonce,
    SymmetricKey,
};
use crate::error::{Error, Result};
use crate::format;
use crate::identity::{DualKeyIdentity, PublicIdentity};
use crate::time::now_timestamp_millis;

/// Output of [`EnvelopeCrypto::encrypt`]
#[derive(Debug, Clone)]
pub struct EncryptedPayload {
    /// AEAD ciphertext + tag
    pub ciphertext: Vec<u8>,
    /// Payload nonce
    pub nonce: Nonce,
    /// How recipients recover the payload key
    pub key_material: KeyMaterial,
}

/// Everything needed to seal one envelope
#[derive(Debug, Clone)]
pub struct SealRequest<'a> {
    /// Envelope ID; a random UUID when `None`
    pub id: Option<String>,
    /// Content kind
    pub payload_type: PayloadType,
    /// Plaintext payload
    pub plaintext: &'a [u8],
    /// Primary recipients
    pub to: Vec<PublicIdentity>,
    /// Secondary recipients
    pub cc: Vec<PublicIdentity>,
    /// Expiry (Unix milliseconds)
    pub expires_at: Option<i64>,
}

impl<'a> SealRequest<'a> {
    /// Start a request with no recipients
    pub fn new(payload_type: PayloadType, plaintext: &'a [u8]) -> Self {
        Self {
            id: None,
            payload_type,
            plaintext,
            to: Vec::new(),
            cc: Vec::new(),
            expires_at: None,
        }
    }

    /// Add a primary recipient
    pub fn to(mut self, recipient: PublicIdentity) -> Self {
        self.to.push(recipient);
        self
    }

    /// Add a secondary recipient
    pub fn cc(mut self, recipient: PublicIdentity) -> Self {
        self.cc.push(recipient);
        self
    }

    /// Use a caller-chosen envelope ID
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set an expiry time
    pub fn expires_at(mut self, expires_at: i64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

/// Envelope encryption and signing
///
/// Holds only configuration. Keys are passed into each call, so one
/// instance can serve any number of identities and threads.
#[derive(Debug, Clone, Default)]
pub struct EnvelopeCrypto {
    config: EnvelopeConfig,
}

impl EnvelopeCrypto {
    /// Create with the given configuration
    pub fn new(config: EnvelopeConfig) -> Self {
        Self { config }
    }

    /// Current configuration
    pub fn config(&self) -> &EnvelopeConfig {
        &self.config
    }

    // ========================================================================
    // ENCRYPTION
    // ========================================================================

    /// Encrypt for the given X25519 public keys
    ///
    /// One key selects single-recipient mode, more select multi-recipient.
    pub fn encrypt(&self, plaintext: &[u8], recipients: &[[u8; 32]]) -> Result<EncryptedPayload> {
        match recipients {
            [] => Err(Error::EmptyRecipients),
            [only] => self.encrypt_single(plaintext, only),
            many => self.encrypt_multi(plaintext, many),
        }
    }

    /// Encrypt directly to one recipient through a fresh ephemeral exchange
    pub fn encrypt_single(&self, plaintext: &[u8], recipient: &[u8; 32]) -> Result<EncryptedPayload> {
        self.check_payload_size(plaintext.len())?;

        let (ephemeral_public_key, nonce, ciphertext) =
            seal_to(recipient, domain::PAYLOAD, plaintext)?;

        tracing::debug!(size = plaintext.len(), "encrypted single-recipient payload");

        Ok(EncryptedPayload {
            ciphertext,
            nonce,
            key_material: KeyMaterial::Single {
                ephemeral_public_key,
            },
        })
    }

    /// Encrypt once under a random content key and wrap it per recipient
    pub fn encrypt_multi(&self, plaintext: &[u8], recipients: &[[u8; 32]]) -> Result<EncryptedPayload> {
        if recipients.is_empty() {
            return Err(Error::EmptyRecipients);
        }
        if recipients.len() > self.config.max_recipients {
            return Err(Error::TooManyRecipients {
                count: recipients.len(),
                max: self.config.max_recipients,
            });
        }
        self.check_payload_size(plaintext.len())?;

        let content_key = SymmetricKey::random();
        let (nonce, ciphertext) = aead::seal(&content_key, plaintext)?;

        let mut recipient_keys = BTreeMap::new();
        for recipient in recipients {
            let (ephemeral_public_key, wrap_nonce, encrypted_key) =
                seal_to(recipient, domain::KEY_WRAP, content_key.as_bytes())?;

            let fp = fingerprint(recipient);
            let wrapped = WrappedKey {
                ephemeral_public_key,
                nonce: wrap_nonce,
                encrypted_key,
            };
            if recipient_keys.insert(fp.clone(), wrapped).is_some() {
                return Err(Error::DuplicateRecipient(fp));
            }
        }

        tracing::debug!(
            size = plaintext.len(),
            recipients = recipient_keys.len(),
            "encrypted multi-recipient payload"
        );

        Ok(EncryptedPayload {
            ciphertext,
            nonce,
            key_material: KeyMaterial::Multi { recipient_keys },
        })
    }

    fn check_payload_size(&self, size: usize) -> Result<()> {
        if size > self.config.max_payload_size {
            return Err(Error::PayloadTooLarge {
                size,
                max: self.config.max_payload_size,
            });
        }
        Ok(())
    }

    // ========================================================================
    // DECRYPTION
    // ========================================================================

    /// Decrypt an envelope body's payload. Does not check the signature.
    pub fn decrypt(&self, body: &EnvelopeBody, recipient: &DualKeyIdentity) -> Result<Vec<u8>> {
        self.decrypt_payload(&body.encrypted_payload, &body.nonce, &body.key_material, recipient)
    }

    /// Decrypt raw payload parts
    pub fn decrypt_payload(
        &self,
        ciphertext: &[u8],
        nonce: &Nonce,
        key_material: &KeyMaterial,
        recipient: &DualKeyIdentity,
    ) -> Result<Vec<u8>> {
        match key_material {
            KeyMaterial::Single {
                ephemeral_public_key,
            } => self.decrypt_single(ciphertext, nonce, ephemeral_public_key, recipient),
            KeyMaterial::Multi { recipient_keys } => {
                self.decrypt_multi(ciphertext, nonce, recipient_keys, recipient)
            }
        }
    }

    /// Decrypt a single-recipient payload
    pub fn decrypt_single(
        &self,
        ciphertext: &[u8],
        nonce: &Nonce,
        ephemeral_public_key: &[u8; 32],
        recipient: &DualKeyIdentity,
    ) -> Result<Vec<u8>> {
        open_from(
            recipient.encryption(),
            ephemeral_public_key,
            domain::PAYLOAD,
            nonce,
            ciphertext,
        )
        .map_err(|e| {
            tracing::warn!(error = %e, "single-recipient payload did not decrypt");
            e
        })
    }

    /// Unwrap this recipient's content key, then decrypt the payload
    pub fn decrypt_multi(
        &self,
        ciphertext: &[u8],
        nonce: &Nonce,
        recipient_keys: &BTreeMap<String, WrappedKey>,
        recipient: &DualKeyIdentity,
    ) -> Result<Vec<u8>> {
        let fp = recipient.encryption_fingerprint();
        let wrapped = recipient_keys.get(&fp).ok_or_else(|| {
            tracing::warn!(fingerprint = %fp, "own fingerprint not in recipientKeys");
            Error::NotARecipient
        })?;

        if wrapped.encrypted_key.len() != WRAPPED_KEY_SIZE {
            return Err(Error::InvalidKeyLength {
                what: "wrapped content",
                expected: WRAPPED_KEY_SIZE,
                actual: wrapped.encrypted_key.len(),
            });
        }

        let key_bytes = Zeroizing::new(
            open_from(
                recipient.encryption(),
                &wrapped.ephemeral_public_key,
                domain::KEY_WRAP,
                &wrapped.nonce,
                &wrapped.encrypted_key,
            )
            .map_err(|e| {
                tracing::warn!(fingerprint = %fp, error = %e, "content key did not unwrap");
                e
            })?,
        );
        let content_key = SymmetricKey::from_slice(&key_bytes).map_err(|_| {
            tracing::warn!(fingerprint = %fp, "unwrapped content key has wrong length");
            Error::DecryptionFailed
        })?;

        aead::decrypt(&content_key, nonce, ciphertext).map_err(|e| {
            tracing::warn!(error = %e, "multi-recipient payload did not decrypt");
            e
        })
    }

    // ========================================================================
    // SIGNING
    // ========================================================================

    /// Validate a body and sign its canonical view with the sender's identity key
    pub fn sign(&self, body: EnvelopeBody, sender: &DualKeyIdentity) -> Result<Envelope> {
        body.validate()?;
        if body.from_public_key != sender.signing_public_key() {
            return Err(Error::SenderMismatch);
        }

        let signature = sender.sign(&body.signable_bytes());
        tracing::debug!(id = %body.id, "signed envelope");
        Ok(Envelope::from_parts(body, signature))
    }

    /// Check the envelope signature against `fromPublicKey`
    ///
    /// Returns `false` for any failure, never an error.
    pub fn verify(&self, envelope: &Envelope) -> bool {
        let body = envelope.body();
        let valid = verify(&body.from_public_key, &body.signable_bytes(), envelope.signature());
        if !valid {
            tracing::warn!(id = %body.id, "envelope signature rejected");
        }
        valid
    }

    /// Verify a signature over `message` with both values given as hex or base64
    ///
    /// Undecodable input is a rejection, not an error.
    pub fn verify_detached(&self, message: &[u8], signature: &str, public_key: &str) -> bool {
        let signature = match format::decode_signature(signature) {
            Ok(signature) => signature,
            Err(e) => {
                tracing::debug!(error = %e, "detached signature not decodable");
                return false;
            }
        };
        let public_key = match format::decode_public_key(public_key, "publicKey") {
            Ok(key) => key,
            Err(e) => {
                tracing::debug!(error = %e, "detached public key not decodable");
                return false;
            }
        };
        verify(&public_key, message, &signature)
    }

    // ========================================================================
    // SEAL / OPEN
    // ========================================================================

    /// Encrypt, address and sign a new envelope
    pub fn seal(&self, sender: &DualKeyIdentity, request: SealRequest<'_>) -> Result<Envelope> {
        if request.to.is_empty() {
            return Err(Error::EmptyRecipients);
        }
        let count = request.to.len() + request.cc.len();
        if count > self.config.max_recipients {
            return Err(Error::TooManyRecipients {
                count,
                max: self.config.max_recipients,
            });
        }

        let encryption_keys: Vec<[u8; 32]> = request
            .to
            .iter()
            .chain(&request.cc)
            .map(|r| r.encryption_public_key)
            .collect();
        let payload = self.encrypt(request.plaintext, &encryption_keys)?;

        let signing_keys = |rs: &[PublicIdentity]| -> Vec<[u8; 32]> {
            rs.iter().map(|r| r.signing_public_key).collect()
        };

        let body = EnvelopeBody {
            id: request.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            version: ENVELOPE_PROTOCOL_VERSION,
            from_public_key: sender.signing_public_key(),
            to_public_keys: signing_keys(&request.to),
            cc_public_keys: if request.cc.is_empty() {
                None
            } else {
                Some(signing_keys(&request.cc))
            },
            payload_type: request.payload_type,
            encrypted_payload: payload.ciphertext,
            payload_size: request.plaintext.len() as u64,
            key_material: payload.key_material,
            nonce: payload.nonce,
            timestamp: now_timestamp_millis(),
            expires_at: request.expires_at,
        };

        self.sign(body, sender)
    }

    /// Check version, signature and expiry, then decrypt
    pub fn open(&self, envelope: &Envelope, recipient: &DualKeyIdentity) -> Result<Vec<u8>> {
        let body = envelope.body();

        if body.version != ENVELOPE_PROTOCOL_VERSION {
            tracing::warn!(id = %body.id, version = body.version, "unsupported envelope version");
            return Err(Error::UnsupportedVersion(body.version));
        }

        if !self.verify(envelope) {
            return Err(Error::VerificationFailed);
        }

        // Only a signed expiresAt may decide the outcome
        if self.config.reject_expired {
            if let Some(expires_at) = body.expires_at {
                if body.is_expired(now_timestamp_millis()) {
                    tracing::debug!(id = %body.id, expires_at, "envelope expired");
                    return Err(Error::Expired(expires_at));
                }
            }
        }

        let plaintext = self.decrypt(body, recipient)?;

        if plaintext.len() as u64 != body.payload_size {
            if self.config.strict_payload_size {
                tracing::warn!(
                    id = %body.id,
                    declared = body.payload_size,
                    actual = plaintext.len(),
                    "payloadSize mismatch"
                );
                return Err(Error::PayloadSizeMismatch {
                    declared: body.payload_size,
                    actual: plaintext.len(),
                });
            }
            tracing::debug!(
                id = %body.id,
                declared = body.payload_size,
                actual = plaintext.len(),
                "ignoring advisory payloadSize mismatch"
            );
        }

        Ok(plaintext)
    }
}

/// Ephemeral exchange with `recipient`, then AEAD under the derived key
fn seal_to(
    recipient: &[u8; 32],
    domain: &[u8],
    plaintext: &[u8],
) -> Result<([u8; 32], Nonce, Vec<u8>)> {
    let ephemeral = Ephemeral::generate();
    let ephemeral_public = ephemeral.public_bytes();

    let shared = ephemeral.diffie_hellman(recipient)?;
    let key = derive_key(&shared, domain, &ephemeral_public, recipient)?;
    let (nonce, ciphertext) = aead::seal(&key, plaintext)?;

    Ok((ephemeral_public, nonce, ciphertext))
}

/// Reverse of [`seal_to`] from the recipient's side
fn open_from(
    recipient: &EncryptionKeyPair,
    ephemeral_public: &[u8; 32],
    domain: &[u8],
    nonce: &Nonce,
    sealed: &[u8],
) -> Result<Vec<u8>> {
    // A low-order ephemeral key is tampering, reported like any other
    let shared = shared_secret(recipient, ephemeral_public).map_err(|_| Error::DecryptionFailed)?;
    let key = derive_key(&shared, domain, ephemeral_public, &recipient.public_bytes())?;
    aead::decrypt(&key, nonce, sealed)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::encode_base64;
    use proptest::prelude::*;

    fn hello_for(sender: &DualKeyIdentity, recipients: &[&DualKeyIdentity]) -> Envelope {
        let request = recipients
            .iter()
            .fold(SealRequest::new(PayloadType::Chat, b"hello"), |req, r| {
                req.to(r.public_identity())
            });
        EnvelopeCrypto::default().seal(sender, request).unwrap()
    }

    fn resign(
        crypto: &EnvelopeCrypto,
        sender: &DualKeyIdentity,
        envelope: &Envelope,
        edit: impl FnOnce(&mut EnvelopeBody),
    ) -> Envelope {
        let mut body = envelope.body().clone();
        edit(&mut body);
        crypto.sign(body, sender).unwrap()
    }

    #[test]
    fn test_single_recipient_hello() {
        let crypto = EnvelopeCrypto::default();
        let sender = DualKeyIdentity::generate();
        let recipient = DualKeyIdentity::generate();
        let stranger = DualKeyIdentity::generate();

        let envelope = hello_for(&sender, &[&recipient]);
        let body = envelope.body();

        assert!(!envelope.is_multi_recipient());
        assert!(body.key_material.ephemeral_public_key().is_some());
        assert!(body.key_material.recipient_keys().is_none());
        assert_eq!(body.nonce.as_bytes().len(), 12);
        assert_eq!(body.payload_size, 5);
        assert_eq!(body.from_public_key, sender.signing_public_key());
        assert_eq!(body.to_public_keys, vec![recipient.signing_public_key()]);

        assert_eq!(crypto.open(&envelope, &recipient).unwrap(), b"hello");

        let err = crypto.open(&envelope, &stranger).unwrap_err();
        assert!(matches!(err, Error::DecryptionFailed));
    }

    #[test]
    fn test_three_recipients_and_outsider() {
        let crypto = EnvelopeCrypto::default();
        let sender = DualKeyIdentity::generate();
        let recipients: Vec<DualKeyIdentity> = (0..3).map(|_| DualKeyIdentity::generate()).collect();
        let outsider = DualKeyIdentity::generate();

        let refs: Vec<&DualKeyIdentity> = recipients.iter().collect();
        let envelope = hello_for(&sender, &refs);

        assert!(envelope.is_multi_recipient());
        let keys = envelope.body().key_material.recipient_keys().unwrap();
        assert_eq!(keys.len(), 3);
        assert!(envelope.body().key_material.ephemeral_public_key().is_none());

        for recipient in &recipients {
            assert!(keys.contains_key(&recipient.encryption_fingerprint()));
            assert_eq!(crypto.open(&envelope, recipient).unwrap(), b"hello");
        }

        let err = crypto.open(&envelope, &outsider).unwrap_err();
        assert!(matches!(err, Error::NotARecipient));
        assert!(err.is_crypto_failure());
    }

    #[test]
    fn test_cc_recipients_are_multi_mode() {
        let crypto = EnvelopeCrypto::default();
        let sender = DualKeyIdentity::generate();
        let to = DualKeyIdentity::generate();
        let cc = DualKeyIdentity::generate();

        let request = SealRequest::new(PayloadType::Mail, b"minutes")
            .to(to.public_identity())
            .cc(cc.public_identity());
        let envelope = crypto.seal(&sender, request).unwrap();

        assert!(envelope.is_multi_recipient());
        assert_eq!(
            envelope.body().cc_public_keys,
            Some(vec![cc.signing_public_key()])
        );
        assert_eq!(crypto.open(&envelope, &to).unwrap(), b"minutes");
        assert_eq!(crypto.open(&envelope, &cc).unwrap(), b"minutes");
    }

    #[test]
    fn test_encrypt_decrypt_without_envelope() {
        let crypto = EnvelopeCrypto::default();
        let recipient = DualKeyIdentity::generate();
        let other = DualKeyIdentity::generate();

        let payload = crypto
            .encrypt(b"raw bytes", &[recipient.encryption_public_key()])
            .unwrap();
        assert_eq!(payload.ciphertext.len(), b"raw bytes".len() + crate::crypto::TAG_SIZE);

        let plaintext = crypto
            .decrypt_payload(&payload.ciphertext, &payload.nonce, &payload.key_material, &recipient)
            .unwrap();
        assert_eq!(plaintext, b"raw bytes");

        assert!(crypto
            .decrypt_payload(&payload.ciphertext, &payload.nonce, &payload.key_material, &other)
            .is_err());
    }

    #[test]
    fn test_empty_recipients_rejected() {
        let crypto = EnvelopeCrypto::default();
        let sender = DualKeyIdentity::generate();

        assert!(matches!(crypto.encrypt(b"x", &[]), Err(Error::EmptyRecipients)));
        assert!(matches!(crypto.encrypt_multi(b"x", &[]), Err(Error::EmptyRecipients)));

        let request = SealRequest::new(PayloadType::Chat, b"x");
        assert!(matches!(crypto.seal(&sender, request), Err(Error::EmptyRecipients)));

        // cc alone is not enough
        let request = SealRequest::new(PayloadType::Chat, b"x")
            .cc(DualKeyIdentity::generate().public_identity());
        assert!(matches!(crypto.seal(&sender, request), Err(Error::EmptyRecipients)));
    }

    #[test]
    fn test_limits_from_config() {
        let crypto = EnvelopeCrypto::new(EnvelopeConfig {
            max_payload_size: 4,
            max_recipients: 2,
            ..EnvelopeConfig::default()
        });
        let sender = DualKeyIdentity::generate();
        let a = DualKeyIdentity::generate().public_identity();
        let b = DualKeyIdentity::generate().public_identity();
        let c = DualKeyIdentity::generate().public_identity();

        let too_big = SealRequest::new(PayloadType::Chat, b"hello").to(a);
        assert!(matches!(
            crypto.seal(&sender, too_big),
            Err(Error::PayloadTooLarge { size: 5, max: 4 })
        ));

        let too_many = SealRequest::new(PayloadType::Chat, b"hi").to(a).to(b).cc(c);
        assert!(matches!(
            crypto.seal(&sender, too_many),
            Err(Error::TooManyRecipients { count: 3, max: 2 })
        ));
    }

    #[test]
    fn test_duplicate_recipient_rejected() {
        let crypto = EnvelopeCrypto::default();
        let sender = DualKeyIdentity::generate();
        let r = DualKeyIdentity::generate().public_identity();

        let request = SealRequest::new(PayloadType::Chat, b"x").to(r).cc(r);
        assert!(matches!(
            crypto.seal(&sender, request),
            Err(Error::DuplicateRecipient(_))
        ));
    }

    #[test]
    fn test_seal_defaults_and_custom_id() {
        let crypto = EnvelopeCrypto::default();
        let sender = DualKeyIdentity::generate();
        let r = DualKeyIdentity::generate();

        let a = hello_for(&sender, &[&r]);
        let b = hello_for(&sender, &[&r]);
        assert_ne!(a.id(), b.id());
        assert!(Uuid::parse_str(a.id()).is_ok());
        assert!(a.body().timestamp > 0);

        let request = SealRequest::new(PayloadType::Chat, b"x")
            .to(r.public_identity())
            .with_id("msg-42");
        assert_eq!(crypto.seal(&sender, request).unwrap().id(), "msg-42");
    }

    #[test]
    fn test_sign_rejects_other_sender() {
        let crypto = EnvelopeCrypto::default();
        let sender = DualKeyIdentity::generate();
        let impostor = DualKeyIdentity::generate();
        let r = DualKeyIdentity::generate();

        let envelope = hello_for(&sender, &[&r]);
        let (body, _) = envelope.into_parts();
        assert!(matches!(crypto.sign(body, &impostor), Err(Error::SenderMismatch)));
    }

    #[test]
    fn test_verify_and_byte_flips() {
        let crypto = EnvelopeCrypto::default();
        let sender = DualKeyIdentity::generate();
        let recipients: Vec<DualKeyIdentity> = (0..3).map(|_| DualKeyIdentity::generate()).collect();
        let request = SealRequest::new(PayloadType::Chat, b"hello")
            .to(recipients[0].public_identity())
            .to(recipients[1].public_identity())
            .cc(recipients[2].public_identity());
        let envelope = crypto.seal(&sender, request).unwrap();
        assert!(crypto.verify(&envelope));
        assert!(envelope.body().cc_public_keys.is_some());
        assert!(envelope.is_multi_recipient());

        let tampered = |edit: &dyn Fn(&mut EnvelopeBody)| {
            let (mut body, signature) = envelope.clone().into_parts();
            edit(&mut body);
            Envelope::from_parts(body, signature)
        };

        let edits: Vec<Box<dyn Fn(&mut EnvelopeBody)>> = vec![
            Box::new(|b: &mut EnvelopeBody| b.id.push('!')),
            Box::new(|b: &mut EnvelopeBody| b.from_public_key[0] ^= 1),
            Box::new(|b: &mut EnvelopeBody| b.to_public_keys[1][5] ^= 1),
            Box::new(|b: &mut EnvelopeBody| b.payload_type = PayloadType::Post),
            Box::new(|b: &mut EnvelopeBody| b.encrypted_payload[0] ^= 1),
            Box::new(|b: &mut EnvelopeBody| b.payload_size = 6),
            Box::new(|b: &mut EnvelopeBody| b.nonce.0[11] ^= 1),
            Box::new(|b: &mut EnvelopeBody| b.timestamp -= 1),
            Box::new(|b: &mut EnvelopeBody| b.expires_at = Some(0)),
            Box::new(|b: &mut EnvelopeBody| {
                if let KeyMaterial::Multi { recipient_keys } = &mut b.key_material {
                    let wrapped = recipient_keys.values_mut().next().unwrap();
                    wrapped.encrypted_key[3] ^= 1;
                }
            }),
            Box::new(|b: &mut EnvelopeBody| {
                if let KeyMaterial::Multi { recipient_keys } = &mut b.key_material {
                    let wrapped = recipient_keys.values_mut().next().unwrap();
                    wrapped.ephemeral_public_key[0] ^= 1;
                }
            }),
            Box::new(|b: &mut EnvelopeBody| {
                if let Some(cc) = &mut b.cc_public_keys {
                    cc[0][31] ^= 1;
                }
            }),
            Box::new(|b: &mut EnvelopeBody| {
                // Re-key one wrapped entry under a fingerprint one hex digit off
                if let KeyMaterial::Multi { recipient_keys } = &mut b.key_material {
                    let fingerprint = recipient_keys.keys().next().unwrap().clone();
                    let wrapped = recipient_keys.remove(&fingerprint).unwrap();
                    let first = if fingerprint.starts_with('0') { '1' } else { '0' };
                    recipient_keys.insert(format!("{}{}", first, &fingerprint[1..]), wrapped);
                }
            }),
        ];
        for edit in &edits {
            assert!(!crypto.verify(&tampered(edit.as_ref())));
        }

        let (body, signature) = envelope.clone().into_parts();
        let mut bad_sig = signature;
        bad_sig.0[0] ^= 1;
        assert!(!crypto.verify(&Envelope::from_parts(body, bad_sig)));
    }

    #[test]
    fn test_open_rejects_unsigned_tampering() {
        let crypto = EnvelopeCrypto::default();
        let sender = DualKeyIdentity::generate();
        let r = DualKeyIdentity::generate();
        let envelope = hello_for(&sender, &[&r]);

        let (mut body, signature) = envelope.into_parts();
        body.encrypted_payload[0] ^= 1;
        let tampered = Envelope::from_parts(body, signature);

        assert!(matches!(crypto.open(&tampered, &r), Err(Error::VerificationFailed)));
        // Without the signature check the AEAD tag still catches it
        assert!(matches!(
            crypto.decrypt(tampered.body(), &r),
            Err(Error::DecryptionFailed)
        ));
    }

    #[test]
    fn test_low_order_ephemeral_key_is_decryption_failure() {
        let crypto = EnvelopeCrypto::default();
        let sender = DualKeyIdentity::generate();
        let r = DualKeyIdentity::generate();
        let envelope = hello_for(&sender, &[&r]);

        let forged = resign(&crypto, &sender, &envelope, |b| {
            b.key_material = KeyMaterial::Single {
                ephemeral_public_key: [0u8; 32],
            };
        });
        assert!(matches!(crypto.open(&forged, &r), Err(Error::DecryptionFailed)));
    }

    #[test]
    fn test_wrapped_key_moved_to_other_fingerprint_fails() {
        let crypto = EnvelopeCrypto::default();
        let sender = DualKeyIdentity::generate();
        let a = DualKeyIdentity::generate();
        let b = DualKeyIdentity::generate();
        let envelope = hello_for(&sender, &[&a, &b]);

        let forged = resign(&crypto, &sender, &envelope, |body| {
            if let KeyMaterial::Multi { recipient_keys } = &mut body.key_material {
                let a_wrap = recipient_keys[&a.encryption_fingerprint()].clone();
                recipient_keys.insert(b.encryption_fingerprint(), a_wrap);
            }
        });
        assert!(matches!(crypto.open(&forged, &b), Err(Error::DecryptionFailed)));
        assert_eq!(crypto.open(&forged, &a).unwrap(), b"hello");
    }

    #[test]
    fn test_payload_size_is_advisory_by_default() {
        let crypto = EnvelopeCrypto::default();
        let sender = DualKeyIdentity::generate();
        let r = DualKeyIdentity::generate();
        let envelope = hello_for(&sender, &[&r]);

        let lying = resign(&crypto, &sender, &envelope, |b| b.payload_size = u64::MAX);
        assert_eq!(crypto.open(&lying, &r).unwrap(), b"hello");

        let strict = EnvelopeCrypto::new(EnvelopeConfig {
            strict_payload_size: true,
            ..EnvelopeConfig::default()
        });
        assert!(matches!(
            strict.open(&lying, &r),
            Err(Error::PayloadSizeMismatch { declared: u64::MAX, actual: 5 })
        ));
        assert_eq!(strict.open(&envelope, &r).unwrap(), b"hello");
    }

    #[test]
    fn test_expiry() {
        let sender = DualKeyIdentity::generate();
        let r = DualKeyIdentity::generate();
        let request = SealRequest::new(PayloadType::Call, b"ring")
            .to(r.public_identity())
            .expires_at(1_000);

        let crypto = EnvelopeCrypto::default();
        let envelope = crypto.seal(&sender, request).unwrap();
        assert!(matches!(crypto.open(&envelope, &r), Err(Error::Expired(1_000))));

        let lenient = EnvelopeCrypto::new(EnvelopeConfig {
            reject_expired: false,
            ..EnvelopeConfig::default()
        });
        assert_eq!(lenient.open(&envelope, &r).unwrap(), b"ring");
    }

    #[test]
    fn test_unsigned_expiry_reports_verification_failure() {
        let crypto = EnvelopeCrypto::default();
        let sender = DualKeyIdentity::generate();
        let r = DualKeyIdentity::generate();
        let (mut body, signature) = hello_for(&sender, &[&r]).into_parts();
        body.expires_at = Some(1_000);

        let forged = Envelope::from_parts(body, signature);
        assert!(matches!(crypto.open(&forged, &r), Err(Error::VerificationFailed)));
    }

    #[test]
    fn test_open_rejects_unknown_version() {
        let crypto = EnvelopeCrypto::default();
        let sender = DualKeyIdentity::generate();
        let r = DualKeyIdentity::generate();
        let (mut body, signature) = hello_for(&sender, &[&r]).into_parts();
        body.version = 99;

        let envelope = Envelope::from_parts(body, signature);
        assert!(matches!(
            crypto.open(&envelope, &r),
            Err(Error::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn test_json_round_trip_then_open() {
        let crypto = EnvelopeCrypto::default();
        let sender = DualKeyIdentity::generate();
        let a = DualKeyIdentity::generate();
        let b = DualKeyIdentity::generate();

        for envelope in [hello_for(&sender, &[&a]), hello_for(&sender, &[&a, &b])] {
            let json = envelope.to_json().unwrap();
            let parsed = Envelope::from_json(&json).unwrap();
            assert!(crypto.verify(&parsed));
            assert_eq!(crypto.open(&parsed, &a).unwrap(), b"hello");
        }
    }

    #[test]
    fn test_base64_producer_still_verifies() {
        let crypto = EnvelopeCrypto::default();
        let sender = DualKeyIdentity::generate();
        let r = DualKeyIdentity::generate();
        let envelope = hello_for(&sender, &[&r]);

        let mut value: serde_json::Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();
        value["signature"] = serde_json::json!(encode_base64(envelope.signature().as_bytes()));
        value["fromPublicKey"] = serde_json::json!(encode_base64(&sender.signing_public_key()));
        value["toPublicKeys"] = serde_json::json!([encode_base64(&r.signing_public_key())]);

        let parsed = Envelope::from_json(&value.to_string()).unwrap();
        assert!(crypto.verify(&parsed));
        assert_eq!(crypto.open(&parsed, &r).unwrap(), b"hello");
    }

    #[test]
    fn test_verify_detached_hex_and_base64() {
        let crypto = EnvelopeCrypto::default();
        let id = DualKeyIdentity::generate();
        let signature = id.sign(b"detached message");

        let pk_hex = hex::encode(id.signing_public_key());
        let pk_b64 = encode_base64(&id.signing_public_key());
        let sig_hex = signature.to_hex();
        let sig_b64 = encode_base64(signature.as_bytes());

        for sig in [&sig_hex, &sig_b64] {
            for pk in [&pk_hex, &pk_b64] {
                assert!(crypto.verify_detached(b"detached message", sig, pk));
                assert!(!crypto.verify_detached(b"other message", sig, pk));
            }
        }

        assert!(!crypto.verify_detached(b"detached message", "not a signature", &pk_hex));
        assert!(!crypto.verify_detached(b"detached message", &sig_hex, &pk_hex[..62]));
        assert!(!crypto.verify_detached(b"detached message", &sig_hex.to_uppercase(), &pk_hex));
    }

    #[test]
    fn test_concurrent_use() {
        let crypto = EnvelopeCrypto::default();
        let sender = DualKeyIdentity::generate();
        let recipients: Vec<DualKeyIdentity> = (0..4).map(|_| DualKeyIdentity::generate()).collect();

        std::thread::scope(|scope| {
            for recipient in &recipients {
                let crypto = &crypto;
                let sender = &sender;
                scope.spawn(move || {
                    for i in 0..8u8 {
                        let plaintext = vec![i; 64];
                        let request = SealRequest::new(PayloadType::Chat, &plaintext)
                            .to(recipient.public_identity());
                        let envelope = crypto.seal(sender, request).unwrap();
                        assert_eq!(crypto.open(&envelope, recipient).unwrap(), plaintext);
                    }
                });
            }
        });
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_seal_open_round_trip(
            plaintext in proptest::collection::vec(any::<u8>(), 0..512),
            recipient_count in 1usize..5,
        ) {
            let crypto = EnvelopeCrypto::default();
            let sender = DualKeyIdentity::generate();
            let recipients: Vec<DualKeyIdentity> =
                (0..recipient_count).map(|_| DualKeyIdentity::generate()).collect();

            let request = recipients.iter().fold(
                SealRequest::new(PayloadType::Post, &plaintext),
                |req, r| req.to(r.public_identity()),
            );
            let envelope = crypto.seal(&sender, request).unwrap();

            prop_assert_eq!(envelope.is_multi_recipient(), recipient_count > 1);
            prop_assert!(crypto.verify(&envelope));
            for r in &recipients {
                prop_assert_eq!(crypto.open(&envelope, r).unwrap(), plaintext.clone());
            }

            let outsider = DualKeyIdentity::generate();
            prop_assert!(crypto.open(&envelope, &outsider).unwrap_err().is_crypto_failure());
        }
    }
}
