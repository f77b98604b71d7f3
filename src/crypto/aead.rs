//! # Authenticated Encryption
//!
//! ChaCha20-Poly1305 with a 32-byte key and a 12-byte nonce.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SEALED PAYLOAD LAYOUT                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   ┌──────────────────────────────────────┬──────────────────────┐      │
//! │   │ ciphertext (len = plaintext len)     │ tag (16 bytes)       │      │
//! │   └──────────────────────────────────────┴──────────────────────┘      │
//! │                                                                         │
//! │   The nonce travels separately (envelope `nonce` / wrapped-key         │
//! │   `nonce`). On decrypt the tag is split off by fixed-length slicing.   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A tag mismatch is a hard failure. No partial plaintext is ever returned.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce as ChaChaNonce,
};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

/// Size of the ChaCha20-Poly1305 nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of the Poly1305 authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// Size of the symmetric key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// A 96-bit AEAD nonce
///
/// Always drawn fresh from the OS generator. Every key in this protocol is
/// either derived per message (ephemeral exchange) or generated per message
/// (multi-recipient content key), so a random nonce is never repeated under
/// the same key in practice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Nonce(pub [u8; NONCE_SIZE]);

impl Nonce {
    /// Generate a cryptographically random nonce
    pub fn random() -> Self {
        let mut bytes = [0u8; NONCE_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from existing bytes
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, rejecting anything that is not 12 bytes
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        let bytes: [u8; NONCE_SIZE] = slice.try_into().map_err(|_| Error::InvalidNonceLength {
            expected: NONCE_SIZE,
            actual: slice.len(),
        })?;
        Ok(Self(bytes))
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// A 256-bit ChaCha20-Poly1305 key
///
/// Zeroized when dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; KEY_SIZE]);

impl SymmetricKey {
    /// Generate a random key from the OS generator
    pub fn random() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, rejecting anything that is not 32 bytes
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        let bytes: [u8; KEY_SIZE] = slice.try_into().map_err(|_| Error::InvalidKeyLength {
            what: "symmetric",
            expected: KEY_SIZE,
            actual: slice.len(),
        })?;
        Ok(Self(bytes))
    }

    /// Borrow the raw key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

/// Encrypt `plaintext` under `key` and `nonce`
///
/// Returns `ciphertext || tag`.
pub fn encrypt(key: &SymmetricKey, nonce: &Nonce, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key.0));
    cipher
        .encrypt(ChaChaNonce::from_slice(&nonce.0), plaintext)
        .map_err(|_| {
            tracing::warn!(len = plaintext.len(), "AEAD encryption rejected input");
            Error::EncryptionFailed
        })
}

/// Encrypt under a freshly generated nonce
///
/// Returns `(nonce, ciphertext || tag)`.
pub fn seal(key: &SymmetricKey, plaintext: &[u8]) -> Result<(Nonce, Vec<u8>)> {
    let nonce = Nonce::random();
    let sealed = encrypt(key, &nonce, plaintext)?;
    Ok((nonce, sealed))
}

/// Split `ciphertext || tag` into its two parts
///
/// Fails with [`Error::CiphertextTooShort`] if fewer than [`TAG_SIZE`] bytes
/// are present.
pub fn split_tag(sealed: &[u8]) -> Result<(&[u8], &[u8; TAG_SIZE])> {
    if sealed.len() < TAG_SIZE {
        return Err(Error::CiphertextTooShort(sealed.len()));
    }
    let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_SIZE);
    let tag: &[u8; TAG_SIZE] = tag
        .try_into()
        .map_err(|_| Error::CiphertextTooShort(sealed.len()))?;
    Ok((ciphertext, tag))
}

/// Decrypt `ciphertext || tag` under `key` and `nonce`
///
/// The length check runs before the cipher is touched; the output buffer is
/// sized from the actual ciphertext, never from any declared length.
pub fn decrypt(key: &SymmetricKey, nonce: &Nonce, sealed: &[u8]) -> Result<Vec<u8>> {
    let (ciphertext, _tag) = split_tag(sealed)?;

    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key.0));
    let plaintext = cipher
        .decrypt(ChaChaNonce::from_slice(&nonce.0), sealed)
        .map_err(|_| {
            tracing::debug!(len = sealed.len(), "AEAD tag mismatch");
            Error::DecryptionFailed
        })?;

    debug_assert_eq!(plaintext.len(), ciphertext.len());
    Ok(plaintext)
}

// ============================================================================
// TESTS
// ============================================================================
