//! # Key Derivation Functions
//!
//! HKDF-SHA256 expansion of X25519 shared secrets into AEAD keys.
//!
//! ## Exchange Binding
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    SHARED SECRET → AEAD KEY                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  HKDF-SHA256(                                                          │
//! │    salt = (empty),                                                     │
//! │    ikm  = X25519(ephemeral, recipient),                                │
//! │    info = domain_tag || ephemeral_public || recipient_public           │
//! │  ) → 32-byte ChaCha20-Poly1305 key                                     │
//! │                                                                         │
//! │  The order of the two public keys is fixed. Encrypt and decrypt must   │
//! │  build `info` identically or the AEAD tag will not verify.             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Considerations
//!
//! | Aspect | Design Choice |
//! |--------|---------------|
//! | KDF Algorithm | HKDF-SHA256 |
//! | Key Separation | Different domain tags per purpose |
//! | Exchange Binding | Both public keys in `info` |
//! | Version String | "-v1" suffix |

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::crypto::aead::{SymmetricKey, KEY_SIZE};
use crate::crypto::exchange::SharedSecret;
use crate::error::{Error, Result};

/// Domain separation strings for HKDF
pub mod domain {
    /// Single-recipient payload key
    pub const PAYLOAD: &[u8] = b"umbra-envelope-payload-v1";

    /// Multi-recipient content-key wrap
    pub const KEY_WRAP: &[u8] = b"umbra-envelope-key-wrap-v1";

    /// Hierarchical derived signing keys
    pub const DERIVED_KEY: &[u8] = b"umbra-derived-key-v1";
}

/// Build `domain || ephemeral_public || recipient_public`
pub fn exchange_info(
    domain: &[u8],
    ephemeral_public: &[u8; 32],
    recipient_public: &[u8; 32],
) -> Vec<u8> {
    let mut info = Vec::with_capacity(domain.len() + 64);
    info.extend_from_slice(domain);
    info.extend_from_slice(ephemeral_public);
    info.extend_from_slice(recipient_public);
    info
}

/// Derive the AEAD key for one (ephemeral, recipient) exchange
pub fn derive_key(
    shared: &SharedSecret,
    domain: &[u8],
    ephemeral_public: &[u8; 32],
    recipient_public: &[u8; 32],
) -> Result<SymmetricKey> {
    let info = exchange_info(domain, ephemeral_public, recipient_public);
    let hkdf = Hkdf::<Sha256>::new(None, shared.as_bytes());

    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    hkdf.expand(&info, key.as_mut_slice())
        .map_err(|_| Error::KeyDerivationFailed("HKDF expansion failed".into()))?;

    Ok(SymmetricKey::from_bytes(*key))
}

/// Derive a 32-byte seed for a child key under `path`
///
/// `info = domain::DERIVED_KEY || path`, keyed by the root seed.
pub fn derive_child_seed(root_seed: &[u8; 32], path: &str) -> Result<Zeroizing<[u8; 32]>> {
    let hkdf = Hkdf::<Sha256>::new(None, root_seed);

    let mut info = Vec::with_capacity(domain::DERIVED_KEY.len() + path.len());
    info.extend_from_slice(domain::DERIVED_KEY);
    info.extend_from_slice(path.as_bytes());

    let mut seed = Zeroizing::new([0u8; 32]);
    hkdf.expand(&info, seed.as_mut_slice())
        .map_err(|_| Error::KeyDerivationFailed(format!("Failed to derive child key for '{}'", path)))?;
    Ok(seed)
}

// ============================================================================
// TESTS
// ============================================================================
