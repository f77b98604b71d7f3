//! X25519 key exchange.

use rand::rngs::OsRng;
use x25519_dalek::{EphemeralSecret, PublicKey as X25519PublicKey};
use zeroize::ZeroizeOnDrop;

use crate::crypto::keys::{key_from_slice, EncryptionKeyPair};
use crate::error::{Error, Result};

/// A shared secret derived from X25519 key exchange
///
/// Only ever fed into HKDF, never used as a key directly.
#[derive(ZeroizeOnDrop)]
pub struct SharedSecret {
    bytes: [u8; 32],
}

impl SharedSecret {
    pub(crate) fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

/// Perform Diffie-Hellman between a local keypair and a remote public key
///
/// Both sides compute the same secret:
/// - Alice: alice_secret × bob_public
/// - Bob: bob_secret × alice_public
///
/// A non-contributory result (low-order remote point, all-zero output) is
/// rejected with [`Error::KeyExchangeFailed`].
pub fn shared_secret(local: &EncryptionKeyPair, remote_public: &[u8; 32]) -> Result<SharedSecret> {
    let remote = X25519PublicKey::from(*remote_public);
    let shared = local.static_secret().diffie_hellman(&remote);
    if !shared.was_contributory() {
        tracing::warn!("rejected non-contributory X25519 exchange");
        return Err(Error::KeyExchangeFailed);
    }
    Ok(SharedSecret {
        bytes: shared.to_bytes(),
    })
}

/// [`shared_secret`] over raw slices, validating both lengths first
pub fn shared_secret_from_slices(local_private: &[u8], remote_public: &[u8]) -> Result<SharedSecret> {
    let local = EncryptionKeyPair::from_slice(local_private)?;
    let remote = key_from_slice(remote_public, "x25519 public")?;
    shared_secret(&local, &remote)
}

/// A single-use X25519 keypair
///
/// The secret half is consumed by [`Ephemeral::diffie_hellman`], so it cannot
/// be used twice or persisted.
pub struct Ephemeral {
    secret: EphemeralSecret,
    public: [u8; 32],
}

impl Ephemeral {
    /// Generate a fresh ephemeral keypair from the OS generator
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random_from_rng(OsRng);
        let public = X25519PublicKey::from(&secret).to_bytes();
        Self { secret, public }
    }

    /// Public half, to be carried in the envelope
    pub fn public_bytes(&self) -> [u8; 32] {
        self.public
    }

    /// Consume the secret half against a recipient's public key
    pub fn diffie_hellman(self, remote_public: &[u8; 32]) -> Result<SharedSecret> {
        let remote = X25519PublicKey::from(*remote_public);
        let shared = self.secret.diffie_hellman(&remote);
        if !shared.was_contributory() {
            tracing::warn!("rejected non-contributory X25519 exchange");
            return Err(Error::KeyExchangeFailed);
        }
        Ok(SharedSecret {
            bytes: shared.to_bytes(),
        })
    }
}
