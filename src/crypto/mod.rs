//! # Cryptography Module
//!
//! The primitives the envelope protocol is assembled from.
//!
//! ## Security Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐         ┌─────────────────┐                       │
//! │  │  Signing Key    │         │ Encryption Key  │   generated           │
//! │  │  (Ed25519)      │         │ (X25519)        │   independently       │
//! │  │                 │         │                 │                       │
//! │  │ • Address/DID   │         │ • Key Exchange  │                       │
//! │  │ • Signatures    │         │ • E2E Encryption│                       │
//! │  └─────────────────┘         └─────────────────┘                       │
//! │                                                                         │
//! │  Payload encryption                                                    │
//! │  ──────────────────                                                     │
//! │  1. exchange:  X25519(ephemeral, recipient) → shared secret           │
//! │  2. kdf:       HKDF-SHA256(secret, info = tag||eph_pub||rcpt_pub)     │
//! │  3. aead:      ChaCha20-Poly1305(key, random 96-bit nonce)            │
//! │                                                                         │
//! │  Envelope signing                                                      │
//! │  ────────────────                                                       │
//! │  signing:  Ed25519(SHA-256(canonical signable view))                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices
//!
//! | Algorithm | Purpose |
//! |-----------|---------|
//! | Ed25519 | Signing |
//! | X25519 | Key Exchange |
//! | ChaCha20-Poly1305 | Authenticated Encryption |
//! | HKDF-SHA256 | Key Derivation |
//! | SHA-256 | Signing digest, key fingerprints |
//!
//! ## Security Considerations
//!
//! 1. **Key Zeroization**: secret keys, shared secrets and AEAD keys are zeroized when dropped
//! 2. **Constant-Time Operations**: dalek and RustCrypto primitives throughout
//! 3. **Secure Random**: `rand::rngs::OsRng` per call, no shared generator state
//! 4. **Length Checks First**: every slice entry point validates sizes before use

pub mod aead;
pub mod exchange;
pub mod kdf;
mod keys;
mod signing;

pub use aead::{Nonce, SymmetricKey, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use exchange::{shared_secret, shared_secret_from_slices, Ephemeral, SharedSecret};
pub use kdf::derive_key;
pub use keys::{fingerprint, key_from_slice, EncryptionKeyPair, SigningKeyPair};
pub use signing::{digest, sign, verify, verify_slices, Signature, SIGNATURE_SIZE};

/// Size of public keys in bytes (Ed25519 and X25519 alike)
pub const PUBLIC_KEY_SIZE: usize = 32;
