//! # Umbra Envelope
//!
//! Signed, end-to-end encrypted envelopes for one or many recipients.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       UMBRA ENVELOPE MODULES                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │                     ┌──────────────────────────┐                        │
//! │                     │      EnvelopeCrypto      │                        │
//! │                     │                          │                        │
//! │                     │ - seal / open            │                        │
//! │                     │ - encrypt (1 or N)       │                        │
//! │                     │ - sign / verify          │                        │
//! │                     └────────────┬─────────────┘                        │
//! │          ┌───────────────┬───────┴───────┬────────────────┐            │
//! │          ▼               ▼               ▼                ▼            │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────┐ ┌──────────────┐      │
//! │  │  Identity   │ │   Crypto    │ │  Canonical  │ │    Format    │      │
//! │  │             │ │             │ │             │ │              │      │
//! │  │ - Dual keys │ │ - X25519    │ │ - Sorted    │ │ - hex        │      │
//! │  │ - DID       │ │ - HKDF      │ │   keys      │ │ - base64     │      │
//! │  │ - Derived   │ │ - ChaCha20  │ │ - Integral  │ │ - classify   │      │
//! │  │   keys      │ │ - Ed25519   │ │   numbers   │ │   by length  │      │
//! │  └─────────────┘ └─────────────┘ └─────────────┘ └──────────────┘      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types and their categories
//! - [`config`] - Limits and checks applied when sealing and opening
//! - [`canonical`] - Deterministic JSON bytes for signing
//! - [`crypto`] - Primitives (AEAD, key exchange, KDF, signatures)
//! - [`format`] - Hex / base64 detection and decoding
//! - [`identity`] - Dual-key identities, DIDs, derived keys
//! - [`envelope`] - The envelope record and [`EnvelopeCrypto`]
//!
//! ## Security Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SECURITY LAYERS                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Confidentiality (X25519 + HKDF-SHA256 + ChaCha20-Poly1305)            │
//! │  ──────────────────────────────────────────────────────────             │
//! │  Every envelope uses a fresh ephemeral key. Compromise of the          │
//! │  sender's long-term keys does not expose past envelopes.               │
//! │                                                                         │
//! │  Authenticity (Ed25519 over SHA-256 of canonical bytes)                │
//! │  ───────────────────────────────────────────────────────                │
//! │  The sender signs a fixed projection of every envelope field.          │
//! │  Any single-byte change is rejected.                                   │
//! │                                                                         │
//! │  Key separation                                                        │
//! │  ──────────────                                                         │
//! │  Signing and encryption keys are independent. HKDF info strings are    │
//! │  domain-tagged per use.                                                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use umbra_envelope::{DualKeyIdentity, EnvelopeCrypto, PayloadType, SealRequest};
//!
//! let crypto = EnvelopeCrypto::default();
//! let alice = DualKeyIdentity::generate();
//! let bob = DualKeyIdentity::generate();
//!
//! let request = SealRequest::new(PayloadType::Chat, b"hello").to(bob.public_identity());
//! let envelope = crypto.seal(&alice, request).unwrap();
//!
//! assert_eq!(crypto.open(&envelope, &bob).unwrap(), b"hello");
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod canonical;
pub mod config;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod format;
pub mod identity;
/// Wall-clock helpers.
pub mod time;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use config::EnvelopeConfig;
pub use crypto::{Nonce, Signature};
pub use envelope::{
    EncryptedPayload, Envelope, EnvelopeBody, EnvelopeCrypto, KeyMaterial, PayloadType,
    SealRequest, WrappedKey, ENVELOPE_PROTOCOL_VERSION,
};
pub use error::{Error, ErrorCategory, Result};
pub use identity::{Did, DualKeyIdentity, PublicIdentity};

/// Returns the version of this crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Get build information
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        protocol_version: ENVELOPE_PROTOCOL_VERSION,
        profile: if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        },
    }
}

/// Build information for debugging
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Crate version
    pub version: &'static str,
    /// Envelope protocol version this build writes
    pub protocol_version: u32,
    /// Build profile (debug/release)
    pub profile: &'static str,
}

// ============================================================================
// TESTS
// ============================================================================
