//! # Error Handling
//!
//! Error types for the envelope protocol.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Malformed Input (100-199)   rejected before any primitive runs    │
//! │  │   ├── InvalidKeyLength        - key is not 32 bytes                 │
//! │  │   ├── InvalidSignatureLength  - signature is not 64 bytes           │
//! │  │   ├── InvalidNonceLength      - nonce is not 12 bytes               │
//! │  │   ├── AmbiguousEncoding       - neither hex nor base64 shape        │
//! │  │   ├── EmptyRecipients         - nobody to encrypt for               │
//! │  │   ├── MissingField            - required wire field absent          │
//! │  │   ├── InvalidKeyMaterial      - both/neither single & multi mode    │
//! │  │   ├── InvalidEnvelope         - wire record unreadable              │
//! │  │   └── ...                                                           │
//! │  │                                                                      │
//! │  ├── Cryptographic Failure (300-399)   reason is NOT disclosed         │
//! │  │   ├── DecryptionFailed        - tag mismatch / wrong key / tamper   │
//! │  │   ├── VerificationFailed      - signature rejected                  │
//! │  │   ├── KeyExchangeFailed       - non-contributory X25519 output      │
//! │  │   └── NotARecipient           - own fingerprint not in envelope     │
//! │  │                                                                      │
//! │  └── Internal (900-999)                                                │
//! │      ├── KeyDerivationFailed     - HKDF refused the output length      │
//! │      └── SerializationError      - serde failure                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cryptographic failures are deliberately terse in their `Display` output.
//! The precise internal reason is emitted through `tracing` at the failure
//! site, never returned to the caller.

use thiserror::Error;

/// Result type alias for envelope operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Input was rejected before any cryptographic primitive ran
    MalformedInput,
    /// A cryptographic check failed (reason intentionally withheld)
    CryptoFailure,
    /// Library-internal failure
    Internal,
}

/// Main error type for the envelope protocol
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Malformed Input (100-199)
    // ========================================================================

    /// A key had the wrong decoded length
    #[error("Invalid {what} key: expected {expected} bytes, got {actual}")]
    InvalidKeyLength {
        /// Which key was rejected
        what: &'static str,
        /// Required length
        expected: usize,
        /// Length actually supplied
        actual: usize,
    },

    /// A signature had the wrong decoded length
    #[error("Invalid signature: expected {expected} bytes, got {actual}")]
    InvalidSignatureLength {
        /// Required length
        expected: usize,
        /// Length actually supplied
        actual: usize,
    },

    /// A nonce had the wrong decoded length
    #[error("Invalid nonce: expected {expected} bytes, got {actual}")]
    InvalidNonceLength {
        /// Required length
        expected: usize,
        /// Length actually supplied
        actual: usize,
    },

    /// A field matched neither the hex nor the base64 shape for its length
    #[error("Field '{field}' is neither {expected_len}-byte hex nor base64")]
    AmbiguousEncoding {
        /// Field being decoded
        field: &'static str,
        /// Expected decoded length
        expected_len: usize,
    },

    /// A variable-length field was not valid base64
    #[error("Field '{field}' is not valid base64: {reason}")]
    InvalidEncoding {
        /// Field being decoded
        field: &'static str,
        /// Decoder message
        reason: String,
    },

    /// No recipients were supplied
    #[error("Recipient list is empty")]
    EmptyRecipients,

    /// Too many recipients were supplied
    #[error("Too many recipients: {count} (max {max})")]
    TooManyRecipients {
        /// Recipients supplied
        count: usize,
        /// Configured maximum
        max: usize,
    },

    /// A required field is missing
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// The envelope carries both or neither of the single/multi key material
    #[error("Invalid key material: {0}")]
    InvalidKeyMaterial(&'static str),

    /// Plaintext exceeds the configured maximum
    #[error("Payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Plaintext length
        size: usize,
        /// Configured maximum
        max: usize,
    },

    /// Ciphertext shorter than the authentication tag
    #[error("Ciphertext too short: {0} bytes")]
    CiphertextTooShort(usize),

    /// Decrypted length disagrees with the declared `payloadSize`
    #[error("Payload size mismatch: declared {declared}, actual {actual}")]
    PayloadSizeMismatch {
        /// `payloadSize` from the envelope
        declared: u64,
        /// Length of the recovered plaintext
        actual: usize,
    },

    /// Envelope uses a protocol version this build does not speak
    #[error("Unsupported envelope version: {0}")]
    UnsupportedVersion(u32),

    /// Envelope is past its `expiresAt`
    #[error("Envelope expired at {0}")]
    Expired(i64),

    /// Derivation path is empty or too long
    #[error("Invalid derivation path: {0}")]
    InvalidDerivationPath(String),

    /// Invalid DID format
    #[error("Invalid DID format: {0}")]
    InvalidDid(String),

    /// Payload type tag is not a valid lowercase tag
    #[error("Invalid payload type: {0}")]
    InvalidPayloadType(String),

    /// The same recipient key appears twice
    #[error("Duplicate recipient: {0}")]
    DuplicateRecipient(String),

    /// The wire record could not be read as an envelope
    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// `fromPublicKey` is not the signing identity's key
    #[error("Envelope sender does not match the signing identity")]
    SenderMismatch,

    // ========================================================================
    // Cryptographic Failure (300-399)
    // ========================================================================

    /// Decryption failed
    #[error("Decryption failed")]
    DecryptionFailed,

    /// Signature verification failed
    #[error("Signature verification failed")]
    VerificationFailed,

    /// Key exchange produced an unusable shared secret
    #[error("Key exchange failed")]
    KeyExchangeFailed,

    /// Local key is not among the envelope's recipients
    #[error("Not a recipient of this envelope")]
    NotARecipient,

    /// AEAD encryption failed
    #[error("Encryption failed")]
    EncryptionFailed,

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Key derivation failed
    #[error("Failed to derive key: {0}")]
    KeyDerivationFailed(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl Error {
    /// Get the numeric error code
    ///
    /// - 100-199: Malformed input
    /// - 300-399: Cryptographic failure
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            // Malformed input (100-199)
            Error::InvalidKeyLength { .. } => 100,
            Error::InvalidSignatureLength { .. } => 101,
            Error::InvalidNonceLength { .. } => 102,
            Error::AmbiguousEncoding { .. } => 103,
            Error::InvalidEncoding { .. } => 104,
            Error::EmptyRecipients => 105,
            Error::TooManyRecipients { .. } => 106,
            Error::MissingField(_) => 107,
            Error::InvalidKeyMaterial(_) => 108,
            Error::PayloadTooLarge { .. } => 109,
            Error::CiphertextTooShort(_) => 110,
            Error::PayloadSizeMismatch { .. } => 111,
            Error::UnsupportedVersion(_) => 112,
            Error::Expired(_) => 113,
            Error::InvalidDerivationPath(_) => 114,
            Error::InvalidDid(_) => 115,
            Error::InvalidPayloadType(_) => 116,
            Error::DuplicateRecipient(_) => 117,
            Error::InvalidEnvelope(_) => 118,
            Error::SenderMismatch => 119,

            // Crypto (300-399)
            Error::DecryptionFailed => 300,
            Error::VerificationFailed => 301,
            Error::KeyExchangeFailed => 302,
            Error::NotARecipient => 303,
            Error::EncryptionFailed => 304,

            // Internal (900-999)
            Error::KeyDerivationFailed(_) => 900,
            Error::SerializationError(_) => 901,
        }
    }

    /// Classify this error
    pub fn category(&self) -> ErrorCategory {
        match self.code() {
            100..=199 => ErrorCategory::MalformedInput,
            300..=399 => ErrorCategory::CryptoFailure,
            _ => ErrorCategory::Internal,
        }
    }

    /// True if the input was rejected before touching a primitive
    pub fn is_malformed_input(&self) -> bool {
        self.category() == ErrorCategory::MalformedInput
    }

    /// True if a cryptographic check failed
    pub fn is_crypto_failure(&self) -> bool {
        self.category() == ErrorCategory::CryptoFailure
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================
