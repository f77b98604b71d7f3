//! # Format Adapter
//!
//! Counterparties do not agree on how to spell bytes: some send lowercase
//! hex, some standard base64. Every fixed-length field goes through one
//! classify-then-decode step here instead of ad hoc checks at each call site.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CLASSIFICATION BY EXPECTED LENGTH                    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  decoded len │ hex shape              │ base64 shape (padded)          │
//! │  ────────────┼────────────────────────┼──────────────────────────────  │
//! │       12     │ [0-9a-f]{24}           │ 16 chars                       │
//! │       32     │ [0-9a-f]{64}           │ 44 chars                       │
//! │       64     │ [0-9a-f]{128}          │ 88 chars                       │
//! │                                                                         │
//! │  The two shapes never share a length, so classification is exact.      │
//! │  Anything else is `AmbiguousEncoding` (malformed input).               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::crypto::{Nonce, Signature, NONCE_SIZE, PUBLIC_KEY_SIZE, SIGNATURE_SIZE};
use crate::error::{Error, Result};

/// How a field was spelled on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Lowercase hexadecimal
    Hex,
    /// Standard base64 with padding
    Base64,
}

/// Length of the padded base64 form of `n` bytes
fn base64_len(n: usize) -> usize {
    n.div_ceil(3) * 4
}

fn is_lower_hex(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Decide which encoding `input` uses for a value of `expected_len` bytes
///
/// Pure: looks only at the shape of the string.
pub fn classify(input: &str, expected_len: usize, field: &'static str) -> Result<Encoding> {
    if input.len() == expected_len * 2 && is_lower_hex(input) {
        return Ok(Encoding::Hex);
    }
    if input.len() == base64_len(expected_len) {
        return Ok(Encoding::Base64);
    }
    Err(Error::AmbiguousEncoding {
        field,
        expected_len,
    })
}

/// Classify, decode, and check the decoded length
pub fn decode_fixed(input: &str, expected_len: usize, field: &'static str) -> Result<Vec<u8>> {
    let bytes = match classify(input, expected_len, field)? {
        Encoding::Hex => hex::decode(input).map_err(|e| Error::InvalidEncoding {
            field,
            reason: e.to_string(),
        })?,
        Encoding::Base64 => BASE64.decode(input).map_err(|e| Error::InvalidEncoding {
            field,
            reason: e.to_string(),
        })?,
    };

    if bytes.len() != expected_len {
        // base64 of the right width can still carry fewer bytes via padding
        return Err(Error::AmbiguousEncoding {
            field,
            expected_len,
        });
    }
    Ok(bytes)
}

/// Decode a 32-byte public key (Ed25519 or X25519) from hex or base64
pub fn decode_public_key(input: &str, field: &'static str) -> Result<[u8; PUBLIC_KEY_SIZE]> {
    let bytes = decode_fixed(input, PUBLIC_KEY_SIZE, field)?;
    bytes.try_into().map_err(|v: Vec<u8>| Error::InvalidKeyLength {
        what: field,
        expected: PUBLIC_KEY_SIZE,
        actual: v.len(),
    })
}

/// Decode a 64-byte signature from hex or base64
pub fn decode_signature(input: &str) -> Result<Signature> {
    let bytes = decode_fixed(input, SIGNATURE_SIZE, "signature")?;
    Signature::from_slice(&bytes)
}

/// Decode a 12-byte nonce from hex or base64
pub fn decode_nonce(input: &str, field: &'static str) -> Result<Nonce> {
    let bytes = decode_fixed(input, NONCE_SIZE, field)?;
    Nonce::from_slice(&bytes)
}

/// Decode a variable-length blob (ciphertext, wrapped key); base64 only
pub fn decode_blob(input: &str, field: &'static str) -> Result<Vec<u8>> {
    BASE64.decode(input).map_err(|e| Error::InvalidEncoding {
        field,
        reason: e.to_string(),
    })
}

/// Canonical spelling of keys and signatures: lowercase hex
pub fn encode_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Canonical spelling of nonces and ciphertext: standard base64
pub fn encode_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_hex_and_base64() {
        let raw = [0xABu8; 32];
        let as_hex = hex::encode(raw);
        let as_b64 = BASE64.encode(raw);

        assert_eq!(classify(&as_hex, 32, "k").unwrap(), Encoding::Hex);
        assert_eq!(classify(&as_b64, 32, "k").unwrap(), Encoding::Base64);
    }

    #[test]
    fn test_signature_both_encodings_decode_identically() {
        let raw: Vec<u8> = (0..64).collect();
        let from_hex = decode_signature(&hex::encode(&raw)).unwrap();
        let from_b64 = decode_signature(&BASE64.encode(&raw)).unwrap();
        assert_eq!(from_hex, from_b64);
        assert_eq!(from_hex.as_bytes().as_slice(), raw.as_slice());
    }

    #[test]
    fn test_uppercase_hex_rejected() {
        let upper = hex::encode_upper([0xABu8; 32]);
        assert!(matches!(
            classify(&upper, 32, "k"),
            Err(Error::AmbiguousEncoding { field: "k", expected_len: 32 })
        ));
    }

    #[test]
    fn test_wrong_length_is_malformed_input() {
        let short = hex::encode([1u8; 31]);
        let err = decode_public_key(&short, "fromPublicKey").unwrap_err();
        assert!(err.is_malformed_input());
        assert!(!err.is_crypto_failure());
    }

    #[test]
    fn test_base64_with_bad_alphabet() {
        let bogus = "!".repeat(44);
        assert!(matches!(
            decode_public_key(&bogus, "k"),
            Err(Error::InvalidEncoding { .. })
        ));
    }

    #[test]
    fn test_nonce_decoding() {
        let raw = [5u8; 12];
        assert_eq!(decode_nonce(&hex::encode(raw), "nonce").unwrap().0, raw);
        assert_eq!(decode_nonce(&BASE64.encode(raw), "nonce").unwrap().0, raw);
        assert!(decode_nonce(&BASE64.encode([5u8; 13]), "nonce").is_err());
    }

    #[test]
    fn test_blob_round_trip() {
        let data = b"arbitrary ciphertext";
        assert_eq!(decode_blob(&encode_base64(data), "c").unwrap(), data);
        assert!(decode_blob("not base64!", "c").is_err());
    }
}
