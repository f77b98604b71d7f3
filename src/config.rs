//! Configuration for [`EnvelopeCrypto`](crate::EnvelopeCrypto).

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default maximum plaintext size (1 MiB)
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

/// Default maximum number of recipients (to + cc)
pub const DEFAULT_MAX_RECIPIENTS: usize = 256;

/// Tunables for sealing and opening envelopes
///
/// Every field has a default, so a partial JSON document is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnvelopeConfig {
    /// Plaintexts larger than this are rejected before encryption
    pub max_payload_size: usize,
    /// Upper bound on to + cc recipients
    pub max_recipients: usize,
    /// Check decrypted length against the declared `payloadSize` on open
    pub strict_payload_size: bool,
    /// Refuse to open envelopes past their `expiresAt`
    pub reject_expired: bool,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            max_recipients: DEFAULT_MAX_RECIPIENTS,
            strict_payload_size: false,
            reject_expired: true,
        }
    }
}

impl EnvelopeConfig {
    /// Load from a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
