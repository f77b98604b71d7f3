//! # Canonical Encoding
//!
//! Deterministic JSON bytes for anything that gets hashed or signed.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       CANONICAL FORM RULES                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  1. Object keys sorted lexicographically, at every nesting level       │
//! │  2. No insignificant whitespace                                        │
//! │  3. Integral numbers never carry a decimal point:                      │
//! │        70  and  70.0  both encode as  70                               │
//! │  4. Non-integral numbers keep full (shortest round-trip) precision     │
//! │  5. Object members whose value is null are omitted entirely            │
//! │        {"a":1,"b":null}  →  {"a":1}                                    │
//! │     (null inside an array is kept: positions are significant)          │
//! │  6. Strings use serde_json's escaping, the same rule set everywhere    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Keys compare by their UTF-8 bytes. For keys drawn from the BMP this is
//! the same order a UTF-16 sort produces; signable views only use ASCII keys.

use serde::Serialize;
use serde_json::{Number, Value};

use crate::error::Result;

/// Canonical bytes of a JSON value
///
/// Total over every [`Value`]; there is no failure case.
pub fn canonicalize(value: &Value) -> Vec<u8> {
    let mut out = Vec::with_capacity(256);
    write_value(&mut out, value);
    out
}

/// Canonical bytes of any serializable record
///
/// Fails only if `value` cannot be represented as JSON at all (for example a
/// map with non-string keys), which is a caller contract violation.
pub fn canonicalize_serializable<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let value = serde_json::to_value(value)?;
    Ok(canonicalize(&value))
}

fn write_value(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(n) => write_number(out, n),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(out, item);
            }
            out.push(b']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> =
                map.iter().filter(|(_, v)| !v.is_null()).collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

            out.push(b'{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_string(out, key);
                out.push(b':');
                write_value(out, item);
            }
            out.push(b'}');
        }
    }
}

fn write_number(out: &mut Vec<u8>, n: &Number) {
    if let Some(i) = n.as_i64() {
        out.extend_from_slice(i.to_string().as_bytes());
    } else if let Some(u) = n.as_u64() {
        out.extend_from_slice(u.to_string().as_bytes());
    } else if let Some(f) = n.as_f64() {
        if f == 0.0 {
            // -0.0 included
            out.push(b'0');
        } else if f.fract() == 0.0 {
            // Exact integer digits at any magnitude, never exponent form
            out.extend_from_slice(format!("{:.0}", f).as_bytes());
        } else {
            out.extend_from_slice(n.to_string().as_bytes());
        }
    }
}

fn write_string(out: &mut Vec<u8>, s: &str) {
    // serde_json only fails on writer errors, which a Vec never produces
    serde_json::to_writer(&mut *out, s).ok();
}

// ============================================================================
// TESTS
// ============================================================================
