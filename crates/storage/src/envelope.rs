//! Percent-encoded JSON envelope stored as a cookie value.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{de::DeserializeOwned, Serialize};
use shared::error::EnvelopeError;

/// Everything except the `encodeURIComponent` unreserved marks is escaped.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn encode_envelope<T: Serialize>(value: &T) -> Result<String, EnvelopeError> {
    let json = serde_json::to_string(value)?;
    Ok(utf8_percent_encode(&json, URI_COMPONENT).to_string())
}

pub fn decode_envelope<T: DeserializeOwned>(raw: &str) -> Result<T, EnvelopeError> {
    check_escapes(raw)?;
    let json = percent_decode_str(raw).decode_utf8()?;
    Ok(serde_json::from_str(&json)?)
}

// percent_decode passes stray '%' through; reject them instead.
fn check_escapes(raw: &str) -> Result<(), EnvelopeError> {
    let bytes = raw.as_bytes();
    let mut offset = 0;
    while offset < bytes.len() {
        if bytes[offset] != b'%' {
            offset += 1;
            continue;
        }
        let valid = bytes
            .get(offset + 1..offset + 3)
            .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if !valid {
            return Err(EnvelopeError::MalformedEscape { offset });
        }
        offset += 3;
    }
    Ok(())
}
