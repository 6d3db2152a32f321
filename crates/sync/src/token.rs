//! Sync/cursor token codec (C1).
//!
//! A token's wire form is base64 of the UTF-8 text `"<version>:<payload>"`.
//! Two versions decode on input:
//!
//! - `1` — payload is an RFC 3339 date string.
//! - `2` — payload is a decimal number of seconds since the Unix epoch.
//!
//! Only version `2` is ever produced. Tokens are opaque: callers should
//! never inspect anything but the decoded timestamp.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::DateTime;
use itemsync_core::{Error, Result, Timestamp};
use std::fmt;

const V1_PREFIX: &str = "1:";
const V2_PREFIX: &str = "2:";

fn encode_v2(timestamp: Timestamp) -> String {
    let text = format!("{V2_PREFIX}{}", timestamp.as_secs_f64());
    BASE64.encode(text)
}

fn decode_any(token: &str) -> Result<Timestamp> {
    let decoded = BASE64
        .decode(token)
        .map_err(|e| Error::bad_token(format!("not valid base64: {e}")))?;
    let text = String::from_utf8(decoded)
        .map_err(|e| Error::bad_token(format!("not valid utf-8: {e}")))?;

    if let Some(payload) = text.strip_prefix(V2_PREFIX) {
        let secs: f64 = payload
            .parse()
            .map_err(|_| Error::bad_token(format!("v2 payload is not a number: {payload}")))?;
        Ok(Timestamp::from_secs_f64(secs))
    } else if let Some(payload) = text.strip_prefix(V1_PREFIX) {
        let parsed = DateTime::parse_from_rfc3339(payload)
            .map_err(|e| Error::bad_token(format!("v1 payload is not a date: {e}")))?;
        let micros = parsed.timestamp_micros();
        if micros < 0 {
            return Err(Error::bad_token("v1 payload predates the epoch"));
        }
        Ok(Timestamp::from_micros(micros as u64))
    } else {
        Err(Error::bad_token(
            "missing or unrecognized version prefix".to_string(),
        ))
    }
}

/// "Deliver changes strictly after this point." Returned at the end of a
/// full (non-truncated) response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncToken(String);

impl SyncToken {
    /// Encode a sync token for `timestamp`. Callers (the item service) are
    /// responsible for having already added the `+1µs` boundary offset.
    pub fn encode(timestamp: Timestamp) -> Self {
        Self(encode_v2(timestamp))
    }

    /// Wrap an already-encoded wire string, e.g. one received from a
    /// client request.
    pub fn from_wire(wire: impl Into<String>) -> Self {
        Self(wire.into())
    }

    /// Decode back to the timestamp it represents.
    pub fn decode(&self) -> Result<Timestamp> {
        decode_any(&self.0)
    }

    /// The wire string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SyncToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// "Continue delivering changes at or after this point." Returned mid
/// paginated response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorToken(String);

impl CursorToken {
    /// Encode a cursor token for `timestamp` (the last returned item's
    /// `updated_at_timestamp`, with no boundary offset).
    pub fn encode(timestamp: Timestamp) -> Self {
        Self(encode_v2(timestamp))
    }

    /// Wrap an already-encoded wire string.
    pub fn from_wire(wire: impl Into<String>) -> Self {
        Self(wire.into())
    }

    /// Decode back to the timestamp it represents.
    pub fn decode(&self) -> Result<Timestamp> {
        decode_any(&self.0)
    }

    /// The wire string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CursorToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
