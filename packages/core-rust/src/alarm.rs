//! Alarm data model: `AlarmInfo`, content-equality, and token encoding.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// One `(rule-label, value-string)` pair in an alarm's description list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmDescription {
    pub rule: String,
    pub value: String,
}

/// A single active alarm instance for one UVE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmInfo {
    #[serde(rename = "type")]
    pub alarm_type: String,
    pub severity: String,
    pub timestamp: u64,
    pub token: String,
    pub description: Vec<AlarmDescription>,
    pub acknowledged: bool,
}

impl AlarmInfo {
    /// Builds a freshly-evaluated alarm with `timestamp = 0` and `token = ""`,
    /// matching the shape `process-partition` collects `new_alarms` in before
    /// stamping (see [`AlarmInfo::stamp`]).
    #[must_use]
    pub fn unstamped(
        alarm_type: impl Into<String>,
        severity: impl Into<String>,
        description: Vec<AlarmDescription>,
    ) -> Self {
        Self {
            alarm_type: alarm_type.into(),
            severity: severity.into(),
            timestamp: 0,
            token: String::new(),
            description,
            acknowledged: false,
        }
    }

    /// Two `AlarmInfo`s are content-equal iff they agree on every field with
    /// `timestamp` and `token` forced to zero/empty.
    #[must_use]
    pub fn content_eq(&self, other: &AlarmInfo) -> bool {
        self.alarm_type == other.alarm_type
            && self.severity == other.severity
            && self.description == other.description
            && self.acknowledged == other.acknowledged
    }

    /// Stamps `timestamp` and a freshly-encoded `token`, returning a new,
    /// installable `AlarmInfo`.
    #[must_use]
    pub fn stamp(mut self, host: &str, introspect_port: u16, now_ms: u64) -> Self {
        self.timestamp = now_ms;
        self.token = encode_token(host, introspect_port, now_ms);
        self
    }
}

/// Token payload: `{host, introspect-port, timestamp}`, base64-encoded JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenPayload {
    host: String,
    #[serde(rename = "introspect-port")]
    introspect_port: u16,
    timestamp: u64,
}

/// Encodes an alarm correlation token: an opaque base64 blob of
/// `{host, introspect-port, timestamp}`, used by operators to correlate an
/// alarm instance with the issuing instance's introspection endpoint.
#[must_use]
pub fn encode_token(host: &str, introspect_port: u16, timestamp: u64) -> String {
    let payload = TokenPayload {
        host: host.to_string(),
        introspect_port,
        timestamp,
    };
    // Encoding failure would mean a programming invariant violation (a
    // non-serializable payload); there is nothing sensible to degrade to.
    let json = serde_json::to_vec(&payload).expect("token payload is always serializable");
    BASE64.encode(json)
}

/// Decodes a token produced by [`encode_token`], for introspection and tests.
///
/// # Errors
///
/// Returns an error if `token` is not valid base64, or the decoded bytes are
/// not a valid token payload.
pub fn decode_token(token: &str) -> Result<(String, u16, u64), TokenDecodeError> {
    let bytes = BASE64.decode(token)?;
    let payload: TokenPayload = serde_json::from_slice(&bytes)?;
    Ok((payload.host, payload.introspect_port, payload.timestamp))
}

/// Error decoding an alarm correlation token.
#[derive(Debug, thiserror::Error)]
pub enum TokenDecodeError {
    #[error("invalid base64 token: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("malformed token payload: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(rule: &str, value: &str) -> AlarmDescription {
        AlarmDescription {
            rule: rule.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn token_round_trips() {
        let token = encode_token("host-1", 8089, 12345);
        let (host, port, ts) = decode_token(&token).unwrap();
        assert_eq!(host, "host-1");
        assert_eq!(port, 8089);
        assert_eq!(ts, 12345);
    }

    #[test]
    fn content_eq_ignores_timestamp_and_token() {
        let a = AlarmInfo::unstamped("HighLoad", "MAJOR", vec![desc("load>threshold", "2")])
            .stamp("host-1", 8089, 100);
        let b = AlarmInfo::unstamped("HighLoad", "MAJOR", vec![desc("load>threshold", "2")])
            .stamp("host-2", 9000, 999);
        assert!(a.content_eq(&b));
    }

    #[test]
    fn content_eq_detects_severity_change() {
        let a = AlarmInfo::unstamped("HighLoad", "MAJOR", vec![desc("load>threshold", "2")]);
        let b = AlarmInfo::unstamped("HighLoad", "CRITICAL", vec![desc("load>threshold", "2")]);
        assert!(!a.content_eq(&b));
    }

    #[test]
    fn content_eq_detects_description_change() {
        let a = AlarmInfo::unstamped("HighLoad", "MAJOR", vec![desc("load>threshold", "2")]);
        let b = AlarmInfo::unstamped("HighLoad", "MAJOR", vec![desc("load>threshold", "3")]);
        assert!(!a.content_eq(&b));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_token("not valid base64 !!!").is_err());
    }
}
