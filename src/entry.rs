//! Entry envelope - the unit of storage
//!
//! Every persisted value is wrapped in an [`Entry`] carrying its creation
//! time, the schema version it was written under, an optional expiry and a
//! flag telling whether the payload is base64-encoded JSON text.
//!
//! Wire format (JSON):
//! `{"value": .., "timestamp": ms, "version": "1.0", "expires": ms, "compressed": true}`
//! where `expires` and `compressed` are omitted when unset.

use crate::{Error, Result};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope persisted for one logical key in one tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Payload, or a base64 string of its JSON text when `is_compressed` is set
    pub value: Value,
    /// Creation time, epoch millis
    pub timestamp: i64,
    #[serde(rename = "version")]
    pub schema_version: String,
    /// Expiry, epoch millis
    #[serde(rename = "expires", default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(rename = "compressed", default, skip_serializing_if = "is_false")]
    pub is_compressed: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Outcome of validating a raw stored string against the current clock and
/// schema version.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryState {
    /// Entry is usable; carries the decoded payload
    Live(Value),
    /// `expires` has passed
    Expired,
    /// Written under a different schema version
    VersionMismatch { found: String },
    /// Not parseable as an entry, or the encoded payload fails to decode
    Corrupt(String),
}

impl Entry {
    /// Wrap a payload created at `now` under `schema_version`.
    pub fn new(value: Value, now: i64, schema_version: impl Into<String>) -> Self {
        Self {
            value,
            timestamp: now,
            schema_version: schema_version.into(),
            expires_at: None,
            is_compressed: false,
        }
    }

    pub fn with_expiry(mut self, expires_at: i64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| now > at)
    }

    /// Replace the payload with its encoded form. No-op if already encoded.
    pub fn compress(mut self) -> Result<Self> {
        if !self.is_compressed {
            self.value = Value::String(encode_payload(&self.value)?);
            self.is_compressed = true;
        }
        Ok(self)
    }

    /// The payload as the caller originally stored it.
    pub fn decoded_value(&self) -> Result<Value> {
        if !self.is_compressed {
            return Ok(self.value.clone());
        }
        match &self.value {
            Value::String(encoded) => decode_payload(encoded),
            other => Err(Error::Decode(format!(
                "compressed payload is not a string: {}",
                json_type(other)
            ))),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Classify a raw stored string. Expiry is checked before the version so
    /// a sweep can recognise stale entries from any schema.
    pub fn validate(raw: &str, now: i64, schema_version: &str) -> EntryState {
        let entry = match Self::parse(raw) {
            Ok(entry) => entry,
            Err(e) => return EntryState::Corrupt(e.to_string()),
        };

        if entry.is_expired(now) {
            return EntryState::Expired;
        }

        if entry.schema_version != schema_version {
            return EntryState::VersionMismatch { found: entry.schema_version };
        }

        match entry.decoded_value() {
            Ok(value) => EntryState::Live(value),
            Err(e) => EntryState::Corrupt(e.to_string()),
        }
    }
}

/// Encode a JSON value as base64 over its JSON text.
pub fn encode_payload(value: &Value) -> Result<String> {
    let text = serde_json::to_string(value)?;
    Ok(STANDARD.encode(text))
}

/// Inverse of [`encode_payload`].
pub fn decode_payload(encoded: &str) -> Result<Value> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| Error::Decode(format!("invalid base64: {}", e)))?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
