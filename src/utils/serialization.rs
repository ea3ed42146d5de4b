// src/utils/serialization.rs
//! Serialization utilities for command output and wire payloads.

use crate::errors::DidError;
use serde::{de::DeserializeOwned, Serialize};

/// Serializes a value to a pretty-printed JSON string, the format every
/// document, log and key object is written to stdout in.
pub fn to_pretty_json<T: Serialize>(data: &T) -> Result<String, DidError> {
    serde_json::to_string_pretty(data).map_err(Into::into)
}

/// Deserializes a JSON response body.
///
/// Takes the body as text so that a mismatch can be reported with the
/// offending payload in the log.
pub fn deserialize<T: DeserializeOwned>(data: &str) -> Result<T, DidError> {
    serde_json::from_str(data).map_err(|e| {
        log::debug!("failed to decode response body: {data}");
        e.into()
    })
}
