// src/models/credentials.rs
//! The mutable state of an identity and the rules for changing it.
//!
//! An update to a `did:plc` identity always carries the complete desired
//! values of four fields. [`DidCredentials`] is that set of fields. The
//! `with_*` / `without_*` methods build the pending end state from the current
//! one, touching exactly one field.

use crate::errors::DidError;
use crate::wallet::key_management::normalize_key;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// URI scheme of the canonical self-identifier.
pub const AT_URI_SCHEME: &str = "at://";

/// A service entry of a `did:plc` operation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ServiceEntry {
    /// Example: "AtprotoPersonalDataServer"
    #[serde(rename = "type")]
    pub kind: String,
    /// Example: "https://pds.alice.example"
    pub endpoint: String,
}

/// Rotation keys, alternate identifiers, verification methods and services.
///
/// Matches both the provider's recommended-credentials response and the
/// body of a sign request (minus the confirmation token).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DidCredentials {
    /// `did:key` identifiers, highest priority first.
    #[serde(default)]
    pub rotation_keys: Vec<String>,
    #[serde(default)]
    pub also_known_as: Vec<String>,
    /// Example: {"atproto": "did:key:zQ3sh..."}
    #[serde(default)]
    pub verification_methods: BTreeMap<String, String>,
    #[serde(default)]
    pub services: BTreeMap<String, ServiceEntry>,
}

/// `at://<handle>`, the identifier that must lead the alternate identifiers.
pub fn canonical_identifier(handle: &str) -> String {
    format!("{AT_URI_SCHEME}{}", handle.trim_start_matches('@'))
}

/// Checks that a caller-supplied alternate identifier is an absolute URL.
pub fn parse_alternate_identifier(url: &str) -> Result<String, DidError> {
    let url = url.trim();
    Url::parse(url).map_err(|e| DidError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    Ok(url.to_string())
}

impl DidCredentials {
    /// Whether `key` is a rotation key, in either `did:key:` or bare form.
    pub fn has_rotation_key(&self, key: &str) -> bool {
        let wanted = normalize_key(key);
        self.rotation_keys.iter().any(|k| normalize_key(k) == wanted)
    }

    /// Alternate identifiers with `at://<handle>` first and `urls` appended.
    ///
    /// An existing copy of the canonical identifier further down the list is
    /// moved to the front. URLs already present are skipped.
    pub fn with_linked_urls(&self, handle: &str, urls: &[String]) -> DidCredentials {
        let canonical = canonical_identifier(handle);
        let mut also_known_as = Vec::with_capacity(self.also_known_as.len() + urls.len() + 1);
        also_known_as.push(canonical.clone());
        also_known_as.extend(self.also_known_as.iter().filter(|aka| **aka != canonical).cloned());

        for url in urls {
            if also_known_as.contains(url) {
                log::warn!("{url} is already linked, skipping");
                continue;
            }
            also_known_as.push(url.clone());
        }

        DidCredentials {
            also_known_as,
            ..self.clone()
        }
    }

    /// Rotation keys with `key` appended, or `None` if it is already there.
    pub fn with_rotation_key(&self, key: &str) -> Option<DidCredentials> {
        if self.has_rotation_key(key) {
            return None;
        }
        let mut rotation_keys = self.rotation_keys.clone();
        rotation_keys.push(key.trim().to_string());
        Some(DidCredentials {
            rotation_keys,
            ..self.clone()
        })
    }

    /// Rotation keys without `key`, or `None` if it is not there.
    ///
    /// Only the first matching entry is removed; the order of the others is kept.
    pub fn without_rotation_key(&self, key: &str) -> Option<DidCredentials> {
        let wanted = normalize_key(key);
        let position = self.rotation_keys.iter().position(|k| normalize_key(k) == wanted)?;
        let mut rotation_keys = self.rotation_keys.clone();
        rotation_keys.remove(position);
        Some(DidCredentials {
            rotation_keys,
            ..self.clone()
        })
    }
}
