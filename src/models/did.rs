// src/models/did.rs
//! DID documents, DID methods and the change history of `did:plc` identities.
//!
//! Defines the structures returned by the public directory and by `did:web`
//! hosts, following the [DID Core Specification](https://www.w3.org/TR/did-core/)
//! and the `did:plc` audit log format.

use crate::errors::DidError;
use crate::models::credentials::{DidCredentials, ServiceEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Scheme prefix every DID starts with.
pub const DID_PREFIX: &str = "did:";

/// DID methods this tool can resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DidMethod {
    /// Content-addressed identifiers served by the public directory.
    Plc,
    /// Identifiers hosted under a domain's well-known path.
    Web,
}

impl DidMethod {
    /// Reads the method tag of a DID.
    ///
    /// # Errors
    /// Returns [`DidError::UnsupportedMethod`] for anything but `did:plc:` and
    /// `did:web:` identifiers, including strings that are not DIDs at all.
    pub fn of(did: &str) -> Result<Self, DidError> {
        let rest = did
            .strip_prefix(DID_PREFIX)
            .ok_or_else(|| DidError::UnsupportedMethod(did.to_string()))?;
        match rest.split_once(':') {
            Some(("plc", id)) if !id.is_empty() => Ok(DidMethod::Plc),
            Some(("web", id)) if !id.is_empty() => Ok(DidMethod::Web),
            _ => Err(DidError::UnsupportedMethod(did.to_string())),
        }
    }
}

/// URL of the document for a `did:web` identifier.
///
/// `did:web:example.com` maps to `https://example.com/.well-known/did.json`,
/// `did:web:example.com:user:alice` to `https://example.com/user/alice/did.json`.
/// A percent-encoded colon in the domain (`%3A`) is a port separator.
pub fn did_web_document_url(did: &str) -> Result<String, DidError> {
    let id = did
        .strip_prefix("did:web:")
        .filter(|id| !id.is_empty())
        .ok_or_else(|| DidError::UnsupportedMethod(did.to_string()))?;

    let mut segments = id.split(':');
    let domain = segments
        .next()
        .unwrap_or_default()
        .replace("%3A", ":")
        .replace("%3a", ":");
    let path: Vec<&str> = segments.collect();

    if path.is_empty() {
        Ok(format!("https://{domain}/.well-known/did.json"))
    } else {
        Ok(format!("https://{domain}/{}/did.json", path.join("/")))
    }
}

/// A DID Document.
///
/// Members this tool does not interpret are kept in `extra` so that a fetched
/// document renders back out unchanged apart from key order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    /// JSON-LD context, either a string or a list.
    #[serde(rename = "@context", default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    /// The DID this document describes.
    /// Example: "did:plc:s53e6k6sirobjtz5s6vdddwr"
    pub id: String,

    /// Alternate identifiers, handle first by convention.
    /// Example: ["at://alice.example", "https://github.com/alice"]
    #[serde(default)]
    pub also_known_as: Vec<String>,

    #[serde(default)]
    pub verification_method: Vec<VerificationMethod>,

    #[serde(default)]
    pub service: Vec<Service>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A public key entry of a DID document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub controller: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_multibase: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A service endpoint entry of a DID document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Usually a URL string; DID Core also allows maps and sets.
    pub service_endpoint: Value,
}

/// One entry of a `did:plc` audit log.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub did: String,
    pub operation: PlcOperation,
    /// Content hash of the signed operation.
    pub cid: String,
    /// Set when a later operation, signed by a higher-priority rotation key,
    /// invalidated this one.
    #[serde(default)]
    pub nullified: bool,
    pub created_at: DateTime<Utc>,
}

/// A signed `did:plc` operation.
///
/// Every regular operation is a full snapshot of the identity's mutable
/// state, not a diff against `prev`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum PlcOperation {
    #[serde(rename = "plc_operation", rename_all = "camelCase")]
    Update {
        rotation_keys: Vec<String>,
        verification_methods: BTreeMap<String, String>,
        also_known_as: Vec<String>,
        services: BTreeMap<String, ServiceEntry>,
        prev: Option<String>,
        sig: String,
    },
    #[serde(rename = "plc_tombstone")]
    Tombstone { prev: String, sig: String },
    /// Genesis format used before `plc_operation` existed.
    #[serde(rename = "create", rename_all = "camelCase")]
    LegacyCreate {
        signing_key: String,
        recovery_key: String,
        handle: String,
        service: String,
        prev: Option<String>,
        sig: String,
    },
}

impl PlcOperation {
    /// The credentials this operation establishes, or `None` for a tombstone.
    pub fn credentials(&self) -> Option<DidCredentials> {
        match self {
            PlcOperation::Update {
                rotation_keys,
                verification_methods,
                also_known_as,
                services,
                ..
            } => Some(DidCredentials {
                rotation_keys: rotation_keys.clone(),
                also_known_as: also_known_as.clone(),
                verification_methods: verification_methods.clone(),
                services: services.clone(),
            }),
            PlcOperation::LegacyCreate {
                signing_key,
                recovery_key,
                handle,
                service,
                ..
            } => Some(DidCredentials {
                rotation_keys: vec![recovery_key.clone(), signing_key.clone()],
                also_known_as: vec![format!("at://{handle}")],
                verification_methods: BTreeMap::from([(
                    "atproto".to_string(),
                    signing_key.clone(),
                )]),
                services: BTreeMap::from([(
                    "atproto_pds".to_string(),
                    ServiceEntry {
                        kind: "AtprotoPersonalDataServer".to_string(),
                        endpoint: service.clone(),
                    },
                )]),
            }),
            PlcOperation::Tombstone { .. } => None,
        }
    }
}

/// Latest state recorded in an audit log.
///
/// Nullified entries are skipped.
///
/// # Errors
/// - [`DidError::EmptyHistory`] when no entry is active
/// - [`DidError::Tombstoned`] when the newest active entry is a tombstone
pub fn current_credentials(did: &str, history: &[LogEntry]) -> Result<DidCredentials, DidError> {
    let latest = history
        .iter()
        .rev()
        .find(|entry| !entry.nullified)
        .ok_or_else(|| DidError::EmptyHistory(did.to_string()))?;
    log::debug!("latest active operation for {did}: {} ({})", latest.cid, latest.created_at);
    latest
        .operation
        .credentials()
        .ok_or_else(|| DidError::Tombstoned(did.to_string()))
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub const DID: &str = "did:plc:s53e6k6sirobjtz5s6vdddwr";

    pub const DOCUMENT: &str = r##"{
        "@context": [
            "https://www.w3.org/ns/did/v1",
            "https://w3id.org/security/multikey/v1",
            "https://w3id.org/security/suites/secp256k1-2019/v1"
        ],
        "id": "did:plc:s53e6k6sirobjtz5s6vdddwr",
        "alsoKnownAs": ["at://alice.example"],
        "verificationMethod": [{
            "id": "did:plc:s53e6k6sirobjtz5s6vdddwr#atproto",
            "type": "Multikey",
            "controller": "did:plc:s53e6k6sirobjtz5s6vdddwr",
            "publicKeyMultibase": "zQ3shXjHeiBuRCKmM36cuYnm7YEMzhGnCmCyW92sRJ9pribSF"
        }],
        "service": [{
            "id": "#atproto_pds",
            "type": "AtprotoPersonalDataServer",
            "serviceEndpoint": "https://pds.alice.example"
        }]
    }"##;

    pub const AUDIT_LOG: &str = r#"[
        {
            "did": "did:plc:s53e6k6sirobjtz5s6vdddwr",
            "operation": {
                "sig": "c2lnMQ",
                "prev": null,
                "type": "create",
                "handle": "alice.example",
                "service": "https://pds.alice.example",
                "signingKey": "did:key:zQ3shXjHeiBuRCKmM36cuYnm7YEMzhGnCmCyW92sRJ9pribSF",
                "recoveryKey": "did:key:zQ3shhCGUqDKjStzuDxPkTxN6ujddP4RkEKJJouJGRRkaLGbg"
            },
            "cid": "bafyreiaaaa",
            "nullified": false,
            "createdAt": "2023-04-12T04:53:57.057Z"
        },
        {
            "did": "did:plc:s53e6k6sirobjtz5s6vdddwr",
            "operation": {
                "sig": "c2lnMg",
                "prev": "bafyreiaaaa",
                "type": "plc_operation",
                "services": {
                    "atproto_pds": {
                        "type": "AtprotoPersonalDataServer",
                        "endpoint": "https://pds.alice.example"
                    }
                },
                "alsoKnownAs": ["at://alice.example"],
                "rotationKeys": [
                    "did:key:zQ3shhCGUqDKjStzuDxPkTxN6ujddP4RkEKJJouJGRRkaLGbg",
                    "did:key:zQ3shXjHeiBuRCKmM36cuYnm7YEMzhGnCmCyW92sRJ9pribSF"
                ],
                "verificationMethods": {
                    "atproto": "did:key:zQ3shXjHeiBuRCKmM36cuYnm7YEMzhGnCmCyW92sRJ9pribSF"
                }
            },
            "cid": "bafyreibbbb",
            "nullified": false,
            "createdAt": "2023-11-02T18:20:01.116Z"
        }
    ]"#;
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_method_detection() {
        assert_eq!(DidMethod::of(DID).unwrap(), DidMethod::Plc);
        assert_eq!(DidMethod::of("did:web:example.com").unwrap(), DidMethod::Web);
        for did in ["did:key:zQ3sabc", "did:plc:", "alice.example", "did:web"] {
            assert!(matches!(DidMethod::of(did), Err(DidError::UnsupportedMethod(_))), "{did}");
        }
    }

    #[test]
    fn test_did_web_urls() {
        assert_eq!(
            did_web_document_url("did:web:example.com").unwrap(),
            "https://example.com/.well-known/did.json"
        );
        assert_eq!(
            did_web_document_url("did:web:localhost%3A8443").unwrap(),
            "https://localhost:8443/.well-known/did.json"
        );
        assert_eq!(
            did_web_document_url("did:web:example.com:user:alice").unwrap(),
            "https://example.com/user/alice/did.json"
        );
        assert!(did_web_document_url(DID).is_err());
    }

    #[test]
    fn test_document_keeps_unknown_members() {
        let mut raw: Value = serde_json::from_str(DOCUMENT).unwrap();
        raw["customField"] = Value::from(7);
        let document: DidDocument = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(document.id, DID);
        assert_eq!(document.also_known_as, vec!["at://alice.example"]);
        assert_eq!(document.verification_method[0].kind, "Multikey");
        assert_eq!(document.service[0].service_endpoint, "https://pds.alice.example");
        assert_eq!(serde_json::to_value(&document).unwrap(), raw);
    }

    #[test]
    fn test_audit_log_parses_both_operation_formats() {
        let history: Vec<LogEntry> = serde_json::from_str(AUDIT_LOG).unwrap();
        assert_eq!(history.len(), 2);
        assert!(matches!(history[0].operation, PlcOperation::LegacyCreate { .. }));
        assert!(matches!(history[1].operation, PlcOperation::Update { .. }));

        let genesis = history[0].operation.credentials().unwrap();
        assert_eq!(genesis.also_known_as, vec!["at://alice.example"]);
        assert_eq!(genesis.rotation_keys.len(), 2);
        assert_eq!(genesis.services["atproto_pds"].endpoint, "https://pds.alice.example");
    }

    #[test]
    fn test_current_credentials_skips_nullified() {
        let mut history: Vec<LogEntry> = serde_json::from_str(AUDIT_LOG).unwrap();
        let latest = current_credentials(DID, &history).unwrap();
        assert_eq!(latest.rotation_keys, history[1].operation.credentials().unwrap().rotation_keys);

        history[1].nullified = true;
        let fallback = current_credentials(DID, &history).unwrap();
        assert_eq!(fallback, history[0].operation.credentials().unwrap());

        history[0].nullified = true;
        assert!(matches!(current_credentials(DID, &history), Err(DidError::EmptyHistory(_))));
    }

    #[test]
    fn test_current_credentials_on_tombstone() {
        let mut history: Vec<LogEntry> = serde_json::from_str(AUDIT_LOG).unwrap();
        let mut tombstone = history[1].clone();
        tombstone.operation = PlcOperation::Tombstone {
            prev: "bafyreibbbb".to_string(),
            sig: "c2lnMw".to_string(),
        };
        history.push(tombstone);
        assert!(matches!(current_credentials(DID, &history), Err(DidError::Tombstoned(_))));
    }
}
