// src/errors.rs
//! Error taxonomy for identity lookups, key handling and document updates.
//!
//! Every fallible operation in the crate returns [`DidError`]. None of these
//! errors are retried automatically; they are surfaced to the operator as-is.

use thiserror::Error;

/// Errors produced while resolving, encoding or updating DID documents.
#[derive(Debug, Error)]
pub enum DidError {
    /// The identity provider rejected the supplied account credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The identity provider refused a request (rate limiting, missing scope, ...).
    #[error("identity provider rejected the request: {0}")]
    Provider(String),

    /// A handle could not be turned into a DID.
    #[error("could not resolve {handle}: {reason}")]
    Resolution { handle: String, reason: String },

    /// The DID uses a method other than `plc` or `web`.
    #[error("unsupported DID method in {0}")]
    UnsupportedMethod(String),

    /// The operation exists but not for this DID method.
    #[error("{operation} is not supported for {did}")]
    UnsupportedOperation { operation: &'static str, did: String },

    /// Malformed private key material.
    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),

    /// Bytes that do not describe a point on secp256k1.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// A caller-supplied alternate identifier is not an absolute URL.
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The signed operation was refused. Carries the provider's message verbatim.
    #[error("operation rejected: {0}")]
    Submission(String),

    /// Non-success response from the directory or a did:web host.
    #[error("directory request to {url} failed with status {status}: {body}")]
    Directory { url: String, status: u16, body: String },

    /// The identifier's history ends in a tombstone.
    #[error("{0} has been deactivated")]
    Tombstoned(String),

    /// Every entry of the change history has been nullified (or there are none).
    #[error("no active operations in the history of {0}")]
    EmptyHistory(String),

    /// Standard input closed while waiting for the operator.
    #[error("input closed before a value was entered")]
    InputClosed,

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}
