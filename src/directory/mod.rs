// src/directory/mod.rs
//! Read-only access to published identity documents.
//!
//! `did:plc` documents and their change history come from the public
//! directory; `did:web` documents come from the domain named in the DID.

pub mod plc_client;

use crate::errors::DidError;
use crate::models::did::{DidDocument, LogEntry};

pub use plc_client::DirectoryClient;

/// Document and history lookups used by the read path and the update workflow.
#[allow(async_fn_in_trait)]
pub trait Directory {
    /// Fetches the current document of `did`.
    ///
    /// Fails with [`DidError::UnsupportedMethod`] for methods other than
    /// `plc` and `web`.
    async fn fetch_document(&self, did: &str) -> Result<DidDocument, DidError>;

    /// Fetches the full, ordered change history of a `did:plc` identity.
    ///
    /// Fails with [`DidError::UnsupportedOperation`] for any other method.
    async fn fetch_history(&self, did: &str) -> Result<Vec<LogEntry>, DidError>;
}
