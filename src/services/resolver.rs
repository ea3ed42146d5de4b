// src/services/resolver.rs
//! Identity lookup service.
//!
//! Turns whatever the operator typed (a handle, `@handle`, or a DID) into a
//! DID and fetches its document or change history.

use crate::directory::Directory;
use crate::errors::DidError;
use crate::models::did::{DidDocument, LogEntry, DID_PREFIX};
use crate::pds::IdentityProvider;

/// Read-only lookups against the provider and the directory.
pub struct Resolver<'a, P, D> {
    provider: &'a P,
    directory: &'a D,
}

impl<'a, P, D> Resolver<'a, P, D>
where
    P: IdentityProvider,
    D: Directory,
{
    pub fn new(provider: &'a P, directory: &'a D) -> Self {
        Resolver { provider, directory }
    }

    /// Resolves a handle to its DID. DIDs pass through unchanged.
    ///
    /// # Errors
    /// Returns [`DidError::Resolution`] if the provider cannot resolve the handle.
    pub async fn resolve(&self, handle_or_did: &str) -> Result<String, DidError> {
        let input = handle_or_did.trim();
        if input.starts_with(DID_PREFIX) {
            return Ok(input.to_string());
        }
        let handle = input.trim_start_matches('@');
        let did = self.provider.resolve_handle(handle).await?;
        log::info!("resolved {handle} to {did}");
        Ok(did)
    }

    /// Current document of a handle or DID.
    pub async fn fetch_document(&self, handle_or_did: &str) -> Result<DidDocument, DidError> {
        let did = self.resolve(handle_or_did).await?;
        self.directory.fetch_document(&did).await
    }

    /// Ordered change history of a handle or DID. `did:plc` only.
    pub async fn fetch_history(&self, handle_or_did: &str) -> Result<Vec<LogEntry>, DidError> {
        let did = self.resolve(handle_or_did).await?;
        self.directory.fetch_history(&did).await
    }
}
