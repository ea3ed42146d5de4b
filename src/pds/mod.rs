// src/pds/mod.rs
//! The identity provider: the account's Personal Data Server.
//!
//! Everything that needs the account's authority (signing an operation,
//! sending the confirmation email) goes through the provider. The
//! [`IdentityProvider`] trait is the seam the update workflow is written
//! against; [`xrpc_client::PdsClient`] is the HTTP implementation.

pub mod xrpc_client;

use crate::errors::DidError;
use crate::models::credentials::DidCredentials;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub use xrpc_client::PdsClient;

/// An authenticated session for one account.
#[derive(Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub did: String,
    pub handle: String,
    pub access_jwt: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("did", &self.did)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

/// A `did:plc` operation signed by the provider, ready for submission.
///
/// Opaque to this tool; it is passed back to the provider unchanged.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(transparent)]
pub struct SignedOperation(pub Value);

/// Operations the update workflow needs from the identity provider.
#[allow(async_fn_in_trait)]
pub trait IdentityProvider {
    /// Exchanges account credentials for a session.
    ///
    /// Fails with [`DidError::Authentication`] on bad credentials.
    async fn create_session(&self, identifier: &str, password: &str) -> Result<Session, DidError>;

    /// Resolves a handle to a DID. Fails with [`DidError::Resolution`].
    async fn resolve_handle(&self, handle: &str) -> Result<String, DidError>;

    /// The credentials the provider would put in the identity's next operation.
    async fn recommended_credentials(&self, session: &Session) -> Result<DidCredentials, DidError>;

    /// Emails a one-time confirmation code to the account holder.
    ///
    /// Fails with [`DidError::Provider`] when refused (rate limits and such).
    async fn request_operation_signature(&self, session: &Session) -> Result<(), DidError>;

    /// Signs an operation establishing `credentials`, authorised by `token`.
    ///
    /// Fails with [`DidError::Submission`] carrying the provider's message.
    async fn sign_operation(
        &self,
        session: &Session,
        token: &str,
        credentials: &DidCredentials,
    ) -> Result<SignedOperation, DidError>;

    /// Submits a signed operation to the identity's change history.
    ///
    /// Fails with [`DidError::Submission`] carrying the provider's message.
    async fn submit_operation(
        &self,
        session: &Session,
        operation: &SignedOperation,
    ) -> Result<(), DidError>;
}
