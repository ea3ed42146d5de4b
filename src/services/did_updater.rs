// src/services/did_updater.rs
//! Identity update workflow.
//!
//! Every change to an identity follows the same sequence:
//! 1. **Authenticate** with the identity provider
//! 2. **Compose** the complete end state of the four mutable fields
//! 3. **Request** a one-time confirmation code by email
//! 4. **Collect** the code from the operator
//! 5. **Sign and submit** the operation
//!
//! The pending end state is composed right after authentication, so a change
//! that turns out to be a no-op (key already present, key not found) never
//! sends an email. If the process dies between steps 3 and 5 the emailed code
//! simply goes unused.

use crate::directory::Directory;
use crate::errors::DidError;
use crate::models::credentials::{parse_alternate_identifier, DidCredentials};
use crate::models::did::{current_credentials, DidMethod};
use crate::pds::{IdentityProvider, Session};
use crate::utils::prompt::{prompt_non_empty, prompt_secret_non_empty, Prompter};
use crate::wallet::key_management::{parse_did_key, to_did_key};

/// Progress of one update.
///
/// Transitions only move forward; `Submitted` and `Aborted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Start,
    Authenticated,
    ConfirmationRequested,
    ConfirmationEntered,
    Submitted,
    Aborted,
}

impl WorkflowState {
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowState::Submitted | WorkflowState::Aborted)
    }

    fn can_advance_to(self, next: WorkflowState) -> bool {
        use WorkflowState::*;
        match (self, next) {
            (Submitted | Aborted, _) => false,
            (_, Aborted) => true,
            (Start, Authenticated)
            | (Authenticated, ConfirmationRequested)
            | (ConfirmationRequested, ConfirmationEntered)
            | (ConfirmationEntered, Submitted) => true,
            _ => false,
        }
    }
}

/// The one field an update changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Append URLs to the alternate identifiers.
    LinkUrls(Vec<String>),
    /// Append a `did:key` to the rotation keys.
    AddRotationKey(String),
    /// Drop a key (bare multibase or `did:key:`) from the rotation keys.
    RemoveRotationKey(String),
}

impl Mutation {
    /// Validates the URLs up front so a typo fails before any request is made.
    pub fn link_urls(urls: &[String]) -> Result<Self, DidError> {
        if urls.is_empty() {
            return Err(DidError::InvalidUrl {
                url: String::new(),
                reason: "at least one URL is required".to_string(),
            });
        }
        let urls = urls
            .iter()
            .map(|url| parse_alternate_identifier(url))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Mutation::LinkUrls(urls))
    }

    /// Accepts a secp256k1 key in either spelling and stores its `did:key` form.
    pub fn add_rotation_key(key: &str) -> Result<Self, DidError> {
        let public_key = parse_did_key(key)?;
        Ok(Mutation::AddRotationKey(to_did_key(&public_key)))
    }

    /// Checks that `key` decodes to a secp256k1 point. The caller's spelling
    /// is kept; matching against the current keys ignores the `did:key:` prefix.
    pub fn remove_rotation_key(key: &str) -> Result<Self, DidError> {
        parse_did_key(key)?;
        Ok(Mutation::RemoveRotationKey(key.trim().to_string()))
    }
}

/// A requested change to one account.
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    /// Handle used to log in; a leading `@` is ignored.
    pub handle: String,
    /// Account password. Prompted for when `None`.
    pub password: Option<String>,
    pub mutation: Mutation,
}

/// How an update ended, with the credentials it left in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// A signed operation with these credentials was accepted.
    Submitted(DidCredentials),
    /// The key or URLs to add are already present. Nothing was sent.
    AlreadyPresent(DidCredentials),
    /// The key to remove is not a rotation key. Nothing was sent.
    KeyNotFound(DidCredentials),
}

enum Composition {
    Pending(DidCredentials),
    Unchanged(UpdateOutcome),
}

/// Drives one update from login to submission.
pub struct DidUpdater<'a, P, D> {
    provider: &'a P,
    directory: &'a D,
    state: WorkflowState,
}

impl<'a, P, D> DidUpdater<'a, P, D>
where
    P: IdentityProvider,
    D: Directory,
{
    pub fn new(provider: &'a P, directory: &'a D) -> Self {
        DidUpdater {
            provider,
            directory,
            state: WorkflowState::Start,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    fn advance(&mut self, next: WorkflowState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "invalid transition {:?} -> {:?}",
            self.state,
            next
        );
        log::debug!("update workflow: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Runs the whole sequence. Any error leaves the workflow `Aborted`.
    ///
    /// # Errors
    /// - [`DidError::Authentication`] on bad credentials
    /// - [`DidError::Provider`] if the confirmation email is refused
    /// - [`DidError::Submission`] if signing or submission is refused
    /// - [`DidError::InputClosed`] if stdin closes before a code is entered
    pub async fn run<T: Prompter>(
        &mut self,
        request: &UpdateRequest,
        prompter: &mut T,
    ) -> Result<UpdateOutcome, DidError> {
        let result = self.run_steps(request, prompter).await;
        if result.is_err() && !self.state.is_terminal() {
            self.advance(WorkflowState::Aborted);
        }
        result
    }

    async fn run_steps<T: Prompter>(
        &mut self,
        request: &UpdateRequest,
        prompter: &mut T,
    ) -> Result<UpdateOutcome, DidError> {
        let handle = request.handle.trim().trim_start_matches('@');
        let password = match &request.password {
            Some(password) => password.clone(),
            None => prompt_secret_non_empty(prompter, &format!("Password for {handle}: "))?,
        };

        let session = self.provider.create_session(handle, &password).await?;
        self.advance(WorkflowState::Authenticated);
        log::info!("logged in as {} ({})", session.handle, session.did);

        let pending = match self.compose(&session, &request.mutation).await? {
            Composition::Pending(pending) => pending,
            Composition::Unchanged(outcome) => return Ok(outcome),
        };

        self.provider.request_operation_signature(&session).await?;
        self.advance(WorkflowState::ConfirmationRequested);
        log::info!("confirmation code requested, check the account's email");

        let token = prompt_non_empty(prompter, "Confirmation code from email: ")?;
        self.advance(WorkflowState::ConfirmationEntered);

        let signed = self.provider.sign_operation(&session, &token, &pending).await?;
        self.provider.submit_operation(&session, &signed).await?;
        self.advance(WorkflowState::Submitted);
        log::info!("operation submitted for {}", session.did);

        Ok(UpdateOutcome::Submitted(pending))
    }

    /// Builds the pending end state from the current one.
    async fn compose(&self, session: &Session, mutation: &Mutation) -> Result<Composition, DidError> {
        match mutation {
            Mutation::LinkUrls(urls) => {
                let document = self.directory.fetch_document(&session.did).await?;
                let mut current = self.provider.recommended_credentials(session).await?;
                current.also_known_as = document.also_known_as;
                let pending = current.with_linked_urls(&session.handle, urls);
                if pending == current {
                    log::warn!("every URL is already linked");
                    return Ok(Composition::Unchanged(UpdateOutcome::AlreadyPresent(current)));
                }
                Ok(Composition::Pending(pending))
            }
            Mutation::AddRotationKey(key) => {
                let current = self.provider.recommended_credentials(session).await?;
                match current.with_rotation_key(key) {
                    Some(pending) => Ok(Composition::Pending(pending)),
                    None => {
                        log::warn!("{key} is already a rotation key");
                        Ok(Composition::Unchanged(UpdateOutcome::AlreadyPresent(current)))
                    }
                }
            }
            Mutation::RemoveRotationKey(key) => {
                let current = self.current_rotation_state(session).await?;
                match current.without_rotation_key(key) {
                    Some(pending) => Ok(Composition::Pending(pending)),
                    None => {
                        log::warn!("{key} is not a rotation key");
                        Ok(Composition::Unchanged(UpdateOutcome::KeyNotFound(current)))
                    }
                }
            }
        }
    }

    /// Current credentials for a removal.
    ///
    /// `did:plc` identities read them from the newest active history entry,
    /// others ask the provider. The two sources are not reconciled.
    async fn current_rotation_state(&self, session: &Session) -> Result<DidCredentials, DidError> {
        match DidMethod::of(&session.did)? {
            DidMethod::Plc => {
                let history = self.directory.fetch_history(&session.did).await?;
                current_credentials(&session.did, &history)
            }
            DidMethod::Web => self.provider.recommended_credentials(session).await,
        }
    }
}
