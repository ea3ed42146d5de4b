// src/directory/plc_client.rs
//! HTTP client for the `did:plc` directory and `did:web` hosts.
//!
//! # Features
//! - Document lookup for both supported methods
//! - Audit log retrieval for `did:plc`
//!
//! # Security Considerations
//! - Responses are not verified against the operation signatures; the
//!   directory is trusted for display purposes only

use crate::directory::Directory;
use crate::errors::DidError;
use crate::models::did::{did_web_document_url, DidDocument, DidMethod, LogEntry};
use crate::utils::serialization::deserialize;
use serde::de::DeserializeOwned;

/// Directory client.
#[derive(Clone, Debug)]
pub struct DirectoryClient {
    http: reqwest::Client,
    /// Example: "https://plc.directory"
    plc_url: String,
}

impl DirectoryClient {
    /// Creates a client against the directory at `plc_url`.
    pub fn new(plc_url: &str) -> Self {
        DirectoryClient {
            http: reqwest::Client::new(),
            plc_url: plc_url.trim_end_matches('/').to_string(),
        }
    }

    /// URL of the document of a `did:plc` identity.
    pub fn document_url(&self, did: &str) -> String {
        format!("{}/{}", self.plc_url, did)
    }

    /// URL of the audit log of a `did:plc` identity.
    pub fn audit_log_url(&self, did: &str) -> String {
        format!("{}/{}/log/audit", self.plc_url, did)
    }

    /// Fetches and decodes a JSON resource.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, DidError> {
        log::debug!("GET {url}");
        let response = self.http.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(DidError::Directory {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        deserialize(&body)
    }
}

impl Directory for DirectoryClient {
    async fn fetch_document(&self, did: &str) -> Result<DidDocument, DidError> {
        let url = match DidMethod::of(did)? {
            DidMethod::Plc => self.document_url(did),
            DidMethod::Web => did_web_document_url(did)?,
        };
        self.get_json(&url).await
    }

    async fn fetch_history(&self, did: &str) -> Result<Vec<LogEntry>, DidError> {
        match DidMethod::of(did)? {
            DidMethod::Plc => self.get_json(&self.audit_log_url(did)).await,
            DidMethod::Web => Err(DidError::UnsupportedOperation {
                operation: "change history",
                did: did.to_string(),
            }),
        }
    }
}
