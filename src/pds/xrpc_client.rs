// src/pds/xrpc_client.rs
//! XRPC client for a Personal Data Server.
//!
//! Provides a thin interface over the handful of `com.atproto.*` procedures
//! this tool calls, including session creation, handle resolution, and the
//! `did:plc` signing flow.

use crate::errors::DidError;
use crate::models::credentials::DidCredentials;
use crate::pds::{IdentityProvider, Session, SignedOperation};
use crate::utils::serialization::deserialize;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

const CREATE_SESSION: &str = "com.atproto.server.createSession";
const RESOLVE_HANDLE: &str = "com.atproto.identity.resolveHandle";
const RECOMMENDED_CREDENTIALS: &str = "com.atproto.identity.getRecommendedDidCredentials";
const REQUEST_SIGNATURE: &str = "com.atproto.identity.requestPlcOperationSignature";
const SIGN_OPERATION: &str = "com.atproto.identity.signPlcOperation";
const SUBMIT_OPERATION: &str = "com.atproto.identity.submitPlcOperation";

/// HTTP client for one Personal Data Server.
#[derive(Clone, Debug)]
pub struct PdsClient {
    http: reqwest::Client,
    /// Example: "https://bsky.social"
    base_url: String,
}

/// Error body returned by XRPC endpoints.
#[derive(Deserialize, Debug, Default)]
struct XrpcErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// A non-success XRPC response.
#[derive(Debug)]
pub struct XrpcFailure {
    pub status: u16,
    pub error: Option<String>,
    pub message: Option<String>,
}

impl fmt::Display for XrpcFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.error, &self.message) {
            (Some(error), Some(message)) => write!(f, "{error}: {message}"),
            (Some(text), None) | (None, Some(text)) => write!(f, "{text}"),
            (None, None) => write!(f, "HTTP {}", self.status),
        }
    }
}

/// Why an XRPC call did not produce a body.
#[derive(Debug)]
enum CallError {
    Transport(reqwest::Error),
    Rejected(XrpcFailure),
}

impl CallError {
    /// Maps a rejection into the error variant of the calling step.
    fn rejected_as<F>(self, wrap: F) -> DidError
    where
        F: FnOnce(String) -> DidError,
    {
        match self {
            CallError::Transport(e) => DidError::Http(e),
            CallError::Rejected(failure) => wrap(failure.to_string()),
        }
    }
}

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct ResolveHandleResponse {
    did: String,
}

#[derive(Serialize)]
struct SignOperationRequest<'a> {
    token: &'a str,
    #[serde(flatten)]
    credentials: &'a DidCredentials,
}

#[derive(Deserialize)]
struct SignOperationResponse {
    operation: SignedOperation,
}

#[derive(Serialize)]
struct SubmitOperationRequest<'a> {
    operation: &'a SignedOperation,
}

impl PdsClient {
    /// Creates a client for the provider at `base_url`.
    ///
    /// # Arguments
    /// * `base_url` - Provider origin, with or without a trailing slash
    pub fn new(base_url: &str) -> Self {
        PdsClient {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, nsid: &str) -> String {
        format!("{}/xrpc/{}", self.base_url, nsid)
    }

    /// Sends a request and returns the body of a successful response.
    async fn call(&self, request: RequestBuilder) -> Result<String, CallError> {
        let response = request.send().await.map_err(CallError::Transport)?;
        let status = response.status();
        let body = response.text().await.map_err(CallError::Transport)?;
        log::debug!("xrpc response status {status}");

        if status.is_success() {
            return Ok(body);
        }

        let parsed: XrpcErrorBody = serde_json::from_str(&body).unwrap_or_default();
        let message = match parsed.message {
            Some(message) => Some(message),
            None if parsed.error.is_none() && !body.trim().is_empty() => Some(body),
            None => None,
        };
        Err(CallError::Rejected(XrpcFailure {
            status: status.as_u16(),
            error: parsed.error,
            message,
        }))
    }

    /// Calls an endpoint and decodes its JSON body.
    async fn call_json<R, F>(&self, request: RequestBuilder, wrap: F) -> Result<R, DidError>
    where
        R: DeserializeOwned,
        F: FnOnce(String) -> DidError,
    {
        let body = self.call(request).await.map_err(|e| e.rejected_as(wrap))?;
        deserialize(&body)
    }

    fn get(&self, nsid: &str) -> RequestBuilder {
        log::debug!("GET {nsid}");
        self.http.get(self.endpoint(nsid))
    }

    fn post(&self, nsid: &str) -> RequestBuilder {
        log::debug!("POST {nsid}");
        self.http.post(self.endpoint(nsid))
    }
}

impl IdentityProvider for PdsClient {
    async fn create_session(&self, identifier: &str, password: &str) -> Result<Session, DidError> {
        let request = self
            .post(CREATE_SESSION)
            .json(&CreateSessionRequest { identifier, password });
        self.call_json(request, DidError::Authentication).await
    }

    async fn resolve_handle(&self, handle: &str) -> Result<String, DidError> {
        let request = self.get(RESOLVE_HANDLE).query(&[("handle", handle)]);
        let response: ResolveHandleResponse = self
            .call_json(request, |reason| DidError::Resolution {
                handle: handle.to_string(),
                reason,
            })
            .await?;
        Ok(response.did)
    }

    async fn recommended_credentials(&self, session: &Session) -> Result<DidCredentials, DidError> {
        let request = self
            .get(RECOMMENDED_CREDENTIALS)
            .bearer_auth(&session.access_jwt);
        self.call_json(request, DidError::Provider).await
    }

    async fn request_operation_signature(&self, session: &Session) -> Result<(), DidError> {
        let request = self.post(REQUEST_SIGNATURE).bearer_auth(&session.access_jwt);
        self.call(request)
            .await
            .map_err(|e| e.rejected_as(DidError::Provider))?;
        Ok(())
    }

    async fn sign_operation(
        &self,
        session: &Session,
        token: &str,
        credentials: &DidCredentials,
    ) -> Result<SignedOperation, DidError> {
        let request = self
            .post(SIGN_OPERATION)
            .bearer_auth(&session.access_jwt)
            .json(&SignOperationRequest { token, credentials });
        let response: SignOperationResponse =
            self.call_json(request, DidError::Submission).await?;
        Ok(response.operation)
    }

    async fn submit_operation(
        &self,
        session: &Session,
        operation: &SignedOperation,
    ) -> Result<(), DidError> {
        let request = self
            .post(SUBMIT_OPERATION)
            .bearer_auth(&session.access_jwt)
            .json(&SubmitOperationRequest { operation });
        self.call(request)
            .await
            .map_err(|e| e.rejected_as(DidError::Submission))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::credentials::ServiceEntry;
    use mockito::{mock, Matcher};
    use serde_json::json;
    use std::collections::BTreeMap;

    // The mock server is shared by every test, so each test uses its own
    // path prefix as the provider origin.
    fn client(prefix: &str) -> PdsClient {
        PdsClient::new(&format!("{}/{}/", mockito::server_url(), prefix))
    }

    fn session() -> Session {
        Session {
            did: "did:plc:s53e6k6sirobjtz5s6vdddwr".to_string(),
            handle: "alice.example".to_string(),
            access_jwt: "jwt-token".to_string(),
        }
    }

    #[test]
    fn test_failure_display() {
        let both = XrpcFailure {
            status: 400,
            error: Some("InvalidToken".into()),
            message: Some("Token is expired".into()),
        };
        assert_eq!(both.to_string(), "InvalidToken: Token is expired");
        let bare = XrpcFailure { status: 502, error: None, message: None };
        assert_eq!(bare.to_string(), "HTTP 502");
    }

    #[tokio::test]
    async fn test_create_session() {
        let m = mock("POST", "/session-ok/xrpc/com.atproto.server.createSession")
            .match_body(Matcher::Json(json!({
                "identifier": "alice.example",
                "password": "hunter2"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"did":"did:plc:s53e6k6sirobjtz5s6vdddwr","handle":"alice.example",
                    "accessJwt":"jwt-token","refreshJwt":"refresh"}"#,
            )
            .create();

        let created = client("session-ok")
            .create_session("alice.example", "hunter2")
            .await
            .unwrap();
        assert_eq!(created, session());
        m.assert();
    }

    #[tokio::test]
    async fn test_create_session_bad_password() {
        let _m = mock("POST", "/session-bad/xrpc/com.atproto.server.createSession")
            .with_status(401)
            .with_body(r#"{"error":"AuthenticationRequired","message":"Invalid identifier or password"}"#)
            .create();

        let result = client("session-bad")
            .create_session("alice.example", "wrong")
            .await;
        match result {
            Err(DidError::Authentication(message)) => {
                assert_eq!(message, "AuthenticationRequired: Invalid identifier or password")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_resolve_handle() {
        let _m = mock("GET", "/resolve/xrpc/com.atproto.identity.resolveHandle")
            .match_query(Matcher::UrlEncoded("handle".into(), "alice.example".into()))
            .with_status(200)
            .with_body(r#"{"did":"did:plc:s53e6k6sirobjtz5s6vdddwr"}"#)
            .create();
        let _missing = mock("GET", "/resolve/xrpc/com.atproto.identity.resolveHandle")
            .match_query(Matcher::UrlEncoded("handle".into(), "nobody.example".into()))
            .with_status(400)
            .with_body(r#"{"error":"InvalidRequest","message":"Unable to resolve handle"}"#)
            .create();

        let client = client("resolve");
        assert_eq!(
            client.resolve_handle("alice.example").await.unwrap(),
            "did:plc:s53e6k6sirobjtz5s6vdddwr"
        );
        assert!(matches!(
            client.resolve_handle("nobody.example").await,
            Err(DidError::Resolution { .. })
        ));
    }

    #[tokio::test]
    async fn test_recommended_credentials_uses_bearer_token() {
        let m = mock("GET", "/creds/xrpc/com.atproto.identity.getRecommendedDidCredentials")
            .match_header("authorization", "Bearer jwt-token")
            .with_status(200)
            .with_body(
                r#"{
                    "rotationKeys": ["did:key:zQ3shhCGUqDKjStzuDxPkTxN6ujddP4RkEKJJouJGRRkaLGbg"],
                    "alsoKnownAs": ["at://alice.example"],
                    "verificationMethods": {"atproto": "did:key:zQ3shXjHeiBuRCKmM36cuYnm7YEMzhGnCmCyW92sRJ9pribSF"},
                    "services": {"atproto_pds": {"type": "AtprotoPersonalDataServer", "endpoint": "https://pds.alice.example"}}
                }"#,
            )
            .create();

        let credentials = client("creds").recommended_credentials(&session()).await.unwrap();
        assert_eq!(credentials.rotation_keys.len(), 1);
        assert_eq!(credentials.services["atproto_pds"].endpoint, "https://pds.alice.example");
        m.assert();
    }

    #[tokio::test]
    async fn test_request_signature_rate_limited() {
        let _m = mock("POST", "/ratelimit/xrpc/com.atproto.identity.requestPlcOperationSignature")
            .with_status(429)
            .with_body(r#"{"error":"RateLimitExceeded","message":"Rate Limit Exceeded"}"#)
            .create();

        let result = client("ratelimit").request_operation_signature(&session()).await;
        assert!(matches!(result, Err(DidError::Provider(_))));
    }

    #[tokio::test]
    async fn test_sign_and_submit() {
        let credentials = DidCredentials {
            rotation_keys: vec!["did:key:zQ3shhCGUqDKjStzuDxPkTxN6ujddP4RkEKJJouJGRRkaLGbg".into()],
            also_known_as: vec!["at://alice.example".into()],
            verification_methods: BTreeMap::new(),
            services: BTreeMap::from([(
                "atproto_pds".to_string(),
                ServiceEntry {
                    kind: "AtprotoPersonalDataServer".into(),
                    endpoint: "https://pds.alice.example".into(),
                },
            )]),
        };
        let operation = json!({"type": "plc_operation", "sig": "c2ln"});

        let sign = mock("POST", "/sign/xrpc/com.atproto.identity.signPlcOperation")
            .match_header("authorization", "Bearer jwt-token")
            .match_body(Matcher::PartialJson(json!({
                "token": "ABCDE-12345",
                "alsoKnownAs": ["at://alice.example"]
            })))
            .with_status(200)
            .with_body(json!({ "operation": operation }).to_string())
            .create();
        let submit = mock("POST", "/sign/xrpc/com.atproto.identity.submitPlcOperation")
            .match_body(Matcher::Json(json!({ "operation": operation })))
            .with_status(200)
            .create();

        let client = client("sign");
        let signed = client
            .sign_operation(&session(), "ABCDE-12345", &credentials)
            .await
            .unwrap();
        assert_eq!(signed, SignedOperation(operation.clone()));
        client.submit_operation(&session(), &signed).await.unwrap();
        sign.assert();
        submit.assert();
    }

    #[tokio::test]
    async fn test_submit_rejection_is_verbatim() {
        let _m = mock("POST", "/reject/xrpc/com.atproto.identity.submitPlcOperation")
            .with_status(400)
            .with_body(r#"{"error":"InvalidRequest","message":"Invalid signature on op"}"#)
            .create();

        let operation = SignedOperation(json!({"sig": "bad"}));
        match client("reject").submit_operation(&session(), &operation).await {
            Err(DidError::Submission(message)) => {
                assert_eq!(message, "InvalidRequest: Invalid signature on op")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
