// crates/abac-pep-pdp/src/client.rs
// ============================================================================
// Module: PDP HTTP Client
// Description: One-shot and streaming decision requests over HTTP.
// Purpose: Carry subscriptions to the PDP and decisions back.
// Dependencies: async-trait, reqwest, tokio, tokio-stream, url, abac-pep-core
// ============================================================================

//! ## Overview
//! [`PdpConnection`] is the seam between decision channels and the wire.
//! [`HttpPdpClient`] implements it by POSTing the serialized subscription to
//! the decide-once and decide endpoints. Streamed bodies are decoded on a
//! background task and surfaced as a [`DecisionStream`].
//!
//! Security posture: server responses are untrusted; bodies and messages are
//! size-limited and credentials are never logged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::pin::Pin;
use std::time::Duration;

use abac_pep_core::Decision;
use abac_pep_core::Subscription;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::RequestBuilder;
use reqwest::header::ACCEPT;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tokio_stream::wrappers::ReceiverStream;
use url::Url;

use crate::error::PdpError;
use crate::framing::DecisionFramer;
use crate::framing::decode;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default path of the one-shot decision endpoint.
pub const DEFAULT_DECIDE_ONCE_PATH: &str = "/api/pdp/decide-once";
/// Default path of the streaming decision endpoint.
pub const DEFAULT_DECIDE_PATH: &str = "/api/pdp/decide";
/// Default per-message size limit.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 1024 * 1024;
/// Decisions buffered between the body reader and the consumer.
const STREAM_BUFFER: usize = 16;

// ============================================================================
// SECTION: Connection Seam
// ============================================================================

/// Stream of decisions pushed by the PDP for one subscription.
pub type DecisionStream = Pin<Box<dyn Stream<Item = Result<Decision, PdpError>> + Send>>;

/// Transport to a policy decision point.
#[async_trait]
pub trait PdpConnection: Send + Sync {
    /// Requests a single decision.
    ///
    /// # Errors
    ///
    /// Returns [`PdpError`] on transport, status, or decode failures.
    async fn decide_once(&self, subscription: &Subscription) -> Result<Decision, PdpError>;

    /// Opens a decision stream.
    ///
    /// # Errors
    ///
    /// Returns [`PdpError`] when the stream cannot be established.
    async fn decide(&self, subscription: &Subscription) -> Result<DecisionStream, PdpError>;
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Credentials presented to the PDP.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum PdpAuth {
    /// No authorization header.
    #[default]
    None,
    /// `Authorization: Bearer <token>`.
    Bearer(String),
    /// HTTP basic authentication.
    Basic {
        /// Client user name.
        username: String,
        /// Client secret.
        password: String,
    },
}

impl fmt::Debug for PdpAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            Self::Basic {
                username, ..
            } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// Runtime settings for [`HttpPdpClient`].
#[derive(Debug, Clone)]
pub struct PdpClientConfig {
    /// PDP base URI.
    pub base_uri: Url,
    /// Path of the one-shot endpoint, appended to the base path.
    pub decide_once_path: String,
    /// Path of the streaming endpoint, appended to the base path.
    pub decide_path: String,
    /// Credentials.
    pub auth: PdpAuth,
    /// Connect timeout, and total timeout for one-shot calls.
    pub timeout: Duration,
    /// Per-message and one-shot body size limit.
    pub max_message_bytes: usize,
}

impl PdpClientConfig {
    /// Creates settings with default paths, no credentials, and a 5 s timeout.
    #[must_use]
    pub fn new(base_uri: Url) -> Self {
        Self {
            base_uri,
            decide_once_path: DEFAULT_DECIDE_ONCE_PATH.to_string(),
            decide_path: DEFAULT_DECIDE_PATH.to_string(),
            auth: PdpAuth::None,
            timeout: Duration::from_secs(5),
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }

    /// Sets the credentials.
    #[must_use]
    pub fn with_auth(mut self, auth: PdpAuth) -> Self {
        self.auth = auth;
        self
    }
}

// ============================================================================
// SECTION: HTTP Client
// ============================================================================

/// HTTP transport to the PDP.
///
/// # Invariants
/// - Endpoint URLs are resolved once at construction.
#[derive(Debug, Clone)]
pub struct HttpPdpClient {
    /// Underlying HTTP client.
    client: Client,
    /// Resolved one-shot endpoint.
    decide_once_url: Url,
    /// Resolved streaming endpoint.
    decide_url: Url,
    /// Credentials.
    auth: PdpAuth,
    /// One-shot request timeout.
    timeout: Duration,
    /// Message size limit.
    max_message_bytes: usize,
}

impl HttpPdpClient {
    /// Builds a client from settings.
    ///
    /// # Errors
    ///
    /// Returns [`PdpError::InvalidUri`] for non-HTTP base URIs and
    /// [`PdpError::Transport`] when the HTTP client cannot be built.
    pub fn new(config: PdpClientConfig) -> Result<Self, PdpError> {
        if !matches!(config.base_uri.scheme(), "http" | "https") {
            return Err(PdpError::InvalidUri(format!(
                "unsupported scheme '{}'",
                config.base_uri.scheme()
            )));
        }
        let client = Client::builder()
            .connect_timeout(config.timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|err| PdpError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            decide_once_url: endpoint(&config.base_uri, &config.decide_once_path),
            decide_url: endpoint(&config.base_uri, &config.decide_path),
            auth: config.auth,
            timeout: config.timeout,
            max_message_bytes: config.max_message_bytes,
        })
    }

    /// Returns the resolved one-shot endpoint.
    #[must_use]
    pub const fn decide_once_url(&self) -> &Url {
        &self.decide_once_url
    }

    /// Returns the resolved streaming endpoint.
    #[must_use]
    pub const fn decide_url(&self) -> &Url {
        &self.decide_url
    }

    /// Builds a POST carrying the subscription and credentials.
    fn post(&self, url: &Url, subscription: &Subscription) -> Result<RequestBuilder, PdpError> {
        let body =
            serde_json::to_vec(subscription).map_err(|err| PdpError::Decode(err.to_string()))?;
        let request = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        Ok(match &self.auth {
            PdpAuth::None => request,
            PdpAuth::Bearer(token) => request.bearer_auth(token),
            PdpAuth::Basic {
                username,
                password,
            } => request.basic_auth(username, Some(password)),
        })
    }
}

#[async_trait]
impl PdpConnection for HttpPdpClient {
    async fn decide_once(&self, subscription: &Subscription) -> Result<Decision, PdpError> {
        let response = self
            .post(&self.decide_once_url, subscription)?
            .header(ACCEPT, "application/json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| PdpError::Transport(err.to_string()))?;
        let status = response.status();
        let body = read_body_with_limit(response, self.max_message_bytes).await?;
        if !status.is_success() {
            return Err(PdpError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).trim().to_string(),
            });
        }
        let text = std::str::from_utf8(&body)
            .map_err(|_| PdpError::Decode("response was not valid utf-8".to_string()))?;
        decode(text)
    }

    async fn decide(&self, subscription: &Subscription) -> Result<DecisionStream, PdpError> {
        let response = self
            .post(&self.decide_url, subscription)?
            .header(ACCEPT, "text/event-stream, application/x-ndjson")
            .send()
            .await
            .map_err(|err| PdpError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = read_body_with_limit(response, self.max_message_bytes).await?;
            return Err(PdpError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).trim().to_string(),
            });
        }
        let (sender, receiver) = mpsc::channel(STREAM_BUFFER);
        tokio::spawn(pump_stream(response, sender, self.max_message_bytes));
        Ok(Box::pin(ReceiverStream::new(receiver)))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Appends `path` to the base URI's path.
fn endpoint(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let joined = format!("{}/{}", base.path().trim_end_matches('/'), path.trim_start_matches('/'));
    url.set_path(&joined);
    url
}

/// Reads a response body while enforcing a hard byte limit.
async fn read_body_with_limit(
    mut response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, PdpError> {
    let mut body = Vec::new();
    while let Some(chunk) =
        response.chunk().await.map_err(|err| PdpError::Transport(err.to_string()))?
    {
        if body.len().saturating_add(chunk.len()) > limit {
            return Err(PdpError::Decode(format!("response exceeds {limit} bytes")));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Decodes a streamed body into `sender` until the body or the consumer ends.
async fn pump_stream(
    mut response: reqwest::Response,
    sender: mpsc::Sender<Result<Decision, PdpError>>,
    max_message_bytes: usize,
) {
    let mut framer = DecisionFramer::new(max_message_bytes);
    loop {
        let chunk = tokio::select! {
            () = sender.closed() => return,
            chunk = response.chunk() => chunk,
        };
        let items = match chunk {
            Ok(Some(bytes)) => framer.push(&bytes),
            Ok(None) => {
                for item in framer.finish() {
                    if sender.send(item).await.is_err() {
                        return;
                    }
                }
                return;
            }
            Err(err) => {
                let _ = sender.send(Err(PdpError::Transport(err.to_string()))).await;
                return;
            }
        };
        for item in items {
            if sender.send(item).await.is_err() {
                return;
            }
        }
    }
}
