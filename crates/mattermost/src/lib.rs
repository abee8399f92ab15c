//! Mattermost incoming-webhook transport.
//!
//! Implements [`bridge::DeliveryTransport`] over `reqwest`. One call is one
//! POST of the JSON envelope; nothing is retried.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP client construction, timeouts, and the mapping
//! from client errors to [`bridge::TransportError`] live here. The dispatcher
//! sees only the port.
//!
//! ## Timeouts
//!
//! [`TransportConfig::timeout`] defaults to `None`, which leaves the client
//! without an overall request deadline. A destination that accepts the
//! connection and never answers then holds its dispatch unit open. Set a
//! timeout when bounded latency matters; it is reported as
//! [`bridge::TransportError::Timeout`].

use std::time::Duration;

use async_trait::async_trait;
use bridge::{DeliveryTransport, EndpointUrl, MessageEnvelope, TransportError};
use thiserror::Error;
use tracing::{debug, warn};

/// Most bytes of a rejection body copied into the log record.
const BODY_PREVIEW_LIMIT: usize = 512;

/// Settings for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Overall deadline for one request. `None` means no deadline.
    pub timeout: Option<Duration>,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            user_agent: concat!("mmjira/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// The HTTP client could not be built.
#[derive(Debug, Error)]
#[error("failed to build HTTP client: {0}")]
pub struct TransportBuildError(#[from] reqwest::Error);

/// `reqwest`-backed [`DeliveryTransport`].
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds a transport with the given settings.
    ///
    /// # Errors
    ///
    /// Returns [`TransportBuildError`] if the TLS backend cannot be initialised.
    pub fn new(config: TransportConfig) -> Result<Self, TransportBuildError> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Builds a transport with [`TransportConfig::default`].
    pub fn with_defaults() -> Result<Self, TransportBuildError> {
        Self::new(TransportConfig::default())
    }
}

#[async_trait]
impl DeliveryTransport for HttpTransport {
    async fn post_json(
        &self,
        endpoint: &EndpointUrl,
        envelope: &MessageEnvelope,
    ) -> Result<u16, TransportError> {
        // `json` sets `Content-Type: application/json`.
        let response = self
            .client
            .post(endpoint.as_str())
            .json(envelope)
            .send()
            .await
            .map_err(|e| classify(endpoint, &e))?;

        let status = response.status().as_u16();
        if response.status().is_success() {
            debug!(endpoint = %endpoint, status, "Mattermost accepted the message");
        } else {
            let body = body_preview(response, BODY_PREVIEW_LIMIT).await;
            warn!(endpoint = %endpoint, status, body = %body, "Mattermost rejected the message");
        }
        Ok(status)
    }
}

/// Reads at most `limit` bytes of the response body, lossily decoded.
///
/// Stops pulling chunks once the limit is reached, so an oversized body is
/// never buffered in full. Read errors end the preview early.
async fn body_preview(mut response: reqwest::Response, limit: usize) -> String {
    let mut preview = Vec::new();
    while preview.len() < limit {
        match response.chunk().await {
            Ok(Some(chunk)) => preview.extend_from_slice(&chunk),
            Ok(None) | Err(_) => break,
        }
    }
    preview.truncate(limit);
    String::from_utf8_lossy(&preview).into_owned()
}

fn classify(endpoint: &EndpointUrl, error: &reqwest::Error) -> TransportError {
    let endpoint = endpoint.to_string();
    let message = error.to_string();
    if error.is_timeout() {
        TransportError::Timeout { endpoint, message }
    } else if error.is_connect() {
        TransportError::Connect { endpoint, message }
    } else {
        TransportError::Request { endpoint, message }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    use super::*;

    fn envelope() -> MessageEnvelope {
        MessageEnvelope {
            icon_url: "https://icons.example/jira.png".to_string(),
            username: "jira-bot".to_string(),
            text: "# JIRA 42".to_string(),
        }
    }

    fn endpoint(server: &MockServer, path: &str) -> EndpointUrl {
        EndpointUrl::new(format!("{}{path}", server.uri())).unwrap()
    }

    #[tokio::test]
    async fn posts_envelope_as_json() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/hooks/abc"))
            .and(matchers::header("content-type", "application/json"))
            .and(matchers::body_json(json!({
                "icon_url": "https://icons.example/jira.png",
                "username": "jira-bot",
                "text": "# JIRA 42",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::with_defaults().unwrap();
        let status = transport
            .post_json(&endpoint(&server, "/hooks/abc"), &envelope())
            .await
            .unwrap();

        assert_eq!(status, 200);
    }

    #[tokio::test]
    async fn error_status_is_returned_not_raised() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let transport = HttpTransport::with_defaults().unwrap();
        let status = transport
            .post_json(&endpoint(&server, "/hooks/abc"), &envelope())
            .await
            .unwrap();

        assert_eq!(status, 500);
    }

    #[tokio::test]
    async fn rejection_body_preview_is_truncated() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("x".repeat(10_000)))
            .mount(&server)
            .await;

        let response = reqwest::get(format!("{}/hooks/abc", server.uri())).await.unwrap();
        let preview = body_preview(response, BODY_PREVIEW_LIMIT).await;

        assert_eq!(preview.len(), BODY_PREVIEW_LIMIT);
        assert!(preview.chars().all(|c| c == 'x'));
    }

    #[tokio::test]
    async fn short_rejection_body_is_kept_whole() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid payload"))
            .mount(&server)
            .await;

        let response = reqwest::get(format!("{}/hooks/abc", server.uri())).await.unwrap();

        assert_eq!(body_preview(response, BODY_PREVIEW_LIMIT).await, "invalid payload");
    }

    #[tokio::test]
    async fn refused_connection_is_a_connect_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let unreachable = EndpointUrl::new(format!("http://127.0.0.1:{port}/hooks/abc")).unwrap();

        let transport = HttpTransport::with_defaults().unwrap();
        let err = transport
            .post_json(&unreachable, &envelope())
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Connect { .. }), "got {err:?}");
        assert!(!err.to_string().is_empty());
    }

    #[tokio::test]
    async fn slow_destination_times_out_when_configured() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(TransportConfig {
            timeout: Some(Duration::from_millis(50)),
            ..TransportConfig::default()
        })
        .unwrap();
        let err = transport
            .post_json(&endpoint(&server, "/hooks/abc"), &envelope())
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Timeout { .. }), "got {err:?}");
    }
}
