//! Delivery transport port.
//!
//! The dispatcher depends only on [`DeliveryTransport`]; the reqwest-backed
//! implementation lives in the `mattermost` crate and tests substitute their
//! own.

use async_trait::async_trait;

use crate::{EndpointUrl, MessageEnvelope, TransportError};

/// Capability to POST a JSON envelope and report the response status.
///
/// Implementations send exactly one request per call with
/// `Content-Type: application/json` and never retry. Any HTTP response,
/// whatever its status, is `Ok(status)`. Only a request that could not be
/// completed is an error.
///
/// The dispatcher imposes no deadline of its own. An implementation that
/// needs bounded latency must enforce a timeout and report it as
/// [`TransportError::Timeout`].
#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    async fn post_json(
        &self,
        endpoint: &EndpointUrl,
        envelope: &MessageEnvelope,
    ) -> Result<u16, TransportError>;
}
