//! Error types for the bridge domain.
//!
//! Only [`BridgeError`] can stop the process, and only at startup. The
//! per-event errors ([`ParseError`], [`RenderError`], [`TransportError`]) never
//! escape a dispatch unit: parse failures are rejected at the receiver, while
//! render and transport failures terminate in an `Outcome`.
//!
//! "Project not mapped" is not an error. It is a routine outcome category
//! (`StatusCategory::NotMapped`).

use thiserror::Error;

// ---------------------------------------------------------------------------
// Startup errors
// ---------------------------------------------------------------------------

/// Errors that prevent the bridge from starting.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// The configuration (route table, delivery identity) is invalid.
    ///
    /// Produced at load time; the dispatcher is never constructed with an
    /// invalid configuration.
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Description of the configuration problem.
        message: String,
    },
}

impl BridgeError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-event errors
// ---------------------------------------------------------------------------

/// An inbound webhook payload could not be turned into an `IssueEvent`.
///
/// Produced by the payload parser before the event reaches the dispatcher and
/// surfaced to the webhook caller as a client error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The body is not valid JSON or does not have the expected shape.
    #[error("invalid webhook payload: {message}")]
    InvalidPayload {
        /// Deserializer message, including line and column.
        message: String,
    },

    /// A field the bridge cannot work without is absent or empty.
    #[error("webhook payload is missing required field `{field}`")]
    MissingField {
        /// Dotted JSON path of the missing field.
        field: &'static str,
    },
}

/// The message template could not be filled in.
///
/// Should not occur for a well-formed event; when it does it points at a
/// defect in the template, not at the event, so it is logged as an error and
/// never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("message template could not be rendered: {message}")]
pub struct RenderError {
    /// What went wrong while formatting.
    pub message: String,
}

/// A delivery POST could not be completed at the transport level.
///
/// HTTP error statuses are *not* transport errors: a response of any status
/// counts as delivered.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The connection could not be established (refused, DNS failure, TLS).
    #[error("connection to {endpoint} failed: {message}")]
    Connect {
        /// Target of the failed request.
        endpoint: String,
        /// Underlying client message.
        message: String,
    },

    /// The transport's own deadline elapsed before a response arrived.
    #[error("request to {endpoint} timed out: {message}")]
    Timeout {
        /// Target of the timed-out request.
        endpoint: String,
        /// Underlying client message.
        message: String,
    },

    /// Any other failure while sending the request or reading the response.
    #[error("request to {endpoint} failed: {message}")]
    Request {
        /// Target of the failed request.
        endpoint: String,
        /// Underlying client message.
        message: String,
    },
}
