//! Core domain of the Jira → Mattermost bridge.
//!
//! This crate contains the event model, the message renderer, the route table,
//! the delivery counters, and the transport port the dispatcher posts through.
//! Infrastructure crates implement the port and produce events; they never add
//! domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; `mattermost` defines *how* messages are posted
//! and `jira` defines how payloads are parsed.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`ProjectKey`, `IssueId`, `EndpointUrl`, `SubmissionId`) |
//! | [`types`] | `IssueEvent`, `Outcome`, `MessageEnvelope`, `DeliveryIdentity` |
//! | [`errors`] | Startup and per-event error types |
//! | [`render`] | Pure event → markdown rendering |
//! | [`routing`] | Case-insensitive project → endpoint table |
//! | [`metrics`] | Monotonic counters and their snapshot |
//! | [`transport`] | The `DeliveryTransport` port |

pub mod errors;
pub mod identifiers;
pub mod metrics;
pub mod render;
pub mod routing;
pub mod transport;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::{BridgeError, ParseError, RenderError, TransportError};
pub use identifiers::{EndpointUrl, IssueId, ProjectKey, SubmissionId};
pub use metrics::{CounterKey, CounterSample, Counters, MetricsSnapshot};
pub use render::render;
pub use routing::RouteTable;
pub use transport::DeliveryTransport;
pub use types::{
    Correlation, DeliveryIdentity, IssueEvent, MessageEnvelope, Outcome, StatusCategory,
    Timestamp,
};
