//! Dispatcher and outcome collector for the Jira → Mattermost bridge.
//!
//! [`Dispatcher::submit`] starts one tokio task per issue event and returns an
//! [`OutcomeHandle`] at once. The task renders the message, resolves the
//! route, posts through the injected [`bridge::DeliveryTransport`], and
//! publishes exactly one [`bridge::Outcome`]. [`OutcomeCollector`] consumes the
//! handle and folds the outcome into the shared [`bridge::Counters`].
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** This crate sequences calls between the domain
//! logic in [`bridge`] and the transport port. It contains no domain rules of
//! its own.
//!
//! ## Timeouts and cancellation
//!
//! A dispatch unit has no deadline of its own: a hung destination holds it
//! open until the transport gives up. Callers needing bounded latency must
//! supply a transport that enforces a timeout. A unit that is cancelled or
//! panics still publishes, through the drop guard on its sender, a
//! `TransportFailed` outcome with detail [`ABORTED_DETAIL`].

mod collector;
mod dispatcher;
mod handle;

pub use collector::{OutcomeCollector, RESULT_ABANDONED};
pub use dispatcher::{DispatchState, Dispatcher};
pub use handle::{OutcomeHandle, ABORTED_DETAIL};
