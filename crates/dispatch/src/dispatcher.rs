//! The dispatcher: one concurrent dispatch unit per submitted event.
//!
//! A dispatch unit moves through `Rendering → Routing → Posting → Completed`,
//! leaving early for `Completed` with a failure category when a step fails.
//! Every path ends with exactly one published [`Outcome`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bridge::metrics::{ALL_PROJECTS, OP_SUBMITTED, RESULT_TOTAL};
use bridge::{
    Correlation, Counters, DeliveryIdentity, DeliveryTransport, IssueEvent, MessageEnvelope,
    Outcome, RouteTable,
};
use tracing::{debug, info_span, Instrument};

use crate::handle::{InFlight, OutcomeHandle, OutcomeSender};

/// Steps of a dispatch unit, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Rendering,
    Routing,
    Posting,
    Completed,
}

/// Renders, routes, and posts issue events without blocking the caller.
///
/// Cheap to clone; clones share the route table, the transport, the counters,
/// and the in-flight tracker.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    routes: Arc<RouteTable>,
    identity: DeliveryIdentity,
    transport: Arc<dyn DeliveryTransport>,
    counters: Arc<Counters>,
    in_flight: Arc<InFlight>,
}

impl Dispatcher {
    /// Creates a dispatcher over an already-loaded route table.
    pub fn new(
        routes: Arc<RouteTable>,
        identity: DeliveryIdentity,
        transport: Arc<dyn DeliveryTransport>,
        counters: Arc<Counters>,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                routes,
                identity,
                transport,
                counters,
                in_flight: Arc::new(InFlight::default()),
            }),
        }
    }

    /// Starts a dispatch unit for `event` and returns immediately.
    ///
    /// The returned handle yields exactly one outcome. Must be called from
    /// within a tokio runtime.
    pub fn submit(&self, event: IssueEvent) -> OutcomeHandle {
        let correlation = Correlation::for_event(&event);
        let counters = &self.inner.counters;
        counters.increment(OP_SUBMITTED, ALL_PROJECTS, RESULT_TOTAL);
        counters.increment(OP_SUBMITTED, event.project.as_str(), RESULT_TOTAL);

        let span = info_span!(
            "dispatch",
            submission = %correlation.submission,
            project = %correlation.project,
            issue_id = %correlation.issue_id,
        );
        let (mut sender, handle) =
            OutcomeSender::channel(correlation.clone(), Arc::clone(&self.inner.in_flight));
        let inner = Arc::clone(&self.inner);

        tokio::spawn(
            async move {
                let outcome = inner.run(correlation, &event).await;
                debug!(
                    state = ?DispatchState::Completed,
                    status = %outcome.status,
                    "Publishing outcome"
                );
                sender.publish(outcome);
            }
            .instrument(span),
        );

        handle
    }

    /// Counters shared with the collector and the metrics endpoint.
    pub fn counters(&self) -> Arc<Counters> {
        Arc::clone(&self.inner.counters)
    }

    /// Route table the dispatcher resolves against.
    pub fn routes(&self) -> &RouteTable {
        &self.inner.routes
    }

    /// Number of dispatch units that have not completed yet.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.current()
    }

    /// Waits until no dispatch unit is running, for at most `grace`.
    ///
    /// Returns `true` if the dispatcher went idle in time.
    pub async fn drain(&self, grace: Duration) -> bool {
        tokio::time::timeout(grace, self.inner.in_flight.wait_idle())
            .await
            .is_ok()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.inner.routes.len())
            .field("identity", &self.inner.identity)
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}

impl DispatcherInner {
    async fn run(&self, correlation: Correlation, event: &IssueEvent) -> Outcome {
        debug!(state = ?DispatchState::Rendering, "Rendering message");
        let text = match bridge::render(event) {
            Ok(text) => text,
            Err(e) => return correlation.render_failed(e.to_string()),
        };

        debug!(state = ?DispatchState::Routing, "Resolving route");
        let Some(endpoint) = self.routes.resolve(&event.project) else {
            return correlation.not_mapped();
        };

        debug!(state = ?DispatchState::Posting, endpoint = %endpoint, "Posting message");
        let envelope = MessageEnvelope::new(&self.identity, text);
        match self.transport.post_json(endpoint, &envelope).await {
            Ok(status) => correlation.delivered(endpoint, status),
            Err(e) => correlation.transport_failed(endpoint.as_str(), e.to_string()),
        }
    }
}
