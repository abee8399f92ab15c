//! One-shot outcome handoff between a dispatch unit and its collector.
//!
//! [`OutcomeSender`] is owned by the dispatch unit and [`OutcomeHandle`] by
//! whoever collects. The sender publishes from `Drop` if the unit never got to
//! publish normally, so a collector is never left waiting on a unit that
//! panicked or was cancelled.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bridge::{Correlation, Outcome, SubmissionId};
use tokio::sync::{oneshot, Notify};

/// Detail of the outcome published for a unit that ended without publishing.
pub const ABORTED_DETAIL: &str = "dispatch unit aborted before publishing an outcome";

/// Receiving side of one submission. Yields at most one [`Outcome`].
#[derive(Debug)]
pub struct OutcomeHandle {
    submission: SubmissionId,
    receiver: oneshot::Receiver<Outcome>,
}

impl OutcomeHandle {
    /// The submission this handle belongs to.
    pub fn submission(&self) -> SubmissionId {
        self.submission
    }

    /// Waits for the outcome.
    ///
    /// Returns `None` only if the sender vanished without publishing, which
    /// the drop guard rules out short of leaking the dispatch unit.
    pub async fn wait(self) -> Option<Outcome> {
        self.receiver.await.ok()
    }
}

/// Tracks how many dispatch units are still running.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    pub(crate) fn current(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    pub(crate) async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.current() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn enter(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    fn leave(&self) {
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Publishing side of one submission, owned by the dispatch unit.
///
/// Counts as in flight from creation until it is dropped.
pub(crate) struct OutcomeSender {
    pending: Option<(Correlation, oneshot::Sender<Outcome>)>,
    in_flight: Arc<InFlight>,
}

impl OutcomeSender {
    /// Creates the channel pair for a new submission.
    pub(crate) fn channel(
        correlation: Correlation,
        in_flight: Arc<InFlight>,
    ) -> (OutcomeSender, OutcomeHandle) {
        let (tx, rx) = oneshot::channel();
        in_flight.enter();
        let handle = OutcomeHandle {
            submission: correlation.submission,
            receiver: rx,
        };
        let sender = OutcomeSender {
            pending: Some((correlation, tx)),
            in_flight,
        };
        (sender, handle)
    }

    /// Publishes the unit's outcome. Later calls and the drop guard are no-ops.
    pub(crate) fn publish(&mut self, outcome: Outcome) {
        if let Some((_, tx)) = self.pending.take() {
            // A dropped handle means nobody collects; the outcome is discarded.
            let _ = tx.send(outcome);
        }
    }
}

impl Drop for OutcomeSender {
    fn drop(&mut self) {
        if let Some((correlation, tx)) = self.pending.take() {
            tracing::error!(
                submission = %correlation.submission,
                project = %correlation.project,
                issue_id = %correlation.issue_id,
                "Dispatch unit ended without an outcome"
            );
            let _ = tx.send(correlation.transport_failed(String::new(), ABORTED_DETAIL));
        }
        self.in_flight.leave();
    }
}
