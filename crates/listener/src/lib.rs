//! HTTP receiver for Jira webhooks.
//!
//! Accepts Jira issue webhooks, parses them with [`jira::parse_issue_event`],
//! hands the resulting event to a [`dispatch::Dispatcher`], and spawns an
//! [`dispatch::OutcomeCollector`] on the returned handle. Also serves the
//! counter snapshot and a liveness probe.
//!
//! ## Endpoints
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | `GET` | `/` | Banner |
//! | `POST` | `/hooks/` | Jira webhook intake (200 once dispatched, 400 on bad payload) |
//! | `GET` | `/hooks/` | Counter snapshot (same as `/metrics`) |
//! | `GET` | `/metrics` | Counter snapshot as JSON, 404 when metrics are disabled |
//! | `GET` | `/health` | Liveness, route count, in-flight dispatch units |
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Routing, extraction, and response codes live here. The
//! handlers contain no delivery logic; they only parse and submit.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dispatch::{Dispatcher, OutcomeCollector};

pub mod dump;
pub mod handlers;

pub use handlers::{
    health_handler, home_handler, intake_handler, metrics_handler, HealthResponse, IntakeError,
    MetricsResponse, RESULT_REJECTED,
};

/// Receiver behaviour switches, taken from configuration.
#[derive(Debug, Clone, Default)]
pub struct ListenerSettings {
    /// Directory inbound requests are dumped to. `None` disables dumping.
    pub dump_dir: Option<PathBuf>,
    /// Whether `/metrics` and `GET /hooks/` serve the counter snapshot.
    pub metrics_enabled: bool,
}

/// Shared application state.
///
/// Passed to all handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    dispatcher: Dispatcher,
    collector: OutcomeCollector,
    settings: ListenerSettings,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, settings: ListenerSettings) -> Self {
        let collector = OutcomeCollector::new(dispatcher.counters());
        AppState {
            inner: Arc::new(AppStateInner {
                dispatcher,
                collector,
                settings,
            }),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    pub fn collector(&self) -> &OutcomeCollector {
        &self.inner.collector
    }

    pub fn dump_dir(&self) -> Option<&Path> {
        self.inner.settings.dump_dir.as_deref()
    }

    pub fn metrics_enabled(&self) -> bool {
        self.inner.settings.metrics_enabled
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::get;

    axum::Router::new()
        .route("/", get(home_handler))
        .route("/hooks/", get(metrics_handler).post(intake_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(app_state)
}
