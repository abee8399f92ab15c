//! mmjira entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: load the YAML instance config named by
//!    `--config` and validate it.
//! 2. **Wire observability**: install the `tracing-subscriber` stack, with an
//!    OTLP exporter when `otlp_endpoint` is set.
//! 3. **Construct infrastructure**: build the route table, the reqwest
//!    transport, and the dispatcher, then hand them to the listener.
//! 4. **Serve until signalled**: run the axum server until SIGINT/SIGTERM,
//!    then drain in-flight dispatch units for up to `shutdown_grace_secs`.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use bridge::{Counters, DeliveryIdentity, RouteTable};
use clap::Parser;
use dispatch::Dispatcher;
use listener::{AppState, ListenerSettings};
use mattermost::{HttpTransport, TransportConfig};
use tokio::net::TcpListener;
use tracing::{info, warn};

mod config;
mod telemetry;

use config::{InstanceConfig, LogFormat};

/// Relays Jira issue webhooks to Mattermost channels.
#[derive(Debug, Parser)]
#[command(name = "mmjira", version, about)]
struct Args {
    /// Path to the YAML instance configuration.
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Overrides `log_format` from the configuration file.
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = InstanceConfig::load(&args.config)?;

    let telemetry = telemetry::init(
        args.log_format.unwrap_or(config.log_format),
        config.debug,
        config.otlp_endpoint.as_deref(),
    )?;

    let result = run(config).await;
    if let Err(e) = &result {
        tracing::error!(error = ?e, "mmjira stopped with an error");
    }
    telemetry.shutdown();
    result
}

async fn run(config: InstanceConfig) -> Result<()> {
    info!(
        host = %config.host,
        port = config.port,
        metrics = config.metrics,
        debug = config.debug,
        hooks = config.hooks.len(),
        "Configuration loaded"
    );
    if let Some(profile) = &config.profile {
        warn!(profile = %profile, "Profiling is not supported; `profile` is ignored");
    }

    let dispatcher = build_dispatcher(&config)?;
    let state = AppState::new(dispatcher.clone(), listener_settings(&config));

    let socket = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;
    info!(addr = %socket.local_addr()?, "mmjira is ready to receive webhooks");

    serve(socket, state, &dispatcher, config.shutdown_grace, shutdown_signal()).await
}

/// Builds the dispatcher and its collaborators from configuration.
fn build_dispatcher(config: &InstanceConfig) -> Result<Dispatcher> {
    let routes = RouteTable::from_hooks(&config.hooks).context("invalid `hooks`")?;
    for project in routes.projects() {
        info!(project = %project, "Project mapped");
    }

    let transport = HttpTransport::new(TransportConfig {
        timeout: config.delivery_timeout,
        ..TransportConfig::default()
    })?;

    Ok(Dispatcher::new(
        Arc::new(routes),
        DeliveryIdentity {
            username: config.mm_user.clone(),
            icon_url: config.mm_icon.clone(),
        },
        Arc::new(transport),
        Arc::new(Counters::new()),
    ))
}

fn listener_settings(config: &InstanceConfig) -> ListenerSettings {
    ListenerSettings {
        dump_dir: config.debug.then(|| config.dump_dir.clone()),
        metrics_enabled: config.metrics,
    }
}

/// Serves until `shutdown` resolves, then drains the dispatcher.
async fn serve(
    socket: TcpListener,
    state: AppState,
    dispatcher: &Dispatcher,
    grace: Duration,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    axum::serve(socket, listener::build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    info!(in_flight = dispatcher.in_flight(), "Server stopped, draining dispatch units");
    if dispatcher.drain(grace).await {
        info!("Drain complete");
    } else {
        warn!(
            in_flight = dispatcher.in_flight(),
            grace_secs = grace.as_secs(),
            "Shutdown grace period expired with dispatch units still in flight"
        );
    }
    Ok(())
}

/// Waits for CTRL+C (SIGINT) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
