use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use warroom_core::responder::AgentResponder;
use warroom_engine::{DiscussionRunner, FixedPacing, DEFAULT_AGENT_PACING};
use warroom_telemetry::MetricsRecorder;

use crate::remote::{BackendRouter, REMOTE_PROBE_TIMEOUT};
use crate::routes;
use crate::runs::RunRegistry;

/// Soft per-run deadline enforced by the hosting layer.
pub const DEFAULT_RUN_DEADLINE: Duration = Duration::from_secs(180);

/// Server configuration.
pub struct ServerConfig {
    pub port: u16,
    /// Remote orchestration service base URL; `None` disables routing.
    pub remote_url: Option<String>,
    pub probe_timeout: Duration,
    pub run_deadline: Duration,
    pub agent_pacing: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 9091,
            remote_url: None,
            probe_timeout: REMOTE_PROBE_TIMEOUT,
            run_deadline: DEFAULT_RUN_DEADLINE,
            agent_pacing: DEFAULT_AGENT_PACING,
        }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<DiscussionRunner>,
    pub router: Arc<BackendRouter>,
    pub runs: Arc<RunRegistry>,
    pub run_deadline: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("bind failed: {0}")]
    Bind(#[from] std::io::Error),

    #[error("server bootstrap failed: {0}")]
    Bootstrap(String),
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/team-discussion", post(routes::team_discussion))
        .route("/health", get(routes::health))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Wire up the engine and start serving. Returns a handle carrying the
/// bound port and shutdown controls.
pub async fn start(
    config: ServerConfig,
    responder: Arc<dyn AgentResponder>,
    metrics: Option<Arc<MetricsRecorder>>,
) -> Result<ServerHandle, ServerError> {
    let mut backend = BackendRouter::new(config.remote_url.clone(), config.probe_timeout)
        .map_err(|e| ServerError::Bootstrap(e.to_string()))?;
    if let Some(metrics) = &metrics {
        backend = backend.with_metrics(Arc::clone(metrics));
    }

    let mut runner = DiscussionRunner::new(responder)
        .with_pacing(Arc::new(FixedPacing::new(config.agent_pacing)));
    if let Some(metrics) = &metrics {
        runner = runner.with_metrics(Arc::clone(metrics));
    }

    let runs = Arc::new(RunRegistry::new(metrics));

    let state = AppState {
        runner: Arc::new(runner),
        router: Arc::new(backend),
        runs: Arc::clone(&runs),
        run_deadline: config.run_deadline,
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(port = local_addr.port(), "war room server started");

    let server = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        runs,
        _server: server,
    })
}

/// Handle returned by `start()`.
pub struct ServerHandle {
    pub port: u16,
    runs: Arc<RunRegistry>,
    _server: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    pub fn active_runs(&self) -> usize {
        self.runs.active_count()
    }

    /// Cancel every in-flight discussion. Used on shutdown.
    pub fn abort_all_runs(&self) {
        self.runs.abort_all();
    }
}
