//! Primary/fallback backend routing.
//!
//! When a remote orchestration service is configured, every discussion
//! request is first offered to it; the local engine only runs when the
//! remote is absent or unreachable. The engine itself never learns
//! routing exists.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use warroom_core::case::DiscussionRequest;
use warroom_telemetry::MetricsRecorder;

/// How long the probe waits for response headers from the remote.
pub const REMOTE_PROBE_TIMEOUT: Duration = Duration::from_secs(120);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const BODY_SNIPPET_LEN: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum RemoteProbeError {
    #[error("remote connection refused")]
    ConnectionRefused,

    #[error("remote probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("remote returned status {status}: {body}")]
    BadStatus { status: u16, body: String },

    #[error("remote transport error: {0}")]
    Transport(String),
}

impl RemoteProbeError {
    /// Quiet failures mean the remote is simply not there, which is an
    /// expected deployment state: log at debug. Everything else warns.
    pub fn is_quiet(&self) -> bool {
        matches!(self, Self::ConnectionRefused | Self::Timeout(_))
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Self::ConnectionRefused => "connection_refused",
            Self::Timeout(_) => "timeout",
            Self::BadStatus { .. } => "bad_status",
            Self::Transport(_) => "transport",
        }
    }
}

/// Where one request will be served.
pub enum RouteOutcome {
    /// Remote accepted; its byte stream is proxied verbatim.
    Remote(reqwest::Response),
    /// Run the local engine.
    Local,
}

pub struct BackendRouter {
    client: reqwest::Client,
    remote_url: Option<String>,
    probe_timeout: Duration,
    metrics: Option<Arc<MetricsRecorder>>,
}

impl BackendRouter {
    pub fn new(
        remote_url: Option<String>,
        probe_timeout: Duration,
    ) -> Result<Self, RemoteProbeError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| RemoteProbeError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            remote_url,
            probe_timeout,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn has_remote(&self) -> bool {
        self.remote_url.is_some()
    }

    /// Decide where this request runs. Never fails: every probe error
    /// falls back to the local engine.
    pub async fn route(&self, request: &DiscussionRequest) -> RouteOutcome {
        let Some(base) = &self.remote_url else {
            return RouteOutcome::Local;
        };
        match self.probe(base, request).await {
            Ok(response) => {
                info!(remote = %base, "routing discussion to remote backend");
                self.count("backend.remote", &[]);
                RouteOutcome::Remote(response)
            }
            Err(err) => {
                if err.is_quiet() {
                    debug!(error = %err, "remote unavailable, using local engine");
                } else {
                    warn!(error = %err, "remote probe failed, using local engine");
                }
                self.count("backend.fallbacks", &[("reason", err.reason())]);
                RouteOutcome::Local
            }
        }
    }

    async fn probe(
        &self,
        base: &str,
        request: &DiscussionRequest,
    ) -> Result<reqwest::Response, RemoteProbeError> {
        let url = format!("{}/api/team-discussion", base.trim_end_matches('/'));
        let send = self.client.post(&url).json(request).send();
        let response = match tokio::time::timeout(self.probe_timeout, send).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => return Err(self.classify(err)),
            Err(_) => return Err(RemoteProbeError::Timeout(self.probe_timeout)),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteProbeError::BadStatus {
                status: status.as_u16(),
                body: body.chars().take(BODY_SNIPPET_LEN).collect(),
            });
        }
        Ok(response)
    }

    fn classify(&self, err: reqwest::Error) -> RemoteProbeError {
        if err.is_connect() {
            RemoteProbeError::ConnectionRefused
        } else if err.is_timeout() {
            RemoteProbeError::Timeout(self.probe_timeout)
        } else {
            RemoteProbeError::Transport(err.to_string())
        }
    }

    fn count(&self, name: &str, labels: &[(&str, &str)]) {
        if let Some(metrics) = &self.metrics {
            metrics.counter_inc(name, labels, 1);
        }
    }
}
