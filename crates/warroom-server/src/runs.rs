//! Active-run bookkeeping: one cancellation token per in-flight
//! discussion, an active-run gauge, and abort-all for shutdown.

use std::sync::Arc;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use warroom_core::ids::RunId;
use warroom_telemetry::MetricsRecorder;

#[derive(Default)]
pub struct RunRegistry {
    active: DashMap<RunId, CancellationToken>,
    metrics: Option<Arc<MetricsRecorder>>,
}

impl RunRegistry {
    pub fn new(metrics: Option<Arc<MetricsRecorder>>) -> Self {
        Self {
            active: DashMap::new(),
            metrics,
        }
    }

    /// Track a new run. The returned guard deregisters on drop, so a
    /// run cannot leak its registry entry however its task ends.
    pub fn register(self: &Arc<Self>, run_id: RunId) -> RunGuard {
        let token = CancellationToken::new();
        self.active.insert(run_id.clone(), token.clone());
        self.update_gauge();
        debug!(run_id = %run_id, active = self.active.len(), "run registered");
        RunGuard {
            registry: Arc::clone(self),
            run_id,
            token,
        }
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Cancel one run. True when the run was active.
    pub fn abort(&self, run_id: &RunId) -> bool {
        match self.active.get(run_id) {
            Some(entry) => {
                entry.value().cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every active run. Used on shutdown.
    pub fn abort_all(&self) {
        for entry in self.active.iter() {
            entry.value().cancel();
        }
    }

    fn finish(&self, run_id: &RunId) {
        self.active.remove(run_id);
        self.update_gauge();
        debug!(run_id = %run_id, active = self.active.len(), "run deregistered");
    }

    fn update_gauge(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.gauge_set("runs.active", &[], self.active.len() as f64);
        }
    }
}

/// Keeps one run's registry entry alive.
pub struct RunGuard {
    registry: Arc<RunRegistry>,
    run_id: RunId,
    token: CancellationToken,
}

impl RunGuard {
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.registry.finish(&self.run_id);
    }
}
