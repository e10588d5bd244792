//! Telemetry for the war-room service: structured JSON logs through
//! `tracing` and an in-memory metrics recorder.

mod metrics;

pub use metrics::{HistogramSummary, MetricsRecorder};

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Configuration for the telemetry subsystem.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Default log level. Overridden by RUST_LOG env var.
    pub log_level: Level,
    /// Per-module level overrides (e.g. "warroom_engine" => DEBUG).
    pub module_levels: Vec<(String, Level)>,
    /// Whether metrics recording is enabled.
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            module_levels: Vec::new(),
            metrics_enabled: true,
        }
    }
}

/// Handle to the live telemetry state.
pub struct TelemetryGuard {
    metrics_recorder: Option<Arc<MetricsRecorder>>,
    level_filter: Arc<RwLock<Vec<(String, Level)>>>,
}

impl TelemetryGuard {
    /// Change the recorded log level for a specific module at runtime.
    pub fn set_module_level(&self, module: &str, level: Level) {
        let mut levels = self.level_filter.write();
        if let Some(entry) = levels.iter_mut().find(|(m, _)| m == module) {
            entry.1 = level;
        } else {
            levels.push((module.to_string(), level));
        }
    }

    /// Current per-module log level overrides.
    pub fn module_levels(&self) -> Vec<(String, Level)> {
        self.level_filter.read().clone()
    }

    /// The metrics recorder, when metrics are enabled.
    pub fn metrics(&self) -> Option<&Arc<MetricsRecorder>> {
        self.metrics_recorder.as_ref()
    }
}

/// Initialize the telemetry subsystem. Call once at startup.
pub fn init_telemetry(config: TelemetryConfig) -> TelemetryGuard {
    let level_filter = Arc::new(RwLock::new(config.module_levels.clone()));

    // Build the env filter from config
    let mut filter_str = config.log_level.to_string().to_lowercase();
    for (module, level) in &config.module_levels {
        filter_str.push_str(&format!(",{}={}", module, level.to_string().to_lowercase()));
    }
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    // JSON formatting layer for stdout
    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_target(true)
        .with_span_list(true)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(fmt_layer).init();

    let metrics_recorder = config
        .metrics_enabled
        .then(|| Arc::new(MetricsRecorder::new()));

    TelemetryGuard {
        metrics_recorder,
        level_filter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_levels_can_be_adjusted_at_runtime() {
        let guard = TelemetryGuard {
            metrics_recorder: Some(Arc::new(MetricsRecorder::new())),
            level_filter: Arc::new(RwLock::new(vec![(
                "warroom_server".to_string(),
                Level::INFO,
            )])),
        };
        guard.set_module_level("warroom_server", Level::DEBUG);
        guard.set_module_level("warroom_engine", Level::TRACE);
        let levels = guard.module_levels();
        assert!(levels.contains(&("warroom_server".to_string(), Level::DEBUG)));
        assert!(levels.contains(&("warroom_engine".to_string(), Level::TRACE)));
    }

    #[test]
    fn disabled_metrics_yield_no_recorder() {
        let guard = TelemetryGuard {
            metrics_recorder: None,
            level_filter: Arc::new(RwLock::new(Vec::new())),
        };
        assert!(guard.metrics().is_none());
    }
}
