//! HTTP hosting for the discussion engine: the SSE endpoint,
//! remote/local backend routing, and active-run bookkeeping.

pub mod remote;
pub mod routes;
pub mod runs;
pub mod server;

pub use remote::{BackendRouter, RemoteProbeError, RouteOutcome, REMOTE_PROBE_TIMEOUT};
pub use runs::{RunGuard, RunRegistry};
pub use server::{start, AppState, ServerConfig, ServerError, ServerHandle, DEFAULT_RUN_DEADLINE};
