//! The discussion engine: triage parsing, panel selection, phased
//! sequencing, conflict detection, and consensus synthesis.

pub mod conflict;
pub mod consensus;
pub mod error;
pub mod pacing;
pub mod runner;
pub mod selector;
pub mod stream;
pub mod triage;

pub use conflict::{ConflictDetector, LexicalConflictDetector, CONFLICT_WINDOW};
pub use error::EngineError;
pub use pacing::{FixedPacing, NoPacing, PacingStrategy, DEFAULT_AGENT_PACING};
pub use runner::{DiscussionRunner, RunSummary, RunnerConfig, DEFAULT_CALL_TIMEOUT};
pub use selector::{select_panel, DEFAULT_PANEL, MAX_PANEL, MIN_PANEL};
pub use stream::{DiscussionStream, EVENT_CHANNEL_CAPACITY};
pub use triage::parse_triage;
