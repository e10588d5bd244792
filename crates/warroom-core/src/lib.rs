//! Shared vocabulary for the war-room discussion engine: ids, the
//! patient case model, phases, transcript messages, the event protocol,
//! the specialist catalog, and the responder seam.

pub mod case;
pub mod errors;
pub mod events;
pub mod ids;
pub mod messages;
pub mod phases;
pub mod registry;
pub mod responder;

pub use case::{CaseError, DiscussionRequest, LabResult, PatientCase, Urgency, Vitals};
pub use errors::ResponderError;
pub use events::{
    Consensus, Differential, DiscussionEvent, EventEnvelope, RiskLevel, TriageSummary,
};
pub use ids::{MessageId, RunId};
pub use messages::{AgentMessage, Transcript};
pub use phases::{DiscussionPhase, SPEAKING_PHASES};
pub use registry::{Domain, Specialist};
pub use responder::{AgentReply, AgentResponder, ResponderCall, ResponderRole};
