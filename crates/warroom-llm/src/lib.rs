//! Responder backends: the Cerebras chat-completions client used in
//! production and the scripted mock used in tests.

pub mod mock;
pub mod responder;

pub use mock::{MockReply, MockResponder};
pub use responder::{CerebrasConfig, CerebrasResponder, DEFAULT_API_URL, DEFAULT_MODEL};
