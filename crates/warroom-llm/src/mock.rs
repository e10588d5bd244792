//! Scripted responder for tests.
//!
//! Replies are consumed in call order, so a test scripts the whole
//! discussion up front: one triage reply, then the specialist turns,
//! then the synthesizer reply.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use warroom_core::responder::{AgentReply, AgentResponder, ResponderCall};
use warroom_core::ResponderError;

#[derive(Clone, Debug)]
pub enum MockReply {
    /// Return this reply.
    Reply(AgentReply),
    /// Fail with this error.
    Error(ResponderError),
    /// Wait, then resolve to the inner reply.
    Delay(Duration, Box<MockReply>),
}

impl MockReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Reply(AgentReply::text(content))
    }

    pub fn text_with_confidence(content: impl Into<String>, confidence: f64) -> Self {
        Self::Reply(AgentReply::text(content).with_confidence(confidence))
    }

    pub fn delayed(delay: Duration, inner: MockReply) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

pub struct MockResponder {
    replies: Vec<MockReply>,
    repeat_last: bool,
    call_count: AtomicUsize,
}

impl MockResponder {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies,
            repeat_last: false,
            call_count: AtomicUsize::new(0),
        }
    }

    /// Like `new`, but once the script runs out the final reply repeats
    /// instead of erroring.
    pub fn repeating(replies: Vec<MockReply>) -> Self {
        Self {
            replies,
            repeat_last: true,
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    async fn resolve(&self, mut reply: MockReply) -> Result<AgentReply, ResponderError> {
        loop {
            match reply {
                MockReply::Delay(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    reply = *inner;
                }
                MockReply::Reply(agent_reply) => return Ok(agent_reply),
                MockReply::Error(error) => return Err(error),
            }
        }
    }
}

#[async_trait]
impl AgentResponder for MockResponder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn respond(&self, _call: ResponderCall<'_>) -> Result<AgentReply, ResponderError> {
        let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
        let reply = if let Some(reply) = self.replies.get(idx) {
            reply.clone()
        } else if self.repeat_last {
            match self.replies.last() {
                Some(last) => last.clone(),
                None => {
                    return Err(ResponderError::InvalidRequest(
                        "MockResponder: empty script".into(),
                    ))
                }
            }
        } else {
            return Err(ResponderError::InvalidRequest(format!(
                "MockResponder: no reply scripted for call {idx}"
            )));
        };
        self.resolve(reply).await
    }
}
