//! Outbound event channel for a single run. The runner emits through
//! this; the hosting layer owns the receiving half and forwards frames
//! to the client.

use tokio::sync::mpsc;
use tracing::debug;
use warroom_core::events::{DiscussionEvent, EventEnvelope};

/// Bounded so a stalled client applies backpressure to the run instead
/// of growing an unbounded buffer.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

pub struct DiscussionStream {
    tx: mpsc::Sender<EventEnvelope>,
}

impl DiscussionStream {
    /// Create a stream and its receiving half.
    pub fn channel() -> (Self, mpsc::Receiver<EventEnvelope>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        (Self { tx }, rx)
    }

    pub fn from_sender(tx: mpsc::Sender<EventEnvelope>) -> Self {
        Self { tx }
    }

    /// Stamp the event and send it. Returns false when the consumer is
    /// gone; the event is dropped, never queued for nobody.
    pub async fn emit(&self, event: DiscussionEvent) -> bool {
        let envelope = EventEnvelope::now(event);
        if self.tx.send(envelope).await.is_err() {
            debug!("consumer disconnected, event dropped");
            return false;
        }
        true
    }

    /// True once the receiving half has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
