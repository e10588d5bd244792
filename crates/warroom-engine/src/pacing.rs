//! Pacing between specialist turns so a streaming client renders the
//! discussion as a conversation rather than a burst.

use std::time::Duration;

use async_trait::async_trait;

pub const DEFAULT_AGENT_PACING: Duration = Duration::from_millis(300);

#[async_trait]
pub trait PacingStrategy: Send + Sync {
    /// Awaited after each specialist turn.
    async fn pause(&self);
}

/// Fixed delay between turns.
pub struct FixedPacing {
    delay: Duration,
}

impl FixedPacing {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixedPacing {
    fn default() -> Self {
        Self::new(DEFAULT_AGENT_PACING)
    }
}

#[async_trait]
impl PacingStrategy for FixedPacing {
    async fn pause(&self) {
        tokio::time::sleep(self.delay).await;
    }
}

/// No delay at all. Used by tests.
pub struct NoPacing;

#[async_trait]
impl PacingStrategy for NoPacing {
    async fn pause(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fixed_pacing_waits_the_configured_delay() {
        let pacing = FixedPacing::new(Duration::from_millis(200));
        let before = tokio::time::Instant::now();
        pacing.pause().await;
        assert!(before.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn no_pacing_returns_immediately() {
        let before = std::time::Instant::now();
        NoPacing.pause().await;
        assert!(before.elapsed() < Duration::from_millis(50));
    }
}
