use std::time::Duration;

use warroom_core::errors::ResponderError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("consensus synthesis failed: {0}")]
    Consensus(ResponderError),

    #[error("run aborted")]
    Aborted,

    #[error("run timeout after {0:?}")]
    RunTimeout(Duration),
}

impl EngineError {
    /// True when the run ended because the caller went away, not
    /// because anything went wrong.
    pub fn is_abort(&self) -> bool {
        matches!(self, EngineError::Aborted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consensus_errors_carry_the_cause() {
        let err = EngineError::Consensus(ResponderError::Timeout(Duration::from_secs(60)));
        assert!(err.to_string().contains("consensus synthesis failed"));
        assert!(err.to_string().contains("60s"));
        assert!(!err.is_abort());
    }

    #[test]
    fn abort_is_not_a_failure() {
        assert!(EngineError::Aborted.is_abort());
        assert!(!EngineError::RunTimeout(Duration::from_secs(180)).is_abort());
    }
}
