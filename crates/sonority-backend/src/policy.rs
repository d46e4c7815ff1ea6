//! How engine failures reach the host.

use serde::{Deserialize, Serialize};
use sonority_common::{SoundError, SoundResult};
use sonority_engine::EngineError;
use tracing::warn;

/// Handling of engine call failures in mutating operations.
///
/// Failures are always logged. Revoked voice handles never count as
/// failures. Getters always fall back to cached values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Log and carry on as if the call succeeded
    #[default]
    LogOnly,
    /// Log and return `SoundError::Engine`
    Propagate,
}

impl ErrorPolicy {
    /// Logs a failed engine call and decides whether the caller sees it.
    pub fn settle(self, operation: &'static str, err: &EngineError) -> SoundResult<()> {
        warn!("Engine call {operation} failed: {err}");
        match self {
            Self::LogOnly => Ok(()),
            Self::Propagate => Err(SoundError::engine(operation, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_only_swallows() {
        let policy = ErrorPolicy::LogOnly;
        assert!(policy.settle("set_volume", &EngineError::InvalidParam("volume")).is_ok());
        assert!(policy.settle("set_position", &EngineError::NotReady).is_ok());
    }

    #[test]
    fn test_propagate_returns_engine_error() {
        let policy = ErrorPolicy::Propagate;
        let err = policy
            .settle("set_volume", &EngineError::InvalidParam("volume"))
            .err()
            .expect("propagated");
        assert!(matches!(err, SoundError::Engine { operation: "set_volume", .. }));
    }
}
