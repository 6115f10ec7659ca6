//! Error types for the trust engine.
//!
//! Callers need to tell three situations apart:
//!
//! | Class | Method | Examples |
//! |-------|--------|----------|
//! | Retry later | [`EngineError::is_retryable`] | assessor timeout, rate limit, quorum lost to transient failures |
//! | Permanent halt | [`EngineError::is_permanent_halt`] | exchange submitted to a TERMINATED session |
//! | Caller misuse | [`EngineError::is_caller_misuse`] | empty assessment set, invalid configuration |

use thiserror::Error;
use vigil_council::CouncilError;
use vigil_monitor::MonitorError;

/// Core error type for engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The session is TERMINATED. It never accepts another exchange;
    /// continuing requires opening a new session.
    #[error("Session '{session_id}' is terminated")]
    StateTerminated {
        /// The halted session.
        session_id: String,
    },

    /// A caller precondition was violated.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Council error passthrough.
    #[error("Council error: {0}")]
    Council(#[from] CouncilError),

    /// Monitor error passthrough.
    #[error("Monitor error: {0}")]
    Monitor(MonitorError),
}

impl From<MonitorError> for EngineError {
    fn from(err: MonitorError) -> Self {
        match err {
            MonitorError::SessionTerminated { session_id } => {
                EngineError::StateTerminated { session_id }
            }
            MonitorError::InvalidConfig(msg) => EngineError::Config(msg),
            other => EngineError::Monitor(other),
        }
    }
}

impl EngineError {
    /// True if the same exchange may succeed when submitted again later.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Council(err) => err.is_transient(),
            _ => false,
        }
    }

    /// True if the session is permanently halted.
    pub fn is_permanent_halt(&self) -> bool {
        matches!(self, EngineError::StateTerminated { .. })
    }

    /// True for programming or configuration errors on the caller's side.
    pub fn is_caller_misuse(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidInput(_)
                | EngineError::Config(_)
                | EngineError::Council(CouncilError::InvalidInput(_))
                | EngineError::Monitor(MonitorError::InvalidObservation(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_council::FailureKind;

    #[test]
    fn test_terminated_maps_to_permanent_halt() {
        let err: EngineError = MonitorError::SessionTerminated {
            session_id: "s".to_string(),
        }
        .into();
        assert!(err.is_permanent_halt());
        assert!(!err.is_retryable());
        assert!(!err.is_caller_misuse());
    }

    #[test]
    fn test_transient_failure_is_retryable() {
        let err: EngineError = CouncilError::AssessorFailure {
            assessor: "a".to_string(),
            kind: FailureKind::RateLimited,
        }
        .into();
        assert!(err.is_retryable());
        assert!(!err.is_permanent_halt());
    }

    #[test]
    fn test_malformed_is_not_retryable() {
        let err: EngineError = CouncilError::AssessorFailure {
            assessor: "a".to_string(),
            kind: FailureKind::malformed("nope", "not valid JSON"),
        }
        .into();
        assert!(!err.is_retryable());
        assert!(!err.is_caller_misuse());
    }

    #[test]
    fn test_misuse_classes() {
        assert!(EngineError::Config("x".to_string()).is_caller_misuse());
        assert!(EngineError::from(CouncilError::InvalidInput("empty".to_string())).is_caller_misuse());
        assert!(EngineError::from(MonitorError::InvalidObservation("nan".to_string())).is_caller_misuse());
        assert!(matches!(
            EngineError::from(MonitorError::InvalidConfig("bad".to_string())),
            EngineError::Config(_)
        ));
    }
}
