//! Error types for the session monitor.

use thiserror::Error;

/// Result type alias for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Errors that can occur while observing a session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MonitorError {
    /// An exchange was submitted to a TERMINATED session.
    ///
    /// This is a permanent halt. The session never leaves TERMINATED;
    /// continuing requires opening a new session.
    #[error("session '{session_id}' is terminated")]
    SessionTerminated {
        /// The halted session.
        session_id: String,
    },

    /// An observation carried out-of-range or non-finite values.
    #[error("invalid observation: {0}")]
    InvalidObservation(String),

    /// A threshold or memory setting is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MonitorError {
    /// Returns true if this error signals a permanently halted session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MonitorError::SessionTerminated { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminated_display() {
        let err = MonitorError::SessionTerminated {
            session_id: "s-1".to_string(),
        };
        assert_eq!(err.to_string(), "session 's-1' is terminated");
        assert!(err.is_terminal());
    }

    #[test]
    fn test_invalid_observation_not_terminal() {
        let err = MonitorError::InvalidObservation("falsehood out of range".to_string());
        assert!(!err.is_terminal());
    }
}
