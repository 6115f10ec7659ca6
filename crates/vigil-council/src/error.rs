//! Error types for the assessor council.
//!
//! Distinguishes failures of the external assessment capability
//! (some transient, some definitive) from caller misuse and from
//! aborted multi-round dialogues.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dialogue::{DialogueTranscript, ParticipantFailure};

/// Why a single assessor call failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The call did not return within its timeout.
    Timeout,
    /// The capability refused the call due to rate limiting.
    RateLimited,
    /// Network or transport level failure.
    Transport(String),
    /// The response could not be parsed into a bounded triple.
    Malformed {
        /// The raw response, kept verbatim for diagnosis.
        raw: String,
        /// What was wrong with it.
        detail: String,
    },
}

impl FailureKind {
    /// Builds a malformed-response failure.
    pub fn malformed(raw: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Malformed {
            raw: raw.into(),
            detail: detail.into(),
        }
    }

    /// Returns true for failure classes that may succeed on a later attempt.
    ///
    /// Malformed responses are definitive and never retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FailureKind::Timeout | FailureKind::RateLimited | FailureKind::Transport(_)
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Timeout => write!(f, "timed out"),
            FailureKind::RateLimited => write!(f, "rate limited"),
            FailureKind::Transport(msg) => write!(f, "transport error: {}", msg),
            FailureKind::Malformed { detail, .. } => write!(f, "malformed response: {}", detail),
        }
    }
}

/// Errors that can occur during council operations.
#[derive(Debug, Error)]
pub enum CouncilError {
    /// A caller precondition was violated (programming error, never retried).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An assessor failed to produce an assessment after its retry budget.
    #[error("Assessor '{assessor}' failed: {kind}")]
    AssessorFailure {
        /// Identifier of the failing assessor.
        assessor: String,
        /// The final failure observed.
        kind: FailureKind,
    },

    /// A single-round fan-out lost too many assessors to stay viable.
    #[error("Quorum lost: {remaining} assessors remain, {required} required")]
    QuorumLost {
        /// Minimum viable participants.
        required: usize,
        /// Participants that produced an assessment.
        remaining: usize,
        /// The failures that caused the loss.
        failures: Vec<ParticipantFailure>,
    },

    /// A dialogue was aborted by its failure policy.
    #[error("Dialogue aborted: {reason}")]
    DialogueAborted {
        /// Why the dialogue stopped.
        reason: String,
        /// Everything collected before the abort.
        transcript: Box<DialogueTranscript>,
    },

    /// The dialogue was cancelled before its first round completed.
    #[error("Dialogue cancelled before the first round completed")]
    Cancelled,
}

impl CouncilError {
    /// Returns true when retrying the whole operation later may succeed.
    ///
    /// That is the case only when every underlying assessor failure is
    /// transient.
    pub fn is_transient(&self) -> bool {
        match self {
            CouncilError::AssessorFailure { kind, .. } => kind.is_transient(),
            CouncilError::QuorumLost { failures, .. } => {
                failures.iter().all(|f| f.kind.is_transient())
            }
            CouncilError::DialogueAborted { transcript, .. } => transcript
                .rounds
                .iter()
                .flat_map(|r| r.failures.iter())
                .all(|f| f.kind.is_transient()),
            CouncilError::InvalidInput(_) | CouncilError::Cancelled => false,
        }
    }

    /// Returns the partial transcript carried by an aborted dialogue.
    pub fn transcript(&self) -> Option<&DialogueTranscript> {
        match self {
            CouncilError::DialogueAborted { transcript, .. } => Some(transcript.as_ref()),
            _ => None,
        }
    }
}
