//! Caller-facing evaluation results.

use serde::{Deserialize, Serialize};
use vigil_council::{ConsensusResult, DialogueResult};
use vigil_monitor::{SessionReport, TransitionRecord, TrustState, ViolationKind};

/// What the caller may do with the session after an exchange.
///
/// - `Proceed`: the session is NORMAL, further exchanges may be processed
/// - `Hold`: the session is VIOLATED or RECOVERY, processing is disabled
///   until it recovers
/// - `Halt`: the session is TERMINATED and will never accept input again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateDecision {
    /// Processing enabled.
    Proceed,

    /// Processing disabled pending recovery.
    Hold {
        /// VIOLATED or RECOVERY.
        state: TrustState,
    },

    /// Permanently halted. Requires external intervention.
    Halt,
}

impl GateDecision {
    /// Derives the decision from a trust state.
    pub fn from_state(state: TrustState) -> Self {
        match state {
            TrustState::Normal => Self::Proceed,
            TrustState::Violated | TrustState::Recovery => Self::Hold { state },
            TrustState::Terminated => Self::Halt,
        }
    }

    /// Returns true if processing may continue.
    pub fn is_proceed(&self) -> bool {
        matches!(self, Self::Proceed)
    }

    /// Returns true if processing is held.
    pub fn is_held(&self) -> bool {
        matches!(self, Self::Hold { .. })
    }

    /// Returns true if the session is permanently halted.
    pub fn is_halted(&self) -> bool {
        matches!(self, Self::Halt)
    }
}

/// Everything one evaluation produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationOutcome {
    /// The aggregate over every assessment collected.
    pub consensus: ConsensusResult,

    /// Session snapshot after the exchange.
    pub session: SessionReport,

    /// Gate decision for the next exchange.
    pub decision: GateDecision,

    /// Violation detected on this exchange, if any.
    pub violation: Option<ViolationKind>,

    /// Transitions fired, in order.
    pub transitions: Vec<TransitionRecord>,

    /// The full dialogue, for dialogue evaluations.
    pub dialogue: Option<DialogueResult>,
}

impl EvaluationOutcome {
    /// Shortcut for `session.processing_enabled`.
    pub fn processing_enabled(&self) -> bool {
        self.session.processing_enabled
    }

    /// Shortcut for `session.boundary_testing`.
    pub fn boundary_testing(&self) -> bool {
        self.session.boundary_testing
    }
}
