//! Session monitor facade.
//!
//! Ties the state machine and session memory together in the order one
//! exchange must be processed:
//!
//! 1. Reject a TERMINATED session
//! 2. Classify the observation (independent of trust)
//! 3. Record it in session memory (EMA only when clean)
//! 4. Advance the state machine (decay on a breach)
//! 5. Recompute the boundary testing flag
//!
//! # Example
//!
//! ```rust
//! use vigil_monitor::{ExchangeObservation, SessionMonitor, TrustState};
//!
//! let monitor = SessionMonitor::default();
//! let mut session = monitor.open_session("session-1");
//!
//! let benign = ExchangeObservation::new(0.9, 0.1, 0.05, 120)?;
//! let outcome = monitor.observe(&mut session, &benign)?;
//! assert_eq!(outcome.report.state, TrustState::Normal);
//!
//! let breach = ExchangeObservation::new(0.1, 0.1, 0.9, 120)?;
//! let outcome = monitor.observe(&mut session, &breach)?;
//! assert!(!outcome.report.processing_enabled);
//! # Ok::<(), vigil_monitor::MonitorError>(())
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::machine::{TransitionRecord, TrustStateMachine, TrustThresholds};
use crate::memory::{BoundaryTesting, MemoryConfig, SessionMemory};
use crate::state::{ExchangeObservation, SessionState, TrustState, ViolationKind};

/// Read-only snapshot of one session for monitoring collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    /// Session identifier.
    pub session_id: String,
    /// Current trust state.
    pub state: TrustState,
    /// Current trust estimate.
    pub trust_estimate: f64,
    /// Whether further exchanges may be processed.
    pub processing_enabled: bool,
    /// Sustained boundary testing flag.
    pub boundary_testing: bool,
    /// Which boundary testing conditions hold.
    pub boundary_conditions: BoundaryTesting,
    /// Exchanges observed.
    pub exchange_count: u64,
    /// Recovery attempts charged.
    pub recovery_attempts: u32,
    /// Violations per kind.
    pub violation_tally: BTreeMap<ViolationKind, u32>,
}

/// Result of observing one exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationOutcome {
    /// Violation detected on this exchange, if any.
    pub violation: Option<ViolationKind>,
    /// Transitions fired, in order.
    pub transitions: Vec<TransitionRecord>,
    /// Snapshot after the exchange.
    pub report: SessionReport,
}

/// Drives one or more sessions through the trust state machine.
///
/// The monitor itself is immutable; each session's [`SessionState`] is
/// owned by the caller and threaded through [`observe`](Self::observe).
#[derive(Debug, Clone, Default)]
pub struct SessionMonitor {
    machine: TrustStateMachine,
    memory: SessionMemory,
}

impl SessionMonitor {
    /// Creates a monitor with validated thresholds and memory settings.
    pub fn new(thresholds: TrustThresholds, memory: MemoryConfig) -> Result<Self> {
        Ok(Self {
            machine: TrustStateMachine::new(thresholds)?,
            memory: SessionMemory::new(memory)?,
        })
    }

    pub fn machine(&self) -> &TrustStateMachine {
        &self.machine
    }

    pub fn memory(&self) -> &SessionMemory {
        &self.memory
    }

    /// Opens a new session in NORMAL with full trust.
    pub fn open_session(&self, session_id: impl Into<String>) -> SessionState {
        SessionState::new(session_id)
    }

    /// Observes one exchange of `state`'s session.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::SessionTerminated`](crate::MonitorError::SessionTerminated)
    /// for a TERMINATED session, which is left unchanged.
    pub fn observe(&self, state: &mut SessionState, observation: &ExchangeObservation) -> Result<ObservationOutcome> {
        state.ensure_active()?;

        let violation = self.machine.classify(observation);
        self.memory.record(state, observation, violation)?;
        let transitions = self.machine.advance(state, violation)?;

        let was_flagged = state.boundary_testing();
        let conditions = self.memory.boundary_testing(state);
        state.set_boundary_testing(conditions.is_flagged());
        if conditions.is_flagged() && !was_flagged {
            warn!(
                session = %state.session_id(),
                repeated = conditions.repeated_violations,
                suspicion = conditions.sustained_suspicion,
                declining = conditions.declining_trajectory,
                "sustained boundary testing"
            );
        }

        Ok(ObservationOutcome {
            violation,
            transitions,
            report: self.report_with(state, conditions),
        })
    }

    /// Builds a report for `state` without observing anything.
    pub fn report(&self, state: &SessionState) -> SessionReport {
        self.report_with(state, self.memory.boundary_testing(state))
    }

    fn report_with(&self, state: &SessionState, conditions: BoundaryTesting) -> SessionReport {
        SessionReport {
            session_id: state.session_id().to_string(),
            state: state.trust_state(),
            trust_estimate: state.trust_estimate(),
            processing_enabled: state.processing_enabled(),
            boundary_testing: conditions.is_flagged(),
            boundary_conditions: conditions,
            exchange_count: state.exchange_count(),
            recovery_attempts: state.recovery_attempts(),
            violation_tally: state.violation_tally().clone(),
        }
    }
}
