//! Trust state machine.
//!
//! ```text
//!  NORMAL ──breach──► VIOLATED ──automatic──► RECOVERY
//!    ▲                   ▲                      │
//!    │                   └───────relapse────────┤
//!    └───────clean run, trust > target──────────┤
//!                                               ├──relapse, attempts spent──► TERMINATED
//!                                               └──clean run below target,
//!                                                  attempts spent────────────► TERMINATED
//! ```
//!
//! Breach detection looks only at the aggregate triple and the exchange
//! length, never at the trust estimate. A long run of good behaviour
//! cannot suppress the detection of a structural violation.
//!
//! # Decay Accounting
//!
//! The severe decay and the recovery attempt that belong to the
//! VIOLATED→RECOVERY edge are charged when the breach is observed, so the
//! trust estimate drops on the exchange that caused it. The automatic
//! VIOLATED→RECOVERY record is emitted at the start of the next
//! observation. A relapse from RECOVERY charges the milder decay.
//!
//! # Security Notes
//!
//! - TERMINATED is absorbing. Nothing in this crate leaves it.
//! - Every transition is a deterministic function of the observation and
//!   the prior state, so there is nothing to retry.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{MonitorError, Result};
use crate::state::{ExchangeObservation, SessionState, TrustState, ViolationKind};

/// Breach thresholds and recovery parameters.
///
/// # Example
///
/// ```rust
/// use vigil_monitor::TrustThresholds;
///
/// let thresholds = TrustThresholds::new()
///     .with_role_confusion(0.7)
///     .with_max_recovery_attempts(5);
/// assert!(thresholds.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustThresholds {
    /// Falsehood above which an exchange is a role-confusion breach.
    pub role_confusion: f64,
    /// Exchange length (chars) above which saturation is considered.
    pub saturation_length: usize,
    /// Falsehood above which a long exchange is a saturation breach.
    pub saturation_falsehood: f64,
    /// Trust multiplier on a breach from NORMAL.
    pub severe_decay: f64,
    /// Trust multiplier on a relapse from RECOVERY.
    pub mild_decay: f64,
    /// Trust estimate that must be exceeded to return to NORMAL.
    pub recovery_target: f64,
    /// Consecutive clean exchanges required in RECOVERY.
    pub recovery_run: u32,
    /// Recovery attempts allowed before a relapse terminates the session.
    pub max_recovery_attempts: u32,
}

impl TrustThresholds {
    /// Creates thresholds with default values.
    ///
    /// Defaults:
    /// - Role confusion: 0.65
    /// - Saturation: length 5000 and falsehood 0.5
    /// - Decay: severe 0.3, mild 0.7
    /// - Recovery: target 0.6, run of 3, at most 3 attempts
    pub const fn new() -> Self {
        Self {
            role_confusion: 0.65,
            saturation_length: 5000,
            saturation_falsehood: 0.5,
            severe_decay: 0.3,
            mild_decay: 0.7,
            recovery_target: 0.6,
            recovery_run: 3,
            max_recovery_attempts: 3,
        }
    }

    /// Sets the role-confusion threshold.
    #[must_use]
    pub const fn with_role_confusion(mut self, threshold: f64) -> Self {
        self.role_confusion = threshold;
        self
    }

    /// Sets the saturation length and falsehood pair.
    #[must_use]
    pub const fn with_saturation(mut self, length: usize, falsehood: f64) -> Self {
        self.saturation_length = length;
        self.saturation_falsehood = falsehood;
        self
    }

    /// Sets the severe and mild decay factors.
    #[must_use]
    pub const fn with_decay(mut self, severe: f64, mild: f64) -> Self {
        self.severe_decay = severe;
        self.mild_decay = mild;
        self
    }

    /// Sets the recovery target and required clean run.
    #[must_use]
    pub const fn with_recovery(mut self, target: f64, run: u32) -> Self {
        self.recovery_target = target;
        self.recovery_run = run;
        self
    }

    /// Sets the maximum recovery attempts.
    #[must_use]
    pub const fn with_max_recovery_attempts(mut self, attempts: u32) -> Self {
        self.max_recovery_attempts = attempts;
        self
    }

    /// Checks every value is in range.
    ///
    /// Thresholds and the target must lie in `[0, 1]`; decay factors in
    /// `(0, 1)`; the clean run must be at least 1.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("role_confusion", self.role_confusion),
            ("saturation_falsehood", self.saturation_falsehood),
            ("recovery_target", self.recovery_target),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(MonitorError::InvalidConfig(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        for (name, value) in [("severe_decay", self.severe_decay), ("mild_decay", self.mild_decay)] {
            if !value.is_finite() || value <= 0.0 || value >= 1.0 {
                return Err(MonitorError::InvalidConfig(format!(
                    "{} must be within (0, 1), got {}",
                    name, value
                )));
            }
        }
        if self.recovery_run == 0 {
            return Err(MonitorError::InvalidConfig(
                "recovery_run must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for TrustThresholds {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a transition fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionReason {
    /// NORMAL→VIOLATED on a detected violation.
    Breach(ViolationKind),
    /// VIOLATED→RECOVERY, unconditional.
    EnterRecovery,
    /// RECOVERY→NORMAL after a clean run with trust above target.
    Recovered,
    /// RECOVERY→VIOLATED on a repeat violation.
    Relapse(ViolationKind),
    /// RECOVERY→TERMINATED on a violation with attempts exhausted.
    RecoveryExhausted(ViolationKind),
    /// RECOVERY→TERMINATED after a clean run that left trust at or below
    /// target with attempts exhausted.
    TargetUnreached,
}

/// One state change, with the trust estimate around it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: TrustState,
    pub to: TrustState,
    pub reason: TransitionReason,
    pub trust_before: f64,
    pub trust_after: f64,
}

/// Applies the transition rules to a [`SessionState`].
#[derive(Debug, Clone, Default)]
pub struct TrustStateMachine {
    thresholds: TrustThresholds,
}

impl TrustStateMachine {
    /// Creates a state machine after validating `thresholds`.
    pub fn new(thresholds: TrustThresholds) -> Result<Self> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> &TrustThresholds {
        &self.thresholds
    }

    /// Classifies an observation as a breach, independent of any trust estimate.
    ///
    /// Role confusion takes precedence when both conditions hold.
    pub fn classify(&self, observation: &ExchangeObservation) -> Option<ViolationKind> {
        let t = &self.thresholds;
        if observation.falsehood() > t.role_confusion {
            Some(ViolationKind::RoleConfusion)
        } else if observation.length() > t.saturation_length
            && observation.falsehood() > t.saturation_falsehood
        {
            Some(ViolationKind::ContextSaturation)
        } else {
            None
        }
    }

    /// Advances `state` by one observed exchange.
    ///
    /// `violation` is the result of [`classify`](Self::classify) for that
    /// exchange. Session memory must already have recorded the exchange,
    /// so that a clean exchange's trust update is visible to the
    /// recovery check.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::SessionTerminated`] for a TERMINATED session,
    /// leaving it untouched.
    pub fn advance(
        &self,
        state: &mut SessionState,
        violation: Option<ViolationKind>,
    ) -> Result<Vec<TransitionRecord>> {
        state.ensure_active()?;
        let mut records = Vec::new();

        if state.trust_state() == TrustState::Violated {
            let before = state.trust_estimate();
            records.push(transition(state, TrustState::Recovery, TransitionReason::EnterRecovery, before));
            state.reset_clean_run();
        }

        let before = state.trust_estimate();
        match (state.trust_state(), violation) {
            (TrustState::Normal, Some(kind)) => {
                state.set_trust_estimate(before * self.thresholds.severe_decay);
                state.increment_recovery_attempts();
                records.push(transition(state, TrustState::Violated, TransitionReason::Breach(kind), before));
            }
            (TrustState::Recovery, Some(kind)) => {
                state.set_trust_estimate(before * self.thresholds.mild_decay);
                state.reset_clean_run();
                if state.recovery_attempts() >= self.thresholds.max_recovery_attempts {
                    records.push(transition(
                        state,
                        TrustState::Terminated,
                        TransitionReason::RecoveryExhausted(kind),
                        before,
                    ));
                } else {
                    state.increment_recovery_attempts();
                    records.push(transition(state, TrustState::Violated, TransitionReason::Relapse(kind), before));
                }
            }
            (TrustState::Recovery, None) => {
                state.increment_clean_run();
                if state.clean_run() >= self.thresholds.recovery_run {
                    if state.trust_estimate() > self.thresholds.recovery_target {
                        state.reset_clean_run();
                        records.push(transition(state, TrustState::Normal, TransitionReason::Recovered, before));
                    } else if state.recovery_attempts() >= self.thresholds.max_recovery_attempts {
                        records.push(transition(
                            state,
                            TrustState::Terminated,
                            TransitionReason::TargetUnreached,
                            before,
                        ));
                    }
                }
            }
            (TrustState::Normal, None) | (TrustState::Violated, _) | (TrustState::Terminated, _) => {}
        }

        Ok(records)
    }
}

/// Moves `state` to `to` and logs the change.
fn transition(
    state: &mut SessionState,
    to: TrustState,
    reason: TransitionReason,
    trust_before: f64,
) -> TransitionRecord {
    let from = state.trust_state();
    let trust_after = state.trust_estimate();
    state.set_trust_state(to);

    match to {
        TrustState::Violated | TrustState::Terminated => warn!(
            session = %state.session_id(),
            from = %from,
            to = %to,
            reason = ?reason,
            trust = trust_after,
            "trust state changed"
        ),
        TrustState::Normal | TrustState::Recovery => info!(
            session = %state.session_id(),
            from = %from,
            to = %to,
            reason = ?reason,
            trust = trust_after,
            "trust state changed"
        ),
    }

    TransitionRecord {
        from,
        to,
        reason,
        trust_before,
        trust_after,
    }
}
