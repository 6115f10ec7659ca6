//! Session memory accumulator.
//!
//! Maintains the rolling trust estimate (an exponential moving average of
//! `1 - falsehood`), the bounded balance window and the violation tally,
//! and derives the session-level sustained boundary testing flag.
//!
//! # Boundary Testing
//!
//! The flag is the OR of three conditions, each catching a different way
//! a session degrades:
//!
//! | Condition | Fires when |
//! |-----------|------------|
//! | repeated violations | total violations ≥ count threshold |
//! | sustained suspicion | a strict majority of the recent window has falsehood above the moderate threshold |
//! | declining trajectory | mean balance delta over the recent window < trajectory threshold |
//!
//! The two windowed conditions need a full recent window. With less
//! history they are not satisfied.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MonitorError, Result};
use crate::state::{BalanceSample, ExchangeObservation, SessionState, ViolationKind};

/// Session memory parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// EMA smoothing constant.
    pub alpha: f64,
    /// Maximum balance samples kept.
    pub window_size: usize,
    /// Samples examined by the windowed boundary conditions.
    pub recent_window: usize,
    /// Falsehood counted as suspicious for sustained suspicion.
    pub moderate_falsehood: f64,
    /// Mean balance delta below which the trajectory is declining.
    pub trajectory_threshold: f64,
    /// Total violations that flag repeated violations.
    pub violation_count_threshold: u32,
}

impl MemoryConfig {
    /// Creates a config with default values.
    ///
    /// Defaults:
    /// - EMA α: 0.3
    /// - Window: 20 samples, recent window 5
    /// - Moderate falsehood: 0.4
    /// - Trajectory threshold: -0.1
    /// - Violation count threshold: 3
    pub const fn new() -> Self {
        Self {
            alpha: 0.3,
            window_size: 20,
            recent_window: 5,
            moderate_falsehood: 0.4,
            trajectory_threshold: -0.1,
            violation_count_threshold: 3,
        }
    }

    /// Sets the EMA constant.
    #[must_use]
    pub const fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the balance window and recent window sizes.
    #[must_use]
    pub const fn with_windows(mut self, window_size: usize, recent_window: usize) -> Self {
        self.window_size = window_size;
        self.recent_window = recent_window;
        self
    }

    /// Sets the moderate falsehood threshold.
    #[must_use]
    pub const fn with_moderate_falsehood(mut self, threshold: f64) -> Self {
        self.moderate_falsehood = threshold;
        self
    }

    /// Sets the trajectory threshold.
    #[must_use]
    pub const fn with_trajectory_threshold(mut self, threshold: f64) -> Self {
        self.trajectory_threshold = threshold;
        self
    }

    /// Sets the violation count threshold.
    #[must_use]
    pub const fn with_violation_count_threshold(mut self, count: u32) -> Self {
        self.violation_count_threshold = count;
        self
    }

    /// Checks every value is in range.
    pub fn validate(&self) -> Result<()> {
        if !self.alpha.is_finite() || self.alpha <= 0.0 || self.alpha > 1.0 {
            return Err(MonitorError::InvalidConfig(format!(
                "alpha must be within (0, 1], got {}",
                self.alpha
            )));
        }
        if self.recent_window < 2 || self.recent_window > self.window_size {
            return Err(MonitorError::InvalidConfig(format!(
                "recent_window must be within [2, {}], got {}",
                self.window_size, self.recent_window
            )));
        }
        if !self.moderate_falsehood.is_finite() || !(0.0..=1.0).contains(&self.moderate_falsehood) {
            return Err(MonitorError::InvalidConfig(format!(
                "moderate_falsehood must be within [0, 1], got {}",
                self.moderate_falsehood
            )));
        }
        if !self.trajectory_threshold.is_finite() {
            return Err(MonitorError::InvalidConfig(
                "trajectory_threshold must be finite".to_string(),
            ));
        }
        if self.violation_count_threshold == 0 {
            return Err(MonitorError::InvalidConfig(
                "violation_count_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Which boundary testing conditions hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryTesting {
    pub repeated_violations: bool,
    pub sustained_suspicion: bool,
    pub declining_trajectory: bool,
}

impl BoundaryTesting {
    /// True if any condition holds.
    pub fn is_flagged(&self) -> bool {
        self.repeated_violations || self.sustained_suspicion || self.declining_trajectory
    }
}

/// Records exchanges into a [`SessionState`] and classifies boundary testing.
#[derive(Debug, Clone, Default)]
pub struct SessionMemory {
    config: MemoryConfig,
}

impl SessionMemory {
    /// Creates a session memory after validating `config`.
    pub fn new(config: MemoryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// `α·(1 − falsehood) + (1 − α)·trust`.
    pub fn ema(&self, trust: f64, falsehood: f64) -> f64 {
        self.config.alpha * (1.0 - falsehood) + (1.0 - self.config.alpha) * trust
    }

    /// Records one exchange.
    ///
    /// Appends the balance sample, tallies `violation` if present and,
    /// for a clean exchange, applies the EMA update. A breach leaves the
    /// trust estimate to the state machine's decay.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::SessionTerminated`] for a TERMINATED session.
    pub fn record(
        &self,
        state: &mut SessionState,
        observation: &ExchangeObservation,
        violation: Option<ViolationKind>,
    ) -> Result<()> {
        state.ensure_active()?;

        state.increment_exchange_count();
        state.push_sample(
            BalanceSample {
                balance: observation.balance(),
                falsehood: observation.falsehood(),
            },
            self.config.window_size,
        );

        match violation {
            Some(kind) => state.tally(kind),
            None => {
                let trust = self.ema(state.trust_estimate(), observation.falsehood());
                state.set_trust_estimate(trust);
            }
        }

        debug!(
            session = %state.session_id(),
            exchange = state.exchange_count(),
            trust = state.trust_estimate(),
            balance = observation.balance(),
            "exchange recorded"
        );
        Ok(())
    }

    /// Evaluates the boundary testing conditions against `state`.
    pub fn boundary_testing(&self, state: &SessionState) -> BoundaryTesting {
        let history = state.balance_history();
        let n = self.config.recent_window;

        let (sustained_suspicion, declining_trajectory) = if history.len() >= n && n >= 2 {
            let recent: Vec<&BalanceSample> = history.iter().skip(history.len() - n).collect();

            let suspicious = recent
                .iter()
                .filter(|s| s.falsehood > self.config.moderate_falsehood)
                .count();

            // Mean of consecutive deltas telescopes to (last - first) / (n - 1).
            let mean_delta = (recent[n - 1].balance - recent[0].balance) / (n - 1) as f64;

            (
                suspicious * 2 > n,
                mean_delta < self.config.trajectory_threshold,
            )
        } else {
            (false, false)
        };

        BoundaryTesting {
            repeated_violations: state.total_violations() >= self.config.violation_count_threshold,
            sustained_suspicion,
            declining_trajectory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(truth: f64, falsehood: f64) -> ExchangeObservation {
        ExchangeObservation::new(truth, 0.1, falsehood, 10).unwrap()
    }

    #[test]
    fn test_default_config_valid() {
        assert!(MemoryConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_configs() {
        assert!(MemoryConfig::new().with_alpha(0.0).validate().is_err());
        assert!(MemoryConfig::new().with_alpha(1.5).validate().is_err());
        assert!(MemoryConfig::new().with_windows(4, 5).validate().is_err());
        assert!(MemoryConfig::new().with_windows(20, 1).validate().is_err());
        assert!(MemoryConfig::new().with_violation_count_threshold(0).validate().is_err());
        assert!(SessionMemory::new(MemoryConfig::new().with_moderate_falsehood(2.0)).is_err());
    }

    #[test]
    fn test_ema() {
        let memory = SessionMemory::default();
        assert!((memory.ema(1.0, 0.0) - 1.0).abs() < 1e-12);
        assert!((memory.ema(0.5, 1.0) - 0.35).abs() < 1e-12);
    }

    #[test]
    fn test_record_clean_applies_ema() {
        let memory = SessionMemory::default();
        let mut state = SessionState::with_trust_estimate("s", 0.5).unwrap();
        memory.record(&mut state, &obs(0.9, 0.1), None).unwrap();

        assert!((state.trust_estimate() - (0.3 * 0.9 + 0.7 * 0.5)).abs() < 1e-12);
        assert_eq!(state.exchange_count(), 1);
        assert_eq!(state.balance_history().len(), 1);
        assert_eq!(state.total_violations(), 0);
    }

    #[test]
    fn test_record_breach_tallies_without_ema() {
        let memory = SessionMemory::default();
        let mut state = SessionState::with_trust_estimate("s", 0.65).unwrap();
        memory
            .record(&mut state, &obs(0.1, 0.9), Some(ViolationKind::RoleConfusion))
            .unwrap();

        assert_eq!(state.trust_estimate(), 0.65);
        assert_eq!(state.violation_tally()[&ViolationKind::RoleConfusion], 1);
    }

    #[test]
    fn test_window_is_bounded() {
        let memory = SessionMemory::new(MemoryConfig::new().with_windows(4, 2)).unwrap();
        let mut state = SessionState::new("s");
        for _ in 0..10 {
            memory.record(&mut state, &obs(0.8, 0.1), None).unwrap();
        }
        assert_eq!(state.balance_history().len(), 4);
        assert_eq!(state.exchange_count(), 10);
    }

    #[test]
    fn test_insufficient_history_not_flagged() {
        let memory = SessionMemory::default();
        let mut state = SessionState::new("s");
        for _ in 0..4 {
            memory.record(&mut state, &obs(0.0, 0.6), None).unwrap();
        }
        assert_eq!(memory.boundary_testing(&state), BoundaryTesting::default());
        assert!(!memory.boundary_testing(&state).is_flagged());
    }

    #[test]
    fn test_repeated_violations() {
        let memory = SessionMemory::default();
        let mut state = SessionState::new("s");
        for _ in 0..3 {
            memory
                .record(&mut state, &obs(0.1, 0.9), Some(ViolationKind::RoleConfusion))
                .unwrap();
        }
        let flags = memory.boundary_testing(&state);
        assert!(flags.repeated_violations);
        assert!(flags.is_flagged());
    }

    #[test]
    fn test_sustained_suspicion_needs_majority() {
        let memory = SessionMemory::default();
        let mut state = SessionState::new("s");
        // 3 of 5 above 0.4, flat balance.
        for f in [0.5, 0.1, 0.5, 0.1, 0.5] {
            memory.record(&mut state, &obs(0.5, f), None).unwrap();
        }
        let flags = memory.boundary_testing(&state);
        assert!(flags.sustained_suspicion);
        assert!(!flags.repeated_violations);

        let mut calm = SessionState::new("t");
        for f in [0.5, 0.1, 0.5, 0.1, 0.1] {
            memory.record(&mut calm, &obs(0.5, f), None).unwrap();
        }
        assert!(!memory.boundary_testing(&calm).sustained_suspicion);
    }

    #[test]
    fn test_declining_trajectory() {
        let memory = SessionMemory::default();
        let mut state = SessionState::new("s");
        // Balance falls 0.8, 0.6, 0.4, 0.2, 0.0: mean delta -0.2.
        for (t, f) in [(0.9, 0.1), (0.8, 0.2), (0.7, 0.3), (0.6, 0.4), (0.5, 0.5)] {
            memory.record(&mut state, &obs(t, f), None).unwrap();
        }
        let flags = memory.boundary_testing(&state);
        assert!(flags.declining_trajectory);
        assert!(flags.is_flagged());
    }

    #[test]
    fn test_stable_session_not_flagged() {
        let memory = SessionMemory::default();
        let mut state = SessionState::new("s");
        for _ in 0..20 {
            memory.record(&mut state, &obs(0.9, 0.05), None).unwrap();
        }
        assert!(!memory.boundary_testing(&state).is_flagged());
    }

    #[test]
    fn test_record_rejects_terminated() {
        let memory = SessionMemory::default();
        let mut state = SessionState::new("s");
        state.set_trust_state(crate::state::TrustState::Terminated);
        assert!(memory.record(&mut state, &obs(0.9, 0.1), None).is_err());
        assert_eq!(state.exchange_count(), 0);
    }
}
