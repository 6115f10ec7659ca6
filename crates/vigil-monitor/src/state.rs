//! Session state and per-exchange observations.
//!
//! [`SessionState`] is an explicit value owned by exactly one writer.
//! It is mutated only through the state machine and session memory;
//! everything else sees it through read-only accessors.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};

/// Trust gate state of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrustState {
    /// Initial state. Processing is enabled.
    Normal,
    /// A breach was detected on the last exchange.
    Violated,
    /// Waiting for a sustained clean run after a breach.
    Recovery,
    /// Permanently halted.
    Terminated,
}

impl TrustState {
    /// Further exchanges may be processed only in NORMAL.
    pub fn processing_enabled(&self) -> bool {
        matches!(self, TrustState::Normal)
    }

    /// Returns true for the absorbing TERMINATED state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TrustState::Terminated)
    }
}

impl fmt::Display for TrustState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrustState::Normal => "NORMAL",
            TrustState::Violated => "VIOLATED",
            TrustState::Recovery => "RECOVERY",
            TrustState::Terminated => "TERMINATED",
        };
        f.write_str(name)
    }
}

/// Structural violation detected on one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ViolationKind {
    /// Falsehood above the role-confusion threshold.
    RoleConfusion,
    /// Long exchange with elevated falsehood.
    ContextSaturation,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::RoleConfusion => f.write_str("role confusion"),
            ViolationKind::ContextSaturation => f.write_str("context saturation"),
        }
    }
}

/// The monitor's view of one assessed exchange.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExchangeObservation {
    truth: f64,
    indeterminacy: f64,
    falsehood: f64,
    length: usize,
}

impl ExchangeObservation {
    /// Creates an observation from an aggregate triple and the exchange length.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidObservation`] if any component is
    /// non-finite or outside `[0, 1]`.
    pub fn new(truth: f64, indeterminacy: f64, falsehood: f64, length: usize) -> Result<Self> {
        for (name, value) in [
            ("truth", truth),
            ("indeterminacy", indeterminacy),
            ("falsehood", falsehood),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(MonitorError::InvalidObservation(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(Self {
            truth,
            indeterminacy,
            falsehood,
            length,
        })
    }

    pub fn truth(&self) -> f64 {
        self.truth
    }

    pub fn indeterminacy(&self) -> f64 {
        self.indeterminacy
    }

    pub fn falsehood(&self) -> f64 {
        self.falsehood
    }

    /// Exchange length in characters.
    pub fn length(&self) -> usize {
        self.length
    }

    /// `truth - falsehood`.
    pub fn balance(&self) -> f64 {
        self.truth - self.falsehood
    }
}

/// One entry in the bounded balance window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalanceSample {
    /// `truth - falsehood` of the exchange.
    pub balance: f64,
    /// Falsehood of the exchange.
    pub falsehood: f64,
}

/// Mutable trust state of one session.
///
/// # Thread Safety
///
/// Exchanges of one session must be observed in submission order by a
/// single owner holding `&mut SessionState`. Distinct sessions are fully
/// independent.
///
/// Deserialization applies the same bounds as
/// [`with_trust_estimate`](Self::with_trust_estimate) and rejects balance
/// samples outside the range an observation can produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedSessionState")]
pub struct SessionState {
    session_id: String,
    trust_estimate: f64,
    exchange_count: u64,
    balance_history: VecDeque<BalanceSample>,
    violation_tally: BTreeMap<ViolationKind, u32>,
    trust_state: TrustState,
    recovery_attempts: u32,
    clean_run: u32,
    boundary_testing: bool,
}

#[derive(Deserialize)]
struct UncheckedSessionState {
    session_id: String,
    trust_estimate: f64,
    exchange_count: u64,
    balance_history: VecDeque<BalanceSample>,
    violation_tally: BTreeMap<ViolationKind, u32>,
    trust_state: TrustState,
    recovery_attempts: u32,
    clean_run: u32,
    boundary_testing: bool,
}

impl TryFrom<UncheckedSessionState> for SessionState {
    type Error = MonitorError;

    fn try_from(raw: UncheckedSessionState) -> Result<Self> {
        check_trust(raw.trust_estimate)?;
        for sample in &raw.balance_history {
            let in_range = sample.balance.is_finite()
                && (-1.0..=1.0).contains(&sample.balance)
                && sample.falsehood.is_finite()
                && (0.0..=1.0).contains(&sample.falsehood);
            if !in_range {
                return Err(MonitorError::InvalidObservation(format!(
                    "balance sample out of range: balance {}, falsehood {}",
                    sample.balance, sample.falsehood
                )));
            }
        }
        Ok(Self {
            session_id: raw.session_id,
            trust_estimate: raw.trust_estimate,
            exchange_count: raw.exchange_count,
            balance_history: raw.balance_history,
            violation_tally: raw.violation_tally,
            trust_state: raw.trust_state,
            recovery_attempts: raw.recovery_attempts,
            clean_run: raw.clean_run,
            boundary_testing: raw.boundary_testing,
        })
    }
}

/// A trust estimate must lie in `(0, 1]`: at zero a breach could not lower it.
fn check_trust(trust: f64) -> Result<()> {
    if !trust.is_finite() || trust <= 0.0 || trust > 1.0 {
        return Err(MonitorError::InvalidObservation(format!(
            "trust estimate must be within (0, 1], got {}",
            trust
        )));
    }
    Ok(())
}

impl SessionState {
    /// Opens a session in NORMAL with full trust.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            trust_estimate: 1.0,
            exchange_count: 0,
            balance_history: VecDeque::new(),
            violation_tally: BTreeMap::new(),
            trust_state: TrustState::Normal,
            recovery_attempts: 0,
            clean_run: 0,
            boundary_testing: false,
        }
    }

    /// Opens a session in NORMAL with the given starting trust.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidObservation`] if `trust` is not in `(0, 1]`.
    pub fn with_trust_estimate(session_id: impl Into<String>, trust: f64) -> Result<Self> {
        check_trust(trust)?;
        let mut state = Self::new(session_id);
        state.trust_estimate = trust;
        Ok(state)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn trust_estimate(&self) -> f64 {
        self.trust_estimate
    }

    pub fn exchange_count(&self) -> u64 {
        self.exchange_count
    }

    /// Balance window, oldest first.
    pub fn balance_history(&self) -> &VecDeque<BalanceSample> {
        &self.balance_history
    }

    pub fn violation_tally(&self) -> &BTreeMap<ViolationKind, u32> {
        &self.violation_tally
    }

    /// Violations of every kind recorded in this session.
    pub fn total_violations(&self) -> u32 {
        self.violation_tally.values().sum()
    }

    pub fn trust_state(&self) -> TrustState {
        self.trust_state
    }

    pub fn recovery_attempts(&self) -> u32 {
        self.recovery_attempts
    }

    /// Consecutive clean exchanges observed in RECOVERY.
    pub fn clean_run(&self) -> u32 {
        self.clean_run
    }

    pub fn processing_enabled(&self) -> bool {
        self.trust_state.processing_enabled()
    }

    /// Sustained boundary testing flag as of the last observation.
    pub fn boundary_testing(&self) -> bool {
        self.boundary_testing
    }

    pub(crate) fn ensure_active(&self) -> Result<()> {
        if self.trust_state.is_terminal() {
            return Err(MonitorError::SessionTerminated {
                session_id: self.session_id.clone(),
            });
        }
        Ok(())
    }

    pub(crate) fn set_trust_estimate(&mut self, trust: f64) {
        self.trust_estimate = trust.clamp(0.0, 1.0);
    }

    pub(crate) fn set_trust_state(&mut self, state: TrustState) {
        self.trust_state = state;
    }

    pub(crate) fn increment_exchange_count(&mut self) {
        self.exchange_count += 1;
    }

    pub(crate) fn push_sample(&mut self, sample: BalanceSample, window_size: usize) {
        self.balance_history.push_back(sample);
        while self.balance_history.len() > window_size {
            self.balance_history.pop_front();
        }
    }

    pub(crate) fn tally(&mut self, kind: ViolationKind) {
        *self.violation_tally.entry(kind).or_insert(0) += 1;
    }

    pub(crate) fn increment_recovery_attempts(&mut self) {
        self.recovery_attempts += 1;
    }

    pub(crate) fn increment_clean_run(&mut self) {
        self.clean_run += 1;
    }

    pub(crate) fn reset_clean_run(&mut self) {
        self.clean_run = 0;
    }

    pub(crate) fn set_boundary_testing(&mut self, flagged: bool) {
        self.boundary_testing = flagged;
    }
}
