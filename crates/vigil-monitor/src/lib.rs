//! # Session Monitor
//!
//! Per-session trust gate: a four-state machine driven by aggregate
//! falsehood and exchange structure, plus a session memory that tracks a
//! rolling trust estimate and flags sustained boundary testing.
//!
//! ## Threat Model
//!
//! A conversational session can degrade in ways no single exchange
//! reveals, or hide one structural violation behind a history of good
//! behaviour:
//! - **Role confusion** (falsehood above threshold, regardless of trust)
//! - **Context saturation** (long exchange with elevated falsehood)
//! - **Boundary testing** (repeated breaches, sustained moderate
//!   suspicion, or a declining trajectory)
//!
//! ## Components
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`SessionMonitor`] | Facade processing one exchange in order |
//! | [`TrustStateMachine`] | NORMAL / VIOLATED / RECOVERY / TERMINATED transitions |
//! | [`SessionMemory`] | EMA trust estimate, balance window, boundary testing |
//! | [`SessionState`] | The per-session value threaded through both |
//!
//! ## Quick Start
//!
//! ```rust
//! use vigil_monitor::{ExchangeObservation, SessionMonitor};
//!
//! let monitor = SessionMonitor::default();
//! let mut session = monitor.open_session("s-42");
//!
//! let outcome = monitor.observe(&mut session, &ExchangeObservation::new(0.8, 0.1, 0.1, 64)?)?;
//! assert!(outcome.report.processing_enabled);
//! # Ok::<(), vigil_monitor::MonitorError>(())
//! ```
//!
//! ## Security Notes
//!
//! - Breach detection never consults the trust estimate
//! - TERMINATED is permanent; resuming requires a new session
//! - A session is owned by one writer; distinct sessions are independent

mod error;
mod machine;
mod memory;
mod monitor;
mod state;

pub use error::{MonitorError, Result};
pub use machine::{TransitionReason, TransitionRecord, TrustStateMachine, TrustThresholds};
pub use memory::{BoundaryTesting, MemoryConfig, SessionMemory};
pub use monitor::{ObservationOutcome, SessionMonitor, SessionReport};
pub use state::{BalanceSample, ExchangeObservation, SessionState, TrustState, ViolationKind};
