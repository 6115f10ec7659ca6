//! # Vigil Core
//!
//! Trust-gating engine for conversational exchanges. Orchestrates the
//! assessor council and the session monitor behind one facade.
//!
//! ## Threat Coverage
//!
//! | Layer | Component | Threats |
//! |-------|-----------|---------|
//! | Assessment | Assessor Council | Benign framing that fools most assessors, assessor drift during discussion |
//! | Session | Session Monitor | Role confusion, context saturation, sustained boundary testing |
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     VIGIL CORE                           │
//! ├──────────────────────────────────────────────────────────┤
//! │                                                          │
//! │                  ┌───────────────┐                       │
//! │                  │  TrustEngine  │  ← Unified Facade     │
//! │                  └───────┬───────┘                       │
//! │                          │                               │
//! │           ┌──────────────┴──────────────┐                │
//! │           ▼                             ▼                │
//! │   ┌───────────────┐             ┌───────────────┐        │
//! │   │    Assessor   │  consensus  │    Session    │        │
//! │   │    Council    │ ──────────► │    Monitor    │        │
//! │   └───────────────┘             └───────────────┘        │
//! │                                                          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vigil_core::{CancellationFlag, EngineConfig, EvaluationMode, Exchange, TrustEngine};
//!
//! let engine = TrustEngine::new(EngineConfig::default(), assessors)?;
//! let mut session = engine.open_session("session-1");
//!
//! let exchange = Exchange::new(reply).with_context(history);
//! match engine
//!     .evaluate(&mut session, &exchange, EvaluationMode::Parallel, &CancellationFlag::new())
//!     .await
//! {
//!     Ok(outcome) if outcome.decision.is_proceed() => forward(reply),
//!     Ok(outcome) => hold(outcome.session),
//!     Err(err) if err.is_retryable() => retry_later(),
//!     Err(err) if err.is_permanent_halt() => close_session(),
//!     Err(err) => return Err(err),
//! }
//! ```
//!
//! ## Security Notes
//!
//! - A failed assessment is surfaced as an error, never replaced by a default triple
//! - Breach detection never consults the session's trust estimate
//! - TERMINATED sessions are rejected before any assessor is called
//! - Transcript persistence failures are logged, never propagated

mod config;
mod engine;
mod error;
mod outcome;
mod persistence;

pub use config::{EngineConfig, ParallelConfig, RetryConfig};
pub use engine::{EvaluationMode, TrustEngine};
pub use error::EngineError;
pub use outcome::{EvaluationOutcome, GateDecision};
pub use persistence::{SinkError, TranscriptSink};

// Re-export component types for convenience
pub use vigil_council::{
    AssessmentCache, AssessmentRequest as Exchange, Assessor, CacheKey, CancellationFlag,
    ConsensusResult, CouncilError, DialogueConfig, DialogueResult, DialogueTranscript,
    FailureKind, FailurePolicy, Triple,
};
pub use vigil_monitor::{
    MemoryConfig, MonitorError, SessionReport, SessionState, TransitionReason, TransitionRecord,
    TrustState, TrustThresholds, ViolationKind,
};

/// Core result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
