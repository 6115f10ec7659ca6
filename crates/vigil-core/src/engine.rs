//! The trust engine facade.
//!
//! [`TrustEngine`] takes one exchange of one session through the whole
//! pipeline: assessment (direct, parallel or dialogue), worst-case
//! consensus, breach classification, session memory and the state
//! machine.

use std::sync::Arc;

use tracing::{debug, info, warn};
use vigil_council::{
    AssessmentCache, AssessmentClient, AssessmentRequest, Assessor, AssessorCouncil,
    CancellationFlag, ConsensusResult, CouncilError, DialogueProtocol, DialogueResult,
};
use vigil_monitor::{ExchangeObservation, SessionMonitor, SessionReport, SessionState};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::outcome::{EvaluationOutcome, GateDecision};
use crate::persistence::{persist_logged, TranscriptSink};
use crate::Result;

/// How the assessments of one exchange are collected.
///
/// Decided once per evaluation; each variant has exactly one handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum EvaluationMode {
    /// The first assessor only.
    Direct,
    /// Every assessor once, concurrently, with no cross-visibility.
    Parallel,
    /// The multi-round dialogue.
    Dialogue,
}

/// Trust-gating engine.
///
/// The engine holds no session state. Each session's [`SessionState`] is
/// owned by the caller and passed by `&mut` to
/// [`evaluate`](Self::evaluate), so one session is processed by one
/// writer in submission order while distinct sessions may be evaluated
/// concurrently through a shared `&TrustEngine`.
///
/// # Pipeline
///
/// 1. Reject a TERMINATED session before any assessor is called
/// 2. Collect assessments for the mode and aggregate them
/// 3. Classify the aggregate against the breach thresholds
/// 4. Record the exchange in session memory
/// 5. Advance the state machine
/// 6. Return the consensus, session snapshot and gate decision
///
/// # Example
///
/// ```rust,ignore
/// let engine = TrustEngine::new(EngineConfig::default(), vec![first, second, third])?;
/// let mut session = engine.open_session("session-7");
///
/// let outcome = engine
///     .evaluate(&mut session, &exchange, EvaluationMode::Dialogue, &CancellationFlag::new())
///     .await?;
///
/// if !outcome.decision.is_proceed() {
///     // stop forwarding this session
/// }
/// ```
pub struct TrustEngine {
    council: AssessorCouncil,
    protocol: DialogueProtocol,
    monitor: SessionMonitor,
    sink: Option<Arc<dyn TranscriptSink>>,
}

impl std::fmt::Debug for TrustEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustEngine")
            .field("council", &self.council)
            .field("protocol", &self.protocol)
            .field("monitor", &self.monitor)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl TrustEngine {
    /// Creates an engine over `assessors`.
    ///
    /// Every assessor is wrapped with the configured retry policy and
    /// per-call timeout.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] for an invalid configuration and
    /// [`EngineError::InvalidInput`] for an empty assessor list.
    pub fn new(config: EngineConfig, assessors: Vec<Arc<dyn Assessor>>) -> Result<Self> {
        config.validate()?;
        if assessors.is_empty() {
            return Err(EngineError::InvalidInput(
                "engine needs at least one assessor".to_string(),
            ));
        }

        let retry = config.retry.policy();
        let timeout = config.retry.call_timeout();
        let clients = assessors
            .into_iter()
            .map(|a| {
                AssessmentClient::new(a)
                    .with_retry(retry.clone())
                    .with_timeout(timeout)
            })
            .collect();

        let council = AssessorCouncil::new(clients)
            .with_failure_policy(config.parallel.policy, config.parallel.min_viable);
        let monitor = SessionMonitor::new(config.thresholds, config.memory)?;

        info!(
            assessors = council.member_count(),
            rounds = config.dialogue.rounds,
            "trust engine initialized"
        );

        Ok(Self {
            council,
            protocol: DialogueProtocol::new(config.dialogue),
            monitor,
            sink: None,
        })
    }

    /// Attaches an assessment cache shared by every assessor.
    pub fn with_cache(mut self, cache: Arc<dyn AssessmentCache>) -> Self {
        self.council = self.council.with_cache(cache);
        self
    }

    /// Attaches a sink receiving every dialogue transcript.
    pub fn with_transcript_sink(mut self, sink: Arc<dyn TranscriptSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn council(&self) -> &AssessorCouncil {
        &self.council
    }

    pub fn monitor(&self) -> &SessionMonitor {
        &self.monitor
    }

    /// Opens a new session in NORMAL with full trust.
    pub fn open_session(&self, session_id: impl Into<String>) -> SessionState {
        self.monitor.open_session(session_id)
    }

    /// Snapshot of `session` for monitoring collaborators.
    pub fn report(&self, session: &SessionState) -> SessionReport {
        self.monitor.report(session)
    }

    /// Evaluates one exchange of `session`.
    ///
    /// # Arguments
    ///
    /// * `session` - The session's state, mutated in place
    /// * `exchange` - Passage, context and instructions
    /// * `mode` - How to collect assessments
    /// * `cancel` - Observed before any call and between dialogue rounds
    ///
    /// # Errors
    ///
    /// - [`EngineError::StateTerminated`] if the session is TERMINATED
    /// - [`EngineError::Council`] for assessor failures, lost quorum,
    ///   aborted dialogues and cancellation before any result
    ///
    /// On error the session is left unchanged.
    pub async fn evaluate(
        &self,
        session: &mut SessionState,
        exchange: &AssessmentRequest,
        mode: EvaluationMode,
        cancel: &CancellationFlag,
    ) -> Result<EvaluationOutcome> {
        if session.trust_state().is_terminal() {
            warn!(session = %session.session_id(), "exchange rejected: session terminated");
            return Err(EngineError::StateTerminated {
                session_id: session.session_id().to_string(),
            });
        }
        if cancel.is_cancelled() {
            return Err(CouncilError::Cancelled.into());
        }

        debug!(session = %session.session_id(), ?mode, "evaluating exchange");

        let (consensus, dialogue) = match mode {
            EvaluationMode::Direct => (self.council.assess_direct(exchange).await?, None),
            EvaluationMode::Parallel => (self.council.assess_parallel(exchange).await?, None),
            EvaluationMode::Dialogue => {
                let result = self.deliberate(exchange, cancel).await?;
                (result.consensus.clone(), Some(result))
            }
        };

        self.apply(session, exchange, consensus, dialogue)
    }

    async fn deliberate(
        &self,
        exchange: &AssessmentRequest,
        cancel: &CancellationFlag,
    ) -> Result<DialogueResult> {
        match self.council.deliberate(&self.protocol, exchange, cancel).await {
            Ok(result) => {
                if let Some(sink) = &self.sink {
                    persist_logged(sink.as_ref(), &result.transcript());
                }
                Ok(result)
            }
            Err(err) => {
                if let (Some(sink), Some(transcript)) = (&self.sink, err.transcript()) {
                    persist_logged(sink.as_ref(), transcript);
                }
                Err(err.into())
            }
        }
    }

    fn apply(
        &self,
        session: &mut SessionState,
        exchange: &AssessmentRequest,
        consensus: ConsensusResult,
        dialogue: Option<DialogueResult>,
    ) -> Result<EvaluationOutcome> {
        let triple = consensus.triple();
        let observation = ExchangeObservation::new(
            triple.truth(),
            triple.indeterminacy(),
            triple.falsehood(),
            exchange.exchange_length(),
        )?;

        let observed = self.monitor.observe(session, &observation)?;
        let decision = GateDecision::from_state(observed.report.state);

        info!(
            session = %session.session_id(),
            falsehood = triple.falsehood(),
            state = %observed.report.state,
            trust = observed.report.trust_estimate,
            boundary_testing = observed.report.boundary_testing,
            "exchange evaluated"
        );

        Ok(EvaluationOutcome {
            consensus,
            session: observed.report,
            decision,
            violation: observed.violation,
            transitions: observed.transitions,
            dialogue,
        })
    }
}
