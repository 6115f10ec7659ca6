//! Multi-round dialogue among independent assessors.
//!
//! # Protocol
//!
//! - **Round 1**: every participant assesses independently, with no
//!   visibility of the others. This is the baseline.
//! - **Round k > 1**: one participant is withheld (see
//!   [`withheld_participant`]). Its earlier output stays visible, but it
//!   produces nothing new. Every other participant re-assesses with all
//!   prior rounds as context and may report cross-assessor patterns.
//!
//! Within a round all calls run concurrently and the round ends only
//! when every call has returned or failed. Rounds run strictly in
//! sequence.
//!
//! The aggregate applies worst-case consensus over every assessment of
//! every round, so an early detection cannot be erased by later
//! softening. The per-round spread is metadata only.
//!
//! # Failure Policies
//!
//! | Policy | On assessor failure |
//! |--------|---------------------|
//! | [`FailurePolicy::Strict`] | abort with [`CouncilError::DialogueAborted`] |
//! | [`FailurePolicy::Resilient`] | drop the assessor; abort only if fewer than `min_viable` remain |
//!
//! # Cancellation
//!
//! Cancellation is observed only between rounds. Cancelling before the
//! first round completes yields [`CouncilError::Cancelled`] and no
//! partial result.

mod rotation;
mod transcript;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::assessor::{AssessmentClient, AssessmentRequest};
use crate::consensus::aggregate;
use crate::error::CouncilError;
use crate::Result;

pub use rotation::{falsehood_spread, withheld_participant};
pub use transcript::{DialogueResult, DialogueRound, DialogueTranscript, ParticipantFailure};

use transcript::{collect_patterns, render_history};

/// Instructions appended for rounds after the first.
const DELIBERATION_INSTRUCTIONS: &str = "Earlier assessments of this exchange by other \
assessors are included in the context. Re-assess the exchange independently. If you \
observe patterns across the other assessors' outputs (for example convergence without new \
evidence, or a detection being softened), list them in a \"patterns\" array.";

/// What to do when an assessor fails mid-dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Any failure aborts the dialogue.
    Strict,
    /// Failed assessors are dropped while quorum holds.
    Resilient,
}

/// Configuration for [`DialogueProtocol`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueConfig {
    /// Number of rounds to run.
    pub rounds: u32,
    /// Minimum active participants for the dialogue to continue.
    pub min_viable: usize,
    /// Failure policy.
    pub policy: FailurePolicy,
}

impl DialogueConfig {
    /// Defaults: 3 rounds, 2 viable participants, resilient.
    pub const fn new() -> Self {
        Self {
            rounds: 3,
            min_viable: 2,
            policy: FailurePolicy::Resilient,
        }
    }

    /// Sets the round count.
    pub const fn with_rounds(mut self, rounds: u32) -> Self {
        self.rounds = rounds;
        self
    }

    /// Sets the minimum viable participant count.
    pub const fn with_min_viable(mut self, min_viable: usize) -> Self {
        self.min_viable = min_viable;
        self
    }

    /// Sets the failure policy.
    pub const fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Checks the configuration for unusable values.
    pub fn validate(&self) -> Result<()> {
        if self.rounds == 0 {
            return Err(CouncilError::InvalidInput("dialogue needs at least one round".to_string()));
        }
        if self.min_viable == 0 {
            return Err(CouncilError::InvalidInput(
                "min_viable must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable cancellation signal, observed between rounds.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// Creates an un-cancelled flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs the multi-round dialogue.
#[derive(Debug, Clone, Default)]
pub struct DialogueProtocol {
    config: DialogueConfig,
}

impl DialogueProtocol {
    /// Creates a protocol with the given configuration.
    pub fn new(config: DialogueConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &DialogueConfig {
        &self.config
    }

    /// Runs a dialogue over `participants` for one exchange.
    ///
    /// # Errors
    ///
    /// - [`CouncilError::InvalidInput`] if the configuration is unusable, the
    ///   participant list is empty, smaller than `min_viable`, or has
    ///   duplicate ids
    /// - [`CouncilError::DialogueAborted`] per the failure policy, with the
    ///   partial transcript attached
    /// - [`CouncilError::Cancelled`] if cancelled before round 1 completed
    pub async fn run(
        &self,
        participants: &[AssessmentClient],
        request: &AssessmentRequest,
        cancel: &CancellationFlag,
    ) -> Result<DialogueResult> {
        self.config.validate()?;
        check_participants(participants, self.config.min_viable)?;

        let invocation_id = Uuid::new_v4();
        let mut roster: Vec<&AssessmentClient> = participants.iter().collect();
        let mut rounds: Vec<DialogueRound> = Vec::new();
        let mut failed: Vec<String> = Vec::new();

        info!(
            invocation = %invocation_id,
            participants = roster.len(),
            rounds = self.config.rounds,
            "dialogue started"
        );

        for round in 1..=self.config.rounds {
            if cancel.is_cancelled() {
                if rounds.is_empty() {
                    info!(invocation = %invocation_id, "dialogue cancelled before first round");
                    return Err(CouncilError::Cancelled);
                }
                info!(invocation = %invocation_id, completed = rounds.len(), "dialogue cancelled");
                return conclude(invocation_id, rounds, failed, true);
            }

            let active: Vec<String> = roster.iter().map(|c| c.id().to_string()).collect();
            let withheld = withheld_participant(round, &active).map(str::to_string);
            let round_request = if round == 1 {
                request.clone()
            } else {
                deliberation_request(request, &rounds)
            };

            let speakers: Vec<&AssessmentClient> = roster
                .iter()
                .copied()
                .filter(|c| withheld.as_deref() != Some(c.id()))
                .collect();

            debug!(
                invocation = %invocation_id,
                round,
                speakers = speakers.len(),
                withheld = ?withheld,
                "dialogue round started"
            );

            // Barrier: every speaker returns or fails before the round closes.
            let outcomes = join_all(speakers.iter().map(|c| c.assess(&round_request))).await;

            let mut assessments = Vec::new();
            let mut failures = Vec::new();
            for outcome in outcomes {
                match outcome {
                    Ok(assessment) => assessments.push(assessment),
                    Err(CouncilError::AssessorFailure { assessor, kind }) => {
                        failures.push(ParticipantFailure { assessor, kind })
                    }
                    Err(other) => return Err(other),
                }
            }

            let spread = falsehood_spread(&assessments);
            debug!(invocation = %invocation_id, round, ?spread, failures = failures.len(), "dialogue round finished");

            rounds.push(DialogueRound {
                round,
                active,
                withheld,
                assessments,
                failures: failures.clone(),
                spread,
            });

            if failures.is_empty() {
                continue;
            }
            failed.extend(failures.iter().map(|f| f.assessor.clone()));

            match self.config.policy {
                FailurePolicy::Strict => {
                    let reason = format!(
                        "assessor '{}' failed in round {} under strict policy",
                        failures[0].assessor, round
                    );
                    return Err(abort(invocation_id, rounds, failed, reason));
                }
                FailurePolicy::Resilient => {
                    roster.retain(|c| !failures.iter().any(|f| f.assessor == c.id()));
                    for failure in &failures {
                        warn!(
                            invocation = %invocation_id,
                            round,
                            assessor = %failure.assessor,
                            error = %failure.kind,
                            remaining = roster.len(),
                            "assessor dropped from dialogue"
                        );
                    }
                    if roster.len() < self.config.min_viable {
                        let reason = format!(
                            "quorum breached in round {}: {} active, {} required",
                            round,
                            roster.len(),
                            self.config.min_viable
                        );
                        return Err(abort(invocation_id, rounds, failed, reason));
                    }
                }
            }
        }

        conclude(invocation_id, rounds, failed, false)
    }
}

fn check_participants(participants: &[AssessmentClient], min_viable: usize) -> Result<()> {
    if participants.is_empty() {
        return Err(CouncilError::InvalidInput("dialogue needs participants".to_string()));
    }
    if participants.len() < min_viable {
        return Err(CouncilError::InvalidInput(format!(
            "{} participants cannot meet a quorum of {}",
            participants.len(),
            min_viable
        )));
    }
    for (idx, client) in participants.iter().enumerate() {
        if participants[..idx].iter().any(|c| c.id() == client.id()) {
            return Err(CouncilError::InvalidInput(format!(
                "duplicate participant id '{}'",
                client.id()
            )));
        }
    }
    Ok(())
}

fn deliberation_request(request: &AssessmentRequest, rounds: &[DialogueRound]) -> AssessmentRequest {
    let history = render_history(rounds);
    let context = if request.context.is_empty() {
        format!("Prior assessments:\n{}", history)
    } else {
        format!("{}\n\nPrior assessments:\n{}", request.context, history)
    };
    let instructions = if request.instructions.is_empty() {
        DELIBERATION_INSTRUCTIONS.to_string()
    } else {
        format!("{}\n\n{}", request.instructions, DELIBERATION_INSTRUCTIONS)
    };
    AssessmentRequest {
        passage: request.passage.clone(),
        context,
        instructions,
    }
}

fn conclude(
    invocation_id: Uuid,
    rounds: Vec<DialogueRound>,
    failed: Vec<String>,
    cancelled: bool,
) -> Result<DialogueResult> {
    let all = rounds
        .iter()
        .flat_map(|r| r.assessments.iter().cloned())
        .collect();
    let consensus = aggregate(all)?;
    let patterns = collect_patterns(&rounds);

    info!(
        invocation = %invocation_id,
        rounds = rounds.len(),
        falsehood = consensus.falsehood(),
        cancelled,
        "dialogue concluded"
    );

    Ok(DialogueResult {
        invocation_id,
        rounds,
        consensus,
        patterns,
        valid: true,
        failed,
        cancelled,
    })
}

fn abort(invocation_id: Uuid, rounds: Vec<DialogueRound>, failed: Vec<String>, reason: String) -> CouncilError {
    warn!(invocation = %invocation_id, %reason, "dialogue aborted");

    let all: Vec<_> = rounds
        .iter()
        .flat_map(|r| r.assessments.iter().cloned())
        .collect();
    let consensus = aggregate(all).ok();
    let patterns = collect_patterns(&rounds);

    CouncilError::DialogueAborted {
        reason,
        transcript: Box::new(DialogueTranscript {
            invocation_id,
            rounds,
            consensus,
            patterns,
            valid: false,
            failed,
            cancelled: false,
        }),
    }
}
