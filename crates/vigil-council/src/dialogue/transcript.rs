//! Dialogue rounds, results and transcripts.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use uuid::Uuid;

use crate::assessment::Assessment;
use crate::consensus::ConsensusResult;
use crate::error::FailureKind;

/// One assessor that failed during a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantFailure {
    /// The failing assessor.
    pub assessor: String,
    /// What went wrong.
    pub kind: FailureKind,
}

/// One round of a dialogue. Rounds are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueRound {
    /// 1-based round number.
    pub round: u32,
    /// Participants still active at the start of the round.
    pub active: Vec<String>,
    /// Participant withheld from producing a new assessment (none in round 1).
    pub withheld: Option<String>,
    /// Assessments produced this round.
    pub assessments: Vec<Assessment>,
    /// Participants that failed this round.
    pub failures: Vec<ParticipantFailure>,
    /// Standard deviation of falsehood across this round's assessments.
    pub spread: Option<f64>,
}

/// Outcome of a completed dialogue invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueResult {
    /// Per-invocation identifier.
    pub invocation_id: Uuid,
    /// Rounds in order.
    pub rounds: Vec<DialogueRound>,
    /// Aggregate over every assessment of every round.
    pub consensus: ConsensusResult,
    /// Cross-assessor patterns reported, deduplicated, in order of first report.
    pub patterns: Vec<String>,
    /// False if quorum was breached at any point.
    pub valid: bool,
    /// Assessors dropped after failing.
    pub failed: Vec<String>,
    /// True if the dialogue stopped early on cancellation.
    pub cancelled: bool,
}

impl DialogueResult {
    /// Builds the persistable transcript for this result.
    pub fn transcript(&self) -> DialogueTranscript {
        DialogueTranscript {
            invocation_id: self.invocation_id,
            rounds: self.rounds.clone(),
            consensus: Some(self.consensus.clone()),
            patterns: self.patterns.clone(),
            valid: self.valid,
            failed: self.failed.clone(),
            cancelled: self.cancelled,
        }
    }

    /// Every assessment from every round, in round order.
    pub fn all_assessments(&self) -> impl Iterator<Item = &Assessment> {
        self.rounds.iter().flat_map(|r| r.assessments.iter())
    }
}

/// Structured record of one dialogue invocation, complete or aborted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueTranscript {
    /// Per-invocation identifier.
    pub invocation_id: Uuid,
    /// Rounds collected.
    pub rounds: Vec<DialogueRound>,
    /// Aggregate over the collected assessments, if any were collected.
    pub consensus: Option<ConsensusResult>,
    /// Cross-assessor patterns reported.
    pub patterns: Vec<String>,
    /// False if quorum was breached or the run was aborted.
    pub valid: bool,
    /// Assessors dropped after failing.
    pub failed: Vec<String>,
    /// True if the dialogue stopped early on cancellation.
    pub cancelled: bool,
}

/// Collects reported patterns across rounds, dropping duplicates.
pub(crate) fn collect_patterns(rounds: &[DialogueRound]) -> Vec<String> {
    let mut patterns: Vec<String> = Vec::new();
    for pattern in rounds
        .iter()
        .flat_map(|r| r.assessments.iter())
        .flat_map(|a| a.patterns.iter())
    {
        if !patterns.contains(pattern) {
            patterns.push(pattern.clone());
        }
    }
    patterns
}

/// Renders prior rounds as context for the next round's assessors.
pub(crate) fn render_history(rounds: &[DialogueRound]) -> String {
    let mut out = String::new();
    for round in rounds {
        let _ = writeln!(out, "Round {}:", round.round);
        for assessment in &round.assessments {
            let _ = writeln!(
                out,
                "- [{}] {}: {}",
                assessment.assessor, assessment.triple, assessment.justification
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::Triple;

    fn round(n: u32, entries: Vec<(&str, f64, Vec<&str>)>) -> DialogueRound {
        DialogueRound {
            round: n,
            active: entries.iter().map(|e| e.0.to_string()).collect(),
            withheld: None,
            assessments: entries
                .iter()
                .map(|(id, f, patterns)| {
                    let mut a = Assessment::new(*id, Triple::new(0.1, 0.1, *f).unwrap(), "why");
                    a.patterns = patterns.iter().map(|p| p.to_string()).collect();
                    a
                })
                .collect(),
            failures: Vec::new(),
            spread: None,
        }
    }

    #[test]
    fn test_collect_patterns_dedups_in_order() {
        let rounds = vec![
            round(1, vec![("a", 0.1, vec![])]),
            round(2, vec![("a", 0.1, vec!["echo", "drift"]), ("b", 0.2, vec!["echo"])]),
        ];
        assert_eq!(collect_patterns(&rounds), vec!["echo".to_string(), "drift".to_string()]);
    }

    #[test]
    fn test_render_history() {
        let rounds = vec![round(1, vec![("alpha", 0.7, vec![])])];
        let text = render_history(&rounds);
        assert!(text.contains("Round 1:"));
        assert!(text.contains("[alpha] T=0.10 I=0.10 F=0.70: why"));
    }
}
