//! Worst-case consensus over assessments of one exchange.
//!
//! The aggregate is the assessment with the highest falsehood. Ties are
//! broken by the lowest truth, then by assessor id, then by input order.
//!
//! Averaging is deliberately not offered: an exchange crafted to read as
//! benign to most assessors must not dilute the one assessor that
//! detects the structural violation.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

use crate::assessment::{Assessment, Triple};
use crate::error::CouncilError;
use crate::Result;

/// Rule used to select the aggregate triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionRule {
    /// Max falsehood, then min truth, then assessor id.
    MaxFalsehood,
}

impl SelectionRule {
    /// Stable identifier for transcripts and logs.
    pub fn id(&self) -> &'static str {
        match self {
            SelectionRule::MaxFalsehood => "max-falsehood/min-truth/assessor-id",
        }
    }
}

/// The single result chosen to represent several assessments.
///
/// Deserialized values are re-checked against the selection rule, so a
/// result loaded from storage always indexes a real assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedConsensus")]
pub struct ConsensusResult {
    triple: Triple,
    selected: usize,
    assessments: Vec<Assessment>,
    rule: SelectionRule,
}

#[derive(Deserialize)]
struct UncheckedConsensus {
    triple: Triple,
    selected: usize,
    assessments: Vec<Assessment>,
    rule: SelectionRule,
}

impl TryFrom<UncheckedConsensus> for ConsensusResult {
    type Error = CouncilError;

    fn try_from(raw: UncheckedConsensus) -> Result<Self> {
        let checked = match raw.rule {
            SelectionRule::MaxFalsehood => aggregate(raw.assessments)?,
        };
        if checked.selected != raw.selected || checked.triple != raw.triple {
            return Err(CouncilError::InvalidInput(format!(
                "consensus selects assessment {} but the rule selects {}",
                raw.selected, checked.selected
            )));
        }
        Ok(checked)
    }
}

impl ConsensusResult {
    /// The selected triple.
    pub fn triple(&self) -> Triple {
        self.triple
    }

    /// The selected falsehood (the maximum over all inputs).
    pub fn falsehood(&self) -> f64 {
        self.triple.falsehood()
    }

    /// Index of the selected assessment within [`assessments`](Self::assessments).
    pub fn selected_index(&self) -> usize {
        self.selected
    }

    /// The selected assessment.
    pub fn selected(&self) -> &Assessment {
        &self.assessments[self.selected]
    }

    /// Every contributing assessment, in input order.
    pub fn assessments(&self) -> &[Assessment] {
        &self.assessments
    }

    /// The selection rule applied.
    pub fn rule(&self) -> SelectionRule {
        self.rule
    }
}

/// Reduces a non-empty set of assessments to one [`ConsensusResult`].
///
/// # Errors
///
/// Returns [`CouncilError::InvalidInput`] for an empty set.
///
/// # Example
///
/// ```rust
/// use vigil_council::{aggregate, Assessment, Triple};
///
/// let assessments = vec![
///     Assessment::new("a", Triple::new(0.8, 0.1, 0.1)?, "benign"),
///     Assessment::new("b", Triple::new(0.1, 0.1, 0.9)?, "role reversal"),
///     Assessment::new("c", Triple::new(0.7, 0.1, 0.2)?, "mostly fine"),
/// ];
/// let consensus = aggregate(assessments)?;
/// assert_eq!(consensus.falsehood(), 0.9);
/// assert_eq!(consensus.selected().assessor, "b");
/// # Ok::<(), vigil_council::CouncilError>(())
/// ```
pub fn aggregate(assessments: Vec<Assessment>) -> Result<ConsensusResult> {
    let selected = assessments
        .iter()
        .enumerate()
        .reduce(|best, candidate| {
            if outranks(candidate.1, best.1) {
                candidate
            } else {
                best
            }
        })
        .map(|(idx, _)| idx)
        .ok_or_else(|| CouncilError::InvalidInput("empty assessment set".to_string()))?;

    let triple = assessments[selected].triple;
    debug!(
        selected = %assessments[selected].assessor,
        inputs = assessments.len(),
        triple = %triple,
        "consensus selected"
    );

    Ok(ConsensusResult {
        triple,
        selected,
        assessments,
        rule: SelectionRule::MaxFalsehood,
    })
}

/// True if `candidate` should replace `current` as the selection.
///
/// Full ties keep the earlier input.
fn outranks(candidate: &Assessment, current: &Assessment) -> bool {
    candidate
        .falsehood()
        .total_cmp(&current.falsehood())
        .then_with(|| current.truth().total_cmp(&candidate.truth()))
        .then_with(|| current.assessor.cmp(&candidate.assessor))
        == Ordering::Greater
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(assessor: &str, truth: f64, falsehood: f64) -> Assessment {
        Assessment::new(assessor, Triple::new(truth, 0.0, falsehood).unwrap(), "test")
    }

    #[test]
    fn test_single_assessment() {
        let consensus = aggregate(vec![make("a", 0.2, 0.8)]).unwrap();
        assert!((consensus.falsehood() - 0.8).abs() < f64::EPSILON);
        assert_eq!(consensus.selected_index(), 0);
    }

    #[test]
    fn test_max_falsehood_selected() {
        let consensus = aggregate(vec![
            make("a", 0.9, 0.1),
            make("b", 0.1, 0.9),
            make("c", 0.8, 0.2),
        ])
        .unwrap();
        assert!((consensus.falsehood() - 0.9).abs() < f64::EPSILON);
        assert_eq!(consensus.selected_index(), 1);
        assert_eq!(consensus.selected().assessor, "b");
        assert_eq!(consensus.assessments().len(), 3);
    }

    #[test]
    fn test_majority_cannot_dilute_minority() {
        let mut inputs: Vec<Assessment> = (0..9).map(|i| make(&format!("m{}", i), 0.95, 0.0)).collect();
        inputs.push(make("lone", 0.0, 0.85));
        let consensus = aggregate(inputs).unwrap();
        assert_eq!(consensus.selected().assessor, "lone");
    }

    #[test]
    fn test_tie_broken_by_min_truth() {
        let consensus = aggregate(vec![make("a", 0.5, 0.7), make("b", 0.2, 0.7)]).unwrap();
        assert_eq!(consensus.selected().assessor, "b");
    }

    #[test]
    fn test_tie_broken_by_assessor_id() {
        let consensus = aggregate(vec![make("zeta", 0.2, 0.7), make("alpha", 0.2, 0.7)]).unwrap();
        assert_eq!(consensus.selected().assessor, "alpha");
    }

    #[test]
    fn test_full_tie_keeps_first() {
        let consensus = aggregate(vec![make("a", 0.2, 0.7), make("a", 0.2, 0.7)]).unwrap();
        assert_eq!(consensus.selected_index(), 0);
    }

    #[test]
    fn test_selection_is_order_independent() {
        let forward = aggregate(vec![make("a", 0.3, 0.6), make("b", 0.1, 0.6), make("c", 0.9, 0.1)]).unwrap();
        let reverse = aggregate(vec![make("c", 0.9, 0.1), make("b", 0.1, 0.6), make("a", 0.3, 0.6)]).unwrap();
        assert_eq!(forward.selected().assessor, reverse.selected().assessor);
    }

    #[test]
    fn test_empty_input_rejected() {
        let err = aggregate(Vec::new()).unwrap_err();
        assert!(matches!(err, CouncilError::InvalidInput(_)));
    }

    #[test]
    fn test_rule_id() {
        let consensus = aggregate(vec![make("a", 0.2, 0.8)]).unwrap();
        assert_eq!(consensus.rule(), SelectionRule::MaxFalsehood);
        assert!(consensus.rule().id().starts_with("max-falsehood"));
    }

    #[test]
    fn test_consensus_serialization() {
        let consensus = aggregate(vec![make("a", 0.2, 0.8)]).unwrap();
        let json = serde_json::to_string(&consensus).unwrap();
        assert!(json.contains("MaxFalsehood"));

        let parsed: ConsensusResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, consensus);
    }

    #[test]
    fn test_deserialize_rejects_dangling_selection() {
        let consensus = aggregate(vec![make("a", 0.2, 0.8), make("b", 0.9, 0.1)]).unwrap();
        let mut value = serde_json::to_value(&consensus).unwrap();

        value["selected"] = serde_json::json!(7);
        assert!(serde_json::from_value::<ConsensusResult>(value.clone()).is_err());

        value["selected"] = serde_json::json!(1);
        assert!(serde_json::from_value::<ConsensusResult>(value.clone()).is_err());

        value["selected"] = serde_json::json!(0);
        value["assessments"] = serde_json::json!([]);
        let err = serde_json::from_value::<ConsensusResult>(value).unwrap_err();
        assert!(err.to_string().contains("empty assessment set"));
    }
}
