//! Withheld-participant rotation and per-round spread.

use crate::assessment::Assessment;

/// Returns the participant withheld in `round` (1-based).
///
/// Round 1 withholds nobody. Round `k > 1` withholds
/// `participants[(k - 2) % len]`, so the rotation starts at the first
/// participant in round 2. Fewer than two participants withholds nobody,
/// since a round must leave at least one assessor speaking.
///
/// This is a pure function of its inputs: any round can be computed
/// without replaying the ones before it.
pub fn withheld_participant<S: AsRef<str>>(round: u32, participants: &[S]) -> Option<&str> {
    if round < 2 || participants.len() < 2 {
        return None;
    }
    let idx = (round as usize - 2) % participants.len();
    Some(participants[idx].as_ref())
}

/// Population standard deviation of falsehood across `assessments`.
///
/// Returned as metadata only. `None` when the round produced nothing.
pub fn falsehood_spread(assessments: &[Assessment]) -> Option<f64> {
    if assessments.is_empty() {
        return None;
    }
    let n = assessments.len() as f64;
    let mean = assessments.iter().map(Assessment::falsehood).sum::<f64>() / n;
    let variance = assessments
        .iter()
        .map(|a| (a.falsehood() - mean).powi(2))
        .sum::<f64>()
        / n;
    Some(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::Triple;

    #[test]
    fn test_round_one_withholds_nobody() {
        assert_eq!(withheld_participant(1, &["a", "b", "c"]), None);
    }

    #[test]
    fn test_rotation_through_participants() {
        let ids = ["a", "b", "c"];
        assert_eq!(withheld_participant(2, &ids), Some("a"));
        assert_eq!(withheld_participant(3, &ids), Some("b"));
        assert_eq!(withheld_participant(4, &ids), Some("c"));
        assert_eq!(withheld_participant(5, &ids), Some("a"));
    }

    #[test]
    fn test_any_round_computed_independently() {
        let ids = vec!["a".to_string(), "b".to_string()];
        assert_eq!(withheld_participant(101, &ids), Some("b"));
    }

    #[test]
    fn test_single_participant_never_withheld() {
        assert_eq!(withheld_participant(3, &["solo"]), None);
        let empty: [&str; 0] = [];
        assert_eq!(withheld_participant(3, &empty), None);
    }

    #[test]
    fn test_spread() {
        let make = |f: f64| Assessment::new("x", Triple::new(0.0, 0.0, f).unwrap(), "");
        assert_eq!(falsehood_spread(&[]), None);
        assert_eq!(falsehood_spread(&[make(0.4)]), Some(0.0));

        let spread = falsehood_spread(&[make(0.2), make(0.8)]).unwrap();
        assert!((spread - 0.3).abs() < 1e-12);
    }
}
