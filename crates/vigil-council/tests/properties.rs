//! Property tests for consensus selection, withheld rotation and
//! dialogue aggregation.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use proptest::prelude::*;
use vigil_council::{
    aggregate, withheld_participant, Assessment, AssessmentClient, AssessmentRequest, Assessor,
    CancellationFlag, DialogueConfig, DialogueProtocol, DialogueResult, FailureKind, RetryPolicy,
    Triple,
};

fn arb_assessments() -> impl Strategy<Value = Vec<(u8, f64, f64)>> {
    prop::collection::vec((0u8..6, 0.0f64..=1.0, 0.0f64..=1.0), 1..12)
}

fn build(raw: &[(u8, f64, f64)]) -> Vec<Assessment> {
    raw.iter()
        .map(|(id, t, f)| {
            Assessment::new(format!("assessor-{}", id), Triple::new(*t, 0.5, *f).unwrap(), "p")
        })
        .collect()
}

/// Answers each call with the next falsehood in its script.
struct Scripted {
    id: String,
    falsehoods: Mutex<VecDeque<f64>>,
}

#[async_trait]
impl Assessor for Scripted {
    fn id(&self) -> &str {
        &self.id
    }

    async fn assess(&self, _request: &AssessmentRequest) -> Result<String, FailureKind> {
        let f = self
            .falsehoods
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| FailureKind::Transport("script exhausted".to_string()))?;
        Ok(format!(
            r#"{{"truth":{},"indeterminacy":0.1,"falsehood":{},"reasoning":"scripted"}}"#,
            1.0 - f,
            f
        ))
    }
}

/// One falsehood script per assessor, one entry per round.
fn arb_dialogue() -> impl Strategy<Value = (u32, Vec<Vec<f64>>)> {
    (2usize..=5, 1u32..=4).prop_flat_map(|(n, rounds)| {
        let script = prop::collection::vec(0u32..=100, rounds as usize)
            .prop_map(|steps| steps.into_iter().map(|k| k as f64 / 100.0).collect::<Vec<f64>>());
        (Just(rounds), prop::collection::vec(script, n))
    })
}

fn run_dialogue(rounds: u32, scripts: &[Vec<f64>]) -> DialogueResult {
    let clients: Vec<AssessmentClient> = scripts
        .iter()
        .enumerate()
        .map(|(i, script)| {
            let assessor = Arc::new(Scripted {
                id: format!("assessor-{}", i),
                falsehoods: Mutex::new(script.iter().copied().collect()),
            });
            AssessmentClient::new(assessor).with_retry(RetryPolicy::no_retry())
        })
        .collect();
    let protocol = DialogueProtocol::new(DialogueConfig::new().with_rounds(rounds));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime
        .block_on(protocol.run(&clients, &AssessmentRequest::new("passage"), &CancellationFlag::new()))
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn dialogue_preserves_round_one_maximum((rounds, scripts) in arb_dialogue()) {
        let result = run_dialogue(rounds, &scripts);

        let first = &result.rounds[0];
        prop_assert_eq!(first.assessments.len(), scripts.len());
        let first_max = first.assessments.iter().map(Assessment::falsehood).fold(0.0f64, f64::max);
        prop_assert!(result.consensus.falsehood() >= first_max);
    }

    #[test]
    fn dialogue_aggregate_is_maximum_over_all_rounds((rounds, scripts) in arb_dialogue()) {
        let result = run_dialogue(rounds, &scripts);

        prop_assert!(result.valid);
        prop_assert_eq!(result.rounds.len(), rounds as usize);
        let overall = result.all_assessments().map(Assessment::falsehood).fold(0.0f64, f64::max);
        prop_assert_eq!(result.consensus.falsehood(), overall);
    }
}

proptest! {
    #[test]
    fn aggregate_falsehood_is_the_maximum(raw in arb_assessments()) {
        let max = raw.iter().map(|r| r.2).fold(f64::MIN, f64::max);
        let consensus = aggregate(build(&raw)).unwrap();
        prop_assert_eq!(consensus.falsehood(), max);
    }

    #[test]
    fn aggregate_never_below_any_input(raw in arb_assessments()) {
        let consensus = aggregate(build(&raw)).unwrap();
        for (_, _, f) in &raw {
            prop_assert!(consensus.falsehood() >= *f);
        }
    }

    #[test]
    fn aggregate_selection_ignores_input_order(raw in arb_assessments()) {
        let forward = aggregate(build(&raw)).unwrap();
        let mut reversed = raw.clone();
        reversed.reverse();
        let backward = aggregate(build(&reversed)).unwrap();

        prop_assert_eq!(forward.triple(), backward.triple());
        prop_assert_eq!(&forward.selected().assessor, &backward.selected().assessor);
    }

    #[test]
    fn rotation_withholds_each_participant_once_per_cycle(n in 2usize..8, start in 2u32..50) {
        let ids: Vec<String> = (0..n).map(|i| format!("p{}", i)).collect();
        let mut seen: Vec<&str> = (start..start + n as u32)
            .map(|round| withheld_participant(round, &ids).unwrap())
            .collect();
        seen.sort_unstable();
        seen.dedup();
        prop_assert_eq!(seen.len(), n);
    }

    #[test]
    fn rotation_is_periodic(n in 2usize..8, round in 2u32..200) {
        let ids: Vec<String> = (0..n).map(|i| format!("p{}", i)).collect();
        prop_assert_eq!(
            withheld_participant(round, &ids),
            withheld_participant(round + n as u32, &ids)
        );
    }
}
