//! Assessor council facade.
//!
//! Holds the configured assessors and offers the three ways of
//! assessing one exchange: a single direct call, a parallel fan-out
//! with no cross-visibility, and the multi-round dialogue.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::assessor::{AssessmentCache, AssessmentClient, AssessmentRequest};
use crate::consensus::{aggregate, ConsensusResult};
use crate::dialogue::{
    CancellationFlag, DialogueProtocol, DialogueResult, FailurePolicy, ParticipantFailure,
};
use crate::error::CouncilError;
use crate::Result;

/// The set of assessors consulted for each exchange.
///
/// # Example
///
/// ```rust,ignore
/// use vigil_council::{AssessmentClient, AssessmentRequest, AssessorCouncil};
///
/// let council = AssessorCouncil::new(vec![
///     AssessmentClient::new(primary),
///     AssessmentClient::new(secondary),
/// ]);
///
/// let consensus = council.assess_parallel(&AssessmentRequest::new(text)).await?;
/// println!("falsehood = {}", consensus.falsehood());
/// ```
#[derive(Debug, Clone)]
pub struct AssessorCouncil {
    members: Vec<AssessmentClient>,
    policy: FailurePolicy,
    min_viable: usize,
}

impl AssessorCouncil {
    /// Creates a council with a resilient policy and a quorum of 1.
    pub fn new(members: Vec<AssessmentClient>) -> Self {
        Self {
            members,
            policy: FailurePolicy::Resilient,
            min_viable: 1,
        }
    }

    /// Sets the failure policy and quorum used by [`assess_parallel`](Self::assess_parallel).
    pub fn with_failure_policy(mut self, policy: FailurePolicy, min_viable: usize) -> Self {
        self.policy = policy;
        self.min_viable = min_viable;
        self
    }

    /// Attaches the same cache to every member.
    pub fn with_cache(mut self, cache: Arc<dyn AssessmentCache>) -> Self {
        self.members = self
            .members
            .into_iter()
            .map(|m| m.with_cache(Arc::clone(&cache)))
            .collect();
        self
    }

    /// Returns the number of members.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Returns the member ids in order.
    pub fn member_ids(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.id()).collect()
    }

    /// Returns the members.
    pub fn members(&self) -> &[AssessmentClient] {
        &self.members
    }

    /// Assesses with the first member only.
    pub async fn assess_direct(&self, request: &AssessmentRequest) -> Result<ConsensusResult> {
        let primary = self
            .members
            .first()
            .ok_or_else(|| CouncilError::InvalidInput("council has no members".to_string()))?;

        debug!(assessor = %primary.id(), "direct assessment");
        let assessment = primary.assess(request).await?;
        aggregate(vec![assessment])
    }

    /// Assesses with every member concurrently, then aggregates.
    ///
    /// # Errors
    ///
    /// Under [`FailurePolicy::Strict`] the first member failure is returned
    /// as-is. Under [`FailurePolicy::Resilient`] failures are dropped unless
    /// fewer than `min_viable` assessments remain, which yields
    /// [`CouncilError::QuorumLost`].
    pub async fn assess_parallel(&self, request: &AssessmentRequest) -> Result<ConsensusResult> {
        if self.members.is_empty() {
            return Err(CouncilError::InvalidInput("council has no members".to_string()));
        }

        let outcomes = join_all(self.members.iter().map(|m| m.assess(request))).await;

        let mut assessments = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(assessment) => assessments.push(assessment),
                Err(CouncilError::AssessorFailure { assessor, kind }) => match self.policy {
                    FailurePolicy::Strict => {
                        return Err(CouncilError::AssessorFailure { assessor, kind })
                    }
                    FailurePolicy::Resilient => {
                        warn!(assessor = %assessor, error = %kind, "assessor dropped from parallel assessment");
                        failures.push(ParticipantFailure { assessor, kind });
                    }
                },
                Err(other) => return Err(other),
            }
        }

        if assessments.len() < self.min_viable.max(1) {
            return Err(CouncilError::QuorumLost {
                required: self.min_viable.max(1),
                remaining: assessments.len(),
                failures,
            });
        }

        aggregate(assessments)
    }

    /// Runs the multi-round dialogue over every member.
    pub async fn deliberate(
        &self,
        protocol: &DialogueProtocol,
        request: &AssessmentRequest,
        cancel: &CancellationFlag,
    ) -> Result<DialogueResult> {
        protocol.run(&self.members, request, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessor::Assessor;
    use crate::error::FailureKind;
    use async_trait::async_trait;

    struct Fixed {
        id: &'static str,
        response: std::result::Result<&'static str, FailureKind>,
    }

    #[async_trait]
    impl Assessor for Fixed {
        fn id(&self) -> &str {
            self.id
        }

        async fn assess(&self, _request: &AssessmentRequest) -> std::result::Result<String, FailureKind> {
            self.response.clone().map(str::to_string)
        }
    }

    fn member(id: &'static str, falsehood: f64) -> AssessmentClient {
        let body: &'static str = Box::leak(
            format!(
                r#"{{"truth":{},"indeterminacy":0.1,"falsehood":{},"reasoning":"{}"}}"#,
                1.0 - falsehood,
                falsehood,
                id
            )
            .into_boxed_str(),
        );
        AssessmentClient::new(Arc::new(Fixed { id, response: Ok(body) }))
    }

    fn failing(id: &'static str, kind: FailureKind) -> AssessmentClient {
        AssessmentClient::new(Arc::new(Fixed { id, response: Err(kind) }))
            .with_retry(crate::RetryPolicy::no_retry())
    }

    #[tokio::test]
    async fn test_direct_uses_first_member() {
        let council = AssessorCouncil::new(vec![member("a", 0.3), member("b", 0.9)]);
        let consensus = council.assess_direct(&AssessmentRequest::new("x")).await.unwrap();
        assert_eq!(consensus.selected().assessor, "a");
        assert_eq!(consensus.assessments().len(), 1);
    }

    #[tokio::test]
    async fn test_parallel_takes_worst_case() {
        let council = AssessorCouncil::new(vec![member("a", 0.1), member("b", 0.9), member("c", 0.2)]);
        let consensus = council.assess_parallel(&AssessmentRequest::new("x")).await.unwrap();
        assert!((consensus.falsehood() - 0.9).abs() < f64::EPSILON);
        assert_eq!(consensus.selected_index(), 1);
    }

    #[tokio::test]
    async fn test_parallel_strict_surfaces_failure() {
        let council = AssessorCouncil::new(vec![member("a", 0.1), failing("b", FailureKind::Timeout)])
            .with_failure_policy(FailurePolicy::Strict, 1);
        let err = council.assess_parallel(&AssessmentRequest::new("x")).await.unwrap_err();
        assert!(matches!(err, CouncilError::AssessorFailure { .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_parallel_resilient_drops_failure() {
        let council = AssessorCouncil::new(vec![member("a", 0.1), failing("b", FailureKind::Timeout)])
            .with_failure_policy(FailurePolicy::Resilient, 1);
        let consensus = council.assess_parallel(&AssessmentRequest::new("x")).await.unwrap();
        assert_eq!(consensus.assessments().len(), 1);
    }

    #[tokio::test]
    async fn test_parallel_resilient_quorum_lost() {
        let council = AssessorCouncil::new(vec![member("a", 0.1), failing("b", FailureKind::RateLimited)])
            .with_failure_policy(FailurePolicy::Resilient, 2);
        let err = council.assess_parallel(&AssessmentRequest::new("x")).await.unwrap_err();
        match err {
            CouncilError::QuorumLost { required, remaining, failures } => {
                assert_eq!(required, 2);
                assert_eq!(remaining, 1);
                assert_eq!(failures.len(), 1);
            }
            other => panic!("expected QuorumLost, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_council_is_invalid() {
        let council = AssessorCouncil::new(Vec::new());
        assert!(matches!(
            council.assess_direct(&AssessmentRequest::new("x")).await,
            Err(CouncilError::InvalidInput(_))
        ));
        assert!(matches!(
            council.assess_parallel(&AssessmentRequest::new("x")).await,
            Err(CouncilError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_member_ids() {
        let council = AssessorCouncil::new(vec![member("a", 0.1), member("b", 0.2)]);
        assert_eq!(council.member_count(), 2);
        assert_eq!(council.member_ids(), vec!["a", "b"]);
    }
}
