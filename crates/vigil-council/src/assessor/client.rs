//! Assessment client: one assessor behind timeout, retry, parse and cache.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::cache::{AssessmentCache, CacheKey};
use super::parse::parse_response;
use super::retry::RetryPolicy;
use super::{AssessmentRequest, Assessor};
use crate::assessment::Assessment;
use crate::error::{CouncilError, FailureKind};
use crate::Result;

/// Default per-attempt timeout.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Wraps one [`Assessor`] with the call-boundary policies.
///
/// # Call Sequence
///
/// 1. Cache lookup (when a cache is attached)
/// 2. Call with per-attempt timeout
/// 3. Parse the raw response into a bounded triple
/// 4. On transient failure, back off and retry within the policy
/// 5. Cache the parsed verdict on success
#[derive(Clone)]
pub struct AssessmentClient {
    assessor: Arc<dyn Assessor>,
    retry: RetryPolicy,
    timeout: Duration,
    cache: Option<Arc<dyn AssessmentCache>>,
}

impl std::fmt::Debug for AssessmentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssessmentClient")
            .field("assessor", &self.assessor.id())
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

impl AssessmentClient {
    /// Creates a client with the default retry policy and timeout, and no cache.
    pub fn new(assessor: Arc<dyn Assessor>) -> Self {
        Self {
            assessor,
            retry: RetryPolicy::new(),
            timeout: DEFAULT_CALL_TIMEOUT,
            cache: None,
        }
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Attaches a verdict cache.
    pub fn with_cache(mut self, cache: Arc<dyn AssessmentCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Returns the wrapped assessor's id.
    pub fn id(&self) -> &str {
        self.assessor.id()
    }

    /// Produces one assessment for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`CouncilError::AssessorFailure`] with the last failure once
    /// the retry policy gives up. Malformed responses are surfaced after a
    /// single attempt.
    pub async fn assess(&self, request: &AssessmentRequest) -> Result<Assessment> {
        let key = CacheKey::derive(request, self.id());

        if let Some(cache) = &self.cache {
            if let Some(verdict) = cache.get(&key) {
                debug!(assessor = %self.id(), key = %key, "assessment cache hit");
                return Ok(Assessment::from_verdict(self.id(), verdict));
            }
        }

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;

            let outcome = match tokio::time::timeout(self.timeout, self.assessor.assess(request)).await
            {
                Ok(result) => result,
                Err(_) => Err(FailureKind::Timeout),
            };

            let failure = match outcome.and_then(|raw| parse_response(&raw)) {
                Ok(verdict) => {
                    if let Some(cache) = &self.cache {
                        cache.put(key, &verdict);
                    }
                    debug!(assessor = %self.id(), attempt, triple = %verdict.triple, "assessment received");
                    return Ok(Assessment::from_verdict(self.id(), verdict));
                }
                Err(kind) => kind,
            };

            if !self.retry.should_retry(&failure, attempt) {
                warn!(assessor = %self.id(), attempt, error = %failure, "assessor call failed");
                return Err(CouncilError::AssessorFailure {
                    assessor: self.id().to_string(),
                    kind: failure,
                });
            }

            let delay = self.retry.delay_for(attempt);
            debug!(assessor = %self.id(), attempt, ?delay, error = %failure, "retrying assessor call");
            tokio::time::sleep(delay).await;
        }
    }
}
