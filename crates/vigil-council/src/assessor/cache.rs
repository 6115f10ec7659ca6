//! Content-addressed cache key contract.
//!
//! The engine only owns the key: a SHA-256 digest over the passage,
//! context, instructions and assessor id. Storage and eviction belong
//! to whatever implements [`AssessmentCache`].
//!
//! Each field is length-prefixed before hashing so that moving bytes
//! between adjacent fields always changes the key.

use std::fmt;

use sha2::{Digest, Sha256};

use super::AssessmentRequest;
use crate::assessment::AssessorVerdict;

/// Size of a cache key in bytes.
pub const KEY_SIZE: usize = 32;

/// Content-addressed key for one (request, assessor) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey([u8; KEY_SIZE]);

impl CacheKey {
    /// Derives the key for `request` as seen by `assessor_id`.
    pub fn derive(request: &AssessmentRequest, assessor_id: &str) -> Self {
        let mut hasher = Sha256::new();
        for field in [
            request.passage.as_str(),
            request.context.as_str(),
            request.instructions.as_str(),
            assessor_id,
        ] {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
        Self(hasher.finalize().into())
    }

    /// Returns the raw digest.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Storage for parsed assessor verdicts, consulted before each call.
///
/// Implementations must be safe to share across concurrent calls.
pub trait AssessmentCache: Send + Sync {
    /// Looks up a previously stored verdict.
    fn get(&self, key: &CacheKey) -> Option<AssessorVerdict>;

    /// Stores a verdict. Failures to store are the implementation's concern.
    fn put(&self, key: CacheKey, verdict: &AssessorVerdict);
}
