//! The boundary to the external assessment capability.
//!
//! The capability itself (typically a language model) is an untrusted,
//! latency-bearing oracle. This module defines the [`Assessor`] trait
//! it is reached through, and the [`AssessmentClient`] that wraps one
//! assessor with timeout, retry, response parsing and caching.
//!
//! # Security Notes
//!
//! - A failed call is never replaced by a plausible default triple
//! - Malformed responses fail fast and carry the raw response
//! - Only transient failures (timeout, rate limit, transport) are retried

pub mod cache;
pub mod client;
pub mod parse;
pub mod retry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::FailureKind;

pub use cache::{AssessmentCache, CacheKey};
pub use client::AssessmentClient;
pub use parse::parse_response;
pub use retry::RetryPolicy;

/// Input for one assessor call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentRequest {
    /// The passage under assessment.
    pub passage: String,
    /// Surrounding conversational context.
    pub context: String,
    /// Instructions for the assessor.
    pub instructions: String,
}

impl AssessmentRequest {
    /// Creates a request for a passage with empty context and instructions.
    pub fn new(passage: impl Into<String>) -> Self {
        Self {
            passage: passage.into(),
            context: String::new(),
            instructions: String::new(),
        }
    }

    /// Sets the surrounding context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Sets the assessor instructions.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// Length of the exchange in characters (passage plus context).
    pub fn exchange_length(&self) -> usize {
        self.passage.chars().count() + self.context.chars().count()
    }
}

/// An external assessment capability.
///
/// Implementations return the raw response text; parsing into a
/// bounded triple is done by the caller so that every implementation
/// is held to the same format contract.
#[async_trait]
pub trait Assessor: Send + Sync {
    /// Stable identifier of this assessor.
    fn id(&self) -> &str;

    /// Assesses one request and returns the raw response.
    async fn assess(&self, request: &AssessmentRequest) -> Result<String, FailureKind>;
}
