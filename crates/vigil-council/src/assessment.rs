//! Assessment data model.
//!
//! A [`Triple`] carries three independently bounded dimensions
//! (truth, indeterminacy, falsehood) in place of a binary label.
//! An [`Assessment`] is one assessor's triple for one exchange.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CouncilError;
use crate::Result;

/// Three independently bounded assessment dimensions.
///
/// Each component lies in `[0.0, 1.0]`. The components are NOT
/// required to sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedTriple")]
pub struct Triple {
    truth: f64,
    indeterminacy: f64,
    falsehood: f64,
}

#[derive(Deserialize)]
struct UncheckedTriple {
    truth: f64,
    indeterminacy: f64,
    falsehood: f64,
}

impl TryFrom<UncheckedTriple> for Triple {
    type Error = CouncilError;

    fn try_from(raw: UncheckedTriple) -> Result<Self> {
        Triple::new(raw.truth, raw.indeterminacy, raw.falsehood)
    }
}

impl Triple {
    /// Creates a triple, rejecting non-finite or out-of-range components.
    pub fn new(truth: f64, indeterminacy: f64, falsehood: f64) -> Result<Self> {
        for (name, value) in [
            ("truth", truth),
            ("indeterminacy", indeterminacy),
            ("falsehood", falsehood),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(CouncilError::InvalidInput(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(Self {
            truth,
            indeterminacy,
            falsehood,
        })
    }

    /// Returns the truth component.
    pub fn truth(&self) -> f64 {
        self.truth
    }

    /// Returns the indeterminacy component.
    pub fn indeterminacy(&self) -> f64 {
        self.indeterminacy
    }

    /// Returns the falsehood component.
    pub fn falsehood(&self) -> f64 {
        self.falsehood
    }

    /// Returns `truth - falsehood`, in `[-1.0, 1.0]`.
    pub fn balance(&self) -> f64 {
        self.truth - self.falsehood
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "T={:.2} I={:.2} F={:.2}",
            self.truth, self.indeterminacy, self.falsehood
        )
    }
}

/// The parsed content of one assessor response.
///
/// This is what the cache stores: it carries no assessor identity and
/// no timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessorVerdict {
    /// The assessed triple.
    pub triple: Triple,
    /// The assessor's justification text.
    pub justification: String,
    /// Cross-assessor patterns the assessor reported, if any.
    pub patterns: Vec<String>,
}

/// One assessor's judgment of one exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// Identifier of the assessor that produced this assessment.
    pub assessor: String,
    /// The assessed triple.
    pub triple: Triple,
    /// Justification text.
    pub justification: String,
    /// Cross-assessor patterns reported alongside the triple.
    pub patterns: Vec<String>,
    /// When the assessment was produced.
    pub timestamp: DateTime<Utc>,
}

impl Assessment {
    /// Creates a new assessment stamped with the current time.
    pub fn new(assessor: impl Into<String>, triple: Triple, justification: impl Into<String>) -> Self {
        Self {
            assessor: assessor.into(),
            triple,
            justification: justification.into(),
            patterns: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Builds an assessment from a parsed verdict.
    pub fn from_verdict(assessor: impl Into<String>, verdict: AssessorVerdict) -> Self {
        Self {
            assessor: assessor.into(),
            triple: verdict.triple,
            justification: verdict.justification,
            patterns: verdict.patterns,
            timestamp: Utc::now(),
        }
    }

    /// Adds a reported pattern.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    /// Shorthand for `self.triple.falsehood()`.
    pub fn falsehood(&self) -> f64 {
        self.triple.falsehood()
    }

    /// Shorthand for `self.triple.truth()`.
    pub fn truth(&self) -> f64 {
        self.triple.truth()
    }
}
