//! # Assessor Council
//!
//! Neutrosophic assessment of conversational exchanges by one or more
//! independent assessors, worst-case consensus, and a multi-round
//! dialogue protocol.
//!
//! ## Overview
//!
//! Every assessor scores an exchange with a neutrosophic triple of
//! truth, indeterminacy and falsehood, each independently in `[0, 1]`.
//! The components do not sum to one: an exchange can be simultaneously
//! plausible and violating.
//!
//! Several assessments of the same exchange are reduced to one result by
//! taking the assessment with the highest falsehood. A majority of
//! benign readings never outvotes the one assessor that detects a
//! reciprocity violation.
//!
//! ## Threat Model
//!
//! ### Crafted Benign Framing
//! An exchange can be worded so most assessors read it as harmless.
//! Averaging would let that framing dilute a correct detection, so the
//! aggregate is worst-case only.
//!
//! ### Assessor Drift During Discussion
//! Assessors that see each other's output can converge on a softer
//! reading. The dialogue aggregates over every round, so a round-1
//! detection survives any later softening, and a rotating withheld
//! participant keeps at least one prior reading unrevised each round.
//!
//! ## Architecture
//!
//! ```text
//!    AssessmentRequest
//!           │
//!           ▼
//!  ┌─────────────────┐    timeout / retry / cache
//!  │ AssessmentClient│◄── around each Assessor
//!  └────────┬────────┘
//!           │  direct │ parallel │ dialogue
//!           ▼
//!  ┌─────────────────┐
//!  │  AssessorCouncil│
//!  └────────┬────────┘
//!           ▼
//!  ┌─────────────────┐
//!  │ aggregate (max  │
//!  │   falsehood)    │
//!  └─────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vigil_council::{
//!     AssessmentClient, AssessmentRequest, AssessorCouncil, CancellationFlag,
//!     DialogueConfig, DialogueProtocol,
//! };
//!
//! let council = AssessorCouncil::new(vec![
//!     AssessmentClient::new(first),
//!     AssessmentClient::new(second),
//!     AssessmentClient::new(third),
//! ]);
//!
//! let protocol = DialogueProtocol::new(DialogueConfig::default());
//! let result = council
//!     .deliberate(&protocol, &AssessmentRequest::new(text), &CancellationFlag::new())
//!     .await?;
//!
//! println!("F = {:.2} ({} rounds)", result.consensus.falsehood(), result.rounds.len());
//! ```
//!
//! ## References
//!
//! - [Neutrosophic logic](https://en.wikipedia.org/wiki/Neutrosophic_logic) - independent truth, indeterminacy and falsehood

pub mod assessment;
pub mod assessor;
pub mod consensus;
pub mod council;
pub mod dialogue;
pub mod error;

pub use assessment::{Assessment, AssessorVerdict, Triple};
pub use assessor::{
    parse_response, AssessmentCache, AssessmentClient, AssessmentRequest, Assessor, CacheKey,
    RetryPolicy,
};
pub use consensus::{aggregate, ConsensusResult, SelectionRule};
pub use council::AssessorCouncil;
pub use dialogue::{
    falsehood_spread, withheld_participant, CancellationFlag, DialogueConfig, DialogueProtocol,
    DialogueResult, DialogueRound, DialogueTranscript, FailurePolicy, ParticipantFailure,
};
pub use error::{CouncilError, FailureKind};

/// Result type for council operations.
pub type Result<T> = std::result::Result<T, CouncilError>;
