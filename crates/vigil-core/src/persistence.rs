//! Transcript persistence boundary.
//!
//! Each dialogue invocation yields one [`DialogueTranscript`] keyed by its
//! invocation id. Storage is the caller's concern. A failing sink is
//! logged and otherwise ignored: it never turns a completed evaluation
//! into a failed one.

use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;
use vigil_council::DialogueTranscript;

/// Failure reported by a [`TranscriptSink`].
#[derive(Debug, Error)]
#[error("transcript persistence failed: {0}")]
pub struct SinkError(pub String);

/// Receives dialogue transcripts.
pub trait TranscriptSink: Send + Sync {
    /// Stores one transcript.
    fn persist(&self, invocation_id: Uuid, transcript: &DialogueTranscript) -> Result<(), SinkError>;
}

/// Hands `transcript` to `sink`, logging any failure.
pub(crate) fn persist_logged(sink: &dyn TranscriptSink, transcript: &DialogueTranscript) {
    match sink.persist(transcript.invocation_id, transcript) {
        Ok(()) => debug!(invocation = %transcript.invocation_id, "transcript persisted"),
        Err(err) => warn!(invocation = %transcript.invocation_id, error = %err, "transcript not persisted"),
    }
}
