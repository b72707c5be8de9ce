use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clients::ClientError;
use crate::media::captions::CaptionError;
use crate::media::composer::ComposeError;
use crate::media::probe::ProbeError;
use crate::storage::StorageError;

/// High-level lifecycle state of a generation task.
///
/// The per-stage states between `Processing` and the terminal pair mirror the
/// orchestrator's stage sequence; a poller sees them in order on the happy
/// path, but no linear ordering is enforced by [`TaskTracker`].
///
/// [`TaskTracker`]: crate::runtime::tracker::TaskTracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskState {
    /// Task has been accepted but not yet started.
    Pending,
    /// Task has been handed to the pipeline but no stage has begun.
    Processing,
    /// Downloading and parsing the source post.
    FetchingSource,
    /// Generating the voiceover script.
    GeneratingScript,
    /// Synthesizing the narration audio.
    GeneratingVoiceover,
    /// Loading the background clip from the object store.
    FetchingBackgroundVideo,
    /// Transcribing, styling captions and running the composition.
    ProcessingVideo,
    /// Uploading the finished video and resolving its public URL.
    PublishingResult,
    /// Terminal: the result URL is available.
    Completed,
    /// Terminal: the first fatal error is recorded on the task.
    Failed,
}

impl TaskState {
    /// Returns `true` for the terminal states (`Completed`, `Failed`).
    ///
    /// No transition is defined out of a terminal state; the tracker rejects
    /// further updates once one is recorded.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }
}

/// Errors produced by the pipeline, one variant per stage family.
///
/// The orchestrator records `Display` output of these verbatim as the task's
/// error message, so every variant carries enough context to be read back
/// from a status poll without the source chain.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Source content unreachable or malformed.
    #[error("source fetch failed: {0}")]
    Fetch(#[source] ClientError),

    /// Script or speech synthesis failure.
    #[error("generation failed: {0}")]
    Generation(#[source] ClientError),

    /// Duration measurement failure.
    #[error(transparent)]
    Probe(#[from] ProbeError),

    /// Transcription or subtitle transform failure.
    #[error(transparent)]
    Caption(#[from] CaptionError),

    /// Validation or transcoding failure in the composer.
    #[error(transparent)]
    Compose(#[from] ComposeError),

    /// Object-store read or publish failure.
    #[error("storage error: {0}")]
    Storage(#[source] StorageError),

    /// Job-scoped scratch directory could not be created or written.
    #[error("scratch space error: {0}")]
    Scratch(#[from] std::io::Error),

    /// The transcode admission pool was shut down while a job waited on it.
    #[error("transcode pool unavailable")]
    PoolClosed,
}
