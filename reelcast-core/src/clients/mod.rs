//! Collaborator boundaries for everything the pipeline cannot do locally.
//!
//! The pipeline depends only on the traits in this module; the sibling files
//! provide the HTTP-backed production implementations. Tests inject fakes.

pub mod deepgram;
pub mod forum;
pub mod openai;

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::media::captions::CaptionSegment;

pub use deepgram::DeepgramClient;
pub use forum::ForumFetcher;
pub use openai::OpenAiScriptGenerator;

/// Errors shared by the HTTP collaborator clients.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response shape: {0}")]
    Malformed(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single ranked comment attached to the source post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedComment {
    pub text: String,
    pub upvotes: i64,
}

/// Source material extracted from a forum post.
#[derive(Debug, Clone)]
pub struct SourceContent {
    pub title: String,
    pub description: String,
    pub ranked_comments: Vec<RankedComment>,
}

/// Resolves a source reference (post URL) into title, description and
/// ranked comments.
#[async_trait]
pub trait SourceContentFetcher: Send + Sync {
    async fn fetch(&self, reference: &str) -> Result<SourceContent, ClientError>;
}

/// Generates the narration script from the post's title and description.
#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    async fn generate(&self, title: &str, description: &str) -> Result<String, ClientError>;
}

/// Synthesizes speech for a script. The returned bytes must be a
/// probe-readable audio container (WAV by default).
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, ClientError>;
}

/// Transcribes narration audio into time-coded segments.
///
/// One attempt per job — transcription is billed and rate-limited upstream,
/// so callers must not retry a failed call.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_path: &Path) -> Result<Vec<CaptionSegment>, ClientError>;
}
