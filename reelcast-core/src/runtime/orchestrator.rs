use std::sync::Arc;

use bytes::Bytes;
use tracing::{error, info, warn};

use crate::clients::{ScriptGenerator, SourceContentFetcher, SpeechSynthesizer};
use crate::media::captions::{self, CaptionEngine, StyleSpec};
use crate::media::composer::VideoComposer;
use crate::media::probe::{DurationProbe, MediaAsset, MediaKind};
use crate::runtime::admission::TranscodePool;
use crate::runtime::tracker::TaskTracker;
use crate::runtime::types::{PipelineError, TaskState};
use crate::storage::ObjectStore;

/// External collaborators consumed by the pipeline.
///
/// Everything the pipeline cannot compute locally enters through these four
/// trait objects; tests swap in fakes and the orchestrator logic never
/// notices.
#[derive(Clone)]
pub struct Collaborators {
    pub fetcher: Arc<dyn SourceContentFetcher>,
    pub script: Arc<dyn ScriptGenerator>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub store: Arc<dyn ObjectStore>,
}

/// Static pipeline configuration that is identical for every job.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Caption style burned into every video.
    pub style: StyleSpec,
    /// Object-store bucket holding the background clip and the results.
    pub bucket: String,
    /// Key of the background loop within `bucket`.
    pub background_key: String,
}

/// Sequences one end-to-end generation job.
///
/// Stages run in a fixed order; the matching [`TaskState`] is recorded
/// *before* each stage executes, the first error records `Failed` with the
/// error text verbatim and stops the sequence. There is no retry, no
/// per-stage timeout and no compensation of earlier side effects (a partial
/// upload stays where it is).
#[derive(Clone)]
pub struct PipelineOrchestrator {
    tracker: TaskTracker,
    pool: TranscodePool,
    collaborators: Collaborators,
    captions: Arc<CaptionEngine>,
    composer: Arc<VideoComposer>,
    probe: Arc<DurationProbe>,
    settings: Arc<PipelineSettings>,
}

impl PipelineOrchestrator {
    pub fn new(
        tracker: TaskTracker,
        pool: TranscodePool,
        collaborators: Collaborators,
        captions: CaptionEngine,
        composer: VideoComposer,
        probe: DurationProbe,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            tracker,
            pool,
            collaborators,
            captions: Arc::new(captions),
            composer: Arc::new(composer),
            probe: Arc::new(probe),
            settings: Arc::new(settings),
        }
    }

    pub fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    /// Start a generation job and return its task id immediately.
    ///
    /// The job itself runs in a background task. A watcher awaits its join
    /// handle so that a panic inside the job is recorded as `Failed` on the
    /// task instead of disappearing into the scheduler.
    pub async fn start(&self, reference: impl Into<String>) -> String {
        let reference = reference.into();
        let task_id = self.tracker.create().await;
        self.tracker
            .update(&task_id, TaskState::Processing, None, None)
            .await;
        info!(%task_id, %reference, "generation job accepted");

        let job = self.clone();
        let job_id = task_id.clone();
        let handle = tokio::spawn(async move {
            match job.run_job(&job_id, &reference).await {
                Ok(result_url) => {
                    info!(task_id = %job_id, %result_url, "generation completed");
                    job.tracker
                        .update(&job_id, TaskState::Completed, None, Some(result_url))
                        .await;
                }
                Err(err) => {
                    warn!(task_id = %job_id, error = %err, "generation failed");
                    job.tracker
                        .update(&job_id, TaskState::Failed, Some(err.to_string()), None)
                        .await;
                }
            }
        });

        let watcher_tracker = self.tracker.clone();
        let watch_id = task_id.clone();
        tokio::spawn(async move {
            if let Err(join_err) = handle.await {
                error!(task_id = %watch_id, error = %join_err, "generation task aborted");
                watcher_tracker
                    .update(
                        &watch_id,
                        TaskState::Failed,
                        Some(format!("pipeline task aborted: {join_err}")),
                        None,
                    )
                    .await;
            }
        });

        task_id
    }

    async fn run_job(&self, task_id: &str, reference: &str) -> Result<String, PipelineError> {
        self.enter_stage(task_id, TaskState::FetchingSource).await;
        let content = self
            .collaborators
            .fetcher
            .fetch(reference)
            .await
            .map_err(PipelineError::Fetch)?;

        self.enter_stage(task_id, TaskState::GeneratingScript).await;
        let script = self
            .collaborators
            .script
            .generate(&content.title, &content.description)
            .await
            .map_err(PipelineError::Generation)?;

        self.enter_stage(task_id, TaskState::GeneratingVoiceover)
            .await;
        let audio = self
            .collaborators
            .speech
            .synthesize(&script)
            .await
            .map_err(PipelineError::Generation)?;
        let narration = MediaAsset::probe(&self.probe, Bytes::from(audio), MediaKind::Audio).await?;

        self.enter_stage(task_id, TaskState::FetchingBackgroundVideo)
            .await;
        let background_bytes = self
            .collaborators
            .store
            .read(&self.settings.bucket, &self.settings.background_key)
            .await
            .map_err(PipelineError::Storage)?;
        let background =
            MediaAsset::probe(&self.probe, Bytes::from(background_bytes), MediaKind::Video).await?;

        self.enter_stage(task_id, TaskState::ProcessingVideo).await;
        let video = self.process_video(task_id, &narration, &background).await?;

        self.enter_stage(task_id, TaskState::PublishingResult).await;
        let key = format!("output_video_{task_id}.mp4");
        self.collaborators
            .store
            .write(&self.settings.bucket, &key, &video)
            .await
            .map_err(PipelineError::Storage)?;
        Ok(self
            .collaborators
            .store
            .public_url(&self.settings.bucket, &key))
    }

    /// Transcribe, style and burn the captions, then compose the final clip.
    ///
    /// Composition waits on the transcode pool, so a burst of jobs queues
    /// here instead of spawning unbounded ffmpeg processes.
    async fn process_video(
        &self,
        task_id: &str,
        narration: &MediaAsset,
        background: &MediaAsset,
    ) -> Result<Vec<u8>, PipelineError> {
        let scratch = tempfile::tempdir()?;
        let audio_path = scratch.path().join("narration.wav");
        tokio::fs::write(&audio_path, &narration.bytes).await?;

        let segments = self.captions.transcribe(&audio_path).await?;
        let subtitle = if segments.is_empty() {
            // An empty transcript is valid; the job produces a captionless
            // video rather than failing.
            info!(task_id, "transcript is empty; rendering without captions");
            None
        } else {
            let srt = captions::render_srt(&segments);
            let ass = self.captions.to_ass(&srt).await?;
            Some(captions::apply_style(&ass, &self.settings.style))
        };

        let _permit = self.pool.acquire().await?;
        let video = self
            .composer
            .compose(narration, background, subtitle.as_deref(), &self.settings.style)
            .await?;
        Ok(video)
    }

    async fn enter_stage(&self, task_id: &str, state: TaskState) {
        info!(task_id, stage = %state, "entering stage");
        self.tracker.update(task_id, state, None, None).await;
    }
}

impl std::fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("settings", &self.settings)
            .finish()
    }
}
