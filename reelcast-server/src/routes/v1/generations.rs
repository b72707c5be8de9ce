//! Video generation endpoints.
//!
//! `POST /v1/generations` accepts a source reference and returns a task id
//! immediately; the pipeline runs in the background. Clients poll
//! `GET /v1/generations/{task_id}` until the task reaches a terminal state.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use reelcast_core::TaskSnapshot;

use crate::error::ServerError;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(start_generation, generation_status))]
pub struct GenerationsApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/generations", post(start_generation))
        .route("/generations/{task_id}", get(generation_status))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StartGenerationRequest {
    /// URL of the source post to narrate.
    pub source_url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StartGenerationResponse {
    pub task_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GenerationStatusResponse {
    pub task_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl GenerationStatusResponse {
    fn from_snapshot(snapshot: TaskSnapshot) -> Self {
        Self {
            task_id: snapshot.task_id,
            status: snapshot.status.to_string(),
            error: snapshot.error,
            result_url: snapshot.result_url,
            created_at: snapshot.created_at.to_rfc3339(),
            updated_at: snapshot.updated_at.to_rfc3339(),
        }
    }
}

/// Start a generation job.
///
/// Always returns a task id once the request parses; failures inside the
/// pipeline surface through the status endpoint, not here.
#[utoipa::path(
    post,
    path = "/v1/generations",
    tag = "generations",
    request_body = StartGenerationRequest,
    responses(
        (status = 202, description = "Job accepted", body = StartGenerationResponse),
        (status = 400, description = "Missing source URL")
    )
)]
pub async fn start_generation(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartGenerationRequest>,
) -> Result<(StatusCode, Json<StartGenerationResponse>), ServerError> {
    let source_url = request.source_url.trim();
    if source_url.is_empty() {
        return Err(ServerError::BadRequest(
            "source_url must not be empty".into(),
        ));
    }

    let task_id = state.orchestrator.start(source_url).await;
    Ok((
        StatusCode::ACCEPTED,
        Json(StartGenerationResponse { task_id }),
    ))
}

/// Poll a generation job.
///
/// Terminal states are `completed` (with `result_url`) and `failed` (with
/// the first fatal error verbatim in `error`).
#[utoipa::path(
    get,
    path = "/v1/generations/{task_id}",
    tag = "generations",
    params(("task_id" = String, Path, description = "Task id returned by start")),
    responses(
        (status = 200, description = "Current task snapshot", body = GenerationStatusResponse),
        (status = 404, description = "Unknown task id")
    )
)]
pub async fn generation_status(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<GenerationStatusResponse>, ServerError> {
    let snapshot = state
        .orchestrator
        .tracker()
        .get(&task_id)
        .await
        .ok_or_else(|| ServerError::NotFound(format!("generation {task_id} not found")))?;
    Ok(Json(GenerationStatusResponse::from_snapshot(snapshot)))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;
    use async_trait::async_trait;
    use reelcast_core::clients::{
        ClientError, ScriptGenerator, SourceContent, SourceContentFetcher, SpeechSynthesizer,
        Transcriber,
    };
    use reelcast_core::media::{
        CaptionEngine, CaptionSegment, DurationProbe, MediaProcessor, MediaTool, ProcessOutput,
        StyleSpec, VideoComposer,
    };
    use reelcast_core::storage::{ObjectStore, StorageError};
    use reelcast_core::{
        Collaborators, PipelineOrchestrator, PipelineSettings, TaskTracker, TranscodePool,
    };

    /// Stub processor; never reached because the stub fetcher fails first.
    struct NullProcessor;

    #[async_trait]
    impl MediaProcessor for NullProcessor {
        async fn run(
            &self,
            _tool: MediaTool,
            _args: &[String],
        ) -> std::io::Result<ProcessOutput> {
            Err(std::io::Error::other("no media tools in handler tests"))
        }
    }

    struct UnreachableSource;

    #[async_trait]
    impl SourceContentFetcher for UnreachableSource {
        async fn fetch(&self, _reference: &str) -> Result<SourceContent, ClientError> {
            Err(ClientError::Status {
                status: 503,
                body: "forum unavailable".into(),
            })
        }
    }

    struct StubScript;

    #[async_trait]
    impl ScriptGenerator for StubScript {
        async fn generate(&self, _t: &str, _d: &str) -> Result<String, ClientError> {
            Ok(String::new())
        }
    }

    struct StubSpeech;

    #[async_trait]
    impl SpeechSynthesizer for StubSpeech {
        async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, ClientError> {
            Ok(Vec::new())
        }
    }

    struct StubTranscriber;

    #[async_trait]
    impl Transcriber for StubTranscriber {
        async fn transcribe(
            &self,
            _audio_path: &std::path::Path,
        ) -> Result<Vec<CaptionSegment>, ClientError> {
            Ok(Vec::new())
        }
    }

    struct EmptyStore;

    #[async_trait]
    impl ObjectStore for EmptyStore {
        async fn read(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
            Err(StorageError::NotFound {
                bucket: bucket.to_owned(),
                key: key.to_owned(),
            })
        }

        async fn write(&self, _b: &str, _k: &str, _bytes: &[u8]) -> Result<(), StorageError> {
            Ok(())
        }

        fn public_url(&self, bucket: &str, key: &str) -> String {
            format!("https://cdn.test/{bucket}/{key}")
        }
    }

    fn test_state() -> Arc<AppState> {
        let processor: Arc<dyn MediaProcessor> = Arc::new(NullProcessor);
        let orchestrator = PipelineOrchestrator::new(
            TaskTracker::new(),
            TranscodePool::new(1),
            Collaborators {
                fetcher: Arc::new(UnreachableSource),
                script: Arc::new(StubScript),
                speech: Arc::new(StubSpeech),
                store: Arc::new(EmptyStore),
            },
            CaptionEngine::new(Arc::new(StubTranscriber), Arc::clone(&processor)),
            VideoComposer::with_seed(Arc::clone(&processor), 1),
            DurationProbe::new(processor),
            PipelineSettings {
                style: StyleSpec::default(),
                bucket: "media".into(),
                background_key: "background.mp4".into(),
            },
        );

        let mut config = Config::from_env();
        config.enable_swagger = false;

        Arc::new(AppState {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
        })
    }

    fn snapshot_for_test() -> reelcast_core::TaskSnapshot {
        let now = chrono::Utc::now();
        reelcast_core::TaskSnapshot {
            task_id: "abc".into(),
            status: reelcast_core::TaskState::Completed,
            error: None,
            result_url: Some("https://cdn.test/media/output_video_abc.mp4".into()),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn start_returns_task_id_immediately() {
        let state = test_state();
        let (status, Json(body)) = start_generation(
            State(Arc::clone(&state)),
            Json(StartGenerationRequest {
                source_url: "https://forum.test/post/1".into(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::ACCEPTED);
        assert!(!body.task_id.is_empty());

        // The task is known to the tracker as soon as start returns.
        let Json(snapshot) = generation_status(State(state), Path(body.task_id.clone()))
            .await
            .unwrap();
        assert_eq!(snapshot.task_id, body.task_id);
    }

    #[tokio::test]
    async fn blank_source_url_is_rejected() {
        let state = test_state();
        let err = start_generation(
            State(state),
            Json(StartGenerationRequest {
                source_url: "   ".into(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServerError::BadRequest(_)));
    }

    #[tokio::test]
    async fn unknown_task_id_is_not_found() {
        let state = test_state();
        let err = generation_status(State(state), Path("missing".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
    }

    #[test]
    fn snapshot_maps_to_wire_shape() {
        let response = GenerationStatusResponse::from_snapshot(snapshot_for_test());
        assert_eq!(response.status, "completed");
        assert_eq!(
            response.result_url.as_deref(),
            Some("https://cdn.test/media/output_video_abc.mp4")
        );
        assert!(response.error.is_none());
        assert!(!response.created_at.is_empty());
    }
}
