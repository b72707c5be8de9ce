//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use reelcast_core::PipelineOrchestrator;

use crate::config::Config;

/// State shared across all HTTP handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// The generation pipeline; owns the task tracker.
    pub orchestrator: Arc<PipelineOrchestrator>,
}
