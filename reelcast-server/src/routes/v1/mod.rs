pub mod generations;

use crate::state::AppState;
use utoipa::OpenApi;

use axum::Router;
use std::sync::Arc;

/// Routes nested under `/v1`.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().merge(generations::router())
}

#[derive(OpenApi)]
#[openapi()]
pub struct V1Api;

pub fn api_docs() -> utoipa::openapi::OpenApi {
    let mut spec = V1Api::openapi();
    spec.merge(generations::GenerationsApi::openapi());
    spec
}
