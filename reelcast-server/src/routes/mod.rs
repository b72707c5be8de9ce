//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, per-request trace-ID injection)
//! - Optional Swagger UI / OpenAPI spec endpoint (disable with
//!   `REELCAST_ENABLE_SWAGGER=false`)
//! - Health / heartbeat route
//! - `/v1` generation routes

pub mod doc;
mod health;
mod v1;

use crate::middleware::{cors, trace};
use crate::state::AppState;
use axum::{Router, middleware};
use std::sync::Arc;
use tower::ServiceBuilder;
use utoipa_swagger_ui::SwaggerUi;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .merge(health::router())
        .nest("/v1", v1::router());

    let mut app = Router::new().merge(api_router);

    // Enabled by default; disable with REELCAST_ENABLE_SWAGGER=false in
    // production to avoid exposing the API structure.
    if state.config.enable_swagger {
        app = app.merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", doc::get_docs()),
        );
    }

    app
        // Outermost layers execute first on the way in.
        .layer(ServiceBuilder::new().layer(cors::cors_layer(state.clone())))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            trace::trace_middleware,
        ))
        .with_state(state)
}
