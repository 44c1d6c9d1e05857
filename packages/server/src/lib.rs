pub mod cache;
pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod generator;
pub mod handlers;
pub mod index;
pub mod kind;
pub mod models;
pub mod routes;
pub mod state;
pub mod sync;
pub mod upload;
pub mod utils;

use axum::routing::get;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pantry Image Cache API",
        version = "1.0.0",
        description = "Generate-once image cache for ingredients and recipes"
    ),
    tags(
        (name = "Images", description = "Get-or-generate image URLs"),
        (name = "Assets", description = "Asset Index lookup, uploads and reconciliation"),
    ),
)]
struct ApiDoc;

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api", routes::api_routes(&state.config))
        .split_for_parts();

    router
        .route("/blobs/{*path}", get(handlers::blobs::serve_blob))
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api))
}
