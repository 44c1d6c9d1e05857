use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/images", image_routes())
        .nest("/assets", asset_routes(config))
}

fn image_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::images::ingredient_image))
        .routes(routes!(handlers::images::recipe_image))
}

fn asset_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::assets::search_assets,
            handlers::assets::upload_asset
        ))
        .routes(routes!(handlers::assets::sync_assets))
        .routes(routes!(handlers::assets::get_asset))
        .routes(routes!(handlers::assets::update_public_url))
        .layer(handlers::assets::upload_body_limit(
            config.uploads.max_size_bytes,
        ))
}
