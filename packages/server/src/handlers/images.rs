use axum::Json;
use axum::extract::State;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::AppJson;
use crate::models::image::{ImageUrlResponse, IngredientImageRequest, RecipeImageRequest};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/ingredients",
    tag = "Images",
    operation_id = "getIngredientImage",
    summary = "Get or generate an ingredient image",
    description = "Returns a URL to the owner's copy of the ingredient image. The shared pool is \
        checked first; the generator is only called on a miss. Any failure yields a placeholder \
        URL instead of an error.",
    request_body = IngredientImageRequest,
    responses(
        (status = 200, description = "Image URL", body = ImageUrlResponse),
        (status = 400, description = "Malformed body (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(owner = %payload.owner_id))]
pub async fn ingredient_image(
    State(state): State<AppState>,
    AppJson(payload): AppJson<IngredientImageRequest>,
) -> Result<Json<ImageUrlResponse>, AppError> {
    let url = state
        .ingredients
        .get_or_generate(&payload.label, &payload.owner_id, payload.context.as_deref())
        .await;

    Ok(Json(ImageUrlResponse { url }))
}

#[utoipa::path(
    post,
    path = "/recipes",
    tag = "Images",
    operation_id = "getRecipeImage",
    summary = "Get or generate a recipe image",
    description = "Returns the shared image URL for a recipe title. Every owner receives the same \
        URL for the same normalized title. Any failure yields a placeholder URL.",
    request_body = RecipeImageRequest,
    responses(
        (status = 200, description = "Image URL", body = ImageUrlResponse),
        (status = 400, description = "Malformed body (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn recipe_image(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RecipeImageRequest>,
) -> Result<Json<ImageUrlResponse>, AppError> {
    let url = state
        .recipes
        .get_or_generate(&payload.title, payload.context.as_deref())
        .await;

    Ok(Json(ImageUrlResponse { url }))
}
