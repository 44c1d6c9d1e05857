use axum::Json;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::{AppJson, AppQuery};
use crate::index::DEFAULT_SIMILAR_LIMIT;
use crate::models::asset::{
    AssetListResponse, AssetResponse, AssetSearchParams, UpdatePublicUrlRequest,
};
use crate::state::AppState;
use crate::sync::SyncReport;
use crate::upload::{UploadFile, UploadRequest};

const MAX_SEARCH_LIMIT: u64 = 100;

/// Multipart overhead allowed on top of the configured file size limit, so
/// oversized files reach validation and get a structured error.
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

pub fn upload_body_limit(max_size_bytes: u64) -> DefaultBodyLimit {
    let limit = max_size_bytes.saturating_add(MULTIPART_OVERHEAD);
    DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Assets",
    operation_id = "uploadAsset",
    summary = "Upload a user image",
    description = "Validates and stores a user-supplied image, then indexes it under the \
        normalized item name. Fields: `file` (required), `item_name` (2-100 characters), \
        `kind` (`ingredient`, `recipe` or `upload`), `owner_id` (optional). A name that is \
        already indexed is rejected with 409 and the existing record in `details`.",
    request_body(content_type = "multipart/form-data", description = "Image upload"),
    responses(
        (status = 201, description = "Asset created", body = AssetResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "Name already indexed (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, multipart))]
pub async fn upload_asset(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut file: Option<UploadFile> = None;
    let mut item_name = String::new();
    let mut kind = String::new();
    let mut owner_id: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().map(str::to_owned);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file: {e}")))?;
                file = Some(UploadFile {
                    filename,
                    bytes: bytes.to_vec(),
                });
            }
            Some(text_field @ ("item_name" | "kind" | "owner_id")) => {
                let text = field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read {text_field}: {e}"))
                })?;
                match text_field {
                    "item_name" => item_name = text,
                    "kind" => kind = text,
                    _ => owner_id = Some(text),
                }
            }
            _ => {} // Ignore unknown fields.
        }
    }

    let request = UploadRequest::new(
        file,
        owner_id.as_deref(),
        &item_name,
        &kind,
        state.uploads.policy(),
    )?;
    let record = state.uploads.upload(request).await?;

    Ok((StatusCode::CREATED, Json(AssetResponse::from(record))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Assets",
    operation_id = "searchAssets",
    summary = "Search assets by name",
    description = "Substring match on canonical names, most relevant first. Falls back to \
        matching individual words. Returns an empty list when nothing matches.",
    params(AssetSearchParams),
    responses(
        (status = 200, description = "Matching assets", body = AssetListResponse),
        (status = 400, description = "Invalid query (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn search_assets(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<AssetSearchParams>,
) -> Result<Json<AssetListResponse>, AppError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_SIMILAR_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT);

    let records = state
        .index
        .find_similar(&params.q, params.kind, limit)
        .await?;

    Ok(Json(AssetListResponse {
        data: records.into_iter().map(AssetResponse::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/{name}",
    tag = "Assets",
    operation_id = "getAsset",
    summary = "Look up an asset by name",
    description = "Exact lookup. The name is normalized first, so `Tomate Cherry` finds \
        `tomate_cherry`.",
    params(("name" = String, Path, description = "Asset name or label")),
    responses(
        (status = 200, description = "Asset found", body = AssetResponse),
        (status = 404, description = "No such asset (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_asset(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<AssetResponse>, AppError> {
    let record = state
        .index
        .find_exact(&name)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Asset '{name}' not found")))?;

    Ok(Json(record.into()))
}

#[utoipa::path(
    patch,
    path = "/{id}/url",
    tag = "Assets",
    operation_id = "updateAssetUrl",
    summary = "Correct an asset's public URL",
    description = "The only supported mutation of an indexed asset.",
    params(("id" = i32, Path, description = "Asset ID")),
    request_body = UpdatePublicUrlRequest,
    responses(
        (status = 200, description = "Asset updated", body = AssetResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "No such asset (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn update_public_url(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdatePublicUrlRequest>,
) -> Result<Json<AssetResponse>, AppError> {
    let public_url = payload.public_url.trim();
    if public_url.is_empty() {
        return Err(AppError::Validation("Public URL must not be empty".into()));
    }

    let record = state
        .index
        .update_public_url(id, public_url)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Asset {id} not found")))?;

    Ok(Json(record.into()))
}

#[utoipa::path(
    post,
    path = "/sync",
    tag = "Assets",
    operation_id = "syncAssets",
    summary = "Index orphaned shared-pool blobs",
    description = "Scans every shared pool and inserts index rows for blobs that have none. \
        Never updates or deletes rows. Per-blob failures are counted, not raised.",
    responses(
        (status = 200, description = "Sync finished", body = SyncReport),
    ),
)]
#[instrument(skip(state))]
pub async fn sync_assets(State(state): State<AppState>) -> Json<SyncReport> {
    Json(state.sync.sync_all().await)
}
