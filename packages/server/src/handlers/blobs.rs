use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use common::storage::BlobPath;
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::error::AppError;
use crate::state::AppState;

/// Stream a blob from the configured store. Backs the public URLs handed out
/// by the filesystem backend.
#[instrument(skip(state))]
pub async fn serve_blob(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let path = BlobPath::parse(&path)?;
    let reader = state.blobs.read_stream(&path).await?;

    Response::builder()
        .header(header::CONTENT_TYPE, path.content_type())
        .header(header::CACHE_CONTROL, "public, max-age=3600")
        .body(Body::from_stream(ReaderStream::new(reader)))
        .map_err(|e| AppError::Internal(e.to_string()))
}
