//! `POST /api/colorize`.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use base64::{Engine as _, engine::general_purpose};
use recolor_pipeline::{PipelineError, UploadRejection};
use tracing::debug;

use crate::http::constants::UPLOAD_FIELD;
use crate::http::errors::ApiError;
use crate::models::ColorizeResponse;
use crate::state::ApiState;

/// Stream the `image` field through the pipeline and return the result as base64.
///
/// Fields other than `image` are skipped; only the first `image` field is used.
pub(crate) async fn colorize(
    State(state): State<Arc<ApiState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ColorizeResponse>, ApiError> {
    let mut multipart =
        multipart.map_err(|rejection| ApiError::from_multipart_rejection(&rejection))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::from_multipart(&err))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            debug!(field = field.name().unwrap_or_default(), "ignoring multipart field");
            continue;
        }
        let filename = field.file_name().map(ToOwned::to_owned);
        let image = state.pipeline.run(field, filename.as_deref()).await?;
        return Ok(Json(ColorizeResponse {
            result: general_purpose::STANDARD.encode(&image.bytes),
            content_type: image.content_type.to_string(),
        }));
    }

    Err(PipelineError::rejected(UploadRejection::MissingFile).into())
}
