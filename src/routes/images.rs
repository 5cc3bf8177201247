//! Image routes — upload, history, and the filter-pass endpoint.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::services::image::{self as image_svc, ImageError, ImageRecord};
use crate::services::pipeline;
use crate::services::storage::{self, ObjectStore};
use crate::state::AppState;

/// Content types accepted at upload. Everything here round-trips through
/// the `image` crate's decoders and encoders.
const ACCEPTED_CONTENT_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp", "image/gif", "image/bmp"];

pub(crate) fn is_accepted_content_type(content_type: &str) -> bool {
    ACCEPTED_CONTENT_TYPES.contains(&content_type)
}

pub(crate) fn image_error_to_status(err: &ImageError) -> StatusCode {
    match err {
        ImageError::NotFound(_) | ImageError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        ImageError::Forbidden(_) => StatusCode::FORBIDDEN,
        ImageError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// =============================================================================
// UPLOAD
// =============================================================================

/// `POST /api/images` — multipart upload of one image file.
///
/// Streams the `file` field into memory with an incremental size check,
/// sniffs the bytes to confirm they decode as an image, stores the object,
/// and inserts the metadata row.
pub async fn upload_image(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ImageRecord>), StatusCode> {
    let mut file_name: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut data: Option<Vec<u8>> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!(error = %e, "malformed multipart body");
        StatusCode::BAD_REQUEST
    })? {
        if field.name() != Some("file") {
            continue;
        }

        file_name = field.file_name().map(ToOwned::to_owned);
        content_type = field.content_type().map(ToOwned::to_owned);

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(|e| {
            tracing::warn!(error = %e, "failed to read upload chunk");
            StatusCode::BAD_REQUEST
        })? {
            if bytes.len() + chunk.len() > state.max_upload_bytes {
                tracing::warn!(
                    max_upload_bytes = state.max_upload_bytes,
                    "upload exceeds size cap, aborting"
                );
                return Err(StatusCode::PAYLOAD_TOO_LARGE);
            }
            bytes.extend_from_slice(&chunk);
        }
        data = Some(bytes);
        break;
    }

    let Some(data) = data else {
        return Err(StatusCode::BAD_REQUEST);
    };
    if data.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let content_type = content_type.ok_or(StatusCode::BAD_REQUEST)?;
    if !is_accepted_content_type(&content_type) {
        return Err(StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    // The declared type is client input; make sure the bytes are actually
    // a decodable image before storing them.
    if pipeline::sniff_format(&data).is_none() {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    let file_name = file_name.unwrap_or_else(|| "upload".to_owned());
    let original_key = storage::object_key();

    state.store.put(&original_key, &data).await.map_err(|e| {
        tracing::error!(error = %e, "failed to store uploaded object");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let record = image_svc::insert_image(&state.pool, auth.user.id, &file_name, &original_key, &content_type)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to insert image record");
            image_error_to_status(&e)
        })?;

    tracing::info!(user_id = %auth.user.id, key = %original_key, bytes = data.len(), "image uploaded");

    Ok((StatusCode::CREATED, Json(record)))
}

// =============================================================================
// HISTORY
// =============================================================================

/// `GET /api/images` — the caller's upload history, newest first.
pub async fn list_images(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<ImageRecord>>, StatusCode> {
    let records = image_svc::list_images(&state.pool, auth.user.id)
        .await
        .map_err(|e| image_error_to_status(&e))?;
    Ok(Json(records))
}

/// `GET /api/images/{id}` — one record, owner only.
pub async fn get_image(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ImageRecord>, StatusCode> {
    let record = image_svc::get_image(&state.pool, id, auth.user.id)
        .await
        .map_err(|e| image_error_to_status(&e))?;
    Ok(Json(record))
}

/// `DELETE /api/images/{id}` — delete the record and its stored objects.
pub async fn delete_image(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let record = image_svc::delete_image(&state.pool, id, auth.user.id)
        .await
        .map_err(|e| image_error_to_status(&e))?;

    for key in image_svc::object_keys(&record) {
        if let Err(e) = state.store.delete(&key).await {
            // The record is gone; an orphaned object is only disk waste.
            tracing::warn!(error = %e, %key, "failed to delete stored object");
        }
    }

    Ok(Json(serde_json::json!({ "ok": true })))
}

// =============================================================================
// PROCESS
// =============================================================================

#[derive(Deserialize)]
pub struct ProcessRequest {
    pub original_key: String,
    pub filters: Vec<String>,
}

/// Flag-carrying result of a filter pass. Processing failures keep HTTP
/// 200 and report through `success`, matching the contract of the
/// function this endpoint replaces.
#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_key: Option<String>,
}

/// `POST /api/images/process` — apply named filters to an uploaded image.
///
/// Request errors (bad key, unknown record, someone else's record) are
/// 4xx; failures of the storage/decode/encode/update sequence are logged
/// and folded into `success: false`.
pub async fn process_image(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<ProcessRequest>,
) -> Result<Json<ProcessResponse>, StatusCode> {
    if !storage::is_valid_key(&body.original_key) {
        return Err(StatusCode::BAD_REQUEST);
    }

    let record = image_svc::find_by_original_key(&state.pool, &body.original_key)
        .await
        .map_err(|e| image_error_to_status(&e))?;
    if record.user_id != auth.user.id {
        return Err(StatusCode::FORBIDDEN);
    }

    match pipeline::process_image(&state, &record, &body.filters).await {
        Ok(processed_key) => Ok(Json(ProcessResponse { success: true, processed_key: Some(processed_key) })),
        Err(e) => {
            tracing::error!(error = %e, original_key = %body.original_key, "filter pass failed");
            Ok(Json(ProcessResponse { success: false, processed_key: None }))
        }
    }
}

#[cfg(test)]
#[path = "images_test.rs"]
mod tests;
