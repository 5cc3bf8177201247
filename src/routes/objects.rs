//! Object routes — serve stored image bytes.
//!
//! Any signed-in user may read `images/*` objects; that is the access
//! scope the before/after panes and history thumbnails rely on.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};

use crate::routes::auth::AuthUser;
use crate::services::image as image_svc;
use crate::services::storage::{self, ObjectStore, StorageError};
use crate::state::AppState;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

// Object keys are fresh UUIDs, so bytes under a key never change.
const OBJECT_CACHE_CONTROL: &str = "private, max-age=31536000, immutable";

/// `GET /api/objects/{key}` — stream an object's bytes with its recorded
/// content type.
pub async fn get_object(State(state): State<AppState>, _auth: AuthUser, Path(key): Path<String>) -> Response {
    if !storage::is_valid_key(&key) {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let bytes = match state.store.get(&key).await {
        Ok(bytes) => bytes,
        Err(StorageError::NotFound(_)) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!(error = %e, %key, "object read failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let content_type = match image_svc::content_type_for_key(&state.pool, &key).await {
        Ok(ct) => ct.unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_owned()),
        Err(e) => {
            tracing::warn!(error = %e, %key, "content type lookup failed");
            FALLBACK_CONTENT_TYPE.to_owned()
        }
    };

    ([(CONTENT_TYPE, content_type), (CACHE_CONTROL, OBJECT_CACHE_CONTROL.to_owned())], bytes).into_response()
}
