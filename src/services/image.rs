//! Image metadata records — one row per upload.
//!
//! DESIGN
//! ======
//! The only persisted entity besides accounts: a flat record pairing the
//! uploading user, the original file name, the stored object key, and an
//! optional processed-object key. Key uniqueness is enforced by the
//! database; there are no other relationships or invariants.

use sqlx::PgPool;
use uuid::Uuid;

use crate::services::storage;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image not found: {0}")]
    NotFound(Uuid),
    #[error("image record for key not found: {0}")]
    KeyNotFound(String),
    #[error("not the owner of image: {0}")]
    Forbidden(Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Metadata row for an uploaded image.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ImageRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    pub original_key: String,
    pub processed_key: Option<String>,
    pub content_type: String,
    pub created_at: Option<String>,
}

type ImageTuple = (Uuid, Uuid, String, String, Option<String>, String, Option<String>);

fn from_tuple(t: ImageTuple) -> ImageRecord {
    ImageRecord {
        id: t.0,
        user_id: t.1,
        file_name: t.2,
        original_key: t.3,
        processed_key: t.4,
        content_type: t.5,
        created_at: t.6,
    }
}

const SELECT_COLUMNS: &str = r#"id, user_id, file_name, original_key, processed_key, content_type,
       to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at"#;

// =============================================================================
// CRUD
// =============================================================================

/// Insert the metadata row for a fresh upload.
///
/// # Errors
///
/// Returns a database error if the insert fails (including key collisions,
/// which cannot happen with UUID keys in practice).
pub async fn insert_image(
    pool: &PgPool,
    user_id: Uuid,
    file_name: &str,
    original_key: &str,
    content_type: &str,
) -> Result<ImageRecord, ImageError> {
    let id = Uuid::new_v4();
    sqlx::query(
        r"INSERT INTO images (id, user_id, file_name, original_key, content_type)
          VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(id)
    .bind(user_id)
    .bind(file_name)
    .bind(original_key)
    .bind(content_type)
    .execute(pool)
    .await?;

    Ok(ImageRecord {
        id,
        user_id,
        file_name: file_name.to_owned(),
        original_key: original_key.to_owned(),
        processed_key: None,
        content_type: content_type.to_owned(),
        created_at: None,
    })
}

/// List a user's uploads, newest first. This is the upload history view.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_images(pool: &PgPool, user_id: Uuid) -> Result<Vec<ImageRecord>, ImageError> {
    let rows = sqlx::query_as::<_, ImageTuple>(&format!(
        "SELECT {SELECT_COLUMNS} FROM images WHERE user_id = $1 ORDER BY images.created_at DESC",
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(from_tuple).collect())
}

/// Fetch one record by ID, enforcing ownership.
///
/// # Errors
///
/// Returns `NotFound` for unknown IDs and `Forbidden` when the record
/// belongs to another user.
pub async fn get_image(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<ImageRecord, ImageError> {
    let row = sqlx::query_as::<_, ImageTuple>(&format!("SELECT {SELECT_COLUMNS} FROM images WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(ImageError::NotFound(id))?;

    let record = from_tuple(row);
    if record.user_id != user_id {
        return Err(ImageError::Forbidden(id));
    }
    Ok(record)
}

/// Fetch one record by its original object key.
///
/// # Errors
///
/// Returns `KeyNotFound` when no upload owns the key.
pub async fn find_by_original_key(pool: &PgPool, original_key: &str) -> Result<ImageRecord, ImageError> {
    let row = sqlx::query_as::<_, ImageTuple>(&format!(
        "SELECT {SELECT_COLUMNS} FROM images WHERE original_key = $1",
    ))
    .bind(original_key)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ImageError::KeyNotFound(original_key.to_owned()))?;

    Ok(from_tuple(row))
}

/// Record the processed-object key on the row owning `original_key`.
///
/// This is the single-record update at the end of a filter pass.
///
/// # Errors
///
/// Returns `KeyNotFound` if the row vanished between lookup and update.
pub async fn set_processed_key(pool: &PgPool, original_key: &str, processed_key: &str) -> Result<(), ImageError> {
    let result = sqlx::query("UPDATE images SET processed_key = $2 WHERE original_key = $1")
        .bind(original_key)
        .bind(processed_key)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ImageError::KeyNotFound(original_key.to_owned()));
    }
    Ok(())
}

/// Delete a record, enforcing ownership. Returns the deleted row so the
/// caller can clean up the stored objects.
///
/// # Errors
///
/// Returns `NotFound` / `Forbidden` as [`get_image`] does.
pub async fn delete_image(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<ImageRecord, ImageError> {
    let record = get_image(pool, id, user_id).await?;

    sqlx::query("DELETE FROM images WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(record)
}

/// Content type for a stored object, whichever side of the record it is
/// on. Used when serving object bytes.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn content_type_for_key(pool: &PgPool, key: &str) -> Result<Option<String>, ImageError> {
    let ct = sqlx::query_scalar::<_, String>(
        "SELECT content_type FROM images WHERE original_key = $1 OR processed_key = $1 LIMIT 1",
    )
    .bind(key)
    .fetch_optional(pool)
    .await?;

    Ok(ct)
}

/// Both object keys attached to a record, for storage cleanup on delete.
#[must_use]
pub fn object_keys(record: &ImageRecord) -> Vec<String> {
    let mut keys = vec![record.original_key.clone()];
    if let Some(processed) = &record.processed_key {
        keys.push(processed.clone());
    }
    keys.retain(|k| storage::is_valid_key(k));
    keys
}

#[cfg(test)]
#[path = "image_test.rs"]
mod tests;
