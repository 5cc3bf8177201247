//! Filter pipeline — the image-processor.
//!
//! DESIGN
//! ======
//! All pixel-level work is delegated to the `image` crate; this module is
//! the thin orchestration around it: decode, apply the requested named
//! filters in order, encode back to the upload's format, store the result
//! under a fresh key, and stamp the key on the metadata record.
//!
//! Unknown filter names are skipped, never rejected — the filter list is a
//! vocabulary, not a schema. Duplicates apply again; the loop is an
//! unconditional ordered iteration over whatever the client sent.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};

use crate::services::image as image_svc;
use crate::services::image::ImageRecord;
use crate::services::storage::{self, ObjectStore, StorageError};
use crate::state::AppState;

/// Gaussian blur strength.
pub const BLUR_SIGMA: f32 = 5.0;
/// Pixelation cell size in pixels.
pub const PIXELATE_BLOCK: u32 = 10;

// =============================================================================
// FILTERS
// =============================================================================

/// The five known transforms, keyed by the wire names clients send
/// (camelCase `blackWhite` included — it is the contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Blur,
    BlackWhite,
    Pixelate,
    Rotate,
    Mirror,
}

impl Filter {
    /// Resolve a wire name. `None` for anything outside the vocabulary.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "blur" => Some(Self::Blur),
            "blackWhite" => Some(Self::BlackWhite),
            "pixelate" => Some(Self::Pixelate),
            "rotate" => Some(Self::Rotate),
            "mirror" => Some(Self::Mirror),
            _ => None,
        }
    }

    /// Apply this transform. Every arm is a single `image` crate call
    /// except pixelate, which composes two nearest-neighbor resizes.
    #[must_use]
    pub fn apply(self, image: &DynamicImage) -> DynamicImage {
        match self {
            Self::Blur => image.blur(BLUR_SIGMA),
            Self::BlackWhite => image.grayscale(),
            Self::Pixelate => pixelate(image, PIXELATE_BLOCK),
            Self::Rotate => image.rotate90(),
            Self::Mirror => image.fliph(),
        }
    }
}

fn pixelate(image: &DynamicImage, block: u32) -> DynamicImage {
    let (w, h) = image.dimensions();
    let down_w = (w / block).max(1);
    let down_h = (h / block).max(1);
    image
        .resize_exact(down_w, down_h, FilterType::Nearest)
        .resize_exact(w, h, FilterType::Nearest)
}

/// Apply the named filters in request order, skipping unknown names.
#[must_use]
pub fn apply_filters(image: DynamicImage, filter_names: &[String]) -> DynamicImage {
    let mut image = image;
    for name in filter_names {
        match Filter::from_name(name) {
            Some(filter) => image = filter.apply(&image),
            None => tracing::debug!(filter = %name, "unknown filter name ignored"),
        }
    }
    image
}

// =============================================================================
// TRANSCODE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("image decode/encode failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("metadata error: {0}")]
    Metadata(#[from] image_svc::ImageError),
}

/// Resolve the output format from the upload's recorded content type,
/// falling back to sniffing the bytes.
#[must_use]
pub fn output_format(content_type: &str, bytes: &[u8]) -> Option<ImageFormat> {
    ImageFormat::from_mime_type(content_type).or_else(|| sniff_format(bytes))
}

/// Sniff the image format from magic bytes. `None` when the bytes are not
/// a format the `image` crate recognizes.
#[must_use]
pub fn sniff_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

/// Encode to `format`, normalizing the color type where the encoder is
/// pickier than the pipeline: JPEG has no alpha channel, the WebP encoder
/// takes RGB(A) only (relevant after `blackWhite` turns the buffer to
/// luma).
///
/// # Errors
///
/// Returns an encode error from the `image` crate.
pub fn encode(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, PipelineError> {
    let normalized = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()),
        ImageFormat::WebP => DynamicImage::ImageRgba8(image.to_rgba8()),
        _ => image.clone(),
    };
    let mut buf = Cursor::new(Vec::new());
    normalized.write_to(&mut buf, format)?;
    Ok(buf.into_inner())
}

/// Run the full filter pass over `record`'s original object and return the
/// transformed bytes. Pure with respect to the database — used directly by
/// tests and by [`process_image`].
///
/// # Errors
///
/// Fails on undecodable bytes, unknown output format, or encode failure.
pub fn transform_bytes(bytes: &[u8], content_type: &str, filter_names: &[String]) -> Result<Vec<u8>, PipelineError> {
    let format =
        output_format(content_type, bytes).ok_or_else(|| PipelineError::UnsupportedFormat(content_type.to_owned()))?;
    let decoded = image::load_from_memory(bytes)?;
    let processed = apply_filters(decoded, filter_names);
    encode(&processed, format)
}

// =============================================================================
// PROCESS
// =============================================================================

/// The core operation: download the original object, transform it, store
/// the result under a fresh key, and update the metadata record.
///
/// # Errors
///
/// Propagates storage, decode/encode, and metadata-update failures; the
/// route layer folds any of them into a `success: false` response.
pub async fn process_image(state: &AppState, record: &ImageRecord, filter_names: &[String]) -> Result<String, PipelineError> {
    let original = state.store.get(&record.original_key).await?;
    let processed = transform_bytes(&original, &record.content_type, filter_names)?;

    let processed_key = storage::object_key();
    state.store.put(&processed_key, &processed).await?;

    image_svc::set_processed_key(&state.pool, &record.original_key, &processed_key).await?;

    tracing::info!(
        original_key = %record.original_key,
        processed_key = %processed_key,
        filters = filter_names.len(),
        "filter pass complete"
    );

    Ok(processed_key)
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
