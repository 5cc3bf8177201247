use super::*;
use image::{Rgba, RgbaImage};

fn two_pixel_row(left: [u8; 4], right: [u8; 4]) -> DynamicImage {
    let mut img = RgbaImage::new(2, 1);
    img.put_pixel(0, 0, Rgba(left));
    img.put_pixel(1, 0, Rgba(right));
    DynamicImage::ImageRgba8(img)
}

fn gradient(width: u32, height: u32) -> DynamicImage {
    #[allow(clippy::cast_possible_truncation)]
    let img = RgbaImage::from_fn(width, height, |x, y| Rgba([(x * 20) as u8, (y * 20) as u8, 0, 255]));
    DynamicImage::ImageRgba8(img)
}

fn png_bytes(image: &DynamicImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];

// =========================================================================
// FILTER NAMES
// =========================================================================

#[test]
fn from_name_resolves_the_five_known_filters() {
    assert_eq!(Filter::from_name("blur"), Some(Filter::Blur));
    assert_eq!(Filter::from_name("blackWhite"), Some(Filter::BlackWhite));
    assert_eq!(Filter::from_name("pixelate"), Some(Filter::Pixelate));
    assert_eq!(Filter::from_name("rotate"), Some(Filter::Rotate));
    assert_eq!(Filter::from_name("mirror"), Some(Filter::Mirror));
}

#[test]
fn from_name_rejects_unknown_and_miscased_names() {
    assert_eq!(Filter::from_name("sepia"), None);
    assert_eq!(Filter::from_name("Blur"), None);
    assert_eq!(Filter::from_name("blackwhite"), None);
    assert_eq!(Filter::from_name(""), None);
}

// =========================================================================
// TRANSFORMS
// =========================================================================

#[test]
fn rotate_swaps_dimensions() {
    let out = Filter::Rotate.apply(&gradient(6, 3));
    assert_eq!(out.dimensions(), (3, 6));
}

#[test]
fn mirror_flips_horizontally() {
    let out = Filter::Mirror.apply(&two_pixel_row(RED, BLUE));
    assert_eq!(out.get_pixel(0, 0).0, BLUE);
    assert_eq!(out.get_pixel(1, 0).0, RED);
}

#[test]
fn black_white_discards_color() {
    let out = Filter::BlackWhite.apply(&two_pixel_row(RED, BLUE));
    let [r, g, b, _] = out.to_rgba8().get_pixel(0, 0).0;
    assert_eq!(r, g);
    assert_eq!(g, b);
}

#[test]
fn blur_preserves_dimensions() {
    let out = Filter::Blur.apply(&gradient(8, 5));
    assert_eq!(out.dimensions(), (8, 5));
}

#[test]
fn pixelate_preserves_dimensions() {
    let out = Filter::Pixelate.apply(&gradient(25, 17));
    assert_eq!(out.dimensions(), (25, 17));
}

#[test]
fn pixelate_flattens_one_block_to_a_single_color() {
    // A 10x10 input is one pixelation cell: every output pixel matches.
    let out = Filter::Pixelate.apply(&gradient(10, 10));
    let first = out.to_rgba8().get_pixel(0, 0).0;
    for (_, _, px) in out.to_rgba8().enumerate_pixels() {
        assert_eq!(px.0, first);
    }
}

#[test]
fn pixelate_survives_images_smaller_than_the_block() {
    let out = Filter::Pixelate.apply(&gradient(3, 2));
    assert_eq!(out.dimensions(), (3, 2));
}

// =========================================================================
// PIPELINE
// =========================================================================

#[test]
fn apply_filters_skips_unknown_names() {
    let names = vec!["sepia".to_owned(), "mirror".to_owned(), "invert".to_owned()];
    let out = apply_filters(two_pixel_row(RED, BLUE), &names);
    // Only the mirror ran.
    assert_eq!(out.get_pixel(0, 0).0, BLUE);
}

#[test]
fn apply_filters_with_no_known_names_is_identity() {
    let input = gradient(4, 4);
    let out = apply_filters(input.clone(), &["sepia".to_owned(), "emboss".to_owned()]);
    assert_eq!(out.to_rgba8().as_raw(), input.to_rgba8().as_raw());
}

#[test]
fn apply_filters_runs_in_request_order() {
    // rotate-then-mirror differs from mirror-then-rotate on a 2x1 strip.
    let a = apply_filters(two_pixel_row(RED, BLUE), &["rotate".to_owned(), "mirror".to_owned()]);
    let b = apply_filters(two_pixel_row(RED, BLUE), &["mirror".to_owned(), "rotate".to_owned()]);
    assert_eq!(a.dimensions(), (1, 2));
    assert_eq!(b.dimensions(), (1, 2));
    assert_ne!(a.to_rgba8().as_raw(), b.to_rgba8().as_raw());
}

#[test]
fn duplicate_filters_apply_again() {
    // Two rotations make a 180° turn; the strip order reverses.
    let out = apply_filters(two_pixel_row(RED, BLUE), &["rotate".to_owned(), "rotate".to_owned()]);
    assert_eq!(out.dimensions(), (2, 1));
    assert_eq!(out.get_pixel(0, 0).0, BLUE);
    assert_eq!(out.get_pixel(1, 0).0, RED);
}

// =========================================================================
// TRANSCODE
// =========================================================================

#[test]
fn output_format_prefers_the_recorded_content_type() {
    assert_eq!(output_format("image/png", b"junk"), Some(ImageFormat::Png));
    assert_eq!(output_format("image/jpeg", b"junk"), Some(ImageFormat::Jpeg));
}

#[test]
fn output_format_falls_back_to_sniffing() {
    let bytes = png_bytes(&gradient(2, 2));
    assert_eq!(output_format("application/octet-stream", &bytes), Some(ImageFormat::Png));
}

#[test]
fn output_format_unknown_everywhere_is_none() {
    assert_eq!(output_format("application/pdf", b"%PDF-1.4"), None);
}

#[test]
fn encode_jpeg_drops_alpha() {
    let bytes = encode(&gradient(4, 4), ImageFormat::Jpeg).unwrap();
    assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
}

#[test]
fn encode_jpeg_after_black_white() {
    let grey = Filter::BlackWhite.apply(&gradient(4, 4));
    let bytes = encode(&grey, ImageFormat::Jpeg).unwrap();
    assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
}

#[test]
fn transform_bytes_round_trips_png() {
    let bytes = png_bytes(&gradient(6, 3));
    let out = transform_bytes(&bytes, "image/png", &["rotate".to_owned()]).unwrap();
    assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Png);
    assert_eq!(image::load_from_memory(&out).unwrap().dimensions(), (3, 6));
}

#[test]
fn transform_bytes_rejects_undecodable_input() {
    let err = transform_bytes(b"not an image", "image/png", &[]).unwrap_err();
    assert!(matches!(err, PipelineError::Image(_)));
}

#[test]
fn transform_bytes_rejects_unknown_formats() {
    let err = transform_bytes(b"%PDF-1.4", "application/pdf", &[]).unwrap_err();
    assert!(matches!(err, PipelineError::UnsupportedFormat(_)));
}

// =========================================================================
// PROCESS (in-memory store + live DB)
// =========================================================================

#[cfg(feature = "live-db-tests")]
mod live {
    use super::*;
    use crate::services::image as image_svc;
    use crate::services::storage::ObjectStore;
    use crate::state::test_helpers;

    #[tokio::test]
    async fn process_image_stores_result_and_stamps_record() {
        let state = test_helpers::live_app_state().await;
        let user_id = sqlx::query_scalar("INSERT INTO users (name) VALUES ('pipeline-test') RETURNING id")
            .fetch_one(&state.pool)
            .await
            .expect("seed user");

        let original_key = crate::services::storage::object_key();
        state.store.put(&original_key, &png_bytes(&gradient(6, 3))).await.unwrap();
        let record = image_svc::insert_image(&state.pool, user_id, "grad.png", &original_key, "image/png")
            .await
            .unwrap();

        let processed_key = process_image(&state, &record, &["rotate".to_owned()]).await.unwrap();

        let stored = state.store.get(&processed_key).await.unwrap();
        assert_eq!(image::load_from_memory(&stored).unwrap().dimensions(), (3, 6));

        let updated = image_svc::find_by_original_key(&state.pool, &original_key).await.unwrap();
        assert_eq!(updated.processed_key.as_deref(), Some(processed_key.as_str()));
    }

    #[tokio::test]
    async fn process_image_missing_object_fails() {
        let state = test_helpers::live_app_state().await;
        let record = image_svc::ImageRecord {
            id: uuid::Uuid::new_v4(),
            user_id: uuid::Uuid::new_v4(),
            file_name: "ghost.png".into(),
            original_key: crate::services::storage::object_key(),
            processed_key: None,
            content_type: "image/png".into(),
            created_at: None,
        };
        let err = process_image(&state, &record, &[]).await.unwrap_err();
        assert!(matches!(err, PipelineError::Storage(_)));
    }
}
