//! Upload preprocessing: bounded-width JPEG re-encode with a best-effort fallback.

use std::io::Cursor;

use image::imageops::FilterType;
use tracing::{debug, warn};

use crate::constants::{DEFAULT_JPEG_QUALITY, DEFAULT_MAX_IMAGE_WIDTH};
use crate::payload::ImagePayload;

const JPEG_MIME: &str = "image/jpeg";

/// Knobs for [prepare_for_upload].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PreprocessOptions {
    /// Output width never exceeds this.
    pub max_width: u32,
    /// JPEG quality, 1-100.
    pub jpeg_quality: u8,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_IMAGE_WIDTH,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Scales the image down to `max_width` and re-encodes it as JPEG.
///
/// Anything that can't be decoded or encoded is returned untouched; this never fails.
pub fn downscale_to_jpeg(payload: &ImagePayload, options: PreprocessOptions) -> ImagePayload {
    match try_downscale(payload, options) {
        Ok(prepared) => prepared,
        Err(err) => {
            debug!("Sending original image bytes, preprocessing failed: {}", err);
            payload.clone()
        }
    }
}

/// Runs [downscale_to_jpeg] on the blocking pool.
pub async fn prepare_for_upload(payload: ImagePayload, options: PreprocessOptions) -> ImagePayload {
    let original = payload.clone();
    match tokio::task::spawn_blocking(move || downscale_to_jpeg(&payload, options)).await {
        Ok(prepared) => prepared,
        Err(err) => {
            warn!("Image preprocessing task failed: {}", err);
            original
        }
    }
}

fn try_downscale(
    payload: &ImagePayload,
    options: PreprocessOptions,
) -> Result<ImagePayload, image::ImageError> {
    let reader = image::ImageReader::new(Cursor::new(&payload.bytes)).with_guessed_format()?;
    let format = reader.format();
    let image = reader.decode()?;

    let (width, height) = (image.width(), image.height());
    let max_width = options.max_width.max(1);
    if width <= max_width && format == Some(image::ImageFormat::Jpeg) {
        return Ok(ImagePayload::new(JPEG_MIME, payload.bytes.clone()));
    }

    let image = if width > max_width {
        let (new_width, new_height) = scaled_dimensions(width, height, max_width);
        debug!(
            "Resizing upload from {}x{} to {}x{}",
            width, height, new_width, new_height
        );
        image.resize_exact(new_width, new_height, FilterType::Triangle)
    } else {
        image
    };

    let rgb = image.to_rgb8();
    let mut output = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
        &mut output,
        options.jpeg_quality.clamp(1, 100),
    );
    encoder.encode_image(&rgb)?;
    Ok(ImagePayload::new(JPEG_MIME, output))
}

/// Width clamped to `max_width`, height kept proportional (at least one pixel).
pub fn scaled_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width || width == 0 {
        return (width, height);
    }
    let scaled = (f64::from(height) * f64::from(max_width) / f64::from(width)).round();
    (max_width, (scaled as u32).max(1))
}
