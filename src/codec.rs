//! Wire codec for images exchanged over the HTTP API
//!
//! Requests carry images either as raw base64 payloads or as data URIs of the
//! form `data:image/<subtype>;base64,<payload>`. Responses are always data
//! URIs. Conversions between [`DynamicImage`] and the fixed-layout arrays the
//! pipeline works on (3-channel color, 1-channel mask) live here as well.

use crate::error::{InpaintError, Result};
use base64::{engine::general_purpose, Engine};
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use std::io::Cursor;

/// Decode a data URI or raw base64 string into an image
///
/// Accepts `data:image/<subtype>;base64,<payload>` or a bare base64 string.
/// A `data:` prefix that does not match the expected grammar is rejected
/// before any base64 decoding is attempted.
///
/// # Errors
/// - [`InpaintError::InvalidInput`] for a malformed data URI prefix, invalid
///   base64, or bytes that do not decode as a supported image format
pub fn decode_image(data: &str) -> Result<DynamicImage> {
    let payload = if data.starts_with("data:") {
        extract_data_uri_payload(data)?
    } else {
        data
    };

    let bytes = general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| InpaintError::invalid_input(format!("invalid base64 payload: {e}")))?;

    image::load_from_memory(&bytes)
        .map_err(|e| InpaintError::invalid_input(format!("failed to decode image bytes: {e}")))
}

/// Split the base64 payload out of a `data:image/...;base64,...` URI
fn extract_data_uri_payload(data: &str) -> Result<&str> {
    let rest = data
        .strip_prefix("data:image/")
        .ok_or_else(|| InpaintError::invalid_input("Invalid data URL format"))?;

    let (subtype, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| InpaintError::invalid_input("Invalid data URL format"))?;

    if subtype.is_empty() || payload.is_empty() {
        return Err(InpaintError::invalid_input("Invalid data URL format"));
    }

    Ok(payload)
}

/// Encode an image into a data URI with the correct MIME subtype
///
/// # Errors
/// - Image serialization failures for the requested format
pub fn encode_image(image: &DynamicImage, format: ImageFormat) -> Result<String> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, format).map_err(|e| {
        InpaintError::processing(format!("failed to encode result as {format:?}: {e}"))
    })?;

    let payload = general_purpose::STANDARD.encode(buffer.into_inner());
    Ok(format!("data:{};base64,{}", mime_subtype(format), payload))
}

/// MIME type string for the supported output formats
fn mime_subtype(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::WebP => "image/webp",
        // PNG is the default lossless output
        _ => "image/png",
    }
}

/// Force conversion to a 3-channel color buffer
///
/// Grayscale and alpha-bearing layouts are converted; alpha is dropped by
/// compositing onto black per the image crate's `to_rgb8` semantics.
#[must_use]
pub fn to_color_array(image: &DynamicImage) -> RgbImage {
    image.to_rgb8()
}

/// Force conversion to a single-channel luminance buffer (mask layout)
#[must_use]
pub fn to_mask_array(image: &DynamicImage) -> GrayImage {
    image.to_luma8()
}
