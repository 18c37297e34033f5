//! Model output conversion, cropping and compositing
//!
//! The model emits an NCHW float tensor covering the padded canvas. This
//! module clamps it back to 8-bit, crops away the padding, and blends the
//! reconstruction against the original image using the dilated mask as a
//! per-pixel weight. Pixels outside the dilated mask are bit-preserved from
//! the input.

use crate::error::{InpaintError, Result};
use image::{GrayImage, Rgb, RgbImage};
use ndarray::Array4;

/// Crop the model output to the original dimensions and composite it against
/// the original image
///
/// The blend weight per pixel is `dilated_mask / 255` broadcast across the
/// three color channels:
///
/// `final = round(model_output * weight + original * (1 - weight))`
///
/// The model output is nominally in [0, 1]; out-of-range values are clamped
/// during the 8-bit conversion rather than trusted.
///
/// # Errors
/// - [`InpaintError::Inference`] if the output tensor is not (1, 3, H, W) or
///   is smaller than the original image
pub fn composite(
    output: &Array4<f32>,
    original: &RgbImage,
    dilated_mask: &GrayImage,
) -> Result<RgbImage> {
    let (batch, channels, out_height, out_width) = output.dim();
    if batch != 1 || channels != 3 {
        return Err(InpaintError::inference(format!(
            "expected output tensor shape (1, 3, H, W), got ({batch}, {channels}, {out_height}, {out_width})"
        )));
    }

    let (width, height) = original.dimensions();
    if (out_width as u32) < width || (out_height as u32) < height {
        return Err(InpaintError::inference(format!(
            "model output {out_width}x{out_height} smaller than original {width}x{height}"
        )));
    }
    if dilated_mask.dimensions() != (width, height) {
        return Err(InpaintError::processing(format!(
            "blend mask dimensions {:?} do not match original {width}x{height}",
            dilated_mask.dimensions()
        )));
    }

    let mut result = RgbImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let weight = f32::from(dilated_mask.get_pixel(x, y).0[0]) / 255.0;
            if weight == 0.0 {
                // Untouched pixels are copied verbatim, never recomputed
                result.put_pixel(x, y, *original.get_pixel(x, y));
                continue;
            }

            let (xi, yi) = (x as usize, y as usize);
            let source = original.get_pixel(x, y);
            let mut blended = [0u8; 3];
            for c in 0..3 {
                let model = clamp_to_u8(output[[0, c, yi, xi]] * 255.0);
                let value = model * weight + f32::from(source.0[c]) * (1.0 - weight);
                blended[c] = value.round().clamp(0.0, 255.0) as u8;
            }
            result.put_pixel(x, y, Rgb(blended));
        }
    }

    Ok(result)
}

/// Clamp a float pixel value into the representable 8-bit range
fn clamp_to_u8(value: f32) -> f32 {
    value.clamp(0.0, 255.0)
}
