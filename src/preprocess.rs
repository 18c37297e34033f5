//! Image and mask preprocessing for the inpainting model
//!
//! Produces model-ready NCHW tensors from raw 8-bit buffers. The steps are
//! ordered and each is a pure transformation:
//!
//! 1. Resize the mask to the image dimensions (nearest-neighbor, preserves
//!    hard mask edges)
//! 2. Binarize at threshold 127
//! 3. Dilate the binary mask by [`DILATION_ITERATIONS`] iterations
//! 4. Reflect-pad image and mask so both dimensions are multiples of
//!    [`PAD_MULTIPLE`]
//! 5. Normalize to `f32` in [0, 1]
//! 6. Zero the image wherever the mask is set, so the model never sees the
//!    region it has to reconstruct

use crate::error::{InpaintError, Result};
use image::{imageops, GrayImage, RgbImage};
use ndarray::Array4;

/// The model requires spatial dimensions to be multiples of this value
pub const PAD_MULTIPLE: u32 = 8;

/// Mask pixels strictly greater than this become inpaint pixels (255)
pub const BINARIZE_THRESHOLD: u8 = 127;

/// Morphological dilation iterations applied to the binary mask
///
/// Grows the inpaint region outward to compensate for imprecise user-drawn
/// masks and to soften the blend seam at the mask boundary.
pub const DILATION_ITERATIONS: usize = 2;

/// Model-ready tensors plus the bookkeeping needed for postprocessing
#[derive(Debug)]
pub struct PreparedInput {
    /// Normalized image with masked pixels zeroed, NCHW (1, 3, H, W)
    pub image_tensor: Array4<f32>,
    /// Normalized binary mask, NCHW (1, 1, H, W)
    pub mask_tensor: Array4<f32>,
    /// Width before padding, for cropping the output
    pub original_width: u32,
    /// Height before padding, for cropping the output
    pub original_height: u32,
    /// Dilated binary mask at original (unpadded) dimensions; the compositor
    /// uses it as the per-pixel blend weight
    pub dilated_mask: GrayImage,
}

/// Run the full preprocessing pipeline on a color image and its mask
///
/// The mask may have different dimensions than the image; it is resized with
/// nearest-neighbor interpolation before binarization.
///
/// # Errors
/// - [`InpaintError::Processing`] for zero-sized inputs
pub fn prepare(image: &RgbImage, mask: &GrayImage) -> Result<PreparedInput> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(InpaintError::processing("input image has zero dimensions"));
    }

    let mask = if mask.dimensions() == (width, height) {
        mask.clone()
    } else {
        tracing::debug!(
            mask_dims = ?mask.dimensions(),
            image_dims = ?(width, height),
            "resizing mask to image dimensions"
        );
        imageops::resize(mask, width, height, imageops::FilterType::Nearest)
    };

    let binary = binarize(&mask);
    let dilated = dilate(&binary, DILATION_ITERATIONS);

    let padded_image = pad_to_multiple_rgb(image, PAD_MULTIPLE);
    let padded_mask = pad_to_multiple_gray(&dilated, PAD_MULTIPLE);

    let (image_tensor, mask_tensor) = to_masked_tensors(&padded_image, &padded_mask);

    Ok(PreparedInput {
        image_tensor,
        mask_tensor,
        original_width: width,
        original_height: height,
        dilated_mask: dilated,
    })
}

/// Threshold a mask to strict binary values
///
/// Pixels strictly greater than [`BINARIZE_THRESHOLD`] become 255 (inpaint),
/// everything else becomes 0 (preserve). Idempotent.
#[must_use]
pub fn binarize(mask: &GrayImage) -> GrayImage {
    let mut out = mask.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = if pixel.0[0] > BINARIZE_THRESHOLD { 255 } else { 0 };
    }
    out
}

/// Binary dilation with a 4-connected (cross) structuring element
///
/// Expects a binary mask (0/255). Each iteration grows the set region by one
/// pixel along the axes.
#[must_use]
pub fn dilate(mask: &GrayImage, iterations: usize) -> GrayImage {
    let (width, height) = mask.dimensions();
    let mut current = mask.clone();

    for _ in 0..iterations {
        let mut next = current.clone();
        for y in 0..height {
            for x in 0..width {
                if current.get_pixel(x, y).0[0] == 0 {
                    continue;
                }
                next.put_pixel(x, y, image::Luma([255]));
                if x > 0 {
                    next.put_pixel(x - 1, y, image::Luma([255]));
                }
                if x + 1 < width {
                    next.put_pixel(x + 1, y, image::Luma([255]));
                }
                if y > 0 {
                    next.put_pixel(x, y - 1, image::Luma([255]));
                }
                if y + 1 < height {
                    next.put_pixel(x, y + 1, image::Luma([255]));
                }
            }
        }
        current = next;
    }

    current
}

/// Minimal padding that makes `dim` a multiple of `multiple`
#[must_use]
pub fn padding_for(dim: u32, multiple: u32) -> u32 {
    (multiple - dim % multiple) % multiple
}

/// Mirror a coordinate back into `[0, len)` for edge-reflection padding
///
/// Reflection does not repeat the border pixel (row `len` maps to `len - 2`)
/// and keeps bouncing between the borders when the pad is wider than the
/// dimension itself. A single-pixel dimension has only one value to reflect.
fn reflect_index(i: u32, len: u32) -> u32 {
    if len <= 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let phase = i % period;
    if phase < len {
        phase
    } else {
        period - phase
    }
}

/// Pad a color image to the next dimension multiple using edge-reflection
#[must_use]
pub fn pad_to_multiple_rgb(image: &RgbImage, multiple: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let new_width = width + padding_for(width, multiple);
    let new_height = height + padding_for(height, multiple);
    if (new_width, new_height) == (width, height) {
        return image.clone();
    }

    RgbImage::from_fn(new_width, new_height, |x, y| {
        *image.get_pixel(reflect_index(x, width), reflect_index(y, height))
    })
}

/// Pad a single-channel mask to the next dimension multiple using edge-reflection
#[must_use]
pub fn pad_to_multiple_gray(mask: &GrayImage, multiple: u32) -> GrayImage {
    let (width, height) = mask.dimensions();
    let new_width = width + padding_for(width, multiple);
    let new_height = height + padding_for(height, multiple);
    if (new_width, new_height) == (width, height) {
        return mask.clone();
    }

    GrayImage::from_fn(new_width, new_height, |x, y| {
        *mask.get_pixel(reflect_index(x, width), reflect_index(y, height))
    })
}

/// Normalize padded buffers into NCHW tensors and zero the masked image region
#[allow(clippy::indexing_slicing)] // tensor dimensions pre-allocated to match buffers
fn to_masked_tensors(image: &RgbImage, mask: &GrayImage) -> (Array4<f32>, Array4<f32>) {
    let (width, height) = image.dimensions();
    let (w, h) = (width as usize, height as usize);

    let mut image_tensor = Array4::<f32>::zeros((1, 3, h, w));
    let mut mask_tensor = Array4::<f32>::zeros((1, 1, h, w));

    for y in 0..height {
        for x in 0..width {
            let m = f32::from(mask.get_pixel(x, y).0[0]) / 255.0;
            let keep = 1.0 - m;
            let pixel = image.get_pixel(x, y);
            let (xi, yi) = (x as usize, y as usize);

            mask_tensor[[0, 0, yi, xi]] = m;
            image_tensor[[0, 0, yi, xi]] = f32::from(pixel.0[0]) / 255.0 * keep;
            image_tensor[[0, 1, yi, xi]] = f32::from(pixel.0[1]) / 255.0 * keep;
            image_tensor[[0, 2, yi, xi]] = f32::from(pixel.0[2]) / 255.0 * keep;
        }
    }

    (image_tensor, mask_tensor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    fn mask_with_values(values: &[u8]) -> GrayImage {
        let mut mask = GrayImage::new(values.len() as u32, 1);
        for (i, v) in values.iter().enumerate() {
            mask.put_pixel(i as u32, 0, Luma([*v]));
        }
        mask
    }

    #[test]
    fn test_binarize_threshold_is_strict() {
        let mask = mask_with_values(&[0, 126, 127, 128, 255]);
        let binary = binarize(&mask);
        let values: Vec<u8> = binary.pixels().map(|p| p.0[0]).collect();
        assert_eq!(values, vec![0, 0, 0, 255, 255]);
    }

    #[test]
    fn test_binarize_is_idempotent() {
        let mask = mask_with_values(&[3, 90, 127, 200, 255]);
        let once = binarize(&mask);
        let twice = binarize(&once);
        assert_eq!(once.as_raw(), twice.as_raw());
    }

    #[test]
    fn test_dilate_single_pixel_cross() {
        let mut mask = GrayImage::new(7, 7);
        mask.put_pixel(3, 3, Luma([255]));

        let dilated = dilate(&mask, 1);
        let set: usize = dilated.pixels().filter(|p| p.0[0] == 255).count();
        // One iteration of a 4-connected element turns a point into a cross
        assert_eq!(set, 5);
        assert_eq!(dilated.get_pixel(2, 3).0[0], 255);
        assert_eq!(dilated.get_pixel(3, 2).0[0], 255);
        assert_eq!(dilated.get_pixel(2, 2).0[0], 0);
    }

    #[test]
    fn test_dilate_two_iterations_reach() {
        let mut mask = GrayImage::new(9, 9);
        mask.put_pixel(4, 4, Luma([255]));

        let dilated = dilate(&mask, 2);
        // Manhattan distance <= 2 from the seed: 13 pixels
        let set: usize = dilated.pixels().filter(|p| p.0[0] == 255).count();
        assert_eq!(set, 13);
        assert_eq!(dilated.get_pixel(4, 2).0[0], 255);
        assert_eq!(dilated.get_pixel(4, 1).0[0], 0);
    }

    #[test]
    fn test_padding_property() {
        for dim in [1u32, 5, 7, 8, 9, 15, 16, 100, 127] {
            let pad = padding_for(dim, PAD_MULTIPLE);
            assert!(pad < PAD_MULTIPLE);
            assert_eq!((dim + pad) % PAD_MULTIPLE, 0);
        }
    }

    #[test]
    fn test_pad_reflects_without_repeating_edge() {
        // 6 wide: padded to 8, columns 6 and 7 mirror columns 4 and 3
        let mut img = RgbImage::new(6, 8);
        for (x, _, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgb([x as u8 * 10, 0, 0]);
        }
        let padded = pad_to_multiple_rgb(&img, PAD_MULTIPLE);
        assert_eq!(padded.dimensions(), (8, 8));
        assert_eq!(padded.get_pixel(6, 0).0[0], 40);
        assert_eq!(padded.get_pixel(7, 0).0[0], 30);
    }

    #[test]
    fn test_pad_keeps_reflecting_when_narrower_than_pad() {
        // 2 wide: padding to 8 needs more pixels than the image holds, so the
        // reflection bounces between the two columns without repeating either
        let mut img = RgbImage::new(2, 8);
        for (x, _, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgb([x as u8 * 10, 0, 0]);
        }
        let padded = pad_to_multiple_rgb(&img, PAD_MULTIPLE);
        assert_eq!(padded.dimensions(), (8, 8));
        let cols: Vec<u8> = (0..8).map(|x| padded.get_pixel(x, 0).0[0]).collect();
        assert_eq!(cols, vec![0, 10, 0, 10, 0, 10, 0, 10]);
    }

    #[test]
    fn test_pad_noop_when_already_multiple() {
        let img = RgbImage::from_pixel(16, 8, Rgb([9, 9, 9]));
        let padded = pad_to_multiple_rgb(&img, PAD_MULTIPLE);
        assert_eq!(padded.dimensions(), (16, 8));
    }

    #[test]
    fn test_prepare_resizes_mismatched_mask() {
        let image = RgbImage::from_pixel(16, 16, Rgb([100, 100, 100]));
        let mask = GrayImage::from_pixel(8, 8, Luma([255]));

        let prepared = prepare(&image, &mask).unwrap();
        assert_eq!(prepared.dilated_mask.dimensions(), (16, 16));
        assert_eq!(prepared.original_width, 16);
        assert_eq!(prepared.original_height, 16);
    }

    #[test]
    fn test_prepare_zeroes_masked_image_region() {
        let image = RgbImage::from_pixel(8, 8, Rgb([200, 150, 100]));
        let mut mask = GrayImage::new(8, 8);
        mask.put_pixel(4, 4, Luma([255]));

        let prepared = prepare(&image, &mask).unwrap();
        assert_eq!(prepared.image_tensor.dim(), (1, 3, 8, 8));
        assert_eq!(prepared.mask_tensor.dim(), (1, 1, 8, 8));

        // Seed pixel and its dilated neighborhood are zeroed in the input
        assert_eq!(prepared.image_tensor[[0, 0, 4, 4]], 0.0);
        assert_eq!(prepared.image_tensor[[0, 1, 4, 3]], 0.0);
        assert_eq!(prepared.mask_tensor[[0, 0, 4, 4]], 1.0);

        // A far corner is untouched and normalized
        assert!((prepared.image_tensor[[0, 0, 0, 0]] - 200.0 / 255.0).abs() < 1e-6);
        assert_eq!(prepared.mask_tensor[[0, 0, 0, 0]], 0.0);
    }

    #[test]
    fn test_prepare_pads_tensor_dimensions() {
        let image = RgbImage::from_pixel(13, 10, Rgb([50, 50, 50]));
        let mask = GrayImage::new(13, 10);

        let prepared = prepare(&image, &mask).unwrap();
        assert_eq!(prepared.image_tensor.dim(), (1, 3, 16, 16));
        assert_eq!(prepared.original_width, 13);
        assert_eq!(prepared.original_height, 10);
        // The blend mask stays at original dimensions
        assert_eq!(prepared.dilated_mask.dimensions(), (13, 10));
    }
}
