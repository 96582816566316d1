//! Image preprocessing and mask postprocessing
//!
//! Pixel pipeline around the segmentation model: normalize into the NCHW
//! layout the model expects, turn its single-channel output back into an
//! alpha mask, composite mask onto the source.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgba, RgbaImage};

use crate::engine::Tensor;

use super::CutoutError;

/// Normalize an image for the forward pass: RGB, Lanczos resize to
/// `target`×`target`, `x / 255 - 0.5` per channel, HWC→CHW, batch dim.
pub fn normalize_image(img: &DynamicImage, target: u32) -> Tensor {
    let resized = img
        .resize_exact(target, target, FilterType::Lanczos3)
        .to_rgb8();

    let plane = (target * target) as usize;
    let mut data = vec![0f32; 3 * plane];
    for (x, y, pixel) in resized.enumerate_pixels() {
        let idx = (y * target + x) as usize;
        for c in 0..3 {
            data[c * plane + idx] = f32::from(pixel[c]) / 255.0 - 0.5;
        }
    }

    Tensor::new(
        vec![1, 3, target as usize, target as usize],
        data,
    )
}

/// Convert the model's output into a grayscale mask at the source image's
/// dimensions: squeeze leading singleton dims, min-max normalize (a constant
/// output becomes a fully transparent mask), scale to u8, resize back.
pub fn mask_from_output(output: &Tensor, width: u32, height: u32) -> Result<GrayImage, CutoutError> {
    let (mh, mw) = match *output.shape() {
        [_, _, h, w] | [_, h, w] | [h, w] => (h, w),
        ref other => {
            return Err(CutoutError::BadOutput(format!(
                "unexpected output shape {other:?}"
            )))
        }
    };
    if output.data().len() < mh * mw {
        return Err(CutoutError::BadOutput(format!(
            "output carries {} values for a {mh}x{mw} mask",
            output.data().len()
        )));
    }
    let plane = &output.data()[..mh * mw];

    let mut lo = f32::INFINITY;
    let mut hi = f32::NEG_INFINITY;
    for &v in plane {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    let range = hi - lo;

    let mask: GrayImage = ImageBuffer::from_fn(mw as u32, mh as u32, |x, y| {
        let v = plane[y as usize * mw + x as usize];
        let norm = if range > 0.0 { (v - lo) / range } else { 0.0 };
        Luma([(norm * 255.0).round() as u8])
    });

    Ok(image::imageops::resize(
        &mask,
        width,
        height,
        FilterType::Lanczos3,
    ))
}

/// Composite: source RGB with the mask as alpha channel. The mask must
/// already match the source dimensions.
pub fn apply_alpha_mask(img: &DynamicImage, mask: &GrayImage) -> RgbaImage {
    let rgb = img.to_rgb8();
    debug_assert_eq!((rgb.width(), rgb.height()), (mask.width(), mask.height()));

    RgbaImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let p = rgb.get_pixel(x, y);
        let a = mask.get_pixel(x, y)[0];
        Rgba([p[0], p[1], p[2], a])
    })
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    fn solid(width: u32, height: u32, value: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_pixel(
            width,
            height,
            Rgb([value, value, value]),
        ))
    }

    #[test]
    fn normalize_shape_and_range() {
        let input = normalize_image(&solid(2, 2, 255), 4);
        assert_eq!(input.shape(), &[1, 3, 4, 4]);
        assert_eq!(input.data().len(), 48);
        for &v in input.data() {
            assert!((v - 0.5).abs() < 1e-6);
        }

        let black = normalize_image(&solid(2, 2, 0), 4);
        for &v in black.data() {
            assert!((v + 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn mask_min_max_normalizes() {
        let output = Tensor::new(vec![1, 1, 2, 2], vec![0.0, 1.0, 2.0, 3.0]);
        let mask = mask_from_output(&output, 2, 2).unwrap();
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
        assert_eq!(mask.get_pixel(1, 1)[0], 255);
    }

    #[test]
    fn constant_output_becomes_transparent_mask() {
        let output = Tensor::new(vec![1, 1, 2, 2], vec![0.7; 4]);
        let mask = mask_from_output(&output, 2, 2).unwrap();
        for pixel in mask.pixels() {
            assert_eq!(pixel[0], 0);
        }
    }

    #[test]
    fn mask_accepts_squeezed_shapes() {
        for shape in [vec![1, 1, 2, 2], vec![1, 2, 2], vec![2, 2]] {
            let output = Tensor::new(shape, vec![0.0, 1.0, 0.5, 0.25]);
            assert!(mask_from_output(&output, 2, 2).is_ok());
        }

        let bad = Tensor::new(vec![4], vec![0.0; 4]);
        assert!(matches!(
            mask_from_output(&bad, 2, 2),
            Err(CutoutError::BadOutput(_))
        ));
    }

    #[test]
    fn alpha_composite_keeps_color_and_applies_mask() {
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(1, 1, Rgb([255, 0, 0])));
        let mask: GrayImage = ImageBuffer::from_pixel(1, 1, Luma([128]));

        let out = apply_alpha_mask(&img, &mask);
        assert_eq!(out.get_pixel(0, 0), &Rgba([255, 0, 0, 128]));
    }
}
