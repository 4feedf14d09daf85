use crate::error::ScanError;
use image::{imageops::FilterType, DynamicImage, GenericImageView};

/// Upscale the image by `factor` using Catmull-Rom (cubic) interpolation.
///
/// Small glyphs binarize badly; enlarging them before thresholding keeps
/// thin strokes connected. A factor of exactly 1.0 short-circuits to the
/// identity, since resampling at unit scale only introduces interpolation
/// artifacts.
pub fn apply(image: DynamicImage, factor: f32) -> Result<DynamicImage, ScanError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ScanError::InvalidImage(format!(
            "cannot rescale a {}x{} image",
            width, height
        )));
    }

    if factor == 1.0 {
        return Ok(image);
    }

    let new_width = (width as f32 * factor).round() as u32;
    let new_height = (height as f32 * factor).round() as u32;

    Ok(image.resize_exact(new_width, new_height, FilterType::CatmullRom))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn test_rescale_dimension_law() {
        let img = GrayImage::new(101, 57);
        let result = apply(DynamicImage::ImageLuma8(img), 1.5).unwrap();
        assert_eq!(result.width(), (101.0_f32 * 1.5).round() as u32);
        assert_eq!(result.height(), (57.0_f32 * 1.5).round() as u32);
    }

    #[test]
    fn test_rescale_unit_factor_is_identity() {
        let img = GrayImage::from_fn(30, 20, |x, y| Luma([(x * 7 + y * 3) as u8]));
        let original = img.clone();

        let result = apply(DynamicImage::ImageLuma8(img), 1.0).unwrap();

        assert_eq!(result.to_luma8().as_raw(), original.as_raw());
    }

    #[test]
    fn test_rescale_rejects_zero_area() {
        let img = GrayImage::new(0, 0);
        let result = apply(DynamicImage::ImageLuma8(img), 2.0);
        assert!(matches!(result, Err(ScanError::InvalidImage(_))));
    }
}
