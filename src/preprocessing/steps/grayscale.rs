use crate::error::ScanError;
use image::DynamicImage;

/// Collapse color channels to single-channel luminance.
/// Every later stage assumes grayscale input.
pub fn apply(image: DynamicImage) -> Result<DynamicImage, ScanError> {
    Ok(DynamicImage::ImageLuma8(image.to_luma8()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_grayscale_converts_color() {
        let mut img = RgbImage::new(10, 10);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 255, 0]));
        img.put_pixel(2, 0, Rgb([0, 0, 255]));

        let result = apply(DynamicImage::ImageRgb8(img)).unwrap();
        let gray = result.to_luma8();

        assert!(gray.get_pixel(0, 0).0[0] > 0);
        assert!(gray.get_pixel(1, 0).0[0] > 0);
        assert!(gray.get_pixel(2, 0).0[0] > 0);
    }

    #[test]
    fn test_grayscale_preserves_dimensions() {
        let img = RgbImage::new(100, 50);
        let result = apply(DynamicImage::ImageRgb8(img)).unwrap();
        assert_eq!(result.width(), 100);
        assert_eq!(result.height(), 50);
    }

    #[test]
    fn test_grayscale_is_idempotent() {
        let img = RgbImage::from_fn(20, 20, |x, y| Rgb([x as u8 * 3, y as u8 * 7, 90]));

        let once = apply(DynamicImage::ImageRgb8(img)).unwrap();
        let twice = apply(once.clone()).unwrap();

        assert_eq!(once.to_luma8().as_raw(), twice.to_luma8().as_raw());
    }
}
