use crate::error::ScanError;
use image::DynamicImage;
use imageproc::filter::sharpen3x3;

/// Laplacian sharpening to make stroke edges more distinct before
/// binarization. Useful for slightly blurred photos; off by default.
pub fn apply(image: DynamicImage) -> Result<DynamicImage, ScanError> {
    let gray = image.to_luma8();
    Ok(DynamicImage::ImageLuma8(sharpen3x3(&gray)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn test_sharpen_enhances_edges() {
        let img = GrayImage::from_fn(20, 10, |x, _| {
            if x < 10 {
                Luma([50])
            } else {
                Luma([200])
            }
        });

        let result = apply(DynamicImage::ImageLuma8(img)).unwrap();
        let out = result.to_luma8();

        let edge_left = out.get_pixel(9, 5).0[0];
        let edge_right = out.get_pixel(10, 5).0[0];

        let original_diff = 200i32 - 50;
        let result_diff = (edge_right as i32 - edge_left as i32).abs();

        assert!(
            result_diff >= original_diff,
            "Edge should be enhanced: {} >= {}",
            result_diff,
            original_diff
        );
    }

    #[test]
    fn test_sharpen_preserves_dimensions() {
        let img = GrayImage::new(33, 17);
        let result = apply(DynamicImage::ImageLuma8(img)).unwrap();
        assert_eq!(result.width(), 33);
        assert_eq!(result.height(), 17);
    }
}
