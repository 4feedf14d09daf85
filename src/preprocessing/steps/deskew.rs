use crate::error::ScanError;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::geometry::min_area_rect;
use imageproc::point::Point;

/// Luminance cutoff for the ink mask; pixels darker than this count as text.
const INK_THRESHOLD: u8 = 128;
/// Rotations smaller than this are measurement noise, not skew.
const MIN_CORRECTION_DEGREES: f32 = 0.1;

/// Straighten the dominant text baseline.
///
/// The skew estimate comes from the minimum-area rectangle enclosing all
/// ink pixels, using a fixed luminance cutoff that is independent of the
/// configurable binarization stage. A uniformly light image has no ink mask
/// and is returned unchanged.
pub fn apply(image: DynamicImage) -> Result<DynamicImage, ScanError> {
    let gray = image.to_luma8();

    let angle = match estimate_skew_degrees(&gray) {
        Some(angle) if angle.abs() >= MIN_CORRECTION_DEGREES => angle,
        _ => return Ok(DynamicImage::ImageLuma8(gray)),
    };

    tracing::debug!("Correcting estimated skew of {:.2} degrees", angle);
    let rotated = rotate_about_center_replicate(&gray, (-angle).to_radians());
    Ok(DynamicImage::ImageLuma8(rotated))
}

/// Estimate the text skew in degrees, folded into (-45, 45].
///
/// Returns `None` when the image contains no ink pixels. The minimum-area
/// rectangle's orientation is only defined mod 90 degrees, so the angle of
/// its longer edge is normalized before use.
pub fn estimate_skew_degrees(gray: &GrayImage) -> Option<f32> {
    let ink: Vec<Point<i32>> = gray
        .enumerate_pixels()
        .filter(|(_, _, pixel)| pixel.0[0] < INK_THRESHOLD)
        .map(|(x, y, _)| Point::new(x as i32, y as i32))
        .collect();

    if ink.is_empty() {
        return None;
    }

    let corners = min_area_rect(&ink);

    // Text runs along the longer of the two rectangle edges.
    let e1 = (corners[1].x - corners[0].x, corners[1].y - corners[0].y);
    let e2 = (corners[2].x - corners[1].x, corners[2].y - corners[1].y);
    let sq1 = (e1.0 as i64).pow(2) + (e1.1 as i64).pow(2);
    let sq2 = (e2.0 as i64).pow(2) + (e2.1 as i64).pow(2);
    let (dx, dy) = if sq1 >= sq2 { e1 } else { e2 };

    if dx == 0 && dy == 0 {
        return Some(0.0);
    }

    let mut angle = (dy as f32).atan2(dx as f32).to_degrees();
    while angle > 45.0 {
        angle -= 90.0;
    }
    while angle <= -45.0 {
        angle += 90.0;
    }

    Some(angle)
}

/// Rotate the image contents by `theta` radians about the center, sampling
/// bilinearly and replicating edge pixels into newly exposed regions, so the
/// border introduces no artificial dark/light transitions for the
/// binarization stage to trip over.
fn rotate_about_center_replicate(gray: &GrayImage, theta: f32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let cx = (width as f32 - 1.0) / 2.0;
    let cy = (height as f32 - 1.0) / 2.0;
    let (sin, cos) = theta.sin_cos();

    GrayImage::from_fn(width, height, |x, y| {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let sx = cx + cos * dx + sin * dy;
        let sy = cy - sin * dx + cos * dy;
        Luma([sample_clamped(gray, sx, sy)])
    })
}

/// Bilinear sample at (x, y) with coordinates clamped to the image bounds.
fn sample_clamped(gray: &GrayImage, x: f32, y: f32) -> u8 {
    let (width, height) = gray.dimensions();
    let max_x = (width - 1) as f32;
    let max_y = (height - 1) as f32;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor();
    let y0 = y.floor();
    let x1 = (x0 + 1.0).min(max_x);
    let y1 = (y0 + 1.0).min(max_y);
    let fx = x - x0;
    let fy = y - y0;

    let p00 = gray.get_pixel(x0 as u32, y0 as u32).0[0] as f32;
    let p10 = gray.get_pixel(x1 as u32, y0 as u32).0[0] as f32;
    let p01 = gray.get_pixel(x0 as u32, y1 as u32).0[0] as f32;
    let p11 = gray.get_pixel(x1 as u32, y1 as u32).0[0] as f32;

    let top = p00 + (p10 - p00) * fx;
    let bottom = p01 + (p11 - p01) * fx;
    (top + (bottom - top) * fy).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three parallel dark bands tilted by `degrees`, on a white page.
    fn tilted_page(degrees: f32) -> GrayImage {
        let mut img = GrayImage::from_pixel(400, 300, Luma([255]));
        let slope = degrees.to_radians().tan();
        for band in 0..3 {
            let base = 80.0 + band as f32 * 60.0;
            for x in 40..360 {
                let center = base + (x - 40) as f32 * slope;
                for dy in -2..=2 {
                    let y = (center + dy as f32).round() as i32;
                    if (0..300).contains(&y) {
                        img.put_pixel(x, y as u32, Luma([20]));
                    }
                }
            }
        }
        img
    }

    #[test]
    fn test_blank_image_is_returned_unchanged() {
        let img = GrayImage::from_pixel(100, 100, Luma([255]));
        let original = img.clone();

        let result = apply(DynamicImage::ImageLuma8(img)).unwrap();

        assert_eq!(result.width(), 100);
        assert_eq!(result.height(), 100);
        assert_eq!(result.to_luma8().as_raw(), original.as_raw());
    }

    #[test]
    fn test_blank_image_has_no_estimate() {
        let img = GrayImage::from_pixel(50, 50, Luma([200]));
        assert_eq!(estimate_skew_degrees(&img), None);
    }

    #[test]
    fn test_estimate_matches_synthetic_tilt() {
        let img = tilted_page(10.0);
        let angle = estimate_skew_degrees(&img).unwrap();
        assert!(
            (angle - 10.0).abs() < 1.0,
            "Expected ~10 degrees, got {}",
            angle
        );
    }

    #[test]
    fn test_deskew_straightens_tilted_page() {
        let img = tilted_page(10.0);

        let result = apply(DynamicImage::ImageLuma8(img)).unwrap();
        let residual = estimate_skew_degrees(&result.to_luma8()).unwrap();

        assert!(
            residual.abs() < 1.0,
            "Expected residual skew within 1 degree, got {}",
            residual
        );
    }

    #[test]
    fn test_deskew_preserves_dimensions() {
        let img = tilted_page(-6.0);
        let result = apply(DynamicImage::ImageLuma8(img)).unwrap();
        assert_eq!(result.width(), 400);
        assert_eq!(result.height(), 300);
    }
}
