use crate::error::ScanError;
use crate::preprocessing::pipeline::BinarizationMode;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::filter::{bilateral_filter, gaussian_blur_f32, median_filter};

/// Gaussian weighting that matches a 21-pixel thresholding window.
const ADAPTIVE_SIGMA: f32 = 3.5;
/// Offset subtracted from the local weighted mean.
const ADAPTIVE_OFFSET: f32 = 10.0;
/// Bilateral filter parameters tuned for document photos.
const BILATERAL_WINDOW: u32 = 9;
const BILATERAL_SIGMA_COLOR: f32 = 75.0;
const BILATERAL_SIGMA_SPATIAL: f32 = 75.0;

/// Convert grayscale to binary: edge-preserving smoothing, thresholding,
/// then median despeckling sized from the noise level.
pub fn apply(
    image: DynamicImage,
    mode: BinarizationMode,
    noise_level: u8,
) -> Result<DynamicImage, ScanError> {
    let gray = image.to_luma8();

    // Flattens paper texture without blurring stroke edges the way a plain
    // Gaussian would.
    let smoothed = bilateral_filter(
        &gray,
        BILATERAL_WINDOW,
        BILATERAL_SIGMA_COLOR,
        BILATERAL_SIGMA_SPATIAL,
    );

    let binary = match mode {
        BinarizationMode::Adaptive => adaptive_threshold(&smoothed),
        BinarizationMode::Global => global_threshold(&smoothed),
    };

    // A rank filter removes isolated salt/pepper pixels without eroding
    // stroke edges, and maps {0, 255} inputs back onto {0, 255}.
    let kernel = median_kernel(noise_level);
    let cleaned = if kernel > 1 {
        let radius = kernel / 2;
        median_filter(&binary, radius, radius)
    } else {
        binary
    };

    Ok(DynamicImage::ImageLuma8(cleaned))
}

/// Odd median/morphology kernel derived from the noise level; even levels
/// round up, and level 1 yields the identity kernel.
pub fn median_kernel(noise_level: u8) -> u32 {
    (u32::from(noise_level) / 2) * 2 + 1
}

/// Local-adaptive thresholding: each pixel is compared against the
/// Gaussian-weighted mean of its neighborhood minus a fixed offset.
///
/// Local thresholds survive the illumination gradients of a photographed
/// page, where any single global cutoff fails on one side while succeeding
/// on the other.
fn adaptive_threshold(gray: &GrayImage) -> GrayImage {
    let local_mean = gaussian_blur_f32(gray, ADAPTIVE_SIGMA);

    let mut out = GrayImage::new(gray.width(), gray.height());
    for (x, y, pixel) in gray.enumerate_pixels() {
        let threshold = local_mean.get_pixel(x, y).0[0] as f32 - ADAPTIVE_OFFSET;
        let value = if pixel.0[0] as f32 > threshold { 255 } else { 0 };
        out.put_pixel(x, y, Luma([value]));
    }
    out
}

/// Single bimodal (Otsu) cutoff for the whole image. Selected explicitly as
/// the faster, less shadow-tolerant mode; never used as a fallback.
fn global_threshold(gray: &GrayImage) -> GrayImage {
    let cutoff = otsu_level(gray);
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y).0[0] > cutoff {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}
