use crate::error::ScanError;
use image::DynamicImage;
use serde::Serialize;
use std::time::Instant;

use super::steps;

/// Noise level at which the cleanup stage adds an opening pass.
const DESPECKLE_NOISE_LEVEL: u8 = 5;

/// Binarization strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinarizationMode {
    /// Per-neighborhood thresholds, robust to uneven illumination
    #[default]
    Adaptive,
    /// Single bimodal cutoff; faster, less shadow-tolerant
    Global,
}

impl BinarizationMode {
    /// Parse from a form/query parameter string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "adaptive" => Some(Self::Adaptive),
            "global" => Some(Self::Global),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Adaptive => "adaptive",
            Self::Global => "global",
        }
    }
}

/// Tunable pipeline parameters.
///
/// Defaults match the interactive front end's slider defaults: modest
/// upscaling, medium noise removal, deskew and sharpening off.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Upscale factor, 1.0..=3.0; 1.0 disables rescaling.
    pub upscale_factor: f32,
    /// Noise removal level, 1..=7; normalized to an odd kernel before use.
    pub noise_level: u8,
    pub deskew_enabled: bool,
    pub sharpen_enabled: bool,
    pub binarization: BinarizationMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            upscale_factor: 1.5,
            noise_level: 3,
            deskew_enabled: false,
            sharpen_enabled: false,
            binarization: BinarizationMode::Adaptive,
        }
    }
}

impl PipelineConfig {
    pub const MAX_UPSCALE: f32 = 3.0;
    pub const MAX_NOISE_LEVEL: u8 = 7;

    /// Reject parameters outside the supported ranges.
    pub fn validate(&self) -> Result<(), ScanError> {
        if !self.upscale_factor.is_finite()
            || self.upscale_factor < 1.0
            || self.upscale_factor > Self::MAX_UPSCALE
        {
            return Err(ScanError::InvalidRequest(format!(
                "upscale_factor must be within 1.0..={}, got {}",
                Self::MAX_UPSCALE,
                self.upscale_factor
            )));
        }
        if self.noise_level < 1 || self.noise_level > Self::MAX_NOISE_LEVEL {
            return Err(ScanError::InvalidRequest(format!(
                "noise_level must be within 1..={}, got {}",
                Self::MAX_NOISE_LEVEL,
                self.noise_level
            )));
        }
        Ok(())
    }
}

/// Timing information for a single pipeline stage
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Result of preprocessing including timing stats
#[derive(Debug, Clone, Serialize)]
pub struct PreprocessingResult {
    /// Processed binary image (not serialized)
    #[serde(skip)]
    pub image: DynamicImage,
    /// Total preprocessing time in milliseconds
    pub total_time_ms: u64,
    /// Individual stage timings
    pub steps: Vec<StepTiming>,
}

/// Decode an uploaded image, failing fast before any stage runs.
pub fn decode_upload(data: &[u8]) -> Result<DynamicImage, ScanError> {
    if data.is_empty() {
        return Err(ScanError::InvalidImage("empty upload".to_string()));
    }
    let image = image::load_from_memory(data)
        .map_err(|e| ScanError::InvalidImage(format!("failed to decode image: {}", e)))?;
    if image.width() == 0 || image.height() == 0 {
        return Err(ScanError::InvalidImage("image has zero area".to_string()));
    }
    Ok(image)
}

/// Preprocessing pipeline: applies the enhancement stages in fixed order
/// according to its configuration.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the image through the configured stages.
    ///
    /// Stage order is fixed: grayscale, rescale, deskew (optional), sharpen
    /// (optional), binarize, morphological cleanup. Each stage's output is
    /// the sole input to the next.
    pub fn process(&self, image: DynamicImage) -> Result<PreprocessingResult, ScanError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(ScanError::InvalidImage("image has zero area".to_string()));
        }
        self.config.validate()?;

        let start = Instant::now();
        let mut timings = Vec::new();
        let cfg = self.config;

        let mut img = image;
        img = self.run_step("grayscale", img, &mut timings, steps::grayscale::apply)?;
        img = self.run_step("rescale", img, &mut timings, |img| {
            steps::rescale::apply(img, cfg.upscale_factor)
        })?;

        if cfg.deskew_enabled {
            img = self.run_step("deskew", img, &mut timings, steps::deskew::apply)?;
        }

        if cfg.sharpen_enabled {
            img = self.run_step("sharpen", img, &mut timings, steps::sharpen::apply)?;
        }

        img = self.run_step("binarize", img, &mut timings, |img| {
            steps::binarize::apply(img, cfg.binarization, cfg.noise_level)
        })?;
        img = self.run_step("morphology", img, &mut timings, |img| {
            steps::morphology::apply(img, cfg.noise_level >= DESPECKLE_NOISE_LEVEL)
        })?;

        Ok(PreprocessingResult {
            image: img,
            total_time_ms: start.elapsed().as_millis() as u64,
            steps: timings,
        })
    }

    fn run_step<F>(
        &self,
        name: &str,
        img: DynamicImage,
        timings: &mut Vec<StepTiming>,
        step_fn: F,
    ) -> Result<DynamicImage, ScanError>
    where
        F: FnOnce(DynamicImage) -> Result<DynamicImage, ScanError>,
    {
        let step_start = Instant::now();
        let result = step_fn(img)?;
        timings.push(StepTiming {
            name: name.to_string(),
            time_ms: step_start.elapsed().as_millis() as u64,
        });
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn test_binarization_mode_round_trip() {
        for mode in [BinarizationMode::Adaptive, BinarizationMode::Global] {
            assert_eq!(BinarizationMode::from_str(mode.as_str()), Some(mode));
        }
        assert_eq!(BinarizationMode::from_str("otsu"), None);
    }

    #[test]
    fn test_config_rejects_out_of_range_upscale() {
        let config = PipelineConfig {
            upscale_factor: 0.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ScanError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_config_rejects_out_of_range_noise_level() {
        let config = PipelineConfig {
            noise_level: 9,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ScanError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_decode_upload_rejects_corrupt_bytes() {
        let result = decode_upload(b"definitely not an image");
        assert!(matches!(result, Err(ScanError::InvalidImage(_))));
    }

    #[test]
    fn test_decode_upload_rejects_empty_upload() {
        let result = decode_upload(&[]);
        assert!(matches!(result, Err(ScanError::InvalidImage(_))));
    }

    #[test]
    fn test_process_scales_dimensions() {
        let img = GrayImage::from_pixel(50, 40, Luma([240]));
        let pipeline = Pipeline::new(PipelineConfig {
            upscale_factor: 2.0,
            noise_level: 1,
            ..Default::default()
        });

        let result = pipeline.process(DynamicImage::ImageLuma8(img)).unwrap();

        assert_eq!(result.image.width(), 100);
        assert_eq!(result.image.height(), 80);
    }

    #[test]
    fn test_process_rejects_zero_area_image() {
        let pipeline = Pipeline::new(PipelineConfig::default());
        let result = pipeline.process(DynamicImage::ImageLuma8(GrayImage::new(0, 0)));
        assert!(matches!(result, Err(ScanError::InvalidImage(_))));
    }
}
