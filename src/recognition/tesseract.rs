//! Tesseract engine implementation
//!
//! Statically linked Tesseract build, no system dependencies. Traineddata
//! files are resolved per script component (a combined selector like
//! `tha+eng` needs one file per language) and downloaded into the user
//! cache directory on first use.

use crate::config::Config;
use crate::error::ScanError;
use crate::recognition::{RecognitionEngine, RecognitionOutcome, ScriptCode};
use image::{DynamicImage, GrayImage};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tesseract_static::tesseract::{PageSegMode, Tesseract};

/// Tesseract-backed recognition engine
pub struct TesseractEngine {
    tessdata_dir: PathBuf,
}

impl TesseractEngine {
    /// Create the engine, resolving traineddata for the default script and
    /// probing initialization so a broken installation fails at startup
    /// rather than on the first request.
    pub fn new(config: &Config) -> Result<Self, ScanError> {
        let tessdata_dir = match &config.tessdata_path {
            Some(path) => PathBuf::from(path),
            None => default_tessdata_dir(),
        };

        ensure_traineddata(&tessdata_dir, config.default_script)
            .map_err(ScanError::EngineInit)?;

        let probe = Tesseract::new(tessdata_dir.to_str(), Some(config.default_script.as_str()))
            .map_err(|e| {
                ScanError::EngineInit(format!("failed to initialize Tesseract: {}", e))
            })?;
        drop(probe);

        tracing::info!(
            "Tesseract engine ready (tessdata: {}, default script: {})",
            tessdata_dir.display(),
            config.default_script.as_str()
        );

        Ok(Self { tessdata_dir })
    }
}

impl RecognitionEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn description(&self) -> &'static str {
        "Tesseract OCR engine (statically linked, multi-script)"
    }

    fn recognize(
        &self,
        image: &GrayImage,
        script: ScriptCode,
        engine_config: &str,
    ) -> Result<RecognitionOutcome, ScanError> {
        ensure_traineddata(&self.tessdata_dir, script).map_err(|e| {
            ScanError::Recognition(format!(
                "script '{}' unavailable: {} (missing language pack?)",
                script.as_str(),
                e
            ))
        })?;

        let options = EngineOptions::parse(engine_config);
        if options.oem != 3 {
            // The bindings fix the engine model at initialization; a
            // non-default --oem is accepted but the compiled default applies.
            tracing::debug!("engine mode {} requested; using build default", options.oem);
        }

        // BMP is always accepted by the underlying Leptonica loader; RGB
        // keeps the encoding path uniform.
        let rgb = DynamicImage::ImageLuma8(image.clone()).to_rgb8();
        let mut bmp_data = Vec::new();
        {
            let mut cursor = std::io::Cursor::new(&mut bmp_data);
            rgb.write_to(&mut cursor, image::ImageFormat::Bmp)
                .map_err(|e| ScanError::Recognition(format!("failed to encode bitmap: {}", e)))?;
        }

        tracing::debug!(
            "Recognizing {}x{} bitmap, script {}, {} bytes",
            image.width(),
            image.height(),
            script.as_str(),
            bmp_data.len()
        );

        let mut tess = Tesseract::new(self.tessdata_dir.to_str(), Some(script.as_str()))
            .map_err(|e| {
                ScanError::Recognition(format!(
                    "failed to start recognition for script '{}': {}",
                    script.as_str(),
                    e
                ))
            })?;
        tess.set_page_seg_mode(options.page_seg_mode());

        tess = tess
            .set_image_from_mem(&bmp_data)
            .map_err(|e| ScanError::Recognition(format!("failed to set image: {}", e)))?;

        tess = tess
            .recognize()
            .map_err(|e| ScanError::Recognition(format!("recognition failed: {}", e)))?;

        let text = tess
            .get_text()
            .map_err(|e| ScanError::Recognition(format!("failed to read text: {}", e)))?;

        // mean_text_conf is 0-100; report 0.0-1.0
        let confidence = tess.mean_text_conf() as f32 / 100.0;

        Ok(RecognitionOutcome {
            text: text.trim().to_string(),
            confidence,
            warnings: Vec::new(),
        })
    }

    fn supported_scripts(&self) -> Vec<String> {
        ScriptCode::ALL
            .iter()
            .map(|s| s.as_str().to_string())
            .collect()
    }
}

/// Engine options recovered from the opaque configuration string.
///
/// The format mirrors the engine's own command line: `--psm N` selects page
/// segmentation, `--oem N` the engine model. Unknown tokens are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EngineOptions {
    psm: u8,
    oem: u8,
}

impl EngineOptions {
    fn parse(engine_config: &str) -> Self {
        let mut options = Self { psm: 3, oem: 3 };
        let mut tokens = engine_config.split_whitespace();
        while let Some(token) = tokens.next() {
            match token {
                "--psm" => {
                    if let Some(value) = tokens.next().and_then(|t| t.parse().ok()) {
                        options.psm = value;
                    }
                }
                "--oem" => {
                    if let Some(value) = tokens.next().and_then(|t| t.parse().ok()) {
                        options.oem = value;
                    }
                }
                other => tracing::debug!("ignoring engine config token: {}", other),
            }
        }
        options
    }

    fn page_seg_mode(&self) -> PageSegMode {
        match self.psm {
            0 => PageSegMode::PsmOsdOnly,
            1 => PageSegMode::PsmAutoOsd,
            2 => PageSegMode::PsmAutoOnly,
            3 => PageSegMode::PsmAuto,
            4 => PageSegMode::PsmSingleColumn,
            5 => PageSegMode::PsmSingleBlockVertText,
            6 => PageSegMode::PsmSingleBlock,
            7 => PageSegMode::PsmSingleLine,
            8 => PageSegMode::PsmSingleWord,
            9 => PageSegMode::PsmCircleWord,
            10 => PageSegMode::PsmSingleChar,
            11 => PageSegMode::PsmSparseText,
            12 => PageSegMode::PsmSparseTextOsd,
            13 => PageSegMode::PsmRawLine,
            _ => PageSegMode::PsmAuto,
        }
    }
}

fn default_tessdata_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("textscan")
        .join("tessdata")
}

/// Make sure every component of a combined script selector has its
/// traineddata file present, downloading missing ones.
fn ensure_traineddata(dir: &Path, script: ScriptCode) -> Result<(), String> {
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("failed to create tessdata directory {:?}: {}", dir, e))?;

    for language in script.as_str().split('+') {
        let path = dir.join(format!("{}.traineddata", language));
        if path.exists() {
            continue;
        }
        tracing::info!(
            "Downloading traineddata for '{}' (this may take a moment)...",
            language
        );
        download_file(&traineddata_url(language), &path)?;
        tracing::info!("Downloaded traineddata to {:?}", path);
    }

    Ok(())
}

/// tessdata_fast models: smaller and quicker to fetch than the full set
fn traineddata_url(language: &str) -> String {
    format!(
        "https://github.com/tesseract-ocr/tessdata_fast/raw/main/{}.traineddata",
        language
    )
}

fn download_file(url: &str, path: &Path) -> Result<(), String> {
    let response = ureq::get(url)
        .call()
        .map_err(|e| format!("failed to download {}: {}", url, e))?;

    let body = response
        .into_body()
        .read_to_vec()
        .map_err(|e| format!("failed to read download body: {}", e))?;

    let mut file = File::create(path).map_err(|e| format!("failed to create {:?}: {}", path, e))?;
    file.write_all(&body)
        .map_err(|e| format!("failed to write {:?}: {}", path, e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_options_defaults() {
        assert_eq!(EngineOptions::parse(""), EngineOptions { psm: 3, oem: 3 });
    }

    #[test]
    fn test_engine_options_parse_flags() {
        let options = EngineOptions::parse("--oem 1 --psm 6");
        assert_eq!(options, EngineOptions { psm: 6, oem: 1 });
    }

    #[test]
    fn test_engine_options_skip_unknown_tokens() {
        let options = EngineOptions::parse("--dpi 300 --psm 11 garbage");
        assert_eq!(options.psm, 11);
        assert_eq!(options.oem, 3);
    }

    #[test]
    fn test_traineddata_url_names_the_language() {
        let url = traineddata_url("tha");
        assert!(url.ends_with("tha.traineddata"));
    }
}
