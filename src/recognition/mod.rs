//! Recognition engine boundary
//!
//! The pipeline hands a cleaned bitmap to a recognition engine together
//! with a script selector and an engine configuration string. Both are
//! forwarded opaquely; the core never interprets them. Engines are
//! conditionally compiled behind feature flags.

#[cfg(feature = "engine-tesseract")]
pub mod tesseract;

use crate::config::Config;
use crate::error::ScanError;
use image::GrayImage;
use std::sync::Arc;

/// User-facing guidance when recognition mechanically succeeds but returns
/// no text. Usually a tuning problem (wrong script, insufficient upscale)
/// rather than a system fault.
pub const EMPTY_RESULT_WARNING: &str =
    "no text detected; try a higher upscale factor or a different script selector";

/// Writing-system selector forwarded to the recognition engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptCode {
    ThaEng,
    Eng,
    ChiSim,
    ChiTra,
    ThaChiSim,
}

impl ScriptCode {
    pub const ALL: [ScriptCode; 5] = [
        ScriptCode::ThaEng,
        ScriptCode::Eng,
        ScriptCode::ChiSim,
        ScriptCode::ChiTra,
        ScriptCode::ThaChiSim,
    ];

    /// Parse from a form/query parameter string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "tha+eng" => Some(Self::ThaEng),
            "eng" => Some(Self::Eng),
            "chi_sim" => Some(Self::ChiSim),
            "chi_tra" => Some(Self::ChiTra),
            "tha+chi_sim" => Some(Self::ThaChiSim),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ThaEng => "tha+eng",
            Self::Eng => "eng",
            Self::ChiSim => "chi_sim",
            Self::ChiTra => "chi_tra",
            Self::ThaChiSim => "tha+chi_sim",
        }
    }
}

/// Result returned by a recognition engine
#[derive(Debug, Clone)]
pub struct RecognitionOutcome {
    pub text: String,
    pub confidence: f32,
    pub warnings: Vec<String>,
}

/// Trait that all recognition engines must implement
pub trait RecognitionEngine: Send + Sync {
    /// Returns the engine identifier (e.g., "tesseract")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Recognize text on a processed bitmap. The script selector and the
    /// engine configuration string are interpreted by the engine alone.
    fn recognize(
        &self,
        image: &GrayImage,
        script: ScriptCode,
        engine_config: &str,
    ) -> Result<RecognitionOutcome, ScanError>;

    /// Script selectors this engine accepts
    fn supported_scripts(&self) -> Vec<String>;
}

/// Construct the compiled-in recognition engine.
pub fn create_engine(config: &Config) -> Result<Arc<dyn RecognitionEngine>, ScanError> {
    let mut engine: Option<Arc<dyn RecognitionEngine>> = None;

    #[cfg(feature = "engine-tesseract")]
    {
        tracing::info!("Initializing tesseract engine...");
        engine = Some(Arc::new(tesseract::TesseractEngine::new(config)?));
    }

    #[cfg(not(feature = "engine-tesseract"))]
    let _ = config;

    engine.ok_or_else(|| {
        ScanError::EngineInit(
            "no recognition engine compiled in; build with --features engine-tesseract".to_string(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_code_round_trip() {
        for script in ScriptCode::ALL {
            assert_eq!(ScriptCode::from_str(script.as_str()), Some(script));
        }
    }

    #[test]
    fn test_script_code_rejects_unknown_selector() {
        assert_eq!(ScriptCode::from_str("klingon"), None);
        assert_eq!(ScriptCode::from_str(""), None);
        assert_eq!(ScriptCode::from_str("ENG"), None);
    }

    #[test]
    fn test_combined_scripts_split_into_components() {
        assert_eq!(ScriptCode::ThaEng.as_str().split('+').count(), 2);
        assert_eq!(ScriptCode::Eng.as_str().split('+').count(), 1);
        assert_eq!(ScriptCode::ThaChiSim.as_str().split('+').count(), 2);
    }
}
