use crate::config::Config;
use crate::error::ScanError;
use crate::preprocessing::{
    decode_upload, BinarizationMode, Pipeline, PipelineConfig, StepTiming,
};
use crate::recognition::{
    create_engine, RecognitionEngine, RecognitionOutcome, ScriptCode, EMPTY_RESULT_WARNING,
};
use axum::{
    body::Bytes,
    extract::{multipart::Field, DefaultBodyLimit, Multipart, State},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose, Engine as _};
use image::GrayImage;
use serde::Serialize;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn RecognitionEngine>,
    pub config: Arc<Config>,
}

/// Recognition response
#[derive(Serialize)]
pub struct RecognizeResponse {
    pub text: String,
    pub confidence: f32,
    pub script: String,
    pub processing_time_ms: u64,
    pub preprocessing: PreprocessingSummary,
    pub warnings: Vec<String>,
    /// Base64 PNG of the processed bitmap, on request; shown for
    /// inspection, never persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_image: Option<String>,
}

#[derive(Serialize)]
pub struct PreprocessingSummary {
    pub total_time_ms: u64,
    pub steps: Vec<StepTiming>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub engine: String,
    pub engine_description: String,
    pub supported_scripts: Vec<String>,
    pub default_script: String,
    pub max_file_size_bytes: usize,
    pub pipeline_defaults: PipelineDefaults,
}

#[derive(Serialize)]
pub struct PipelineDefaults {
    pub upscale_factor: f32,
    pub noise_level: u8,
    pub deskew: bool,
    pub sharpen: bool,
    pub binarization: String,
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    let engine = create_engine(&config)?;
    let addr = format!("{}:{}", config.host, config.port);
    let max_file_size = config.max_file_size;

    let state = AppState {
        engine,
        config: Arc::new(config),
    };

    let app = Router::new()
        .route("/recognize", post(handle_recognize))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(DefaultBodyLimit::max(max_file_size))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Handle recognition requests: decode the upload, run the preprocessing
/// pipeline with the requested parameters, then hand the cleaned bitmap to
/// the recognition engine.
async fn handle_recognize(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<RecognizeResponse>, ScanError> {
    let start = Instant::now();

    let mut file_data: Option<Bytes> = None;
    let mut pipeline_config = PipelineConfig::default();
    let mut script = state.config.default_script;
    let mut engine_config = state.config.engine_config.clone();
    let mut include_image = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ScanError::InvalidRequest(format!("failed to parse multipart: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "file" => {
                file_data = Some(field.bytes().await.map_err(|e| {
                    ScanError::InvalidRequest(format!("failed to read file data: {}", e))
                })?);
            }
            "script" => {
                let value = text_field(&name, field).await?;
                script = ScriptCode::from_str(&value).ok_or_else(|| {
                    ScanError::InvalidRequest(format!("unknown script selector: {}", value))
                })?;
            }
            "upscale_factor" => {
                let value = text_field(&name, field).await?;
                pipeline_config.upscale_factor = value.parse().map_err(|_| {
                    ScanError::InvalidRequest(format!("invalid upscale_factor: {}", value))
                })?;
            }
            "noise_level" => {
                let value = text_field(&name, field).await?;
                pipeline_config.noise_level = value.parse().map_err(|_| {
                    ScanError::InvalidRequest(format!("invalid noise_level: {}", value))
                })?;
            }
            "deskew" => {
                pipeline_config.deskew_enabled =
                    parse_bool(&name, &text_field(&name, field).await?)?;
            }
            "sharpen" => {
                pipeline_config.sharpen_enabled =
                    parse_bool(&name, &text_field(&name, field).await?)?;
            }
            "binarization" => {
                let value = text_field(&name, field).await?;
                pipeline_config.binarization =
                    BinarizationMode::from_str(&value).ok_or_else(|| {
                        ScanError::InvalidRequest(format!("unknown binarization mode: {}", value))
                    })?;
            }
            "engine_config" => {
                engine_config = text_field(&name, field).await?;
            }
            "include_image" => {
                include_image = parse_bool(&name, &text_field(&name, field).await?)?;
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let data = file_data.ok_or(ScanError::MissingFile)?;

    if data.len() > state.config.max_file_size {
        return Err(ScanError::ImageTooLarge {
            size: data.len(),
            max: state.config.max_file_size,
        });
    }

    pipeline_config.validate()?;

    // Fails fast on a corrupt or empty upload, before any stage runs.
    let image = decode_upload(&data)?;

    let pipeline = Pipeline::new(pipeline_config);
    let preprocessed = pipeline.process(image)?;
    let bitmap = preprocessed.image.to_luma8();

    let outcome = state.engine.recognize(&bitmap, script, &engine_config)?;
    let warnings = result_warnings(&outcome);

    let processed_image = if include_image {
        Some(encode_png_base64(&bitmap)?)
    } else {
        None
    };

    let processing_time_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        "Recognition completed in {}ms (preprocessing {}ms), script: {}, confidence: {:.2}, text length: {}",
        processing_time_ms,
        preprocessed.total_time_ms,
        script.as_str(),
        outcome.confidence,
        outcome.text.len()
    );

    Ok(Json(RecognizeResponse {
        text: outcome.text,
        confidence: outcome.confidence,
        script: script.as_str().to_string(),
        processing_time_ms,
        preprocessing: PreprocessingSummary {
            total_time_ms: preprocessed.total_time_ms,
            steps: preprocessed.steps,
        },
        warnings,
        processed_image,
    }))
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    let defaults = PipelineConfig::default();
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        engine: state.engine.name().to_string(),
        engine_description: state.engine.description().to_string(),
        supported_scripts: state.engine.supported_scripts(),
        default_script: state.config.default_script.as_str().to_string(),
        max_file_size_bytes: state.config.max_file_size,
        pipeline_defaults: PipelineDefaults {
            upscale_factor: defaults.upscale_factor,
            noise_level: defaults.noise_level,
            deskew: defaults.deskew_enabled,
            sharpen: defaults.sharpen_enabled,
            binarization: defaults.binarization.as_str().to_string(),
        },
    })
}

async fn text_field(name: &str, field: Field<'_>) -> Result<String, ScanError> {
    field
        .text()
        .await
        .map_err(|e| ScanError::InvalidRequest(format!("invalid {}: {}", name, e)))
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ScanError> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ScanError::InvalidRequest(format!(
            "invalid {}: expected true/false, got {}",
            name, value
        ))),
    }
}

/// An empty recognition result is a success with a warning, not an error:
/// it usually means a tuning problem rather than a system fault.
fn result_warnings(outcome: &RecognitionOutcome) -> Vec<String> {
    let mut warnings = outcome.warnings.clone();
    if outcome.text.is_empty() {
        warnings.push(EMPTY_RESULT_WARNING.to_string());
    }
    warnings
}

fn encode_png_base64(image: &GrayImage) -> Result<String, ScanError> {
    let mut png = Vec::new();
    {
        let mut cursor = Cursor::new(&mut png);
        image
            .write_to(&mut cursor, image::ImageFormat::Png)
            .map_err(|e| {
                ScanError::Internal(format!("failed to encode processed image: {}", e))
            })?;
    }
    Ok(general_purpose::STANDARD.encode(png))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_accepts_common_forms() {
        assert!(parse_bool("deskew", "true").unwrap());
        assert!(parse_bool("deskew", "1").unwrap());
        assert!(!parse_bool("deskew", "false").unwrap());
        assert!(!parse_bool("deskew", "0").unwrap());
        assert!(parse_bool("deskew", "yes").is_err());
    }

    #[test]
    fn test_empty_result_becomes_warning() {
        let outcome = RecognitionOutcome {
            text: String::new(),
            confidence: 0.0,
            warnings: vec![],
        };
        let warnings = result_warnings(&outcome);
        assert_eq!(warnings, vec![EMPTY_RESULT_WARNING.to_string()]);
    }

    #[test]
    fn test_non_empty_result_has_no_extra_warning() {
        let outcome = RecognitionOutcome {
            text: "hello".to_string(),
            confidence: 0.9,
            warnings: vec!["low contrast".to_string()],
        };
        let warnings = result_warnings(&outcome);
        assert_eq!(warnings, vec!["low contrast".to_string()]);
    }

    #[test]
    fn test_processed_image_encodes_as_base64_png() {
        let bitmap = GrayImage::from_pixel(8, 8, image::Luma([255]));
        let encoded = encode_png_base64(&bitmap).unwrap();
        let decoded = general_purpose::STANDARD.decode(encoded).unwrap();
        assert_eq!(&decoded[1..4], b"PNG");
    }
}
