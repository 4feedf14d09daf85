//! Image preprocessing for OCR enhancement
//!
//! A fixed sequence of deterministic transforms turns a noisy photograph
//! into a recognition-ready binary bitmap. Each stage is a pure function;
//! the pipeline holds no state between runs.

pub mod pipeline;
pub mod steps;

pub use pipeline::{
    decode_upload, BinarizationMode, Pipeline, PipelineConfig, PreprocessingResult, StepTiming,
};
