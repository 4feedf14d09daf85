//! OCR preprocessing server.
//!
//! Takes a photographed page, runs it through a deterministic enhancement
//! pipeline (grayscale, upscaling, optional deskew, denoising, adaptive
//! binarization, morphological cleanup) and hands the cleaned bitmap to a
//! recognition engine. The pipeline is stateless: every request is processed
//! independently.

pub mod config;
pub mod error;
pub mod preprocessing;
pub mod recognition;
pub mod server;
