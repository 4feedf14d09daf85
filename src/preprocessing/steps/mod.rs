//! Individual pipeline stages

pub mod binarize;
pub mod deskew;
pub mod grayscale;
pub mod morphology;
pub mod rescale;
pub mod sharpen;
