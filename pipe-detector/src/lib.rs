#![allow(missing_docs)]
#![allow(unused_extern_crates)] //Otherwise intel_mkl_src is considered an unused crate

// Required for linking.
#[cfg(target_os = "macos")]
extern crate accelerate_src;

#[cfg(not(target_os = "macos"))]
extern crate intel_mkl_src;

pub mod classifier;
pub mod contours;
pub mod ellipse_fitting;
pub mod error;
pub mod filters;
pub mod geometry;
pub mod loader;
pub mod morphology;
pub mod pipe_detector;
pub mod preprocess;
pub mod report;
pub mod segment;
pub mod stage;
pub mod utils;
pub const IS_DEBUG: bool = false;
