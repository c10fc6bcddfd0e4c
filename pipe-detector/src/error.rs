use std::path::PathBuf;

use thiserror::Error;

/// Failure to obtain a pixel buffer from disk. Fatal to a run.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("image not found: {0}")]
    Missing(PathBuf),

    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Per-contour geometry failure. Always absorbed into a rejection.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("ellipse fit needs at least {needed} points, got {got}")]
    TooFewPoints { needed: usize, got: usize },

    #[error("degenerate point set")]
    Degenerate,

    #[error("fitted conic is not an ellipse")]
    NotAnEllipse,

    #[error("fitted ellipse has a zero-length axis")]
    ZeroAxis,
}

/// A parameter set that violates its own invariants.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParameterError {
    #[error("{name} must be an odd size of at least 1, got {value}")]
    KernelSize { name: &'static str, value: u32 },

    #[error("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error("area range is empty: min {min} > max {max}")]
    AreaRange { min: f64, max: f64 },
}

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("invalid detection parameters: {0}")]
    Parameter(#[from] ParameterError),
}
