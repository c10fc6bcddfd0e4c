use std::path::Path;
use std::time::Instant;

use image::DynamicImage;
use slog::info;

use crate::classifier::{classify_contours, Detection, RejectionCounts, ShapeFilter};
use crate::contours::{extract_external_contours, ChainApproximation};
use crate::error::{DetectionError, ParameterError};
use crate::loader::load_image;
use crate::morphology::MAX_KERNEL_SIZE;
use crate::preprocess::preprocess;
use crate::report::PipeReport;
use crate::segment::segment;
use crate::stage::{NoopObserver, Stage, StageObserver};
use crate::utils::set_log_config;
use crate::IS_DEBUG;

/// PreprocessParameter
#[derive(Clone, Debug, PartialEq)]
pub struct PreprocessParameter {
    /// Side of the elliptical element used by the black-hat transform.
    pub black_hat_kernel: u32,
    pub clahe_clip_limit: f32,
    /// (rows, cols) of the CLAHE tile grid.
    pub clahe_tile_grid: (usize, usize),
    pub bilateral_diameter: u32,
    pub bilateral_sigma_color: f32,
    pub bilateral_sigma_space: f32,
    /// Median filter radius after the bilateral filter; `None` skips it.
    pub median_radius: Option<u32>,
}

impl Default for PreprocessParameter {
    fn default() -> Self {
        Self {
            black_hat_kernel: 25,
            clahe_clip_limit: 3.0,
            clahe_tile_grid: (7, 7),
            bilateral_diameter: 8,
            bilateral_sigma_color: 75.0,
            bilateral_sigma_space: 80.0,
            median_radius: None,
        }
    }
}

/// SegmentationParameter
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentationParameter {
    /// Pixels at or below this value become foreground.
    pub threshold: u8,
    /// Side of the elliptical element used for close and open.
    pub kernel_size: u32,
    pub close_iterations: u32,
    pub open_iterations: u32,
}

impl Default for SegmentationParameter {
    fn default() -> Self {
        Self {
            threshold: 100,
            kernel_size: 7,
            close_iterations: 1,
            open_iterations: 4,
        }
    }
}

/// PipeDetectionParameter
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PipeDetectionParameter {
    pub preprocess: PreprocessParameter,
    pub segmentation: SegmentationParameter,
    pub approximation: ChainApproximation,
    pub shape: ShapeFilter,
}

impl PipeDetectionParameter {
    /// Higher precision: hull checks on, tight axis ratio.
    pub fn new_strict_param() -> PipeDetectionParameter {
        PipeDetectionParameter::default()
    }

    /// Higher recall: no hull checks, elongated fits allowed, lighter
    /// morphology and an extra median pass.
    pub fn new_loose_param() -> PipeDetectionParameter {
        let mut ret = PipeDetectionParameter::default();
        ret.preprocess.median_radius = Some(2);
        ret.segmentation.kernel_size = 5;
        ret.segmentation.open_iterations = 2;
        ret.shape = ShapeFilter::loose();
        ret
    }

    pub fn validate(&self) -> Result<(), ParameterError> {
        let kernel = |name: &'static str, value: u32| {
            if value == 0 || value % 2 == 0 || value > MAX_KERNEL_SIZE {
                Err(ParameterError::KernelSize { name, value })
            } else {
                Ok(())
            }
        };
        let positive = |name: &'static str, value: f64| {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(ParameterError::NotPositive { name, value })
            }
        };

        kernel("black_hat_kernel", self.preprocess.black_hat_kernel)?;
        kernel("segmentation.kernel_size", self.segmentation.kernel_size)?;
        positive("clahe_clip_limit", self.preprocess.clahe_clip_limit as f64)?;
        positive("clahe_tile_grid.0", self.preprocess.clahe_tile_grid.0 as f64)?;
        positive("clahe_tile_grid.1", self.preprocess.clahe_tile_grid.1 as f64)?;
        positive("bilateral_diameter", self.preprocess.bilateral_diameter as f64)?;
        positive("bilateral_sigma_color", self.preprocess.bilateral_sigma_color as f64)?;
        positive("bilateral_sigma_space", self.preprocess.bilateral_sigma_space as f64)?;
        positive("max_axis_ratio", self.shape.max_axis_ratio)?;
        if self.shape.min_area > self.shape.max_area {
            return Err(ParameterError::AreaRange {
                min: self.shape.min_area,
                max: self.shape.max_area,
            });
        }
        Ok(())
    }
}

/// Outcome of one run over one image.
#[derive(Clone, Debug, PartialEq)]
pub struct PipeDetection {
    /// Accepted detections, in contour extraction order.
    pub detections: Vec<Detection>,
    pub rejections: RejectionCounts,
    /// Number of contours handed to the classifier.
    pub n_contours: usize,
}

impl PipeDetection {
    pub fn count(&self) -> usize {
        self.detections.len()
    }
}

/// Detect pipe cross-sections in a decoded image.
///
/// `observer` receives the preprocessed image and the cleaned mask.
pub fn detect_pipes(
    image: &DynamicImage,
    param: &PipeDetectionParameter,
    observer: &mut dyn StageObserver,
) -> Result<PipeDetection, ParameterError> {
    param.validate()?;
    let log = set_log_config();

    let tick = Instant::now();
    let preprocessed = preprocess(image, &param.preprocess);
    observer.observe(Stage::Preprocessed, &preprocessed);
    if IS_DEBUG {
        info!(
            log,
            "preprocess took {:.3}s",
            tick.elapsed().as_millis() as f64 / 1000.0
        );
    }

    let tick = Instant::now();
    let mask = segment(&preprocessed, &param.segmentation);
    observer.observe(Stage::Mask, &mask);
    if IS_DEBUG {
        info!(
            log,
            "segment took {:.3}s",
            tick.elapsed().as_millis() as f64 / 1000.0
        );
    }

    let tick = Instant::now();
    let contours = extract_external_contours(&mask, param.approximation);
    let (detections, rejections) = classify_contours(&contours, &param.shape);
    if IS_DEBUG {
        info!(
            log,
            "contours + classification took {:.3}s",
            tick.elapsed().as_millis() as f64 / 1000.0
        );
        rejections
            .iter()
            .for_each(|(stage, n)| info!(log, "rejected at {:?}: {}", stage, n));
    }

    info!(
        log,
        "pipes detected: {} of {} contours",
        detections.len(),
        contours.len()
    );

    Ok(PipeDetection {
        detections,
        rejections,
        n_contours: contours.len(),
    })
}

/// Load, detect and annotate in one call.
pub fn detect_pipes_in_file<P: AsRef<Path>>(
    path: P,
    param: &PipeDetectionParameter,
) -> Result<PipeReport, DetectionError> {
    let image = load_image(path)?;
    let detection = detect_pipes(&image, param, &mut NoopObserver)?;
    Ok(PipeReport::new(&image, detection))
}
