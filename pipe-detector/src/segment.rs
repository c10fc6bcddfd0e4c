use image::{GrayImage, Luma};
use imageproc::map::map_colors;

use crate::morphology::{close, elliptical_mask, open};
use crate::pipe_detector::SegmentationParameter;

pub const FOREGROUND: u8 = 255;
pub const BACKGROUND: u8 = 0;

/// Inverted binary threshold: `pixel <= threshold` becomes foreground.
pub fn threshold_dark(gray: &GrayImage, threshold: u8) -> GrayImage {
    map_colors(gray, |p| {
        if p[0] <= threshold {
            Luma([FOREGROUND])
        } else {
            Luma([BACKGROUND])
        }
    })
}

/// Close first so blobs are solid, then open to drop specks and cut thin
/// bridges.
pub fn clean_mask(mask: &GrayImage, param: &SegmentationParameter) -> GrayImage {
    let kernel = elliptical_mask(param.kernel_size);
    let closed = close(mask, &kernel, param.close_iterations);
    open(&closed, &kernel, param.open_iterations)
}

pub fn segment(preprocessed: &GrayImage, param: &SegmentationParameter) -> GrayImage {
    clean_mask(&threshold_dark(preprocessed, param.threshold), param)
}
