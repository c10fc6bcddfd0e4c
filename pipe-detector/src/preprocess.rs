use image::{DynamicImage, GrayImage, Luma};

use crate::filters::{bilateral, clahe, median};
use crate::morphology::{black_hat, elliptical_mask};
use crate::pipe_detector::PreprocessParameter;
use crate::utils::ImageUtil;

/// Single channel luma reduction.
pub fn to_intensity(image: &DynamicImage) -> GrayImage {
    image.to_luma8()
}

/// Add the black-hat response back onto the intensity (saturating).
pub fn emphasize_dark_regions(gray: &GrayImage, kernel_size: u32) -> GrayImage {
    let response = black_hat(gray, &elliptical_mask(kernel_size));
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([gray.get_pixel(x, y)[0].saturating_add(response.get_pixel(x, y)[0])])
    })
}

pub fn normalize_contrast(gray: &GrayImage) -> GrayImage {
    ImageUtil::to_gray_image(&ImageUtil::normalize_min_max(&ImageUtil::to_array(gray)))
}

pub fn equalize_local_contrast(gray: &GrayImage, tiles: (usize, usize), clip_limit: f32) -> GrayImage {
    ImageUtil::to_gray_image(&clahe(&ImageUtil::to_array(gray), tiles, clip_limit))
}

pub fn denoise(gray: &GrayImage, param: &PreprocessParameter) -> GrayImage {
    let smooth = ImageUtil::to_gray_image(&bilateral(
        &ImageUtil::to_array(gray),
        param.bilateral_diameter,
        param.bilateral_sigma_color,
        param.bilateral_sigma_space,
    ));
    match param.median_radius {
        Some(radius) if radius > 0 => median(&smooth, radius),
        _ => smooth,
    }
}

/// Full preprocessing chain: intensity, dark emphasis, min-max rescale,
/// CLAHE, bilateral (+ optional median).
pub fn preprocess(image: &DynamicImage, param: &PreprocessParameter) -> GrayImage {
    let gray = to_intensity(image);
    let corrected = emphasize_dark_regions(&gray, param.black_hat_kernel);
    let normalized = normalize_contrast(&corrected);
    let equalized =
        equalize_local_contrast(&normalized, param.clahe_tile_grid, param.clahe_clip_limit);
    let smooth = denoise(&equalized, param);
    assert_eq!(smooth.dimensions(), gray.dimensions());
    smooth
}
