use image::{GrayImage, Luma};
use imageproc::morphology::{grayscale_dilate, grayscale_erode, Mask};

/// Largest structuring element side accepted by [`elliptical_mask`].
pub const MAX_KERNEL_SIZE: u32 = 255;

/// Elliptical structuring element image of `size`×`size` (255 = member).
///
/// Rows span `c ± round(c * sqrt(1 - dy²/r²))`, the same rasterisation as
/// OpenCV's `MORPH_ELLIPSE`.
pub fn elliptical_kernel(size: u32) -> GrayImage {
    let r = (size / 2) as i32;
    let c = (size / 2) as i32;
    let inv_r2 = if r > 0 { 1.0 / (r * r) as f64 } else { 0.0 };
    let mut kernel = GrayImage::new(size, size);
    for i in 0..size as i32 {
        let dy = i - r;
        if dy.abs() > r {
            continue;
        }
        let dx = (c as f64 * (((r * r - dy * dy) as f64) * inv_r2).sqrt()).round() as i32;
        let j1 = (c - dx).max(0);
        let j2 = (c + dx + 1).min(size as i32);
        for j in j1..j2 {
            kernel.put_pixel(j as u32, i as u32, Luma([255]));
        }
    }
    kernel
}

pub fn elliptical_mask(size: u32) -> Mask {
    debug_assert!(size >= 1 && size <= MAX_KERNEL_SIZE);
    let center = (size / 2) as u8;
    Mask::from_image(&elliptical_kernel(size), center, center)
}

pub fn erode(image: &GrayImage, mask: &Mask, iterations: u32) -> GrayImage {
    let mut out = image.clone();
    for _ in 0..iterations {
        out = grayscale_erode(&out, mask);
    }
    out
}

pub fn dilate(image: &GrayImage, mask: &Mask, iterations: u32) -> GrayImage {
    let mut out = image.clone();
    for _ in 0..iterations {
        out = grayscale_dilate(&out, mask);
    }
    out
}

/// `erode^n` then `dilate^n`.
pub fn open(image: &GrayImage, mask: &Mask, iterations: u32) -> GrayImage {
    dilate(&erode(image, mask, iterations), mask, iterations)
}

/// `dilate^n` then `erode^n`.
pub fn close(image: &GrayImage, mask: &Mask, iterations: u32) -> GrayImage {
    erode(&dilate(image, mask, iterations), mask, iterations)
}

/// `close(image) - image`: bright where the image is darker than its
/// surroundings at the scale of `mask`.
pub fn black_hat(image: &GrayImage, mask: &Mask) -> GrayImage {
    let closed = close(image, mask, 1);
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([closed.get_pixel(x, y)[0].saturating_sub(image.get_pixel(x, y)[0])])
    })
}

#[cfg(test)]
mod tests {
    use super::{black_hat, close, elliptical_kernel, elliptical_mask, open};
    use image::{GrayImage, Luma};
    use itertools::Itertools;

    fn members(kernel: &GrayImage) -> Vec<(u32, u32)> {
        kernel
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] > 0)
            .map(|(x, y, _)| (x, y))
            .collect_vec()
    }

    #[test]
    fn test_elliptical_kernel_shape() {
        let kernel = elliptical_kernel(5);
        let expected = [
            [0, 0, 1, 0, 0],
            [1, 1, 1, 1, 1],
            [1, 1, 1, 1, 1],
            [1, 1, 1, 1, 1],
            [0, 0, 1, 0, 0],
        ];
        for (y, row) in expected.iter().enumerate() {
            for (x, &v) in row.iter().enumerate() {
                assert_eq!(
                    kernel.get_pixel(x as u32, y as u32)[0] > 0,
                    v == 1,
                    "mismatch at ({}, {})",
                    x,
                    y
                );
            }
        }
    }

    #[test]
    fn test_elliptical_kernel_symmetric() {
        let kernel = elliptical_kernel(25);
        let pts = members(&kernel);
        assert!(pts.contains(&(12, 0)) && pts.contains(&(12, 24)));
        assert!(pts.contains(&(0, 12)) && pts.contains(&(24, 12)));
        assert!(!pts.contains(&(0, 0)));
        for &(x, y) in &pts {
            assert!(pts.contains(&(24 - x, y)) && pts.contains(&(x, 24 - y)));
        }
    }

    #[test]
    fn test_open_removes_specks_keeps_blobs() {
        let mut image = GrayImage::new(60, 60);
        for (x, y) in (10..40).cartesian_product(10..40) {
            image.put_pixel(x, y, Luma([255]));
        }
        image.put_pixel(50, 50, Luma([255]));

        let opened = open(&image, &elliptical_mask(5), 2);
        assert_eq!(opened.get_pixel(50, 50)[0], 0);
        assert_eq!(opened.get_pixel(25, 25)[0], 255);
    }

    #[test]
    fn test_close_fills_holes() {
        let mut image = GrayImage::from_pixel(40, 40, Luma([255]));
        image.put_pixel(20, 20, Luma([0]));
        let closed = close(&image, &elliptical_mask(3), 1);
        assert_eq!(closed.get_pixel(20, 20)[0], 255);
    }

    #[test]
    fn test_black_hat_responds_to_small_dark_spots() {
        let mut image = GrayImage::from_pixel(80, 80, Luma([200]));
        for (x, y) in (38..42).cartesian_product(38..42) {
            image.put_pixel(x, y, Luma([40]));
        }
        let response = black_hat(&image, &elliptical_mask(25));
        assert_eq!(response.get_pixel(40, 40)[0], 160);
        assert_eq!(response.get_pixel(5, 5)[0], 0);
    }
}
