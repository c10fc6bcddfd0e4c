use image::GrayImage;
use imageproc::filter::median_filter;
use itertools::Itertools;
use ndarray::{s, Array2, Array3};

const HIST_SIZE: usize = 256;

/// Per-tile lookup tables of a clipped, redistributed histogram.
fn clahe_tile_lut(tile: ndarray::ArrayView2<f32>, clip_limit: f32) -> [f32; HIST_SIZE] {
    let mut lut = [0.0; HIST_SIZE];
    let n_pixels = tile.len();
    if n_pixels == 0 {
        lut.iter_mut().enumerate().for_each(|(i, v)| *v = i as f32);
        return lut;
    }

    let mut hist = [0_usize; HIST_SIZE];
    tile.iter()
        .for_each(|&v| hist[(v.max(0.0) as usize).min(HIST_SIZE - 1)] += 1);

    if clip_limit > 0.0 {
        let clip = ((clip_limit * n_pixels as f32 / HIST_SIZE as f32) as usize).max(1);
        let mut clipped = 0;
        hist.iter_mut().filter(|h| **h > clip).for_each(|h| {
            clipped += *h - clip;
            *h = clip;
        });

        let batch = clipped / HIST_SIZE;
        let mut residual = clipped - batch * HIST_SIZE;
        hist.iter_mut().for_each(|h| *h += batch);
        if residual > 0 {
            let step = (HIST_SIZE / residual).max(1);
            let mut i = 0;
            while i < HIST_SIZE && residual > 0 {
                hist[i] += 1;
                residual -= 1;
                i += step;
            }
        }
    }

    let scale = (HIST_SIZE - 1) as f32 / n_pixels as f32;
    let mut sum = 0;
    for (i, h) in hist.iter().enumerate() {
        sum += h;
        lut[i] = (sum as f32 * scale).round().min(255.0);
    }
    lut
}

/// Contrast limited adaptive histogram equalization.
///
/// `tiles` is (rows, cols) of the tile grid. Each output pixel blends the
/// lookup tables of the four nearest tile centres bilinearly.
pub fn clahe(image: &Array2<f32>, tiles: (usize, usize), clip_limit: f32) -> Array2<f32> {
    let (n_rows, n_cols) = image.dim();
    let (tiles_y, tiles_x) = (tiles.0.max(1), tiles.1.max(1));
    let tile_h = n_rows as f32 / tiles_y as f32;
    let tile_w = n_cols as f32 / tiles_x as f32;

    let mut luts = Array3::<f32>::zeros((tiles_y, tiles_x, HIST_SIZE));
    (0..tiles_y)
        .cartesian_product(0..tiles_x)
        .for_each(|(ty, tx)| {
            let r0 = (ty as f32 * tile_h) as usize;
            let r1 = (((ty + 1) as f32 * tile_h) as usize).min(n_rows);
            let c0 = (tx as f32 * tile_w) as usize;
            let c1 = (((tx + 1) as f32 * tile_w) as usize).min(n_cols);
            let lut = clahe_tile_lut(image.slice(s![r0..r1, c0..c1]), clip_limit);
            luts.slice_mut(s![ty, tx, ..])
                .iter_mut()
                .zip(lut.iter())
                .for_each(|(dst, src)| *dst = *src);
        });

    // (low tile, high tile, weight of high tile) along one axis
    let neighbours = |pos: usize, tile_size: f32, n_tiles: usize| {
        let f = pos as f32 / tile_size - 0.5;
        let low = f.floor();
        let weight = f - low;
        let low = low as isize;
        let hi = (low + 1).min(n_tiles as isize - 1).max(0) as usize;
        (low.max(0) as usize, hi, weight)
    };

    let mut out = Array2::<f32>::zeros((n_rows, n_cols));
    (0..n_rows).cartesian_product(0..n_cols).for_each(|(r, c)| {
        let v = (image[[r, c]].max(0.0) as usize).min(HIST_SIZE - 1);
        let (ty1, ty2, ya) = neighbours(r, tile_h, tiles_y);
        let (tx1, tx2, xa) = neighbours(c, tile_w, tiles_x);
        let top = luts[[ty1, tx1, v]] * (1.0 - xa) + luts[[ty1, tx2, v]] * xa;
        let bottom = luts[[ty2, tx1, v]] * (1.0 - xa) + luts[[ty2, tx2, v]] * xa;
        out[[r, c]] = (top * (1.0 - ya) + bottom * ya).round();
    });
    out
}

/// Edge preserving smoothing.
///
/// Neighbours within `diameter / 2` are weighted by both spatial distance and
/// intensity difference. Out-of-image neighbours are skipped.
pub fn bilateral(
    image: &Array2<f32>,
    diameter: u32,
    sigma_color: f32,
    sigma_space: f32,
) -> Array2<f32> {
    let radius = (diameter / 2).max(1) as isize;
    let color_coeff = -0.5 / (sigma_color * sigma_color);
    let space_coeff = -0.5 / (sigma_space * sigma_space);

    let offsets = (-radius..=radius)
        .cartesian_product(-radius..=radius)
        .filter_map(|(i, j)| {
            let r2 = (i * i + j * j) as f32;
            if r2.sqrt() > radius as f32 {
                None
            } else {
                Some((i, j, (r2 * space_coeff).exp()))
            }
        })
        .collect_vec();

    let (n_rows, n_cols) = (image.dim().0 as isize, image.dim().1 as isize);
    let mut out = Array2::<f32>::zeros(image.dim());
    (0..n_rows).cartesian_product(0..n_cols).for_each(|(r, c)| {
        let center = image[[r as usize, c as usize]];
        let (mut sum, mut wsum) = (0.0, 0.0);
        for &(i, j, space_weight) in &offsets {
            let (nr, nc) = (r + i, c + j);
            if nr < 0 || nc < 0 || nr >= n_rows || nc >= n_cols {
                continue;
            }
            let val = image[[nr as usize, nc as usize]];
            let diff = val - center;
            let w = space_weight * (diff * diff * color_coeff).exp();
            sum += w * val;
            wsum += w;
        }
        out[[r as usize, c as usize]] = sum / wsum;
    });
    out
}

/// Square-window median, for salt and pepper noise.
pub fn median(image: &GrayImage, radius: u32) -> GrayImage {
    median_filter(image, radius, radius)
}

#[cfg(test)]
mod tests {
    use super::{bilateral, clahe, median};
    use assert_approx_eq::assert_approx_eq;
    use image::{GrayImage, Luma};
    use ndarray::Array2;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_clahe_uniform_stays_uniform_and_bright() {
        let image = Array2::from_elem((70, 70), 220.0_f32);
        let out = clahe(&image, (7, 7), 3.0);
        let first = out[[0, 0]];
        assert!(out.iter().all(|&v| v == first));
        assert!(first >= 200.0, "bright image darkened to {}", first);
    }

    #[test]
    fn test_clahe_stretches_local_contrast() {
        let image = Array2::from_shape_fn((70, 70), |(_, c)| if c % 2 == 0 { 100.0 } else { 110.0 });
        let out = clahe(&image, (7, 7), 3.0);
        let diff = out[[35, 35]] - out[[35, 34]];
        assert!(diff.abs() > 10.0, "contrast not increased: {}", diff);
    }

    #[test]
    fn test_clahe_keeps_dark_blob_dark() {
        let image = Array2::from_shape_fn((140, 140), |(r, c)| {
            let (dr, dc) = (r as f32 - 70.0, c as f32 - 70.0);
            if (dr * dr + dc * dc).sqrt() <= 30.0 {
                0.0
            } else {
                255.0
            }
        });
        let out = clahe(&image, (7, 7), 3.0);
        assert!(out[[70, 70]] < 50.0);
        assert!(out[[5, 5]] > 200.0);
    }

    #[test]
    fn test_bilateral_constant_image() {
        let image = Array2::from_elem((20, 20), 123.0_f32);
        let out = bilateral(&image, 8, 75.0, 80.0);
        out.iter().for_each(|&v| assert_approx_eq!(v, 123.0, 1e-3));
    }

    #[test]
    fn test_bilateral_preserves_step_edge() {
        let image = Array2::from_shape_fn((20, 20), |(_, c)| if c < 10 { 50.0 } else { 200.0 });
        let out = bilateral(&image, 8, 20.0, 80.0);
        assert_approx_eq!(out[[10, 9]], 50.0, 0.5);
        assert_approx_eq!(out[[10, 10]], 200.0, 0.5);
    }

    #[test]
    fn test_bilateral_reduces_noise() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let image = Array2::from_shape_fn((40, 40), |_| 128.0 + rng.gen_range(-10.0_f32..10.0));
        let out = bilateral(&image, 8, 75.0, 80.0);
        let spread = |a: &Array2<f32>| {
            let mean = a.mean().unwrap();
            a.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / a.len() as f32
        };
        assert!(spread(&out) < spread(&image) / 4.0);
    }

    #[test]
    fn test_median_removes_salt() {
        let mut image = GrayImage::from_pixel(15, 15, Luma([40]));
        image.put_pixel(7, 7, Luma([255]));
        let out = median(&image, 2);
        assert_eq!(out.get_pixel(7, 7)[0], 40);
    }
}
