use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;

/// How boundary pixels are stored in an extracted contour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ChainApproximation {
    /// Every boundary pixel.
    None,
    /// Only the end points of horizontal, vertical and diagonal runs.
    #[default]
    Simple,
}

/// Closed outer boundary of one connected mask region.
#[derive(Clone, Debug, PartialEq)]
pub struct Contour {
    pub points: Vec<Point<i32>>,
}

impl Contour {
    pub fn new(points: Vec<Point<i32>>) -> Self {
        debug_assert!(!points.is_empty(), "a contour has at least one point");
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn to_f64(&self) -> Vec<[f64; 2]> {
        self.points
            .iter()
            .map(|p| [p.x as f64, p.y as f64])
            .collect()
    }
}

#[inline]
fn step(from: &Point<i32>, to: &Point<i32>) -> (i32, i32) {
    ((to.x - from.x).signum(), (to.y - from.y).signum())
}

/// Drop points whose incoming and outgoing steps point the same way.
pub fn compress_chain(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    let kept: Vec<_> = (0..n)
        .filter(|&i| {
            let prev = &points[(i + n - 1) % n];
            let next = &points[(i + 1) % n];
            step(prev, &points[i]) != step(&points[i], next)
        })
        .map(|i| points[i])
        .collect();
    if kept.is_empty() {
        points[..1].to_vec()
    } else {
        kept
    }
}

/// Outer boundaries of all top-level foreground regions. Holes and regions
/// nested inside holes are skipped.
pub fn extract_external_contours(mask: &GrayImage, approximation: ChainApproximation) -> Vec<Contour> {
    find_contours::<i32>(mask)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .filter(|c| !c.points.is_empty())
        .map(|c| match approximation {
            ChainApproximation::None => Contour::new(c.points),
            ChainApproximation::Simple => Contour::new(compress_chain(&c.points)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{compress_chain, extract_external_contours, ChainApproximation};
    use image::{GrayImage, Luma};
    use imageproc::point::Point;
    use itertools::Itertools;

    fn fill(mask: &mut GrayImage, xs: std::ops::Range<u32>, ys: std::ops::Range<u32>, v: u8) {
        for (x, y) in xs.cartesian_product(ys) {
            mask.put_pixel(x, y, Luma([v]));
        }
    }

    #[test]
    fn test_only_outer_boundaries() {
        let mut mask = GrayImage::new(60, 60);
        // ring with a separate blob inside its hole
        fill(&mut mask, 5..45, 5..45, 255);
        fill(&mut mask, 10..40, 10..40, 0);
        fill(&mut mask, 20..25, 20..25, 255);
        // second independent blob
        fill(&mut mask, 50..55, 50..55, 255);

        let contours = extract_external_contours(&mask, ChainApproximation::None);
        assert_eq!(contours.len(), 2);
    }

    #[test]
    fn test_empty_mask() {
        let mask = GrayImage::new(30, 30);
        assert!(extract_external_contours(&mask, ChainApproximation::Simple).is_empty());
    }

    #[test]
    fn test_single_pixel_blob() {
        let mut mask = GrayImage::new(10, 10);
        mask.put_pixel(4, 4, Luma([255]));
        let contours = extract_external_contours(&mask, ChainApproximation::Simple);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].points, vec![Point::new(4, 4)]);
    }

    #[test]
    fn test_simple_approximation_keeps_rectangle_corners() {
        let mut mask = GrayImage::new(30, 30);
        fill(&mut mask, 5..15, 8..20, 255);
        let contours = extract_external_contours(&mask, ChainApproximation::Simple);
        assert_eq!(contours.len(), 1);
        let corners = contours[0].points.iter().copied().sorted_by_key(|p| (p.x, p.y)).collect_vec();
        assert_eq!(
            corners,
            vec![
                Point::new(5, 8),
                Point::new(5, 19),
                Point::new(14, 8),
                Point::new(14, 19)
            ]
        );
    }

    #[test]
    fn test_compress_chain_diagonal_run() {
        let pts = vec![
            Point::new(0, 0),
            Point::new(1, 1),
            Point::new(2, 2),
            Point::new(3, 3),
            Point::new(2, 3),
            Point::new(1, 3),
            Point::new(0, 3),
            Point::new(0, 2),
            Point::new(0, 1),
        ];
        let compressed = compress_chain(&pts);
        assert_eq!(
            compressed,
            vec![Point::new(0, 0), Point::new(3, 3), Point::new(0, 3)]
        );
    }
}
