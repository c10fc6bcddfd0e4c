use std::f64::consts::PI;

use imageproc::geometry::{arc_length, convex_hull};
use imageproc::point::Point;

use crate::ellipse_fitting::Ellipse;

/// Area enclosed by a closed polygon (shoelace formula).
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let twice_area: i64 = (0..n)
        .map(|i| {
            let (p, q) = (points[i], points[(i + 1) % n]);
            p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64
        })
        .sum();
    twice_area.abs() as f64 / 2.0
}

/// Closed arc length.
pub fn perimeter(points: &[Point<i32>]) -> f64 {
    arc_length(points, true)
}

/// `4π·area / perimeter²`; 1.0 for a perfect circle. `None` for a zero perimeter.
pub fn circularity(area: f64, perimeter: f64) -> Option<f64> {
    if perimeter > 0.0 {
        Some(4.0 * PI * area / (perimeter * perimeter))
    } else {
        None
    }
}

pub fn hull(points: &[Point<i32>]) -> Vec<Point<i32>> {
    convex_hull(points)
}

/// Measurements of one contour, filled in as far as classification got.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeometricMetrics {
    pub n_points: usize,
    pub area: Option<f64>,
    pub perimeter: Option<f64>,
    pub circularity: Option<f64>,
    pub hull_area: Option<f64>,
    pub hull_perimeter: Option<f64>,
    pub ellipse: Option<Ellipse>,
}

impl GeometricMetrics {
    /// `area / hull_area`, when both are known and the hull is non-degenerate.
    pub fn solidity(&self) -> Option<f64> {
        match (self.area, self.hull_area) {
            (Some(a), Some(h)) if h > 0.0 => Some(a / h),
            _ => None,
        }
    }

    pub fn perimeter_ratio(&self) -> Option<f64> {
        match (self.perimeter, self.hull_perimeter) {
            (Some(p), Some(h)) if h > 0.0 => Some(p / h),
            _ => None,
        }
    }
}
