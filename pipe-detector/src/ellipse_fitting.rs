use ndarray::Array2;
use ndarray_linalg::svd::SVD;

use crate::error::GeometryError;

/// A conic needs five points to be determined.
pub const MIN_FIT_POINTS: usize = 5;

// Relative singular value below which a direction counts as null.
const RANK_TOLERANCE: f64 = 1e-10;

/// Rotated ellipse in image coordinates (y down).
///
/// `axes` are full lengths; `axes[0]` lies along `angle` (degrees, `[0, 180)`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ellipse {
    pub center: [f64; 2],
    pub axes: [f64; 2],
    pub angle: f64,
}

impl Ellipse {
    pub fn major_axis(&self) -> f64 {
        self.axes[0].max(self.axes[1])
    }

    pub fn minor_axis(&self) -> f64 {
        self.axes[0].min(self.axes[1])
    }

    /// `major / minor`; infinite for a zero minor axis.
    pub fn axis_ratio(&self) -> f64 {
        let minor = self.minor_axis();
        if minor > 0.0 {
            self.major_axis() / minor
        } else {
            f64::INFINITY
        }
    }

    /// Direction of the major axis in degrees, `[0, 180)`.
    pub fn major_axis_angle(&self) -> f64 {
        if self.axes[0] >= self.axes[1] {
            self.angle
        } else {
            (self.angle + 90.0).rem_euclid(180.0)
        }
    }
}

/// Shift to the centroid and scale so the mean distance from it is √2.
fn normalization_params(points: &[[f64; 2]]) -> (f64, f64, f64) {
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p[0]).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p[1]).sum::<f64>() / n;
    let mean_dist = points
        .iter()
        .map(|p| ((p[0] - mean_x).powi(2) + (p[1] - mean_y).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    (mean_x, mean_y, mean_dist)
}

/// Centre, axes and rotation of `A x² + B xy + C y² + D x + E y + F = 0`.
fn conic_to_ellipse(c: &[f64; 6]) -> Result<Ellipse, GeometryError> {
    let [a, b, c_, d, e, f] = *c;
    let disc = b * b - 4.0 * a * c_;
    if disc >= -f64::EPSILON {
        return Err(GeometryError::NotAnEllipse);
    }
    let x0 = (2.0 * c_ * d - b * e) / disc;
    let y0 = (2.0 * a * e - b * d) / disc;
    let f0 = a * x0 * x0 + b * x0 * y0 + c_ * y0 * y0 + d * x0 + e * y0 + f;

    let theta = 0.5 * b.atan2(a - c_);
    let (sin_t, cos_t) = theta.sin_cos();
    let lambda_theta = a * cos_t * cos_t + b * sin_t * cos_t + c_ * sin_t * sin_t;
    let lambda_perp = a + c_ - lambda_theta;

    let semi_w2 = -f0 / lambda_theta;
    let semi_h2 = -f0 / lambda_perp;
    if !semi_w2.is_finite() || !semi_h2.is_finite() || semi_w2 < 0.0 || semi_h2 < 0.0 {
        return Err(GeometryError::NotAnEllipse);
    }
    if semi_w2 == 0.0 || semi_h2 == 0.0 {
        return Err(GeometryError::ZeroAxis);
    }

    Ok(Ellipse {
        center: [x0, y0],
        axes: [2.0 * semi_w2.sqrt(), 2.0 * semi_h2.sqrt()],
        angle: theta.to_degrees().rem_euclid(180.0),
    })
}

///Fit an ellipse to x, y coordinates.
///
/// Algebraic least squares: the conic is the right singular vector of the
/// design matrix `[x², xy, y², x, y, 1]` with the smallest singular value,
/// computed on centred and scaled points.
pub fn fit_ellipse(points: &[[f64; 2]]) -> Result<Ellipse, GeometryError> {
    let n_points = points.len();
    if n_points < MIN_FIT_POINTS {
        return Err(GeometryError::TooFewPoints {
            needed: MIN_FIT_POINTS,
            got: n_points,
        });
    }

    let (mean_x, mean_y, mean_dist) = normalization_params(points);
    if mean_dist <= f64::EPSILON {
        return Err(GeometryError::Degenerate);
    }
    let scale = std::f64::consts::SQRT_2 / mean_dist;

    let mut a = Array2::<f64>::zeros((n_points, 6));
    for (i, p) in points.iter().enumerate() {
        let (x, y) = ((p[0] - mean_x) * scale, (p[1] - mean_y) * scale);
        a[[i, 0]] = x * x;
        a[[i, 1]] = x * y;
        a[[i, 2]] = y * y;
        a[[i, 3]] = x;
        a[[i, 4]] = y;
        a[[i, 5]] = 1.0;
    }

    let (_, sigma, vt) = a.svd(false, true).map_err(|_| GeometryError::Degenerate)?;
    let vt = vt.ok_or(GeometryError::Degenerate)?;

    // more than one null direction means the points do not pin down a conic
    let largest = sigma.iter().copied().fold(0.0, f64::max);
    let nullity = (6 - sigma.len())
        + sigma
            .iter()
            .filter(|&&s| s <= RANK_TOLERANCE * largest)
            .count();
    if largest <= 0.0 || nullity > 1 {
        return Err(GeometryError::Degenerate);
    }

    let last = vt.nrows() - 1;
    let coeffs = [
        vt[(last, 0)],
        vt[(last, 1)],
        vt[(last, 2)],
        vt[(last, 3)],
        vt[(last, 4)],
        vt[(last, 5)],
    ];
    let fitted = conic_to_ellipse(&coeffs)?;

    let ellipse = Ellipse {
        center: [
            fitted.center[0] / scale + mean_x,
            fitted.center[1] / scale + mean_y,
        ],
        axes: [fitted.axes[0] / scale, fitted.axes[1] / scale],
        angle: fitted.angle,
    };
    if !(ellipse.axes[0] > 0.0 && ellipse.axes[1] > 0.0) {
        return Err(GeometryError::ZeroAxis);
    }
    Ok(ellipse)
}
