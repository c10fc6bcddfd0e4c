use std::collections::BTreeMap;

use crate::contours::Contour;
use crate::ellipse_fitting::{fit_ellipse, Ellipse};
use crate::error::GeometryError;
use crate::geometry::{circularity, hull, perimeter, polygon_area, GeometricMetrics};

/// Hull-based checks. Disabled in the loose profile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConvexityFilter {
    /// Minimum `area / hull_area`.
    pub min_solidity: f64,
    /// Minimum `perimeter / hull_perimeter`.
    pub min_perimeter_ratio: f64,
}

/// Thresholds of the admissibility chain, in evaluation order.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapeFilter {
    pub min_points: usize,
    pub min_area: f64,
    pub max_area: f64,
    pub min_circularity: f64,
    pub convexity: Option<ConvexityFilter>,
    pub max_axis_ratio: f64,
}

impl Default for ShapeFilter {
    fn default() -> Self {
        Self::strict()
    }
}

impl ShapeFilter {
    pub fn strict() -> Self {
        Self {
            min_points: 15,
            min_area: 800.0,
            max_area: 20000.0,
            min_circularity: 0.65,
            convexity: Some(ConvexityFilter {
                min_solidity: 0.82,
                min_perimeter_ratio: 0.90,
            }),
            max_axis_ratio: 2.0,
        }
    }

    pub fn loose() -> Self {
        Self {
            min_points: 5,
            min_area: 800.0,
            max_area: 20000.0,
            min_circularity: 0.6,
            convexity: None,
            max_axis_ratio: 7.5,
        }
    }
}

/// Predicate that rejected a contour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RejectionStage {
    PointCount,
    Area,
    Perimeter,
    Circularity,
    HullArea,
    Convexity,
    PerimeterRatio,
    EllipseFit,
    AxisRatio,
}

impl RejectionStage {
    pub const ALL: [RejectionStage; 9] = [
        RejectionStage::PointCount,
        RejectionStage::Area,
        RejectionStage::Perimeter,
        RejectionStage::Circularity,
        RejectionStage::HullArea,
        RejectionStage::Convexity,
        RejectionStage::PerimeterRatio,
        RejectionStage::EllipseFit,
        RejectionStage::AxisRatio,
    ];
}

/// Accepted pipe cross-section.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub ellipse: Ellipse,
    /// Area of the source contour.
    pub area: f64,
    pub circularity: f64,
}

impl Detection {
    pub fn center(&self) -> [f64; 2] {
        self.ellipse.center
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Classification {
    Accepted(Detection),
    Rejected {
        stage: RejectionStage,
        metrics: GeometricMetrics,
        /// Set when a geometry guard, not a threshold, caused the rejection.
        cause: Option<GeometryError>,
    },
}

impl Classification {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Classification::Accepted(_))
    }

    pub fn rejection_stage(&self) -> Option<RejectionStage> {
        match self {
            Classification::Accepted(_) => None,
            Classification::Rejected { stage, .. } => Some(*stage),
        }
    }
}

struct Rejection {
    stage: RejectionStage,
    cause: Option<GeometryError>,
}

#[inline]
fn ensure(condition: bool, stage: RejectionStage) -> Result<(), Rejection> {
    if condition {
        Ok(())
    } else {
        Err(Rejection { stage, cause: None })
    }
}

fn run_predicates(
    contour: &Contour,
    filter: &ShapeFilter,
    metrics: &mut GeometricMetrics,
) -> Result<Detection, Rejection> {
    let points = &contour.points;
    metrics.n_points = points.len();
    ensure(points.len() >= filter.min_points, RejectionStage::PointCount)?;

    let area = polygon_area(points);
    metrics.area = Some(area);
    ensure(
        area >= filter.min_area && area <= filter.max_area,
        RejectionStage::Area,
    )?;

    let perim = perimeter(points);
    metrics.perimeter = Some(perim);
    ensure(perim > 0.0, RejectionStage::Perimeter)?;

    let circ = circularity(area, perim).ok_or(Rejection {
        stage: RejectionStage::Perimeter,
        cause: None,
    })?;
    metrics.circularity = Some(circ);
    ensure(circ >= filter.min_circularity, RejectionStage::Circularity)?;

    if let Some(convexity) = &filter.convexity {
        let hull_pts = hull(points);
        let hull_area = polygon_area(&hull_pts);
        metrics.hull_area = Some(hull_area);
        ensure(hull_area > 0.0, RejectionStage::HullArea)?;
        ensure(
            area / hull_area >= convexity.min_solidity,
            RejectionStage::Convexity,
        )?;

        let hull_perim = perimeter(&hull_pts);
        metrics.hull_perimeter = Some(hull_perim);
        ensure(
            hull_perim > 0.0 && perim / hull_perim >= convexity.min_perimeter_ratio,
            RejectionStage::PerimeterRatio,
        )?;
    }

    let ellipse = fit_ellipse(&contour.to_f64()).map_err(|e| Rejection {
        stage: RejectionStage::EllipseFit,
        cause: Some(e),
    })?;
    metrics.ellipse = Some(ellipse);
    if ellipse.minor_axis() <= 0.0 {
        return Err(Rejection {
            stage: RejectionStage::EllipseFit,
            cause: Some(GeometryError::ZeroAxis),
        });
    }
    ensure(
        ellipse.axis_ratio() <= filter.max_axis_ratio,
        RejectionStage::AxisRatio,
    )?;

    Ok(Detection {
        ellipse,
        area,
        circularity: circ,
    })
}

/// Run the admissibility chain on one contour. The first failing predicate
/// decides the outcome; later metrics stay unset.
pub fn classify_contour(contour: &Contour, filter: &ShapeFilter) -> Classification {
    let mut metrics = GeometricMetrics::default();
    match run_predicates(contour, filter, &mut metrics) {
        Ok(detection) => Classification::Accepted(detection),
        Err(Rejection { stage, cause }) => Classification::Rejected {
            stage,
            metrics,
            cause,
        },
    }
}

/// Number of contours dropped at each stage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RejectionCounts(BTreeMap<RejectionStage, usize>);

impl RejectionCounts {
    pub fn record(&mut self, stage: RejectionStage) {
        *self.0.entry(stage).or_insert(0) += 1;
    }

    pub fn get(&self, stage: RejectionStage) -> usize {
        self.0.get(&stage).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RejectionStage, usize)> + '_ {
        self.0.iter().map(|(s, n)| (*s, *n))
    }
}

/// Classify every contour, keeping accepted detections in contour order.
pub fn classify_contours(
    contours: &[Contour],
    filter: &ShapeFilter,
) -> (Vec<Detection>, RejectionCounts) {
    let mut rejections = RejectionCounts::default();
    let detections = contours
        .iter()
        .filter_map(|contour| match classify_contour(contour, filter) {
            Classification::Accepted(detection) => Some(detection),
            Classification::Rejected { stage, .. } => {
                rejections.record(stage);
                None
            }
        })
        .collect();
    (detections, rejections)
}
