use image::{DynamicImage, RgbImage};
use image_overlay::overlay::{
    draw_center_marker_mut, draw_rotated_ellipse_mut, save_overlay, MARKER_COLOR, OUTLINE_COLOR,
};

use crate::classifier::{Detection, RejectionCounts};
use crate::pipe_detector::PipeDetection;

const OUTLINE_THICKNESS: u32 = 2;
const MARKER_RADIUS: i32 = 4;

/// Draw every detection on an RGB copy of `original`.
pub fn annotate(original: &DynamicImage, detections: &[Detection]) -> RgbImage {
    let mut canvas = original.to_rgb8();
    for detection in detections {
        let ellipse = &detection.ellipse;
        let center = (ellipse.center[0] as f32, ellipse.center[1] as f32);
        draw_rotated_ellipse_mut(
            &mut canvas,
            center,
            (ellipse.axes[0] as f32, ellipse.axes[1] as f32),
            ellipse.angle as f32,
            OUTLINE_THICKNESS,
            OUTLINE_COLOR,
        );
        draw_center_marker_mut(&mut canvas, center, MARKER_RADIUS, MARKER_COLOR);
    }
    canvas
}

/// Result of one run: the accepted detections, why the rest were dropped,
/// and the annotated overlay.
#[derive(Clone, Debug)]
pub struct PipeReport {
    detection: PipeDetection,
    annotated: RgbImage,
}

impl PipeReport {
    pub fn new(original: &DynamicImage, detection: PipeDetection) -> Self {
        let annotated = annotate(original, &detection.detections);
        Self {
            detection,
            annotated,
        }
    }

    pub fn count(&self) -> usize {
        self.detection.detections.len()
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detection.detections
    }

    pub fn rejections(&self) -> &RejectionCounts {
        &self.detection.rejections
    }

    pub fn n_contours(&self) -> usize {
        self.detection.n_contours
    }

    pub fn annotated(&self) -> &RgbImage {
        &self.annotated
    }

    /// Write the overlay to `output_path`, or to a temporary png when `None`.
    pub fn save_annotated(&self, output_path: Option<String>) -> Result<String, String> {
        save_overlay(&self.annotated, output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::{annotate, PipeReport};
    use crate::classifier::{Detection, RejectionCounts, RejectionStage};
    use crate::ellipse_fitting::Ellipse;
    use crate::pipe_detector::PipeDetection;
    use image::{DynamicImage, GrayImage, Luma, Rgb};
    use image_overlay::overlay::{MARKER_COLOR, OUTLINE_COLOR};

    fn detection(x: f64, y: f64, w: f64, h: f64) -> Detection {
        Detection {
            ellipse: Ellipse {
                center: [x, y],
                axes: [w, h],
                angle: 0.0,
            },
            area: std::f64::consts::PI * w * h / 4.0,
            circularity: 0.9,
        }
    }

    #[test]
    fn test_annotate_grey_input() {
        let original = DynamicImage::ImageLuma8(GrayImage::from_pixel(100, 80, Luma([128])));
        let annotated = annotate(&original, &[detection(50.0, 40.0, 40.0, 40.0)]);

        assert_eq!(annotated.dimensions(), (100, 80));
        assert_eq!(*annotated.get_pixel(50, 40), MARKER_COLOR);
        // outline crosses the horizontal axis at x = 50 +- 20
        assert!((68..=72).any(|x| *annotated.get_pixel(x, 40) == OUTLINE_COLOR));
        assert!((28..=32).any(|x| *annotated.get_pixel(x, 40) == OUTLINE_COLOR));
        // untouched background keeps its grey value on every channel
        assert_eq!(*annotated.get_pixel(2, 2), Rgb([128, 128, 128]));
        // the source is never modified
        assert_eq!(original.to_luma8().get_pixel(50, 40)[0], 128);
    }

    #[test]
    fn test_annotate_no_detections() {
        let original = DynamicImage::ImageLuma8(GrayImage::from_pixel(30, 20, Luma([7])));
        assert_eq!(annotate(&original, &[]), original.to_rgb8());
    }

    #[test]
    fn test_report_accessors() {
        let mut rejections = RejectionCounts::default();
        rejections.record(RejectionStage::Area);
        rejections.record(RejectionStage::Area);
        rejections.record(RejectionStage::AxisRatio);
        let detections = vec![
            detection(20.0, 20.0, 16.0, 16.0),
            detection(60.0, 30.0, 20.0, 12.0),
        ];
        let original = DynamicImage::ImageLuma8(GrayImage::from_pixel(90, 50, Luma([200])));
        let report = PipeReport::new(
            &original,
            PipeDetection {
                detections: detections.clone(),
                rejections,
                n_contours: 5,
            },
        );

        assert_eq!(report.count(), 2);
        assert_eq!(report.detections(), detections.as_slice());
        assert_eq!(report.rejections().get(RejectionStage::Area), 2);
        assert_eq!(report.rejections().total(), 3);
        assert_eq!(report.n_contours(), 5);
        assert_eq!(*report.annotated().get_pixel(60, 30), MARKER_COLOR);
    }

    #[test]
    fn test_save_annotated() {
        let original = DynamicImage::ImageLuma8(GrayImage::from_pixel(40, 40, Luma([90])));
        let detection_result = PipeDetection {
            detections: vec![detection(20.0, 20.0, 20.0, 20.0)],
            rejections: RejectionCounts::default(),
            n_contours: 1,
        };
        let report = PipeReport::new(&original, detection_result);

        let path = report.save_annotated(None).unwrap();
        let reread = image::open(&path).unwrap().to_rgb8();
        assert_eq!(&reread, report.annotated());
        let _ = std::fs::remove_file(path);
    }
}
