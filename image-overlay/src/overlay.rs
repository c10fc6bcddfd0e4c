use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use rand::Rng;

/// Outline colour used for accepted ellipses.
pub const OUTLINE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
/// Fill colour used for centre markers.
pub const MARKER_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

// One polyline vertex per degree of arc.
const ELLIPSE_SEGMENTS: usize = 360;

fn create_temporary_png_file_path() -> Result<String, String> {
    let temporary_output_dir = std::env::temp_dir();
    let mut temporary_file_name: String = rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(10)
        .map(char::from)
        .collect();
    temporary_file_name.push_str(".png");
    let temporary_path = temporary_output_dir.as_path().join(temporary_file_name);

    // Possibility that Windows utf-16 paths contain data that cannot be
    // re-encoded to utf-8:
    // https://github.com/rust-lang/rust/issues/12056
    let path_string = temporary_path
        .clone()
        .into_os_string()
        .into_string()
        .map_err(|_| {
            format!(
                "Failed to convert path to string {}",
                temporary_path.display()
            )
        })?;

    Ok(path_string)
}

/// Vertices of a rotated ellipse outline.
///
/// `axes` are full axis lengths, `axes.0` lying along `angle` (degrees,
/// image coordinates, y pointing down).
pub fn ellipse_polyline(center: (f32, f32), axes: (f32, f32), angle: f32) -> Vec<(f32, f32)> {
    let (semi_w, semi_h) = (axes.0 / 2.0, axes.1 / 2.0);
    let (sin_a, cos_a) = angle.to_radians().sin_cos();
    (0..ELLIPSE_SEGMENTS)
        .map(|i| {
            let t = 2.0 * std::f32::consts::PI * i as f32 / ELLIPSE_SEGMENTS as f32;
            let (u, v) = (semi_w * t.cos(), semi_h * t.sin());
            (
                center.0 + u * cos_a - v * sin_a,
                center.1 + u * sin_a + v * cos_a,
            )
        })
        .collect()
}

/// Draw a rotated ellipse outline in place.
///
/// Thickness is built from concentric outlines one pixel apart.
pub fn draw_rotated_ellipse_mut(
    image: &mut RgbImage,
    center: (f32, f32),
    axes: (f32, f32),
    angle: f32,
    thickness: u32,
    color: Rgb<u8>,
) {
    let thickness = thickness.max(1);
    let first_offset = -(thickness as f32 - 1.0) / 2.0;
    for k in 0..thickness {
        let offset = first_offset + k as f32;
        let ring_axes = (
            (axes.0 + 2.0 * offset).max(0.0),
            (axes.1 + 2.0 * offset).max(0.0),
        );
        let vertices = ellipse_polyline(center, ring_axes, angle);
        for (i, &start) in vertices.iter().enumerate() {
            let end = vertices[(i + 1) % vertices.len()];
            draw_line_segment_mut(image, start, end, color);
        }
    }
}

/// Draw a filled circular marker in place.
pub fn draw_center_marker_mut(
    image: &mut RgbImage,
    center: (f32, f32),
    radius: i32,
    color: Rgb<u8>,
) {
    draw_filled_circle_mut(image, (center.0 as i32, center.1 as i32), radius, color);
}

pub fn save_overlay(image: &RgbImage, optional_output_path: Option<String>) -> Result<String, String> {
    /* Writes an annotated image to disk and returns the path written.

       Args:
          image: the annotated image
          optional_output_path: A path to write the image to. If no value is provided
            it will be written to a temporary directory as provided by the OS's APIs.
            The format follows the path extension.
    */
    let output_path = match optional_output_path {
        Some(result) => result,
        None => create_temporary_png_file_path()?,
    };

    image.save(&output_path).map_err(|e| e.to_string())?;

    Ok(output_path)
}
