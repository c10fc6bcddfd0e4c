use image::GrayImage;
use ndarray::Array2;
use ndarray_stats::QuantileExt;
use slog::o;
use slog::Drain;
use slog::FnValue;
use slog::Logger;

pub struct ImageUtil {}
impl ImageUtil {
    /// Grey image to a (rows, cols) array.
    pub fn to_array(image: &GrayImage) -> Array2<f32> {
        let (width, height) = image.dimensions();
        Array2::from_shape_fn((height as usize, width as usize), |(r, c)| {
            image.get_pixel(c as u32, r as u32)[0] as f32
        })
    }

    /// Convert back to an image, rounding and saturating to `[0, 255]`.
    pub fn to_gray_image(data: &Array2<f32>) -> GrayImage {
        let (height, width) = data.dim();
        GrayImage::from_fn(width as u32, height as u32, |x, y| {
            image::Luma([clamp(data[(y as usize, x as usize)].round(), 0.0, 255.0) as u8])
        })
    }

    /// Linearly rescale so the minimum maps to 0 and the maximum to 255.
    ///
    /// A flat input has no range to stretch and is returned unchanged.
    pub fn normalize_min_max(data: &Array2<f32>) -> Array2<f32> {
        let (min, max) = match (data.min(), data.max()) {
            (Ok(&min), Ok(&max)) => (min, max),
            _ => return data.clone(),
        };
        if max - min <= f32::EPSILON {
            return data.clone();
        }
        let scale = 255.0 / (max - min);
        data.mapv(|x| (x - min) * scale)
    }
}

pub fn clamp(input: f32, min: f32, max: f32) -> f32 {
    debug_assert!(min <= max, "min must be less than or equal to max");
    if input < min {
        min
    } else if input > max {
        max
    } else {
        input
    }
}

pub fn set_log_config() -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    Logger::root(
        drain,
        o!("place" =>
         FnValue(move |info| {
             format!("{}:{} {}",
                     info.file(),
                     info.line(),
                     info.module(),
                     )
         })
        ),
    )
}
