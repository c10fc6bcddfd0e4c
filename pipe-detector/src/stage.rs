use std::fmt;
use std::path::{Path, PathBuf};

use image::GrayImage;
use ndarray::Array2;
use ndarray_npy::write_npy;
use slog::{error, Logger};

use crate::utils::set_log_config;

/// Intermediate images handed to a [`StageObserver`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Output of the preprocessor.
    Preprocessed,
    /// Cleaned binary mask from the segmenter.
    Mask,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Preprocessed => "preprocessed",
            Stage::Mask => "mask",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Side channel called after each image-producing stage.
pub trait StageObserver {
    fn observe(&mut self, stage: Stage, image: &GrayImage);
}

impl<F> StageObserver for F
where
    F: FnMut(Stage, &GrayImage),
{
    fn observe(&mut self, stage: Stage, image: &GrayImage) {
        self(stage, image)
    }
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl StageObserver for NoopObserver {
    fn observe(&mut self, _stage: Stage, _image: &GrayImage) {}
}

/// Writes every stage to `<dir>/<stage>.npy` as a (rows, cols) u8 array.
pub struct NpyStageDump {
    dir: PathBuf,
    log: Logger,
}

impl NpyStageDump {
    pub fn new<P: AsRef<Path>>(dir: P) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
            log: set_log_config(),
        })
    }

    pub fn path_for(&self, stage: Stage) -> PathBuf {
        self.dir.join(format!("{}.npy", stage.name()))
    }
}

impl StageObserver for NpyStageDump {
    fn observe(&mut self, stage: Stage, image: &GrayImage) {
        let (width, height) = image.dimensions();
        let data = match Array2::from_shape_vec(
            (height as usize, width as usize),
            image.as_raw().clone(),
        ) {
            Ok(data) => data,
            Err(e) => {
                error!(self.log, "cannot shape {} stage: {}", stage, e);
                return;
            }
        };
        let path = self.path_for(stage);
        if let Err(e) = write_npy(&path, &data) {
            error!(self.log, "failed to write {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{NpyStageDump, Stage, StageObserver};
    use image::{GrayImage, Luma};
    use ndarray::Array2;
    use ndarray_npy::read_npy;

    #[test]
    fn test_closure_observer() {
        let mut seen = Vec::new();
        {
            let mut observer = |stage: Stage, image: &GrayImage| seen.push((stage, image.width()));
            observer.observe(Stage::Mask, &GrayImage::new(3, 2));
        }
        assert_eq!(seen, vec![(Stage::Mask, 3)]);
    }

    #[test]
    fn test_npy_dump() {
        let dir = std::env::temp_dir().join("pipe_detector_stage_dump");
        let mut dump = NpyStageDump::new(&dir).unwrap();
        let mut image = GrayImage::new(4, 3);
        image.put_pixel(3, 1, Luma([255]));
        dump.observe(Stage::Mask, &image);

        let data: Array2<u8> = read_npy(dump.path_for(Stage::Mask)).unwrap();
        assert_eq!(data.dim(), (3, 4));
        assert_eq!(data[(1, 3)], 255);
        let _ = std::fs::remove_dir_all(dir);
    }
}
