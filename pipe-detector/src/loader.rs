use std::path::Path;

use image::DynamicImage;

use crate::error::LoadError;

/// Decode an image file, colour or grey.
///
/// A missing path is reported separately from an undecodable one.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage, LoadError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(LoadError::Missing(path.to_path_buf()));
    }
    image::open(path).map_err(|source| LoadError::Decode {
        path: path.to_path_buf(),
        source,
    })
}
