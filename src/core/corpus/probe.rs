//! Lazy lookup of image dimensions and byte size.
//!
//! Only candidate pairs are probed, so the full decode stays off the scan
//! path while still rejecting files whose pixels went bad after they were
//! fingerprinted.

use image::ImageReader;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Attributes of an image that are only resolved when a pair is considered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    /// File size in bytes
    pub size: u64,
}

/// Resolves image attributes on demand.
///
/// Implement this trait to feed synthetic dimensions to the matcher in tests.
pub trait ImageProbe: Send + Sync {
    /// Dimensions and byte size, or `None` if the image cannot be read
    fn probe(&self, path: &Path) -> Option<ImageInfo>;

    /// Whether the image is still present in the corpus
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// Decodes the whole image; a readable header alone is not enough
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodingProbe;

impl ImageProbe for DecodingProbe {
    fn probe(&self, path: &Path) -> Option<ImageInfo> {
        let size = fs::metadata(path).ok()?.len();

        let dimensions = ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| e.to_string())
            .and_then(|reader| reader.decode().map_err(|e| e.to_string()))
            .map(|image| (image.width(), image.height()));

        match dimensions {
            Ok((width, height)) if width > 0 && height > 0 => Some(ImageInfo {
                width,
                height,
                size,
            }),
            Ok(_) => None,
            Err(reason) => {
                debug!(path = %path.display(), %reason, "image no longer decodes");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    #[test]
    fn probe_reads_dimensions_and_size() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("wide.png");
        RgbImage::from_pixel(30, 20, Rgb([10, 20, 30])).save(&path).unwrap();

        let info = DecodingProbe.probe(&path).unwrap();

        assert_eq!((info.width, info.height), (30, 20));
        assert_eq!(info.size, fs::metadata(&path).unwrap().len());
    }

    #[test]
    fn probe_rejects_non_images() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fake.png");
        fs::write(&path, b"definitely not a png").unwrap();

        assert!(DecodingProbe.probe(&path).is_none());
    }

    #[test]
    fn probe_rejects_truncated_pixels_behind_a_valid_header() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cut.png");
        RgbImage::from_fn(64, 64, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, 7]))
            .save(&path)
            .unwrap();
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

        assert!(image::image_dimensions(&path).is_ok());
        assert!(DecodingProbe.probe(&path).is_none());
    }

    #[test]
    fn probe_missing_file_is_none() {
        assert!(DecodingProbe.probe(Path::new("/nonexistent/a.png")).is_none());
        assert!(!DecodingProbe.exists(Path::new("/nonexistent/a.png")));
    }
}
