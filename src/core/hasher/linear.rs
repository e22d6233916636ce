//! Linear-light RGB buffers and the sRGB transfer functions.
//!
//! Fingerprints average light, so decoded sRGB samples are expanded to
//! linear intensity on read and compressed back on write.

use crate::error::FingerprintError;
use image::{DynamicImage, ImageReader, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;
use std::sync::OnceLock;

/// sRGB-encoded value in [0, 1] to linear intensity
pub fn srgb_to_linear(value: f32) -> f32 {
    if value <= 0.04045 {
        value / 12.92
    } else {
        ((value + 0.055) / 1.055).powf(2.4)
    }
}

/// Linear intensity to sRGB-encoded value, both nominally in [0, 1]
pub fn linear_to_srgb(value: f64) -> f64 {
    if value <= 0.0031308 {
        value * 12.92
    } else {
        1.055 * value.powf(1.0 / 2.4) - 0.055
    }
}

fn expansion_table() -> &'static [f32; 256] {
    static TABLE: OnceLock<[f32; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0.0f32; 256];
        for (i, slot) in table.iter_mut().enumerate() {
            *slot = srgb_to_linear(i as f32 / 255.0);
        }
        table
    })
}

/// Decoded pixels as interleaved linear RGB, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct LinearImage {
    width: u32,
    height: u32,
    samples: Vec<f32>,
}

impl LinearImage {
    /// Wrap already-linear interleaved RGB samples.
    ///
    /// `samples` must hold exactly `width * height * 3` values.
    pub fn from_rgb_samples(
        width: u32,
        height: u32,
        samples: Vec<f32>,
    ) -> Result<Self, FingerprintError> {
        let expected = width as usize * height as usize * 3;
        if samples.len() != expected {
            return Err(FingerprintError::LengthMismatch {
                left: samples.len(),
                right: expected,
            });
        }
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    /// Expand any decoded image to linear RGB
    pub fn from_image(image: &DynamicImage) -> Self {
        let rgb = image.to_rgb8();
        let table = expansion_table();
        let samples = rgb.as_raw().iter().map(|&v| table[v as usize]).collect();

        Self {
            width: rgb.width(),
            height: rgb.height(),
            samples,
        }
    }

    /// Decode encoded file contents. `path` is only used for error context.
    pub fn decode(path: &Path, bytes: &[u8]) -> Result<Self, FingerprintError> {
        let image = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| FingerprintError::Io {
                path: path.to_path_buf(),
                source: e,
            })?
            .decode()
            .map_err(|e| FingerprintError::Decode {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        Self::checked(path, &image)
    }

    /// Read and decode an image file
    pub fn open(path: &Path) -> Result<Self, FingerprintError> {
        let bytes = std::fs::read(path).map_err(|e| FingerprintError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::decode(path, &bytes)
    }

    fn checked(path: &Path, image: &DynamicImage) -> Result<Self, FingerprintError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(FingerprintError::EmptyImage {
                path: path.to_path_buf(),
            });
        }
        Ok(Self::from_image(image))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// BT.601 luma of one pixel, computed in linear light
    pub fn luma(&self, x: u32, y: u32) -> f64 {
        let offset = (y as usize * self.width as usize + x as usize) * 3;
        let r = self.samples[offset] as f64;
        let g = self.samples[offset + 1] as f64;
        let b = self.samples[offset + 2] as f64;
        r * 0.299 + g * 0.587 + b * 0.114
    }

    /// Compress back to 8-bit sRGB
    pub fn to_rgb8(&self) -> RgbImage {
        let quantize = |v: f32| (linear_to_srgb(v as f64) * 255.0).round().clamp(0.0, 255.0) as u8;

        RgbImage::from_fn(self.width, self.height, |x, y| {
            let offset = (y as usize * self.width as usize + x as usize) * 3;
            Rgb([
                quantize(self.samples[offset]),
                quantize(self.samples[offset + 1]),
                quantize(self.samples[offset + 2]),
            ])
        })
    }

    /// Write as an sRGB image; the format follows the file extension
    pub fn save(&self, path: &Path) -> Result<(), FingerprintError> {
        self.to_rgb8()
            .save(path)
            .map_err(|e| FingerprintError::Encode {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }
}
