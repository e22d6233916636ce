//! The fingerprint value and its distance function.

use crate::error::FingerprintError;
use base64::{engine::general_purpose::STANDARD, Engine};
use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

/// An ordered grid of 8-bit sRGB luma samples, row-major.
///
/// Lower distance means more similar images.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    samples: Vec<u8>,
}

impl Fingerprint {
    pub fn new(samples: Vec<u8>) -> Self {
        Self { samples }
    }

    /// Raw samples, row-major
    pub fn as_bytes(&self) -> &[u8] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sum of per-sample absolute differences.
    ///
    /// Fails when the fingerprints were built with different grid parameters.
    pub fn distance(&self, other: &Fingerprint) -> Result<u32, FingerprintError> {
        if self.samples.len() != other.samples.len() {
            return Err(FingerprintError::LengthMismatch {
                left: self.samples.len(),
                right: other.samples.len(),
            });
        }

        Ok(self
            .samples
            .iter()
            .zip(other.samples.iter())
            .map(|(a, b)| u32::from(a.abs_diff(*b)))
            .sum())
    }

    /// Hexadecimal rendering, two characters per sample
    pub fn to_hex(&self) -> String {
        self.samples.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Encoding used by the persisted fingerprint log
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.samples)
    }

    pub fn from_base64(encoded: &str) -> Result<Self, FingerprintError> {
        STANDARD
            .decode(encoded.trim())
            .map(Self::new)
            .map_err(|e| FingerprintError::Encoding(e.to_string()))
    }

    /// Render the samples as a square grayscale image, one pixel per sample.
    ///
    /// Returns `None` when the sample count is not a perfect square.
    pub fn to_grid_image(&self) -> Option<GrayImage> {
        let side = (self.samples.len() as f64).sqrt().round() as u32;
        if side == 0 || (side * side) as usize != self.samples.len() {
            return None;
        }

        Some(GrayImage::from_fn(side, side, |x, y| {
            Luma([self.samples[(y * side + x) as usize]])
        }))
    }
}

impl From<Vec<u8>> for Fingerprint {
    fn from(samples: Vec<u8>) -> Self {
        Self::new(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_self_is_zero() {
        let fp = Fingerprint::new(vec![0, 17, 128, 255]);
        assert_eq!(fp.distance(&fp).unwrap(), 0);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Fingerprint::new(vec![10, 200, 30]);
        let b = Fingerprint::new(vec![12, 190, 35]);
        assert_eq!(a.distance(&b).unwrap(), b.distance(&a).unwrap());
    }

    #[test]
    fn distance_sums_absolute_differences() {
        let a = Fingerprint::new(vec![0, 10, 20]);
        let b = Fingerprint::new(vec![3, 10, 15]);
        assert_eq!(a.distance(&b).unwrap(), 8);
    }

    #[test]
    fn distance_of_opposites_is_maximal() {
        let a = Fingerprint::new(vec![0; 64]);
        let b = Fingerprint::new(vec![255; 64]);
        assert_eq!(a.distance(&b).unwrap(), 64 * 255);
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let a = Fingerprint::new(vec![0; 64]);
        let b = Fingerprint::new(vec![0; 16]);
        assert!(matches!(
            a.distance(&b),
            Err(FingerprintError::LengthMismatch { left: 64, right: 16 })
        ));
    }

    #[test]
    fn base64_survives_a_round_trip() {
        let fp = Fingerprint::new((0..64).map(|i| (i * 4) as u8).collect());
        let decoded = Fingerprint::from_base64(&fp.to_base64()).unwrap();
        assert_eq!(decoded, fp);
    }

    #[test]
    fn garbage_base64_is_rejected() {
        assert!(Fingerprint::from_base64("not base64 at all!").is_err());
    }

    #[test]
    fn to_hex_produces_correct_string() {
        let fp = Fingerprint::new(vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(fp.to_hex(), "deadbeef");
    }

    #[test]
    fn grid_image_places_samples_row_major() {
        let fp = Fingerprint::new(vec![1, 2, 3, 4]);
        let grid = fp.to_grid_image().unwrap();
        assert_eq!(grid.dimensions(), (2, 2));
        assert_eq!(grid.get_pixel(1, 0)[0], 2);
        assert_eq!(grid.get_pixel(0, 1)[0], 3);
    }

    #[test]
    fn grid_image_needs_a_square() {
        assert!(Fingerprint::new(vec![1, 2, 3]).to_grid_image().is_none());
    }
}
