//! # Hasher Module
//!
//! Computes perceptual fingerprints for images.
//!
//! ## How It Works
//! 1. Decode the image and expand sRGB to linear light
//! 2. For every cell of a `size/downsample` grid, average BT.601 luma over a
//!    smoothly weighted neighborhood around the cell center
//! 3. Compress the average back to sRGB and quantize to one byte
//! 4. Compare fingerprints with the sum of absolute sample differences
//!
//! A coarse, smoothly weighted average survives resizing and mild
//! recompression, so a reposted copy lands a small distance away from the
//! original.
//!
//! ## Example
//! ```rust,ignore
//! use image_curator::core::hasher::{FingerprintParams, PerceptualHasher};
//!
//! let hasher = PerceptualHasher::new(FingerprintParams::new(8, 1)?);
//! let fingerprint = hasher.hash_file(&path)?;
//! ```

mod content;
mod fingerprint;
mod grid;
mod linear;

pub use content::ContentHash;
pub use fingerprint::Fingerprint;
pub use linear::{linear_to_srgb, srgb_to_linear, LinearImage};

use crate::error::FingerprintError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Grid parameters shared by every fingerprint in a corpus.
///
/// Fingerprints are only comparable when produced with identical parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FingerprintParams {
    size: u32,
    downsample: u32,
}

impl FingerprintParams {
    /// The corpus-wide default: an 8x8 grid, 64 samples.
    pub const DEFAULT: FingerprintParams = FingerprintParams {
        size: 8,
        downsample: 1,
    };

    /// Validate and build grid parameters.
    ///
    /// `size` must be evenly divisible by `downsample`, and both must be non-zero.
    pub fn new(size: u32, downsample: u32) -> Result<Self, FingerprintError> {
        if size == 0 || downsample == 0 || size % downsample != 0 {
            return Err(FingerprintError::InvalidParameters { size, downsample });
        }
        Ok(Self { size, downsample })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn downsample(&self) -> u32 {
        self.downsample
    }

    /// Cells per side of the output grid
    pub fn side(&self) -> u32 {
        self.size / self.downsample
    }

    /// Number of samples in a fingerprint built with these parameters
    pub fn sample_count(&self) -> usize {
        (self.side() * self.side()) as usize
    }
}

impl Default for FingerprintParams {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Builds fingerprints with a fixed set of grid parameters
#[derive(Debug, Clone, Copy)]
pub struct PerceptualHasher {
    params: FingerprintParams,
}

impl PerceptualHasher {
    pub fn new(params: FingerprintParams) -> Self {
        Self { params }
    }

    /// Build a hasher straight from raw grid parameters
    pub fn with_params(size: u32, downsample: u32) -> Result<Self, FingerprintError> {
        Ok(Self::new(FingerprintParams::new(size, downsample)?))
    }

    pub fn params(&self) -> FingerprintParams {
        self.params
    }

    /// Fingerprint already-decoded linear-light pixels
    pub fn hash_image(&self, image: &LinearImage) -> Fingerprint {
        grid::sample(image, self.params)
    }

    /// Decode in-memory file contents, then fingerprint them.
    ///
    /// `path` is only used for error context.
    pub fn hash_bytes(&self, path: &Path, bytes: &[u8]) -> Result<Fingerprint, FingerprintError> {
        let image = LinearImage::decode(path, bytes)?;
        Ok(self.hash_image(&image))
    }

    /// Read, decode and fingerprint an image file
    pub fn hash_file(&self, path: &Path) -> Result<Fingerprint, FingerprintError> {
        let image = LinearImage::open(path)?;
        Ok(self.hash_image(&image))
    }
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::new(FingerprintParams::DEFAULT)
    }
}
