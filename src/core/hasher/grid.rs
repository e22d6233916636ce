//! Weighted-neighborhood grid sampling.
//!
//! Every output cell averages luma over the same square of offsets around
//! its center. An offset at squared distance `d²` is weighted by
//! `1 - (d²/max_dist)⁴`, so the rim of the neighborhood contributes least.
//! Offsets that fall outside the image are dropped from the average.

use super::fingerprint::Fingerprint;
use super::linear::{linear_to_srgb, LinearImage};
use super::FingerprintParams;

#[derive(Debug, Clone, Copy)]
struct Tap {
    dx: i64,
    dy: i64,
    weight: f64,
}

/// Offsets and weights shared by every cell of one image
fn kernel(width: u32, height: u32, size: u32) -> Vec<Tap> {
    let half_side = (width.max(height) / 2) as f64;
    let reach = half_side / size as f64;
    let max_dist = reach * reach + reach * reach;
    let bound = reach as i64;

    let span = (2 * bound + 1) as usize;
    let mut taps = Vec::with_capacity(span * span);

    for dx in -bound..=bound {
        for dy in -bound..=bound {
            let squared = (dx * dx + dy * dy) as f64;
            // Images smaller than the grid collapse to a single tap.
            let weight = if max_dist > 0.0 {
                let k = (squared / max_dist).clamp(0.0, 1.0);
                1.0 - k * k * k * k
            } else {
                1.0
            };
            taps.push(Tap { dx, dy, weight });
        }
    }

    taps
}

/// Center of a cell along one axis, in source pixels
fn cell_center(extent: u32, size: u32, index: u32, downsample: u32) -> i64 {
    let extent = extent as f64;
    let size = size as f64;
    let cell = extent / size;
    let stride = (extent - cell) / size;
    (stride * (index * downsample) as f64 + cell / 2.0).round() as i64
}

pub(super) fn sample(image: &LinearImage, params: FingerprintParams) -> Fingerprint {
    let width = image.width();
    let height = image.height();
    let size = params.size();
    let downsample = params.downsample();
    let side = params.side();

    let taps = kernel(width, height, size);
    let mut samples = vec![0u8; params.sample_count()];

    for cell_x in 0..side {
        for cell_y in 0..side {
            let center_x = cell_center(width, size, cell_x, downsample);
            let center_y = cell_center(height, size, cell_y, downsample);

            let mut count = 0usize;
            let mut sum = 0.0f64;

            for tap in &taps {
                let x = center_x + tap.dx;
                let y = center_y + tap.dy;
                if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
                    continue;
                }
                count += 1;
                sum += (image.luma(x as u32, y as u32) * tap.weight).clamp(0.0, 1.0);
            }

            let average = if count == 0 { 0.0 } else { sum / count as f64 };
            let encoded = linear_to_srgb(average);
            samples[(cell_y * side + cell_x) as usize] =
                (encoded * 255.0).round().clamp(0.0, 255.0) as u8;
        }
    }

    Fingerprint::new(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{imageops, DynamicImage, Rgb, RgbImage};

    fn solid(value: u8) -> LinearImage {
        LinearImage::from_image(&DynamicImage::ImageRgb8(RgbImage::from_pixel(
            64,
            48,
            Rgb([value, value, value]),
        )))
    }

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let v = (x * 255 / (width - 1)) as u8;
            let w = (y * 255 / (height - 1)) as u8;
            Rgb([v, w / 2 + v / 2, 255 - v])
        })
    }

    #[test]
    fn produces_one_sample_per_cell() {
        let image = solid(100);
        for (size, downsample) in [(8, 1), (8, 2), (8, 4), (6, 3), (16, 2)] {
            let params = FingerprintParams::new(size, downsample).unwrap();
            let fp = sample(&image, params);
            assert_eq!(fp.len(), params.sample_count());
        }
    }

    #[test]
    fn hashing_is_deterministic() {
        let image = LinearImage::from_image(&DynamicImage::ImageRgb8(gradient(120, 90)));
        let a = sample(&image, FingerprintParams::DEFAULT);
        let b = sample(&image, FingerprintParams::DEFAULT);
        assert_eq!(a, b);
    }

    #[test]
    fn black_image_is_all_zero() {
        let fp = sample(&solid(0), FingerprintParams::DEFAULT);
        assert!(fp.as_bytes().iter().all(|&s| s == 0));
    }

    #[test]
    fn brighter_image_never_samples_darker() {
        let dark = sample(&solid(60), FingerprintParams::DEFAULT);
        let bright = sample(&solid(200), FingerprintParams::DEFAULT);
        for (d, b) in dark.as_bytes().iter().zip(bright.as_bytes()) {
            assert!(d <= b);
        }
        assert!(bright.distance(&dark).unwrap() > 0);
    }

    #[test]
    fn resized_copy_stays_close_while_mirror_does_not() {
        let original = gradient(200, 150);
        let resized = imageops::resize(&original, 100, 75, imageops::FilterType::Triangle);
        let mirrored = imageops::flip_horizontal(&original);

        let fp = |img: RgbImage| {
            sample(
                &LinearImage::from_image(&DynamicImage::ImageRgb8(img)),
                FingerprintParams::DEFAULT,
            )
        };

        let base = fp(original);
        let near = base.distance(&fp(resized)).unwrap();
        let far = base.distance(&fp(mirrored)).unwrap();

        assert!(near < 200, "resized copy drifted by {}", near);
        assert!(far > near);
    }

    #[test]
    fn tiny_image_still_hashes() {
        let image = LinearImage::from_rgb_samples(1, 1, vec![0.5, 0.5, 0.5]).unwrap();
        let fp = sample(&image, FingerprintParams::DEFAULT);
        assert_eq!(fp.len(), 64);
        assert!(fp.as_bytes().iter().any(|&s| s > 0));
    }

    #[test]
    fn kernel_weights_fall_off_towards_the_rim() {
        let taps = kernel(160, 160, 8);
        let center = taps.iter().find(|t| t.dx == 0 && t.dy == 0).unwrap();
        let corner = taps.iter().max_by_key(|t| t.dx * t.dx + t.dy * t.dy).unwrap();
        assert_eq!(center.weight, 1.0);
        assert!(corner.weight < center.weight);
        assert!(taps.iter().all(|t| (0.0..=1.0).contains(&t.weight)));
    }
}
