use std::path::Path;

use image::imageops::{self, FilterType};
use image::{GrayImage, ImageFormat};
use log::debug;

use crate::core::MvfError;
use crate::mrc::{self, Raster};

use super::MrcPngOptions;

/// Gray level used when the data has no usable range.
const MIDPOINT: u8 = 128;

/// Maps raster intensities to 8-bit gray.
///
/// With `sigma = Some(k)` (k > 0) intensities are clipped to
/// `[mean - k·σ, mean + k·σ]`, otherwise to `[min, max]`, then scaled
/// linearly onto `[0, 255]`. A zero-width window maps every pixel to 128.
pub fn contrast_stretch(raster: &Raster, sigma: Option<f32>) -> Result<GrayImage, MvfError> {
    let (lo, hi) = match sigma.filter(|k| *k > 0.0) {
        Some(k) => {
            let (mean, std) = mean_std(&raster.pixels);
            (mean - f64::from(k) * std, mean + f64::from(k) * std)
        }
        None => min_max(&raster.pixels),
    };

    let pixels: Vec<u8> = if hi > lo && lo.is_finite() && hi.is_finite() {
        let scale = 255.0 / (hi - lo);
        raster
            .pixels
            .iter()
            .map(|&v| ((f64::from(v) - lo) * scale).clamp(0.0, 255.0).round() as u8)
            .collect()
    } else {
        vec![MIDPOINT; raster.pixels.len()]
    };

    GrayImage::from_raw(raster.width, raster.height, pixels).ok_or_else(|| {
        MvfError::ImageError(format!(
            "pixel buffer does not match {}x{}",
            raster.width, raster.height
        ))
    })
}

/// Height after scaling `width x height` to `target_width`, keeping the
/// aspect ratio.
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    let scaled = (f64::from(height) * f64::from(target_width) / f64::from(width)).round();
    (scaled as u32).max(1)
}

/// Resizes to `target_width` keeping the aspect ratio; 0 keeps the size.
pub fn resize_to_width(image: GrayImage, target_width: u32) -> GrayImage {
    let (width, height) = image.dimensions();
    if target_width == 0 || target_width == width || width == 0 {
        return image;
    }
    let target_height = scaled_height(width, height, target_width);
    imageops::resize(&image, target_width, target_height, FilterType::Triangle)
}

/// Renders the first section of an MRC file as a PNG.
pub fn mrc_to_png(input: &Path, output: &Path, options: &MrcPngOptions) -> Result<(), MvfError> {
    let raster = mrc::read(input)?;
    let image = contrast_stretch(&raster, options.sigma_contrast)?;
    let image = resize_to_width(image, options.target_width);
    image
        .save_with_format(output, ImageFormat::Png)
        .map_err(|e| MvfError::ImageError(format!("writing {}: {}", output.display(), e)))?;
    debug!(
        "wrote {} ({}x{})",
        output.display(),
        image.width(),
        image.height()
    );
    Ok(())
}

fn mean_std(pixels: &[f32]) -> (f64, f64) {
    if pixels.is_empty() {
        return (0.0, 0.0);
    }
    let n = pixels.len() as f64;
    let mean = pixels.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
    let var = pixels
        .iter()
        .map(|&v| (f64::from(v) - mean).powi(2))
        .sum::<f64>()
        / n;
    (mean, var.sqrt())
}

fn min_max(pixels: &[f32]) -> (f64, f64) {
    pixels.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
        let v = f64::from(v);
        (lo.min(v), hi.max(v))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ramp(width: u32, height: u32) -> Raster {
        let pixels = (0..width * height).map(|i| i as f32).collect();
        Raster::new(width, height, pixels).unwrap()
    }

    #[test]
    fn test_uniform_image_maps_to_midpoint() {
        let raster = Raster::new(4, 4, vec![3.5; 16]).unwrap();
        for sigma in [Some(2.0), None] {
            let image = contrast_stretch(&raster, sigma).unwrap();
            assert!(image.pixels().all(|p| p.0[0] == MIDPOINT));
        }
    }

    #[test]
    fn test_sigma_stretch_clips_outliers() {
        let mut pixels = vec![0.0f32; 100];
        pixels[0] = 1.0e6;
        pixels[1] = -1.0e6;
        let raster = Raster::new(10, 10, pixels).unwrap();

        let image = contrast_stretch(&raster, Some(0.5)).unwrap();
        assert_eq!(image.get_pixel(0, 0).0[0], 255);
        assert_eq!(image.get_pixel(1, 0).0[0], 0);
        assert!((127..=128).contains(&image.get_pixel(5, 5).0[0]));
    }

    #[test]
    fn test_min_max_spans_full_range() {
        let image = contrast_stretch(&ramp(8, 2), None).unwrap();
        assert_eq!(image.get_pixel(0, 0).0[0], 0);
        assert_eq!(image.get_pixel(7, 1).0[0], 255);
    }

    #[test]
    fn test_non_positive_sigma_disables_stretch() {
        let a = contrast_stretch(&ramp(8, 2), Some(0.0)).unwrap();
        let b = contrast_stretch(&ramp(8, 2), None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_scaled_height_keeps_aspect() {
        assert_eq!(scaled_height(200, 100, 50), 25);
        assert_eq!(scaled_height(3, 2, 4), 3);
        assert_eq!(scaled_height(1000, 1, 10), 1);
    }

    #[test]
    fn test_resize_to_width() {
        let image = GrayImage::new(200, 100);
        let resized = resize_to_width(image.clone(), 50);
        assert_eq!(resized.dimensions(), (50, 25));
        assert_eq!(resize_to_width(image, 0).dimensions(), (200, 100));
    }

    #[test]
    fn test_mrc_to_png() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.mrc");
        let output = dir.path().join("a.png");
        std::fs::write(&input, mrc::encode_f32(&ramp(40, 20))).unwrap();

        let options = MrcPngOptions {
            sigma_contrast: Some(2.0),
            target_width: 10,
        };
        mrc_to_png(&input, &output, &options).unwrap();

        let png = image::open(&output).unwrap();
        assert_eq!((png.width(), png.height()), (10, 5));
    }

    #[test]
    fn test_mrc_to_png_missing_input() {
        let dir = TempDir::new().unwrap();
        let options = MrcPngOptions {
            sigma_contrast: None,
            target_width: 0,
        };
        let err = mrc_to_png(&dir.path().join("x.mrc"), &dir.path().join("x.png"), &options);
        assert!(err.is_err());
    }
}
