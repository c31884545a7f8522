//! Image preprocessing module
//!
//! Turns a photographed form into a black/white image that Tesseract reads
//! reliably:
//! - Grayscale conversion
//! - Noise removal (median or Gaussian blur)
//! - Binarization (global Otsu or local adaptive threshold)
//! - Optional inversion so ink becomes the foreground

use crate::config::{Blur, PreprocessConfig, Threshold};
use crate::error::PreprocessError;
use image::{DynamicImage, GrayImage, ImageError};
use imageproc::contrast::{adaptive_threshold, otsu_level, threshold, ThresholdType};
use imageproc::filter::{gaussian_blur_f32, median_filter};
use std::path::Path;
use tracing::debug;

/// Decode an image file from disk
pub fn decode_image(path: &Path) -> Result<DynamicImage, PreprocessError> {
    image::open(path).map_err(|err| match err {
        ImageError::IoError(source) => PreprocessError::Io {
            path: path.to_path_buf(),
            source,
        },
        source => PreprocessError::Decode {
            path: path.to_path_buf(),
            source,
        },
    })
}

/// Preprocess a decoded image for OCR
///
/// The result has the same dimensions as `input` and contains only the
/// values 0 and 255.
pub fn preprocess_image(input: &DynamicImage, config: &PreprocessConfig) -> GrayImage {
    let gray = input.to_luma8();

    let blurred = match config.blur {
        Blur::Median { radius } => median_filter(&gray, radius, radius),
        Blur::Gaussian { sigma } => gaussian_blur_f32(&gray, sigma),
        Blur::None => gray,
    };

    match config.threshold {
        Threshold::Otsu => {
            let level = otsu_level(&blurred);
            debug!(level, "Otsu threshold");
            let kind = if config.invert {
                ThresholdType::BinaryInverted
            } else {
                ThresholdType::Binary
            };
            threshold(&blurred, level, kind)
        }
        Threshold::Adaptive { block_radius } => {
            let mut binary = adaptive_threshold(&blurred, block_radius);
            if config.invert {
                image::imageops::invert(&mut binary);
            }
            binary
        }
    }
}

/// Decode and preprocess the image at `path`
pub fn load_and_preprocess(
    path: &Path,
    config: &PreprocessConfig,
) -> Result<GrayImage, PreprocessError> {
    let image = decode_image(path)?;
    debug!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "Decoded image"
    );
    Ok(preprocess_image(&image, config))
}
