//! Dominant product color extraction.
//!
//! For each image: mask out the background, keep the non-black foreground
//! pixels, cluster them with k-means and report the centroids ordered by how
//! many pixels they won. The first entry is the dominant color.

pub(crate) mod kmeans;
pub(crate) mod mask;

pub use kmeans::{KMeans, KMeansFit};
pub use mask::{BackgroundRemover, U2NetRemover};

use std::path::Path;

use image::{GrayImage, RgbImage};

use crate::config::{ColorConfig, Config};
use crate::error::PipelineError;
use crate::types::{Palette, PaletteEntry};

use self::kmeans::Point;

/// Render an RGB triple as a lowercase `#rrggbb` string.
pub fn rgb_to_hex(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

/// Background remover plus clustering parameters.
pub struct ColorExtractor {
    remover: Box<dyn BackgroundRemover>,
    config: ColorConfig,
}

impl ColorExtractor {
    pub fn new(remover: Box<dyn BackgroundRemover>, config: ColorConfig) -> Self {
        Self { remover, config }
    }

    /// Load the U²-Net model named in the config.
    pub fn load(config: &Config) -> Result<Self, PipelineError> {
        let model_path = config.model_path(&config.models.background_remover);
        tracing::info!("Loading background remover from {:?}", model_path);
        let remover = U2NetRemover::load(&model_path, config.color.mask_size)?;
        Ok(Self::new(Box::new(remover), config.color.clone()))
    }

    /// Extract the color palette of one decoded image.
    pub fn palette(&self, image: &RgbImage, path: &Path) -> Result<Palette, PipelineError> {
        let start = std::time::Instant::now();
        let mask = self.remover.foreground_mask(image, path)?;
        if mask.dimensions() != image.dimensions() {
            return Err(PipelineError::Color {
                path: path.to_path_buf(),
                message: format!(
                    "Mask is {:?} but image is {:?}",
                    mask.dimensions(),
                    image.dimensions()
                ),
            });
        }

        let pixels = subsample(product_pixels(image, &mask), self.config.max_samples);
        if pixels.is_empty() {
            return Err(PipelineError::Color {
                path: path.to_path_buf(),
                message: "No valid product pixels found".to_string(),
            });
        }

        let kmeans = KMeans {
            clusters: self.config.cluster_count,
            n_init: self.config.n_init,
            max_iterations: self.config.max_iterations,
            tolerance: self.config.tolerance,
            seed: self.config.seed,
        };
        let fit = kmeans.fit(&pixels).map_err(|message| PipelineError::Color {
            path: path.to_path_buf(),
            message,
        })?;

        let palette = palette_from_fit(&fit, pixels.len());
        tracing::debug!(
            "Palette for {:?}: {} pixels, {} iterations, dominant {:?} in {:?}",
            path,
            pixels.len(),
            fit.iterations,
            palette.dominant().map(|e| e.hex.as_str()),
            start.elapsed()
        );
        Ok(palette)
    }
}

/// Foreground pixels composited against black, with pure black dropped.
///
/// Each channel is scaled by the mask opacity the same way an alpha
/// composite onto a transparent canvas would, so soft mask edges darken.
pub fn product_pixels(image: &RgbImage, mask: &GrayImage) -> Vec<Point> {
    image
        .pixels()
        .zip(mask.pixels())
        .filter(|(_, alpha)| alpha.0[0] > 0)
        .map(|(pixel, alpha)| {
            let a = alpha.0[0] as u32;
            pixel.0.map(|c| div255(c as u32 * a))
        })
        .filter(|rgb| rgb.iter().any(|&c| c != 0))
        .map(|rgb| rgb.map(f64::from))
        .collect()
}

/// Rounded division by 255.
fn div255(value: u32) -> u8 {
    let t = value + 128;
    (((t >> 8) + t) >> 8) as u8
}

/// Keep at most `max_samples` pixels using a fixed stride (0 keeps all).
fn subsample(pixels: Vec<Point>, max_samples: usize) -> Vec<Point> {
    if max_samples == 0 || pixels.len() <= max_samples {
        return pixels;
    }
    let stride = pixels.len().div_ceil(max_samples);
    pixels.into_iter().step_by(stride).collect()
}

/// Order centroids by descending pixel count; ties keep cluster order.
fn palette_from_fit(fit: &KMeansFit, pixel_count: usize) -> Palette {
    let mut order: Vec<usize> = (0..fit.centroids.len()).collect();
    order.sort_by_key(|&j| std::cmp::Reverse(fit.counts[j]));

    let entries = order
        .into_iter()
        .map(|j| {
            let rgb = fit.centroids[j].map(|c| (c.trunc() as i64).clamp(0, 255) as u8);
            PaletteEntry {
                hex: rgb_to_hex(rgb),
                rgb,
                frequency: fit.counts[j] as f32 / pixel_count.max(1) as f32,
            }
        })
        .collect();

    Palette {
        entries,
        pixel_count,
    }
}
