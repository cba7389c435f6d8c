//! Foreground masking with U²-Net (salient object detection).
//!
//! U²-Net expects:
//! - Input size: 320×320 pixels, Lanczos resize
//! - Normalization: divide by the image's max channel value, then ImageNet
//!   mean/std per channel
//! - Tensor layout: NCHW [batch, channels, height, width]
//!
//! The first output is a saliency map that is min-max scaled to 0..=255 and
//! resized back to the source dimensions.

use std::path::Path;
use std::sync::Mutex;

use image::imageops::FilterType;
use image::{GrayImage, Luma, RgbImage};
use ndarray::Array4;
use ort::session::Session;
use ort::value::Value;

use crate::error::PipelineError;
use crate::onnx;

/// ImageNet normalization mean (RGB).
const NORM_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet normalization std (RGB).
const NORM_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Separates the product from its background.
///
/// The returned mask has the same dimensions as `image`; a value of 0 means
/// background, anything else is the foreground opacity.
pub trait BackgroundRemover: Send + Sync {
    fn foreground_mask(&self, image: &RgbImage, path: &Path) -> Result<GrayImage, PipelineError>;
}

/// U²-Net background remover running via ONNX Runtime.
pub struct U2NetRemover {
    session: Mutex<Session>,
    input_name: String,
    input_size: u32,
}

impl U2NetRemover {
    /// Load U²-Net from an ONNX file.
    pub fn load(model_path: &Path, input_size: u32) -> Result<Self, PipelineError> {
        let session = onnx::load_session(model_path, "Background remover")?;
        let input_name = onnx::input_names(&session)
            .into_iter()
            .next()
            .unwrap_or_else(|| "input.1".to_string());

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            input_size,
        })
    }
}

impl BackgroundRemover for U2NetRemover {
    fn foreground_mask(&self, image: &RgbImage, path: &Path) -> Result<GrayImage, PipelineError> {
        let color_error = |message: String| PipelineError::Color {
            path: path.to_path_buf(),
            message,
        };

        let tensor = preprocess(image, self.input_size);
        let shape: Vec<i64> = tensor.shape().iter().map(|&d| d as i64).collect();
        let flat_data: Vec<f32> = tensor.iter().copied().collect();

        let input_value = Value::from_array((shape, flat_data))
            .map_err(|e| color_error(format!("Failed to create mask input tensor: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| color_error(format!("Background remover lock poisoned: {e}")))?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .map_err(|e| color_error(format!("Background removal failed: {e}")))?;

        let (_, output) = outputs
            .iter()
            .next()
            .ok_or_else(|| color_error("Background remover produced no output".to_string()))?;

        let (_shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| color_error(format!("Failed to extract saliency map: {e}")))?;

        let side = self.input_size as usize;
        if data.len() < side * side {
            return Err(color_error(format!(
                "Saliency map has {} values, expected {}",
                data.len(),
                side * side
            )));
        }

        let saliency = saliency_to_mask(&data[..side * side], self.input_size);
        Ok(image::imageops::resize(
            &saliency,
            image.width(),
            image.height(),
            FilterType::Lanczos3,
        ))
    }
}

/// Build the U²-Net input tensor for an RGB image.
pub fn preprocess(image: &RgbImage, input_size: u32) -> Array4<f32> {
    let resized = image::imageops::resize(image, input_size, input_size, FilterType::Lanczos3);

    let max_value = resized.as_raw().iter().copied().max().unwrap_or(0).max(1) as f32;
    let size = input_size as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            let scaled = pixel.0[c] as f32 / max_value;
            tensor[[0, c, y as usize, x as usize]] = (scaled - NORM_MEAN[c]) / NORM_STD[c];
        }
    }

    tensor
}

/// Min-max scale a square saliency map to an 8-bit mask.
pub fn saliency_to_mask(values: &[f32], side: u32) -> GrayImage {
    let (min, max) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;

    GrayImage::from_fn(side, side, |x, y| {
        let v = values[(y * side + x) as usize];
        let scaled = if range > f32::EPSILON {
            (v - min) / range
        } else {
            0.0
        };
        Luma([(scaled * 255.0) as u8])
    })
}
