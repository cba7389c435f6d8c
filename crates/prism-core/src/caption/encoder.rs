//! Image feature encoder (VGG16 fc2) running via ONNX Runtime.

use std::path::Path;
use std::sync::Mutex;

use image::DynamicImage;
use ort::session::Session;
use ort::value::Value;

use crate::error::PipelineError;
use crate::onnx;

use super::preprocess::preprocess;

/// Produces the fixed-length feature vector the caption decoder consumes.
pub trait FeatureEncoder: Send + Sync {
    fn encode(&self, image: &DynamicImage, path: &Path) -> Result<Vec<f32>, PipelineError>;
}

/// VGG16 feature extractor exported to ONNX.
pub struct VggFeatureEncoder {
    session: Mutex<Session>,
    input_name: String,
    image_size: u32,
}

impl VggFeatureEncoder {
    /// Load the feature extractor from an ONNX file.
    pub fn load(model_path: &Path, image_size: u32) -> Result<Self, PipelineError> {
        let session = onnx::load_session(model_path, "Feature extractor")?;
        let input_name = onnx::input_names(&session)
            .into_iter()
            .next()
            .unwrap_or_else(|| "input_1".to_string());

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            image_size,
        })
    }
}

impl FeatureEncoder for VggFeatureEncoder {
    fn encode(&self, image: &DynamicImage, path: &Path) -> Result<Vec<f32>, PipelineError> {
        let tensor = preprocess(image, self.image_size);
        let shape: Vec<i64> = tensor.shape().iter().map(|&d| d as i64).collect();
        let flat_data: Vec<f32> = tensor.iter().copied().collect();

        let input_value =
            Value::from_array((shape, flat_data)).map_err(|e| PipelineError::Caption {
                path: path.to_path_buf(),
                message: format!("Failed to create feature input tensor: {e}"),
            })?;

        let mut session = self.session.lock().map_err(|e| PipelineError::Caption {
            path: path.to_path_buf(),
            message: format!("Feature extractor lock poisoned: {e}"),
        })?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .map_err(|e| PipelineError::Caption {
                path: path.to_path_buf(),
                message: format!("Feature extraction failed: {e}"),
            })?;

        let (_, output) = outputs
            .iter()
            .next()
            .ok_or_else(|| PipelineError::Caption {
                path: path.to_path_buf(),
                message: "Feature extractor produced no output".to_string(),
            })?;

        let (_shape, data) =
            output
                .try_extract_tensor::<f32>()
                .map_err(|e| PipelineError::Caption {
                    path: path.to_path_buf(),
                    message: format!("Failed to extract feature tensor: {e}"),
                })?;

        if data.is_empty() {
            return Err(PipelineError::Caption {
                path: path.to_path_buf(),
                message: "Feature extractor returned an empty vector".to_string(),
            });
        }

        Ok(data.to_vec())
    }
}
