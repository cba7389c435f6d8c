//! Caption decoder model running via ONNX Runtime.

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Value;

use crate::error::PipelineError;
use crate::onnx;

use super::decoder::StepPredictor;

/// Trained caption decoder exported to ONNX.
///
/// Takes two inputs in declaration order: the image features `[1, D]` and
/// the padded id sequence `[1, L]`. The sequence is fed as float32, the
/// default dtype of the Keras input layer it was exported from.
pub struct OnnxStepPredictor {
    session: Mutex<Session>,
    features_input: String,
    sequence_input: String,
}

impl OnnxStepPredictor {
    /// Load the caption decoder from an ONNX file.
    pub fn load(model_path: &Path) -> Result<Self, PipelineError> {
        let session = onnx::load_session(model_path, "Caption decoder")?;
        let names = onnx::input_names(&session);
        if names.len() != 2 {
            return Err(PipelineError::Model {
                message: format!(
                    "Caption decoder at {:?} must take 2 inputs (features, sequence), found {:?}",
                    model_path, names
                ),
            });
        }

        Ok(Self {
            session: Mutex::new(session),
            features_input: names[0].clone(),
            sequence_input: names[1].clone(),
        })
    }

    /// Errors carry no image path; the greedy decoder attaches it.
    fn error(&self, message: String) -> PipelineError {
        PipelineError::Model { message }
    }
}

impl StepPredictor for OnnxStepPredictor {
    fn predict(&self, features: &[f32], sequence: &[u32]) -> Result<Vec<f32>, PipelineError> {
        let features_value = Value::from_array((vec![1i64, features.len() as i64], features.to_vec()))
            .map_err(|e| self.error(format!("Failed to create features tensor: {e}")))?;

        let ids: Vec<f32> = sequence.iter().map(|&id| id as f32).collect();
        let sequence_value = Value::from_array((vec![1i64, ids.len() as i64], ids))
            .map_err(|e| self.error(format!("Failed to create sequence tensor: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| self.error(format!("Caption decoder lock poisoned: {e}")))?;

        let outputs = session
            .run(ort::inputs![
                self.features_input.as_str() => features_value,
                self.sequence_input.as_str() => sequence_value
            ])
            .map_err(|e| self.error(format!("Caption decoder inference failed: {e}")))?;

        let (_, output) = outputs
            .iter()
            .next()
            .ok_or_else(|| self.error("Caption decoder produced no output".to_string()))?;

        let (_shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| self.error(format!("Failed to extract prediction tensor: {e}")))?;

        Ok(data.to_vec())
    }
}
