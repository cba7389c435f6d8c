//! Shared ONNX Runtime session loading.
//!
//! Every model in Prism (feature encoder, caption decoder, background remover)
//! is an ONNX export run through `ort`. Sessions are wrapped in a `Mutex`
//! because `Session::run` requires `&mut self`.

use std::path::Path;

use ort::session::Session;

use crate::error::PipelineError;

/// Load an ONNX model from disk, failing with a model error that names `label`.
pub(crate) fn load_session(model_path: &Path, label: &str) -> Result<Session, PipelineError> {
    if !model_path.exists() {
        return Err(PipelineError::Model {
            message: format!("{label} model not found at {:?}", model_path),
        });
    }

    let session = Session::builder()
        .map_err(|e| PipelineError::Model {
            message: format!("Failed to create ONNX session builder: {e}"),
        })?
        .commit_from_file(model_path)
        .map_err(|e| PipelineError::Model {
            message: format!("Failed to load {label} model from {:?}: {e}", model_path),
        })?;

    tracing::debug!(
        "Loaded {label} model from {:?} (inputs: {:?}, outputs: {:?})",
        model_path,
        input_names(&session),
        session
            .outputs()
            .iter()
            .map(|o| o.name())
            .collect::<Vec<_>>()
    );

    Ok(session)
}

/// Input tensor names in declaration order.
pub(crate) fn input_names(session: &Session) -> Vec<String> {
    session
        .inputs()
        .iter()
        .map(|i| i.name().to_string())
        .collect()
}
