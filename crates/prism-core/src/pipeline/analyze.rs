//! Decode one validated image and run a model on it off the async runtime.
//!
//! Shared by the `Prism` facade and the local CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::caption::CaptionEngine;
use crate::color::ColorExtractor;
use crate::error::PipelineError;
use crate::types::{Caption, ColorOutcome, Palette};

use super::decode::ImageDecoder;

/// Decode `path` and caption it on the blocking pool.
pub async fn caption_image(
    decoder: &ImageDecoder,
    captioner: &Arc<CaptionEngine>,
    path: &Path,
) -> Result<Caption, PipelineError> {
    let image = decoder.decode(path).await?;
    let captioner = Arc::clone(captioner);
    let owned = path.to_path_buf();

    tokio::task::spawn_blocking(move || captioner.caption(&image, &owned))
        .await
        .map_err(|e| PipelineError::Caption {
            path: path.to_path_buf(),
            message: format!("Task join error: {e}"),
        })?
}

/// Decode `path` and extract its palette on the blocking pool.
pub async fn extract_palette(
    decoder: &ImageDecoder,
    extractor: &Arc<ColorExtractor>,
    path: &Path,
) -> Result<Palette, PipelineError> {
    let image = decoder.decode(path).await?.to_rgb8();
    let extractor = Arc::clone(extractor);
    let owned = path.to_path_buf();

    tokio::task::spawn_blocking(move || extractor.palette(&image, &owned))
        .await
        .map_err(|e| PipelineError::Color {
            path: path.to_path_buf(),
            message: format!("Task join error: {e}"),
        })?
}

/// Like [`extract_palette`], but a failure becomes
/// [`ColorOutcome::Failed`] (and a warning) instead of an error.
pub async fn color_outcome(
    decoder: &ImageDecoder,
    extractor: &Arc<ColorExtractor>,
    path: PathBuf,
) -> ColorOutcome {
    match extract_palette(decoder, extractor, &path).await {
        Ok(palette) => ColorOutcome::Extracted { path, palette },
        Err(e) => {
            tracing::warn!("Color extraction failed for {:?}: {e}", path);
            ColorOutcome::Failed {
                path,
                reason: e.to_string(),
            }
        }
    }
}
